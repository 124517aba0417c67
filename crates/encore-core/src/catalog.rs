//! Catalog store contract and an in-memory implementation.

use chrono::Utc;
use dashmap::DashMap;

use crate::error::CatalogError;
use crate::media::MediaRecord;

/// Store of media records keyed by content hash.
///
/// Implementations serialize their own writes; callers hold no lock across
/// calls. Methods are blocking and are called from the scrape worker threads.
pub trait Catalog: Send + Sync {
    /// Look up the record with the given content hash.
    fn lookup(&self, hash: &str) -> Result<Option<MediaRecord>, CatalogError>;

    /// Add a record whose hash is not yet known.
    fn create(&self, media: MediaRecord) -> Result<(), CatalogError>;

    /// Replace an existing record.
    fn update(&self, media: MediaRecord) -> Result<(), CatalogError>;
}

/// Concurrent in-memory catalog.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    records: DashMap<String, MediaRecord>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get a copy of the record with the given hash.
    pub fn get(&self, hash: &str) -> Option<MediaRecord> {
        self.records.get(hash).map(|r| r.value().clone())
    }

    /// Copies of all records, ordered by title then hash.
    pub fn list(&self) -> Vec<MediaRecord> {
        let mut all: Vec<MediaRecord> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.hash.cmp(&b.hash)));
        all
    }
}

impl Catalog for MemoryCatalog {
    fn lookup(&self, hash: &str) -> Result<Option<MediaRecord>, CatalogError> {
        Ok(self.get(hash))
    }

    fn create(&self, mut media: MediaRecord) -> Result<(), CatalogError> {
        use dashmap::mapref::entry::Entry;

        match self.records.entry(media.hash.clone()) {
            Entry::Occupied(_) => Err(CatalogError::AlreadyExists { hash: media.hash }),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                media.created_at = Some(now);
                media.updated_at = Some(now);
                slot.insert(media);
                Ok(())
            }
        }
    }

    fn update(&self, mut media: MediaRecord) -> Result<(), CatalogError> {
        match self.records.get_mut(&media.hash) {
            Some(mut current) => {
                media.created_at = current.created_at;
                media.updated_at = Some(Utc::now());
                *current = media;
                Ok(())
            }
            None => Err(CatalogError::NotFound { hash: media.hash }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hash: &str, title: &str) -> MediaRecord {
        let mut media = MediaRecord::new(format!("/v/{title}.mp4"));
        media.hash = hash.to_string();
        media.title = title.to_string();
        media
    }

    #[test]
    fn test_create_and_lookup() {
        let catalog = MemoryCatalog::new();
        catalog.create(record("h1", "One")).unwrap();

        let found = catalog.lookup("h1").unwrap().unwrap();
        assert_eq!(found.title, "One");
        assert!(found.created_at.is_some());
        assert!(catalog.lookup("h2").unwrap().is_none());
    }

    #[test]
    fn test_create_duplicate_fails() {
        let catalog = MemoryCatalog::new();
        catalog.create(record("h1", "One")).unwrap();

        let err = catalog.create(record("h1", "Again")).unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyExists { .. }));
        assert_eq!(catalog.get("h1").unwrap().title, "One");
    }

    #[test]
    fn test_update_keeps_creation_time() {
        let catalog = MemoryCatalog::new();
        catalog.create(record("h1", "One")).unwrap();
        let created = catalog.get("h1").unwrap().created_at;

        catalog.update(record("h1", "Renamed")).unwrap();
        let updated = catalog.get("h1").unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.created_at, created);

        let err = catalog.update(record("nope", "x")).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }

    #[test]
    fn test_list_sorted() {
        let catalog = MemoryCatalog::new();
        catalog.create(record("h2", "Beta")).unwrap();
        catalog.create(record("h1", "Alpha")).unwrap();

        let titles: Vec<_> = catalog.list().into_iter().map(|m| m.title).collect();
        assert_eq!(titles, vec!["Alpha", "Beta"]);
    }
}
