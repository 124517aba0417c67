//! Scrape status records.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle state of a scrape.
///
/// `Queued` is the entry state, `Running` is entered once a concurrency
/// slot is held, the remaining states are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScrapeStatus {
    Queued,
    Running,
    Finished,
    Failed,
    Cancelled,
}

impl ScrapeStatus {
    /// Check if the scrape is queued or running.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    /// Check if the scrape has ended.
    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

/// Point-in-time view of one scrape.
///
/// Values of this type are always copies: the controller hands out clones
/// and never shares its registry entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRecord {
    /// Root directory of the scrape, its unique key.
    #[serde(serialize_with = "crate::paths::serialize_lossy")]
    pub root_path: PathBuf,
    /// Current lifecycle state.
    pub status: ScrapeStatus,
    /// Directory under examination, empty once the scrape ended.
    #[serde(serialize_with = "crate::paths::serialize_lossy")]
    pub current_path: PathBuf,
    /// File under examination, empty once the scrape ended.
    #[serde(serialize_with = "crate::paths::serialize_lossy")]
    pub current_file: PathBuf,
    /// Media files successfully scraped.
    pub files_scraped: u64,
    /// Media files added to the catalog.
    pub new_files: u64,
    /// Media files merged into existing catalog entries.
    pub updated_files: u64,
    /// Media files skipped because extraction or the catalog write failed.
    pub files_skipped: u64,
    /// When the scrape was requested.
    pub started_at: DateTime<Utc>,
    /// When the scrape reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
    /// Why the scrape failed, only set in `Failed` state.
    pub failure_reason: Option<String>,
}

impl ScrapeRecord {
    /// Create a queued record for a root directory.
    pub fn queued(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            status: ScrapeStatus::Queued,
            current_path: PathBuf::new(),
            current_file: PathBuf::new(),
            files_scraped: 0,
            new_files: 0,
            updated_files: 0,
            files_skipped: 0,
            started_at: Utc::now(),
            finished_at: None,
            failure_reason: None,
        }
    }

    /// Check if the scrape is queued or running.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Move into a terminal state and clear the live progress fields.
    pub fn finish(&mut self, status: ScrapeStatus, failure_reason: Option<String>) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.failure_reason = match status {
            ScrapeStatus::Failed => failure_reason,
            _ => None,
        };
        self.clear_position();
        self.finished_at = Some(Utc::now());
    }

    /// Clear the directory and file under examination.
    pub fn clear_position(&mut self) {
        self.current_path = PathBuf::new();
        self.current_file = PathBuf::new();
    }

    /// Check if `other` lies inside this scrape's root, or the other way round.
    pub fn overlaps(&self, other: &std::path::Path) -> bool {
        other.starts_with(&self.root_path) || self.root_path.starts_with(other)
    }
}

impl std::fmt::Display for ScrapeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Scrape({})[{} | dir: {} | file: {} | {} scraped, {} new, {} updated]",
            self.root_path.display(),
            self.status,
            self.current_path.display(),
            self.current_file.display(),
            self.files_scraped,
            self.new_files,
            self.updated_files,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_status_flags() {
        assert!(ScrapeStatus::Queued.is_active());
        assert!(ScrapeStatus::Running.is_active());
        assert!(ScrapeStatus::Finished.is_terminal());
        assert!(ScrapeStatus::Failed.is_terminal());
        assert!(ScrapeStatus::Cancelled.is_terminal());
        assert_eq!(ScrapeStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_overlap_is_component_wise() {
        let record = ScrapeRecord::queued("/media/a");

        assert!(record.overlaps(Path::new("/media/a")));
        assert!(record.overlaps(Path::new("/media/a/sub")));
        assert!(record.overlaps(Path::new("/media")));
        assert!(!record.overlaps(Path::new("/media/ab")));
        assert!(!record.overlaps(Path::new("/media/b")));
    }

    #[test]
    fn test_finish_clears_position() {
        let mut record = ScrapeRecord::queued("/media/a");
        record.status = ScrapeStatus::Running;
        record.current_path = PathBuf::from("/media/a/x");
        record.current_file = PathBuf::from("/media/a/x/1.mp4");

        record.finish(ScrapeStatus::Cancelled, Some("ignored".to_string()));

        assert_eq!(record.status, ScrapeStatus::Cancelled);
        assert!(record.current_path.as_os_str().is_empty());
        assert!(record.current_file.as_os_str().is_empty());
        assert!(record.failure_reason.is_none());
        assert!(record.finished_at.is_some());
    }

    #[test]
    fn test_json_shape() {
        let record = ScrapeRecord::queued("/media/a");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "queued");
        assert_eq!(json["rootPath"], "/media/a");
        assert_eq!(json["filesScraped"], 0);
    }
}
