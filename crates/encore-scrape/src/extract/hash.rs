//! Content hashing.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use encore_core::{ExtractError, HashMode, MediaRecord};

use super::Extractor;

/// Computes the catalog key of a file from its content with BLAKE3.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher {
    mode: HashMode,
}

impl ContentHasher {
    pub fn new(mode: HashMode) -> Self {
        Self { mode }
    }

    /// Hash the file at `path`, returning the lowercase hex digest.
    pub fn hash_file(&self, path: &Path) -> io::Result<String> {
        let file = File::open(path)?;
        let mut hasher = blake3::Hasher::new();
        match self.mode {
            HashMode::Full => io::copy(&mut io::BufReader::new(file), &mut hasher)?,
            HashMode::Prefix { bytes } => io::copy(&mut file.take(bytes), &mut hasher)?,
        };
        Ok(hasher.finalize().to_hex().to_string())
    }
}

impl Extractor for ContentHasher {
    fn name(&self) -> &str {
        "content-hash"
    }

    fn extract(&self, path: &Path, media: &mut MediaRecord) -> Result<(), ExtractError> {
        media.hash = self.hash_file(path).map_err(|e| ExtractError::io(path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_same_content_same_hash() {
        let temp = TempDir::new().unwrap();
        let a = write(&temp, "a.mp4", b"karaoke");
        let b = write(&temp, "b.mkv", b"karaoke");
        let hasher = ContentHasher::default();

        let hash = hasher.hash_file(&a).unwrap();
        assert_eq!(hash, hasher.hash_file(&b).unwrap());
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_prefix_mode_ignores_tail() {
        let temp = TempDir::new().unwrap();
        let a = write(&temp, "a.mp4", b"0123456789-tail-one");
        let b = write(&temp, "b.mp4", b"0123456789-tail-two");

        let prefix = ContentHasher::new(HashMode::Prefix { bytes: 10 });
        assert_eq!(prefix.hash_file(&a).unwrap(), prefix.hash_file(&b).unwrap());

        let full = ContentHasher::new(HashMode::Full);
        assert_ne!(full.hash_file(&a).unwrap(), full.hash_file(&b).unwrap());
    }

    #[test]
    fn test_missing_file_is_extract_error() {
        let temp = TempDir::new().unwrap();
        let mut media = MediaRecord::new(temp.path().join("gone.mp4"));
        let err = ContentHasher::default()
            .extract(&temp.path().join("gone.mp4"), &mut media)
            .unwrap_err();

        assert!(matches!(err, ExtractError::Io { .. }));
        assert!(!media.has_hash());
    }
}
