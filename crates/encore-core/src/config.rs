//! Scrape configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::media::MetadataField;

/// Default number of scrapes allowed to run at the same time.
pub const DEFAULT_MAX_CONCURRENT: usize = 2;

/// Default number of leading bytes hashed in prefix mode (1 MiB).
pub const DEFAULT_PREFIX_BYTES: u64 = 1024 * 1024;

/// How much of a file goes into its content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HashMode {
    /// Hash the whole file.
    #[default]
    Full,
    /// Hash only the leading `bytes` of the file. Files that differ only
    /// after that prefix collide.
    Prefix { bytes: u64 },
}

/// Settings for the external media probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Run the probe as part of the pipeline.
    pub enabled: bool,
    /// Probe executable, looked up on `PATH` unless absolute.
    pub program: PathBuf,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: PathBuf::from("ffprobe"),
        }
    }
}

/// A user-defined filename preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetDefinition {
    /// Unique preset name.
    pub name: String,
    /// Regular expression matched against the file's base name.
    pub pattern: String,
    /// Capture group index per field.
    pub fields: IndexMap<MetadataField, usize>,
}

/// Configuration for scraping operations.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct ScrapeConfig {
    /// Number of scrapes allowed in `Running` state at once.
    #[builder(default = "DEFAULT_MAX_CONCURRENT")]
    pub max_concurrent: usize,

    /// Content hash coverage.
    #[builder(default)]
    pub hash_mode: HashMode,

    /// Follow symbolic links to directories and files.
    #[builder(default = "false")]
    pub follow_symlinks: bool,

    /// Include hidden entries (starting with .).
    #[builder(default = "true")]
    pub include_hidden: bool,

    /// Glob patterns of entry names to skip.
    #[builder(default)]
    pub ignore_patterns: Vec<String>,

    /// Media probe settings.
    #[builder(default)]
    pub probe: ProbeConfig,

    /// Filename presets applied to every file, in order.
    #[builder(default = "default_presets()")]
    pub filename_presets: Vec<String>,

    /// Additional presets, usable by name in `filename_presets`.
    #[builder(default)]
    pub custom_presets: Vec<PresetDefinition>,
}

fn default_presets() -> Vec<String> {
    vec![
        "ID_Language_Artist_Title_Type_Anime".to_string(),
        "ID_Anime_Title (Type)".to_string(),
    ]
}

impl ScrapeConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == Some(0) {
            return Err("max_concurrent must be at least 1".to_string());
        }
        if let Some(HashMode::Prefix { bytes: 0 }) = self.hash_mode {
            return Err("Hash prefix must not be empty".to_string());
        }
        Ok(())
    }
}

impl ScrapeConfig {
    /// Create a new config builder.
    pub fn builder() -> ScrapeConfigBuilder {
        ScrapeConfigBuilder::default()
    }

    /// Check if hidden entries should be skipped.
    pub fn should_skip_hidden(&self, name: &str) -> bool {
        !self.include_hidden && name.starts_with('.')
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            hash_mode: HashMode::Full,
            follow_symlinks: false,
            include_hidden: true,
            ignore_patterns: Vec::new(),
            probe: ProbeConfig::default(),
            filename_presets: default_presets(),
            custom_presets: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ScrapeConfig::builder()
            .max_concurrent(4usize)
            .hash_mode(HashMode::Prefix { bytes: 4096 })
            .include_hidden(false)
            .build()
            .unwrap();

        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.hash_mode, HashMode::Prefix { bytes: 4096 });
        assert!(config.probe.enabled);
        assert_eq!(config.filename_presets.len(), 2);
    }

    #[test]
    fn test_builder_rejects_zero_concurrency() {
        assert!(ScrapeConfig::builder().max_concurrent(0usize).build().is_err());
        assert!(ScrapeConfig::builder()
            .hash_mode(HashMode::Prefix { bytes: 0 })
            .build()
            .is_err());
    }

    #[test]
    fn test_should_skip_hidden() {
        let mut config = ScrapeConfig::default();

        // By default, hidden entries are included
        assert!(!config.should_skip_hidden(".cache"));

        config.include_hidden = false;
        assert!(config.should_skip_hidden(".cache"));
        assert!(!config.should_skip_hidden("songs"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ScrapeConfig = serde_json::from_str(
            r#"{
                "max_concurrent": 3,
                "hash_mode": { "kind": "prefix", "bytes": 1048576 },
                "custom_presets": [
                    { "name": "Artist - Title", "pattern": "^(.+) - (.+)\\.[^.]+$",
                      "fields": { "Artist": 1, "Title": 2 } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.hash_mode, HashMode::Prefix { bytes: DEFAULT_PREFIX_BYTES });
        assert_eq!(config.custom_presets[0].fields[&MetadataField::Title], 2);
        assert_eq!(config.probe.program, PathBuf::from("ffprobe"));
        assert!(config.include_hidden);
    }
}
