use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use encore_core::ScrapeConfig;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    /// Directory that request paths are resolved against.
    #[serde(default = "default_browse_root")]
    pub browse_root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_browse_root() -> PathBuf {
    PathBuf::from("/")
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log: Log::default(),
            scrape: ScrapeConfig::default(),
            browse_root: default_browse_root(),
        }
    }
}

/// Where a loaded config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// No file was given.
    Defaults,
    /// Read from this file.
    File(PathBuf),
    /// The file does not exist, defaults were used.
    Missing(PathBuf),
}

impl AppConfig {
    /// Load the config file at `path`, or the defaults if none is given.
    ///
    /// A missing file falls back to the defaults; a malformed one is an error.
    /// Logging is usually configured from the result, so the caller reports
    /// the returned [`ConfigSource`].
    pub fn load(path: Option<&Path>) -> Result<(Self, ConfigSource), LoadError> {
        let Some(path) = path else {
            return Ok((Self::default(), ConfigSource::Defaults));
        };
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok((Self::default(), ConfigSource::Missing(path.to_path_buf())));
            }
            Err(source) => {
                return Err(LoadError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let config = Self::parse(&text).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::HashMode;

    #[test]
    fn test_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.listen.port(), 3000);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.browse_root, PathBuf::from("/"));
        assert_eq!(config.scrape.max_concurrent, 2);
    }

    #[test]
    fn test_parse_full() {
        let config = AppConfig::parse(
            r#"
            listen = "127.0.0.1:8080"
            browse_root = "/srv/karaoke"

            [log]
            level = "debug"

            [scrape]
            max_concurrent = 4
            include_hidden = false
            ignore_patterns = ["*.part"]
            hash_mode = { kind = "prefix", bytes = 1048576 }

            [scrape.probe]
            enabled = false

            [[scrape.custom_presets]]
            name = "Artist - Title"
            pattern = '^(.+) - (.+)\.[^.]+$'
            fields = { Artist = 1, Title = 2 }
            "#,
        )
        .unwrap();

        assert_eq!(config.listen.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.scrape.max_concurrent, 4);
        assert_eq!(config.scrape.hash_mode, HashMode::Prefix { bytes: 1 << 20 });
        assert!(!config.scrape.probe.enabled);
        assert_eq!(config.scrape.custom_presets[0].name, "Artist - Title");
        // Unspecified fields keep their defaults
        assert_eq!(config.scrape.filename_presets.len(), 2);
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let temp = tempfile::TempDir::new().unwrap();

        let path = temp.path().join("none.toml");
        let (missing, source) = AppConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(missing.listen, default_listen());
        assert_eq!(source, ConfigSource::Missing(path));

        let good = temp.path().join("good.toml");
        fs::write(&good, "[log]\nlevel = \"warn\"\n").unwrap();
        let (config, source) = AppConfig::load(Some(good.as_path())).unwrap();
        assert_eq!(config.log.level, "warn");
        assert_eq!(source, ConfigSource::File(good));

        assert_eq!(AppConfig::load(None).unwrap().1, ConfigSource::Defaults);

        let bad = temp.path().join("bad.toml");
        fs::write(&bad, "listen = 3000 = 4").unwrap();
        assert!(matches!(
            AppConfig::load(Some(bad.as_path())),
            Err(LoadError::Parse { .. })
        ));
    }
}
