//! Public facade of the scrape engine.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use encore_core::{Catalog, ScrapeConfig, ScrapeError, ScrapeRecord};

use crate::controller::{Controller, Message, Target};
use crate::extract::Pipeline;
use crate::preset::{PresetError, PresetTable};
use crate::walker::{EntryFilter, WalkContext};

/// Errors raised while building an engine from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Preset(#[from] PresetError),

    #[error("Invalid ignore pattern: {0}")]
    IgnorePattern(#[from] globset::Error),

    #[error("max_concurrent must be at least 1")]
    NoConcurrency,
}

/// Handle to a running scrape engine.
///
/// Cloning is cheap; all clones talk to the same controller. The controller
/// shuts down once the last handle is dropped and every scrape has ended.
#[derive(Debug, Clone)]
pub struct ScrapeEngine {
    mailbox: mpsc::Sender<Message>,
}

impl ScrapeEngine {
    /// Build an engine with the default pipeline described by `config`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn from_config(config: &ScrapeConfig, catalog: Arc<dyn Catalog>) -> Result<Self, ConfigError> {
        let presets = PresetTable::with_custom(&config.custom_presets)?;
        let pipeline = Pipeline::from_config(config, &presets)?;
        Self::with_pipeline(config, pipeline, catalog)
    }

    /// Build an engine with a custom extraction pipeline.
    ///
    /// Must be called within a Tokio runtime.
    pub fn with_pipeline(
        config: &ScrapeConfig,
        pipeline: Pipeline,
        catalog: Arc<dyn Catalog>,
    ) -> Result<Self, ConfigError> {
        if config.max_concurrent == 0 {
            return Err(ConfigError::NoConcurrency);
        }
        let filter = EntryFilter::from_config(config)?;
        info!(
            max_concurrent = config.max_concurrent,
            extractors = ?pipeline.names(),
            "Starting scrape engine"
        );
        let ctx = WalkContext {
            pipeline: Arc::new(pipeline),
            catalog,
            filter: Arc::new(filter),
        };
        Ok(Self {
            mailbox: Controller::spawn(ctx, config.max_concurrent),
        })
    }

    /// Queue a scrape of `root`.
    ///
    /// Fails with [`ScrapeError::AlreadyQueued`] if a scrape of `root`, one of
    /// its ancestors or one of its descendants is queued or running.
    pub async fn start(&self, root: impl AsRef<Path>) -> Result<ScrapeRecord, ScrapeError> {
        let root = normalize_root(root.as_ref())?;
        let record = self
            .request(|reply| Message::Start {
                root: root.clone(),
                reply,
            })
            .await??;
        info!(root = %root.display(), "Scrape accepted");
        Ok(record)
    }

    /// Stop the scrape of `root` and wait until it has settled.
    ///
    /// Does nothing if no such scrape is active.
    pub async fn stop(&self, root: impl AsRef<Path>) -> Result<(), ScrapeError> {
        let root = normalize_root(root.as_ref())?;
        self.stop_target(Target::Root(root)).await
    }

    /// Stop every active scrape and wait until all have settled.
    pub async fn stop_all(&self) -> Result<(), ScrapeError> {
        self.stop_target(Target::All).await
    }

    async fn stop_target(&self, target: Target) -> Result<(), ScrapeError> {
        let settled = self.request(|reply| Message::Stop { target, reply }).await?;
        debug!(count = settled.len(), "Waiting for stopped scrapes");
        for token in settled {
            token.cancelled().await;
        }
        Ok(())
    }

    /// Snapshot of the scrape of `root`, if one was ever started.
    pub async fn status(&self, root: impl AsRef<Path>) -> Result<Option<ScrapeRecord>, ScrapeError> {
        let root = normalize_root(root.as_ref())?;
        let records = self
            .request(|reply| Message::Status {
                target: Target::Root(root),
                reply,
            })
            .await?;
        Ok(records.into_iter().next())
    }

    /// Snapshots of all known scrapes, ordered by root path.
    pub async fn status_all(&self) -> Result<Vec<ScrapeRecord>, ScrapeError> {
        let mut records = self
            .request(|reply| Message::Status {
                target: Target::All,
                reply,
            })
            .await?;
        records.sort_by(|a, b| a.root_path.cmp(&b.root_path));
        Ok(records)
    }

    /// Wait until the scrape of `root` has ended and return its final record.
    pub async fn wait(&self, root: impl AsRef<Path>) -> Result<Option<ScrapeRecord>, ScrapeError> {
        let root = normalize_root(root.as_ref())?;
        let settled = self
            .request(|reply| Message::Settled {
                root: root.clone(),
                reply,
            })
            .await?;
        let Some(settled) = settled else {
            return Ok(None);
        };
        settled.cancelled().await;
        self.status(&root).await
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> Message,
    ) -> Result<T, ScrapeError> {
        let (tx, rx) = oneshot::channel();
        self.mailbox
            .send(message(tx))
            .await
            .map_err(|_| ScrapeError::EngineClosed)?;
        rx.await.map_err(|_| ScrapeError::EngineClosed)
    }
}

/// Absolute, lexically cleaned form of a scrape root.
///
/// `.` components and trailing separators are dropped so that equal
/// directories compare equal. Symlinks are not resolved.
pub fn normalize_root(root: &Path) -> Result<PathBuf, ScrapeError> {
    if root.as_os_str().is_empty() {
        return Err(ScrapeError::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    let absolute = std::path::absolute(root).map_err(|e| ScrapeError::root(root, e))?;

    let mut clean = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never climb above the filesystem root.
                if clean.parent().is_some() {
                    clean.pop();
                }
            }
            other => clean.push(other),
        }
    }
    Ok(clean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_root() {
        assert_eq!(normalize_root(Path::new("/media/A/")).unwrap(), PathBuf::from("/media/A"));
        assert_eq!(normalize_root(Path::new("/media/./A")).unwrap(), PathBuf::from("/media/A"));
        assert_eq!(normalize_root(Path::new("/media/B/../A")).unwrap(), PathBuf::from("/media/A"));
        assert_eq!(normalize_root(Path::new("/..")).unwrap(), PathBuf::from("/"));
        assert!(normalize_root(Path::new("")).is_err());
    }

    #[test]
    fn test_relative_root_becomes_absolute() {
        let root = normalize_root(Path::new("videos")).unwrap();
        assert!(root.is_absolute());
        assert!(root.ends_with("videos"));
    }
}
