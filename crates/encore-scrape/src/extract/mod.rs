//! Extraction pipeline.
//!
//! An [`Extractor`] reads one file and fills fields of a [`MediaRecord`].
//! Extractors run in order; later ones see what earlier ones set and only
//! write the fields they own, so their effect is additive.

mod filename;
mod hash;
mod probe;

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use encore_core::{ExtractError, MediaRecord, ScrapeConfig};

use crate::preset::{PresetError, PresetTable};

pub use filename::{normalize_language, FilenameExtractor};
pub use hash::ContentHasher;
pub use probe::{MediaProbe, ProbeReport};

/// A single metadata extraction step.
pub trait Extractor: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Read `path` and populate fields of `media`.
    fn extract(&self, path: &Path, media: &mut MediaRecord) -> Result<(), ExtractError>;
}

impl<F> Extractor for F
where
    F: Fn(&Path, &mut MediaRecord) -> Result<(), ExtractError> + Send + Sync,
{
    fn name(&self) -> &str {
        "custom"
    }

    fn extract(&self, path: &Path, media: &mut MediaRecord) -> Result<(), ExtractError> {
        self(path, media)
    }
}

/// An extractor in the pipeline failed; the file is skipped.
#[derive(Debug, Error)]
#[error("Extractor #{index} ({name}) failed: {source}")]
pub struct PipelineError {
    pub index: usize,
    pub name: String,
    #[source]
    pub source: ExtractError,
}

/// Ordered sequence of extractors applied to every media file.
#[derive(Default)]
pub struct Pipeline {
    extractors: Vec<Box<dyn Extractor>>,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the default pipeline: content hash, media probe (if enabled),
    /// then the configured filename presets in order.
    pub fn from_config(config: &ScrapeConfig, presets: &PresetTable) -> Result<Self, PresetError> {
        let mut pipeline = Self::new().with(ContentHasher::new(config.hash_mode));
        if config.probe.enabled {
            pipeline.push(MediaProbe::new(&config.probe.program));
        }
        for name in &config.filename_presets {
            pipeline.push(FilenameExtractor::new(presets.get(name)?));
        }
        Ok(pipeline)
    }

    /// Append an extractor.
    pub fn push(&mut self, extractor: impl Extractor + 'static) {
        self.extractors.push(Box::new(extractor));
    }

    /// Append an extractor, builder style.
    pub fn with(mut self, extractor: impl Extractor + 'static) -> Self {
        self.push(extractor);
        self
    }

    /// Number of extractors.
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Check if the pipeline has no extractors.
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// Names of the extractors, in order.
    pub fn names(&self) -> Vec<&str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    /// Run all extractors on one file, stopping at the first failure.
    pub fn run(&self, path: &Path, media: &mut MediaRecord) -> Result<(), PipelineError> {
        for (index, extractor) in self.extractors.iter().enumerate() {
            debug!(extractor = extractor.name(), "Running extractor");
            extractor
                .extract(path, media)
                .map_err(|source| PipelineError {
                    index,
                    name: extractor.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("extractors", &self.names())
            .finish()
    }
}
