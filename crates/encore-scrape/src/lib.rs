//! Concurrent directory scraping for encore.
//!
//! A scrape walks one root directory, runs every video file through an
//! extraction [`Pipeline`] and creates or merges the resulting records in a
//! [`Catalog`](encore_core::Catalog). Scrapes are managed by a
//! [`ScrapeEngine`]: at most `max_concurrent` run at once, the rest wait in
//! `Queued` state, and no two active scrapes may overlap.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use encore_core::{MemoryCatalog, ScrapeConfig};
//! use encore_scrape::ScrapeEngine;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = Arc::new(MemoryCatalog::new());
//! let engine = ScrapeEngine::from_config(&ScrapeConfig::default(), catalog.clone())?;
//!
//! engine.start("/media/karaoke").await?;
//! let record = engine.wait("/media/karaoke").await?;
//! println!("{:?}", record);
//! # Ok(())
//! # }
//! ```

mod controller;
mod engine;
pub mod extract;
pub mod preset;
mod walker;

pub use engine::{normalize_root, ConfigError, ScrapeEngine};
pub use extract::{
    ContentHasher, Extractor, FilenameExtractor, MediaProbe, Pipeline, PipelineError,
};
pub use preset::{builtin_definitions, NamePreset, PresetError, PresetTable};
pub use walker::{
    is_media_file, EntryFilter, FileError, FileOutcome, TreeWalker, WalkContext, WalkOutcome,
};
