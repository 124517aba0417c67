//! Core types and traits for encore.
//!
//! This crate provides the fundamental data structures shared by the
//! scraping engine and the HTTP server: catalog media records, scrape
//! status records, the catalog store contract, the merge policy and
//! scrape configuration.

mod catalog;
mod config;
mod error;
mod media;
mod merge;
mod paths;
mod scrape;

pub use catalog::{Catalog, MemoryCatalog};
pub use config::{
    HashMode, PresetDefinition, ProbeConfig, ScrapeConfig, ScrapeConfigBuilder,
    DEFAULT_MAX_CONCURRENT, DEFAULT_PREFIX_BYTES,
};
pub use error::{CatalogError, ExtractError, ScrapeError};
pub use media::{MediaRecord, MetadataField};
pub use merge::merge;
pub use scrape::{ScrapeRecord, ScrapeStatus};
