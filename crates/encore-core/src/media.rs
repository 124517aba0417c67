//! Catalog media record types.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Textual metadata field that a filename preset can fill from a capture group.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum MetadataField {
    Title,
    Artist,
    Language,
    RelatedMedium,
    MediumDetail,
    Description,
    Identifier,
}

/// Catalog entry for one distinct video file.
///
/// Records are keyed by [`MediaRecord::hash`], a content digest of the file.
/// The play and request counters belong to playback and wishlist handling;
/// scraping never modifies them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    /// Hex-encoded content hash, the unique key.
    pub hash: String,
    /// Display title.
    pub title: String,
    /// Performing artist.
    pub artist: String,
    /// Normalized language tag (e.g. `en`, `ja`).
    pub language: String,
    /// Game, show or film the song belongs to.
    pub related_medium: String,
    /// Detail about the related medium, e.g. "Opening 1".
    pub medium_detail: String,
    /// Free-text description.
    pub description: String,
    /// Length of the video in whole seconds.
    #[serde(rename = "duration")]
    pub duration_secs: u64,
    /// Short internal identifier.
    pub identifier: String,
    /// Width of the first video stream.
    pub width: u32,
    /// Height of the first video stream.
    pub height: u32,
    /// Codec of the first video stream.
    pub video_format: String,
    /// Bit rate of the first video stream.
    pub video_bitrate: u64,
    /// Codec of the first audio stream.
    pub audio_format: String,
    /// Bit rate of the first audio stream.
    pub audio_bitrate: u64,
    /// Location of the file as last seen by a scrape.
    #[serde(serialize_with = "crate::paths::serialize_lossy")]
    pub file_name: PathBuf,
    /// Times this video has been played.
    pub times_played: u64,
    /// Times this video has been wished for.
    pub times_requested: u64,
    /// Set by the catalog on creation.
    pub created_at: Option<DateTime<Utc>>,
    /// Set by the catalog on every update.
    pub updated_at: Option<DateTime<Utc>>,
}

impl MediaRecord {
    /// Create an empty record for a file.
    pub fn new(file_name: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Default::default()
        }
    }

    /// Get the value of a textual field.
    pub fn field(&self, field: MetadataField) -> &str {
        match field {
            MetadataField::Title => &self.title,
            MetadataField::Artist => &self.artist,
            MetadataField::Language => &self.language,
            MetadataField::RelatedMedium => &self.related_medium,
            MetadataField::MediumDetail => &self.medium_detail,
            MetadataField::Description => &self.description,
            MetadataField::Identifier => &self.identifier,
        }
    }

    /// Set the value of a textual field.
    pub fn set_field(&mut self, field: MetadataField, value: impl Into<String>) {
        let slot = match field {
            MetadataField::Title => &mut self.title,
            MetadataField::Artist => &mut self.artist,
            MetadataField::Language => &mut self.language,
            MetadataField::RelatedMedium => &mut self.related_medium,
            MetadataField::MediumDetail => &mut self.medium_detail,
            MetadataField::Description => &mut self.description,
            MetadataField::Identifier => &mut self.identifier,
        };
        *slot = value.into();
    }

    /// Check if a content hash has been computed.
    pub fn has_hash(&self) -> bool {
        !self.hash.is_empty()
    }

    /// Fill an empty title with the file's base name, extension stripped.
    ///
    /// Returns `true` if the title was backfilled.
    pub fn backfill_title(&mut self) -> bool {
        if !self.title.trim().is_empty() {
            return false;
        }
        self.title = file_stem(&self.file_name);
        true
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
