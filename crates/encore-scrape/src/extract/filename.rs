//! Metadata from file names via presets.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use unic_langid::LanguageIdentifier;

use encore_core::{ExtractError, MediaRecord, MetadataField};

use super::Extractor;
use crate::preset::NamePreset;

/// Applies one filename preset to the base name of each file.
///
/// Fields whose capture is empty or absent are left alone, so a later
/// preset never erases what an earlier one found.
#[derive(Debug, Clone)]
pub struct FilenameExtractor {
    preset: Arc<NamePreset>,
}

impl FilenameExtractor {
    pub fn new(preset: Arc<NamePreset>) -> Self {
        Self { preset }
    }
}

impl Extractor for FilenameExtractor {
    fn name(&self) -> &str {
        self.preset.name()
    }

    fn extract(&self, path: &Path, media: &mut MediaRecord) -> Result<(), ExtractError> {
        let Some(base) = path.file_name() else {
            return Ok(());
        };
        let base = base.to_string_lossy();

        let Some(values) = self.preset.captures(&base) else {
            debug!(preset = self.preset.name(), "File name does not match preset");
            return Ok(());
        };

        for (field, value) in values {
            match field {
                MetadataField::Language => match normalize_language(value) {
                    Some(tag) => media.language = tag,
                    None => debug!(value, "Ignoring unrecognized language tag"),
                },
                _ => media.set_field(field, value),
            }
        }
        Ok(())
    }
}

/// Canonical BCP 47 form of a language tag, or `None` if it is not one.
pub fn normalize_language(raw: &str) -> Option<String> {
    raw.parse::<LanguageIdentifier>()
        .ok()
        .map(|tag| tag.to_string())
}
