//! Filename presets.
//!
//! A preset is a regular expression over a file's base name plus a map from
//! metadata fields to capture group indices. Presets are compiled once into
//! a [`PresetTable`] when the engine is built; an invalid or unknown preset
//! is a construction error, never a per-file one.

use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use encore_core::{MetadataField, PresetDefinition};

/// Errors raised while compiling or resolving presets.
#[derive(Debug, Error)]
pub enum PresetError {
    /// No preset with this name exists.
    #[error("Unknown filename preset: {name}")]
    Unknown { name: String },

    /// The preset's pattern does not compile.
    #[error("Invalid pattern for preset {name}: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    /// A field refers to a capture group the pattern does not have.
    #[error("Preset {name} maps {field} to group {index}, but the pattern has {groups} groups")]
    CaptureOutOfRange {
        name: String,
        field: MetadataField,
        index: usize,
        groups: usize,
    },

    /// Two user presets share a name.
    #[error("Filename preset defined twice: {name}")]
    Duplicate { name: String },
}

/// A compiled filename preset.
#[derive(Debug)]
pub struct NamePreset {
    name: String,
    pattern: Regex,
    fields: IndexMap<MetadataField, usize>,
}

impl NamePreset {
    /// Compile a preset definition, checking every capture index.
    pub fn compile(definition: &PresetDefinition) -> Result<Self, PresetError> {
        let pattern = Regex::new(&definition.pattern).map_err(|source| PresetError::InvalidPattern {
            name: definition.name.clone(),
            source,
        })?;

        // captures_len counts the implicit whole-match group 0
        let groups = pattern.captures_len() - 1;
        if let Some((field, index)) = definition.fields.iter().find(|(_, index)| **index > groups) {
            return Err(PresetError::CaptureOutOfRange {
                name: definition.name.clone(),
                field: *field,
                index: *index,
                groups,
            });
        }

        Ok(Self {
            name: definition.name.clone(),
            pattern,
            fields: definition.fields.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Field to capture group mapping, in definition order.
    pub fn fields(&self) -> &IndexMap<MetadataField, usize> {
        &self.fields
    }

    /// Match a base name and return the non-empty value for each mapped field.
    ///
    /// Returns `None` if the name does not match.
    pub fn captures<'a>(&self, file_name: &'a str) -> Option<Vec<(MetadataField, &'a str)>> {
        let caps = self.pattern.captures(file_name)?;
        let values = self
            .fields
            .iter()
            .filter_map(|(field, index)| {
                let value = caps.get(*index)?.as_str().trim();
                (!value.is_empty()).then_some((*field, value))
            })
            .collect();
        Some(values)
    }
}

/// Named, compiled presets available to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PresetTable {
    presets: IndexMap<String, Arc<NamePreset>>,
}

impl PresetTable {
    /// Table of the built-in presets.
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for definition in builtin_definitions() {
            // Built-in patterns are fixed and covered by tests.
            match NamePreset::compile(&definition) {
                Ok(preset) => {
                    table.presets.insert(definition.name, Arc::new(preset));
                }
                Err(err) => debug!(error = %err, "Skipping broken built-in preset"),
            }
        }
        table
    }

    /// Built-in presets plus user definitions.
    ///
    /// A user preset with a built-in name replaces the built-in one.
    pub fn with_custom(custom: &[PresetDefinition]) -> Result<Self, PresetError> {
        let mut table = Self::builtin();
        let mut seen = Vec::with_capacity(custom.len());
        for definition in custom {
            if seen.contains(&definition.name.as_str()) {
                return Err(PresetError::Duplicate {
                    name: definition.name.clone(),
                });
            }
            seen.push(definition.name.as_str());

            let preset = NamePreset::compile(definition)?;
            if table
                .presets
                .insert(definition.name.clone(), Arc::new(preset))
                .is_some()
            {
                debug!(preset = %definition.name, "User preset replaces built-in");
            }
        }
        Ok(table)
    }

    /// Look up a preset by name.
    pub fn get(&self, name: &str) -> Result<Arc<NamePreset>, PresetError> {
        self.presets
            .get(name)
            .cloned()
            .ok_or_else(|| PresetError::Unknown {
                name: name.to_string(),
            })
    }

    /// Iterate over presets in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &NamePreset> {
        self.presets.values().map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

fn definition(name: &str, pattern: &str, fields: &[(MetadataField, usize)]) -> PresetDefinition {
    PresetDefinition {
        name: name.to_string(),
        pattern: pattern.to_string(),
        fields: fields.iter().copied().collect(),
    }
}

/// The built-in preset definitions.
///
/// `<id>_<language>_<artist>_<title>[_<detail>[_<related>[_...]]].<ext>` and
/// `<id>_<anime>_<title> (<type>).<ext>`, each also with `-` separators.
pub fn builtin_definitions() -> Vec<PresetDefinition> {
    use MetadataField::*;

    let full = [
        (Identifier, 1),
        (Language, 2),
        (Artist, 3),
        (Title, 4),
        (MediumDetail, 5),
        (RelatedMedium, 6),
    ];
    let anime = [
        (Identifier, 1),
        (Artist, 2),
        (Title, 3),
        (MediumDetail, 5),
        (RelatedMedium, 2),
    ];

    vec![
        definition(
            "ID_Language_Artist_Title_Type_Anime",
            r"^([0-9]+)_([^_]+)_([^_]+)_([^_]+)_?([^_]*)?_?([^_]*)?(_([^_]*))*\.[^.]+$",
            &full,
        ),
        definition(
            "ID_Anime_Title (Type)",
            r"^([0-9]+)_([^_]+)_([^_(]+)(\(([^(]+)\))?\.[^.]+$",
            &anime,
        ),
        definition(
            "ID-Language-Artist-Title-Type-Anime",
            r"^([0-9]+)-([^-]+)-([^-]+)-([^-]+)-?([^-]*)?-?([^-]*)?(-([^-]*))*\.[^.]+$",
            &full,
        ),
        definition(
            "ID-Anime-Title (Type)",
            r"^([0-9]+)-([^-]+)-([^-(]+)(\(([^(]+)\))?\.[^.]+$",
            &anime,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(preset: &NamePreset, name: &str) -> Vec<(MetadataField, String)> {
        preset
            .captures(name)
            .unwrap()
            .into_iter()
            .map(|(f, v)| (f, v.to_string()))
            .collect()
    }

    #[test]
    fn test_builtins_compile() {
        let table = PresetTable::builtin();
        assert_eq!(table.len(), builtin_definitions().len());
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_full_preset() {
        let table = PresetTable::builtin();
        let preset = table.get("ID_Language_Artist_Title_Type_Anime").unwrap();

        assert_eq!(
            values(&preset, "1_en_artist_title.mp4"),
            vec![
                (MetadataField::Identifier, "1".to_string()),
                (MetadataField::Language, "en".to_string()),
                (MetadataField::Artist, "artist".to_string()),
                (MetadataField::Title, "title".to_string()),
            ]
        );

        let all = values(&preset, "42_ja_LiSA_Gurenge_OP1_Demon Slayer.mkv");
        assert!(all.contains(&(MetadataField::MediumDetail, "OP1".to_string())));
        assert!(all.contains(&(MetadataField::RelatedMedium, "Demon Slayer".to_string())));

        assert!(preset.captures("no_digits_here_at.mp4").is_none());
        assert!(preset.captures("1_en_artist.mp4").is_none());
    }

    #[test]
    fn test_anime_preset() {
        let table = PresetTable::builtin();
        let preset = table.get("ID_Anime_Title (Type)").unwrap();

        let found = values(&preset, "12_Naruto_Blue Bird (OP3).mkv");
        assert_eq!(
            found,
            vec![
                (MetadataField::Identifier, "12".to_string()),
                (MetadataField::Artist, "Naruto".to_string()),
                (MetadataField::Title, "Blue Bird".to_string()),
                (MetadataField::MediumDetail, "OP3".to_string()),
                (MetadataField::RelatedMedium, "Naruto".to_string()),
            ]
        );

        // The full-form name does not fit this shape
        assert!(preset.captures("1_en_artist_title.mp4").is_none());
    }

    #[test]
    fn test_dash_presets() {
        let table = PresetTable::builtin();
        let preset = table.get("ID-Language-Artist-Title-Type-Anime").unwrap();
        let found = values(&preset, "7-fr-Stromae-Papaoutai.webm");
        assert!(found.contains(&(MetadataField::Title, "Papaoutai".to_string())));

        let preset = table.get("ID-Anime-Title (Type)").unwrap();
        let found = values(&preset, "3-Bleach-Asterisk (OP1).mp4");
        assert!(found.contains(&(MetadataField::MediumDetail, "OP1".to_string())));
    }

    #[test]
    fn test_invalid_pattern_fails() {
        let err = PresetTable::with_custom(&[definition("Broken", "([0-9]+", &[])]).unwrap_err();
        assert!(matches!(err, PresetError::InvalidPattern { .. }));
    }

    #[test]
    fn test_capture_out_of_range_fails() {
        let err = PresetTable::with_custom(&[definition(
            "Short",
            r"^(.+)\.mp4$",
            &[(MetadataField::Title, 1), (MetadataField::Artist, 2)],
        )])
        .unwrap_err();

        match err {
            PresetError::CaptureOutOfRange { field, index, groups, .. } => {
                assert_eq!(field, MetadataField::Artist);
                assert_eq!(index, 2);
                assert_eq!(groups, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_custom_presets() {
        let custom = definition(
            "Artist - Title",
            r"^(.+) - (.+)\.[^.]+$",
            &[(MetadataField::Artist, 1), (MetadataField::Title, 2)],
        );
        let table = PresetTable::with_custom(&[custom.clone()]).unwrap();
        assert_eq!(table.len(), 5);
        let preset = table.get("Artist - Title").unwrap();
        assert_eq!(
            values(&preset, "Queen - Bohemian Rhapsody.avi")[1],
            (MetadataField::Title, "Bohemian Rhapsody".to_string())
        );

        let err = PresetTable::with_custom(&[custom.clone(), custom]).unwrap_err();
        assert!(matches!(err, PresetError::Duplicate { .. }));
    }

    #[test]
    fn test_unknown_preset() {
        let err = PresetTable::builtin().get("Nope").unwrap_err();
        assert_eq!(err.to_string(), "Unknown filename preset: Nope");
    }
}
