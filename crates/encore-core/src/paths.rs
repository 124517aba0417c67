//! Serde helpers for filesystem paths.
//!
//! File names on Unix are arbitrary bytes. Records are shown to API clients
//! as JSON strings, so paths are written lossily: invalid UTF-8 becomes
//! U+FFFD instead of failing the whole response.

use std::path::Path;

use serde::Serializer;

/// Serialize a path as a string, replacing invalid UTF-8.
pub fn serialize_lossy<S>(path: &Path, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&path.to_string_lossy())
}
