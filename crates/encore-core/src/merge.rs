//! Reconciliation of freshly scraped metadata with existing catalog entries.

use crate::media::MediaRecord;

/// Merge a freshly extracted record into an existing catalog record.
///
/// Every non-empty or non-zero value of `existing` wins; `incoming` only
/// fills the gaps. The file name is always taken from `incoming` because
/// files may have been renamed or moved. The hash, counters and catalog
/// timestamps always stay those of `existing`.
pub fn merge(existing: &MediaRecord, incoming: &MediaRecord) -> MediaRecord {
    MediaRecord {
        hash: existing.hash.clone(),
        title: text(&existing.title, &incoming.title),
        artist: text(&existing.artist, &incoming.artist),
        language: text(&existing.language, &incoming.language),
        related_medium: text(&existing.related_medium, &incoming.related_medium),
        medium_detail: text(&existing.medium_detail, &incoming.medium_detail),
        description: text(&existing.description, &incoming.description),
        duration_secs: number(existing.duration_secs, incoming.duration_secs),
        identifier: text(&existing.identifier, &incoming.identifier),
        width: number(existing.width, incoming.width),
        height: number(existing.height, incoming.height),
        video_format: text(&existing.video_format, &incoming.video_format),
        video_bitrate: number(existing.video_bitrate, incoming.video_bitrate),
        audio_format: text(&existing.audio_format, &incoming.audio_format),
        audio_bitrate: number(existing.audio_bitrate, incoming.audio_bitrate),
        file_name: incoming.file_name.clone(),
        times_played: existing.times_played,
        times_requested: existing.times_requested,
        created_at: existing.created_at,
        updated_at: existing.updated_at,
    }
}

fn text(existing: &str, incoming: &str) -> String {
    if existing.is_empty() {
        incoming.to_string()
    } else {
        existing.to_string()
    }
}

fn number<T: Default + PartialEq + Copy>(existing: T, incoming: T) -> T {
    if existing == T::default() {
        incoming
    } else {
        existing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> MediaRecord {
        MediaRecord {
            hash: "abc".to_string(),
            title: "Title".to_string(),
            artist: "Artist".to_string(),
            language: "ja".to_string(),
            related_medium: "Show".to_string(),
            medium_detail: "OP1".to_string(),
            description: "desc".to_string(),
            duration_secs: 90,
            identifier: "7".to_string(),
            width: 1920,
            height: 1080,
            video_format: "h264".to_string(),
            video_bitrate: 4_000_000,
            audio_format: "aac".to_string(),
            audio_bitrate: 192_000,
            file_name: "/v/7_ja_Artist_Title.mp4".into(),
            times_played: 3,
            times_requested: 5,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_merge_idempotent() {
        let record = populated();
        assert_eq!(merge(&record, &record), record);
    }

    #[test]
    fn test_existing_values_win() {
        let existing = populated();
        let mut incoming = populated();
        incoming.title = "Other".to_string();
        incoming.width = 640;
        incoming.audio_format = "mp3".to_string();

        let merged = merge(&existing, &incoming);
        assert_eq!(merged.title, "Title");
        assert_eq!(merged.width, 1920);
        assert_eq!(merged.audio_format, "aac");
    }

    #[test]
    fn test_gaps_are_filled() {
        let mut existing = MediaRecord::new("/old/name.mp4");
        existing.hash = "abc".to_string();
        existing.title = "Custom Name".to_string();
        let mut incoming = populated();
        incoming.file_name = "/new/name.mp4".into();

        let merged = merge(&existing, &incoming);
        assert_eq!(merged.title, "Custom Name");
        assert_eq!(merged.artist, "Artist");
        assert_eq!(merged.duration_secs, 90);
        assert_eq!(merged.video_bitrate, 4_000_000);
        assert_eq!(merged.file_name, std::path::PathBuf::from("/new/name.mp4"));
    }

    #[test]
    fn test_counters_untouched() {
        let mut existing = populated();
        existing.times_played = 10;
        existing.times_requested = 0;
        let mut incoming = populated();
        incoming.times_played = 0;
        incoming.times_requested = 99;

        let merged = merge(&existing, &incoming);
        assert_eq!(merged.times_played, 10);
        assert_eq!(merged.times_requested, 0);
    }
}
