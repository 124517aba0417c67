use encore_core::{
    merge, Catalog, MediaRecord, MemoryCatalog, MetadataField, ScrapeConfig, ScrapeRecord,
    ScrapeStatus,
};
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

fn full_record(hash: &str) -> MediaRecord {
    let mut media = MediaRecord::new(format!("/videos/{hash}.mp4"));
    media.hash = hash.to_string();
    for field in MetadataField::iter() {
        media.set_field(field, format!("{field} value"));
    }
    media.duration_secs = 240;
    media.width = 1280;
    media.height = 720;
    media.video_format = "vp9".to_string();
    media.video_bitrate = 2_500_000;
    media.audio_format = "opus".to_string();
    media.audio_bitrate = 128_000;
    media.times_played = 4;
    media.times_requested = 9;
    media
}

#[test]
fn test_merge_fills_only_gaps_for_every_field() {
    let existing = full_record("h");
    let mut incoming = MediaRecord::new("/elsewhere/renamed.mp4");
    incoming.hash = "h".to_string();
    for field in MetadataField::iter() {
        incoming.set_field(field, "incoming");
    }
    incoming.duration_secs = 1;
    incoming.width = 2;
    incoming.height = 3;

    let merged = merge(&existing, &incoming);

    for field in MetadataField::iter() {
        assert_eq!(merged.field(field), existing.field(field), "field {field}");
    }
    assert_eq!(merged.duration_secs, 240);
    assert_eq!(merged.width, 1280);
    assert_eq!(merged.height, 720);
    assert_eq!(merged.file_name, PathBuf::from("/elsewhere/renamed.mp4"));
    assert_eq!(merged.times_played, 4);
    assert_eq!(merged.times_requested, 9);
}

#[test]
fn test_merge_idempotent_on_populated_record() {
    let record = full_record("x");
    assert_eq!(merge(&record, &record), record);
}

#[test]
fn test_catalog_roundtrip_through_trait_object() {
    let catalog = MemoryCatalog::new();
    let store: &dyn Catalog = &catalog;

    store.create(full_record("a")).unwrap();
    let mut changed = store.lookup("a").unwrap().unwrap();
    changed.title = "Changed".to_string();
    store.update(changed).unwrap();

    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.get("a").unwrap().title, "Changed");
}

#[test]
fn test_scrape_record_lifecycle() {
    let mut record = ScrapeRecord::queued("/media/a");
    assert!(record.is_active());
    assert!(record.overlaps(Path::new("/media/a/deeper")));

    record.status = ScrapeStatus::Running;
    record.current_path = PathBuf::from("/media/a/deeper");
    record.finish(ScrapeStatus::Failed, Some("disk on fire".to_string()));

    assert!(!record.is_active());
    assert_eq!(record.failure_reason.as_deref(), Some("disk on fire"));
    assert!(record.current_path.as_os_str().is_empty());
}

#[test]
fn test_default_config_values() {
    let config = ScrapeConfig::default();
    assert_eq!(config.max_concurrent, 2);
    assert_eq!(
        config.filename_presets,
        vec![
            "ID_Language_Artist_Title_Type_Anime".to_string(),
            "ID_Anime_Title (Type)".to_string()
        ]
    );
    assert!(!config.follow_symlinks);
}
