#![cfg(feature = "test-utils")]

mod support;

use crate::support::{build_publisher, publish_settings, tracing_init, video_asset, write_media};
use review_export::review::publisher::{ENCODED_MEDIA_FIELD, MEDIA_FIELD, VERSION_TYPE};
use review_export::review::ReviewError;
use review_export::test_support::{FakeFrameReader, MockRemoteService};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_publish_creates_version_with_normalized_range() {
    tracing_init();
    let export_dir = TempDir::new().unwrap();
    let mock = Arc::new(MockRemoteService::new());
    let publisher = build_publisher(
        mock.clone(),
        Arc::new(FakeFrameReader::succeeding()),
        export_dir.path(),
        publish_settings(),
    );

    let mut asset = video_asset(export_dir.path(), "seq010");
    asset.version_number = 3;
    write_media(&asset);

    let outcome = publisher.publish(&asset, "first pass").await.unwrap();

    let version = mock.record(&outcome.version).unwrap();
    assert_eq!(version.entity_type, VERSION_TYPE);
    assert_eq!(version.field("code"), Some(&json!("seq010 v003")));
    assert_eq!(version.field("description"), Some(&json!("first pass")));
    assert_eq!(version.field("first_frame"), Some(&json!(1)));
    assert_eq!(version.field("last_frame"), Some(&json!(11)));
    assert_eq!(version.field("frame_count"), Some(&json!(11)));
    assert_eq!(version.field("frame_range"), Some(&json!("1-11")));
    assert_eq!(version.field("frame_aspect_ratio"), Some(&json!(1.778)));
    assert_eq!(version.field("movie_aspect_ratio"), Some(&json!(1.778)));
    assert_eq!(version.field("department"), Some(&json!("Flame")));
    assert_eq!(
        version.field("created_by"),
        Some(&json!({"type": "HumanUser", "id": 42}))
    );
    assert_eq!(version.field("entity"), Some(&outcome.parent.link()));
}

#[tokio::test]
async fn test_unversioned_title_is_sequence_name() {
    let export_dir = TempDir::new().unwrap();
    let mock = Arc::new(MockRemoteService::new());
    let publisher = build_publisher(
        mock.clone(),
        Arc::new(FakeFrameReader::succeeding()),
        export_dir.path(),
        publish_settings(),
    );

    let asset = video_asset(export_dir.path(), "seq010");
    write_media(&asset);

    let outcome = publisher.publish(&asset, "").await.unwrap();
    let version = mock.record(&outcome.version).unwrap();
    assert_eq!(version.field("code"), Some(&json!("seq010")));
}

#[tokio::test]
async fn test_upload_and_cleanup() {
    let export_dir = TempDir::new().unwrap();
    let mock = Arc::new(MockRemoteService::new());
    let publisher = build_publisher(
        mock.clone(),
        Arc::new(FakeFrameReader::succeeding()),
        export_dir.path(),
        publish_settings(),
    );

    let asset = video_asset(export_dir.path(), "seq010");
    write_media(&asset);

    let outcome = publisher.publish(&asset, "notes").await.unwrap();

    let uploads = mock.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].entity, outcome.version);
    assert_eq!(uploads[0].field, MEDIA_FIELD);
    assert_eq!(uploads[0].file_path, asset.output_path());
    assert!(!asset.output_path().exists());

    // New parent gets a thumbnail; the version relies on server transcoding
    assert!(outcome.parent_created);
    assert_eq!(mock.thumbnail_uploads(), vec![outcome.parent.clone()]);
}

#[tokio::test]
async fn test_existing_parent_is_reused_without_thumbnail() {
    let export_dir = TempDir::new().unwrap();
    let mock = Arc::new(MockRemoteService::new());
    let reader = Arc::new(FakeFrameReader::succeeding());
    let publisher = build_publisher(
        mock.clone(),
        reader.clone(),
        export_dir.path(),
        publish_settings(),
    );

    let first = video_asset(export_dir.path(), "seq010");
    write_media(&first);
    let first_outcome = publisher.publish(&first, "a").await.unwrap();

    let mut second = video_asset(export_dir.path(), "seq010");
    second.resolved_path = "seq010_take2.mov".to_string();
    write_media(&second);
    let second_outcome = publisher.publish(&second, "b").await.unwrap();

    assert_eq!(first_outcome.parent, second_outcome.parent);
    assert!(!second_outcome.parent_created);
    assert_eq!(mock.records_of_type("Sequence").len(), 1);
    assert_eq!(mock.records_of_type(VERSION_TYPE).len(), 2);
    assert_eq!(reader.calls(), 1);
}

#[tokio::test]
async fn test_missing_media_performs_no_remote_writes() {
    let export_dir = TempDir::new().unwrap();
    let mock = Arc::new(MockRemoteService::new());
    let publisher = build_publisher(
        mock.clone(),
        Arc::new(FakeFrameReader::succeeding()),
        export_dir.path(),
        publish_settings(),
    );

    let asset = video_asset(export_dir.path(), "seq010");

    let err = publisher.publish(&asset, "notes").await.unwrap_err();

    assert!(matches!(err, ReviewError::MediaNotFound(ref path) if *path == asset.output_path()));
    assert!(err.is_fatal_to_job());
    assert_eq!(mock.write_count(), 0);
}

#[tokio::test]
async fn test_thumbnail_failure_does_not_block_publish() {
    let export_dir = TempDir::new().unwrap();
    let mock = Arc::new(MockRemoteService::new());
    let reader = Arc::new(FakeFrameReader::failing(1));
    let publisher = build_publisher(
        mock.clone(),
        reader.clone(),
        export_dir.path(),
        publish_settings(),
    );

    let asset = video_asset(export_dir.path(), "seq010");
    write_media(&asset);

    let outcome = publisher.publish(&asset, "notes").await.unwrap();

    assert_eq!(reader.calls(), 1);
    assert!(mock.thumbnail_uploads().is_empty());
    assert!(mock.record(&outcome.version).is_some());
    assert_eq!(mock.uploads().len(), 1);
}

#[tokio::test]
async fn test_bypass_transcoding_uses_encoded_slot_and_thumbnails_version() {
    let export_dir = TempDir::new().unwrap();
    let mock = Arc::new(MockRemoteService::new());
    let mut settings = publish_settings();
    settings.bypass_server_transcoding = true;
    let publisher = build_publisher(
        mock.clone(),
        Arc::new(FakeFrameReader::succeeding()),
        export_dir.path(),
        settings,
    );

    let asset = video_asset(export_dir.path(), "seq010");
    write_media(&asset);

    let outcome = publisher.publish(&asset, "notes").await.unwrap();

    assert_eq!(mock.uploads()[0].field, ENCODED_MEDIA_FIELD);
    assert_eq!(
        mock.thumbnail_uploads(),
        vec![outcome.parent.clone(), outcome.version.clone()]
    );
    assert!(!asset.output_path().exists());
}

#[tokio::test]
async fn test_failed_upload_keeps_version_and_removes_media() {
    let export_dir = TempDir::new().unwrap();
    let mock = Arc::new(MockRemoteService::new());
    let publisher = build_publisher(
        mock.clone(),
        Arc::new(FakeFrameReader::failing(1)),
        export_dir.path(),
        publish_settings(),
    );

    let asset = video_asset(export_dir.path(), "seq010");
    write_media(&asset);
    mock.set_fail_uploads(true);

    let err = publisher.publish(&asset, "notes").await.unwrap_err();

    assert!(matches!(err, ReviewError::Transport(_)));
    assert!(err.is_retryable());
    assert_eq!(mock.records_of_type(VERSION_TYPE).len(), 1);
    assert!(!asset.output_path().exists());
}

#[tokio::test]
async fn test_missing_sequence_template_aborts_before_any_write() {
    let export_dir = TempDir::new().unwrap();
    let mock = Arc::new(MockRemoteService::new());
    let mut settings = publish_settings();
    settings.sequence_task_template = Some("doesNotExist".to_string());
    let publisher = build_publisher(
        mock.clone(),
        Arc::new(FakeFrameReader::succeeding()),
        export_dir.path(),
        settings,
    );

    let asset = video_asset(export_dir.path(), "seq010");
    write_media(&asset);

    let err = publisher.publish(&asset, "notes").await.unwrap_err();

    assert!(matches!(err, ReviewError::Configuration(_)));
    assert_eq!(mock.write_count(), 0);
    // Nothing was uploaded, so the media stays for a rerun
    assert!(asset.output_path().exists());
}

#[tokio::test]
async fn test_version_template_is_linked() {
    let export_dir = TempDir::new().unwrap();
    let mock = Arc::new(MockRemoteService::new());
    let template = mock.seed("TaskTemplate", json!({"code": "Review Version"}));
    let mut settings = publish_settings();
    settings.version_task_template = Some("Review Version".to_string());
    let publisher = build_publisher(
        mock.clone(),
        Arc::new(FakeFrameReader::succeeding()),
        export_dir.path(),
        settings,
    );

    let asset = video_asset(export_dir.path(), "seq010");
    write_media(&asset);

    let outcome = publisher.publish(&asset, "notes").await.unwrap();
    let version = mock.record(&outcome.version).unwrap();
    assert_eq!(version.field("task_template"), Some(&template.entity().link()));
}

#[tokio::test]
async fn test_failed_media_cleanup_does_not_fail_publish() {
    tracing_init();
    let export_dir = TempDir::new().unwrap();
    let mock = Arc::new(MockRemoteService::new());
    let publisher = build_publisher(
        mock.clone(),
        Arc::new(FakeFrameReader::failing(1)),
        export_dir.path(),
        publish_settings(),
    );

    let asset = video_asset(export_dir.path(), "seq010");
    write_media(&asset);
    // The media is gone before the publisher tries to remove it
    mock.set_consume_uploads(true);

    let outcome = publisher.publish(&asset, "notes").await.unwrap();

    assert!(mock.record(&outcome.version).is_some());
    let uploads = mock.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].entity, outcome.version);
    assert!(!asset.output_path().exists());
}
