#![allow(dead_code)]

use review_export::remote::RemoteManager;
use review_export::review::{
    AssetExportInfo, AssetKind, EntityResolver, PublishSettings, ThumbnailExtractor,
    VersionPublisher,
};
use review_export::test_support::{FakeFrameReader, MockRemoteService};
use std::path::Path;
use std::sync::Arc;

/// Initialize tracing for tests with proper test output handling
pub fn tracing_init() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn publish_settings() -> PublishSettings {
    PublishSettings {
        entity_type: "Sequence".to_string(),
        project_id: 65,
        sequence_task_template: None,
        version_task_template: None,
        bypass_server_transcoding: false,
        department: "Flame".to_string(),
        user_id: Some(42),
        thumbnail_width: 1280,
        thumbnail_height: 720,
    }
}

pub fn build_publisher(
    mock: Arc<MockRemoteService>,
    reader: Arc<FakeFrameReader>,
    scratch_dir: &Path,
    settings: PublishSettings,
) -> VersionPublisher {
    let remote = RemoteManager::from_service(mock);
    let resolver = Arc::new(EntityResolver::new(remote.clone()));
    let thumbnails = ThumbnailExtractor::new(reader, remote.clone(), scratch_dir);
    VersionPublisher::new(remote, resolver, thumbnails, settings)
}

/// A video asset as the host reports it after export
pub fn video_asset(destination: &Path, sequence_name: &str) -> AssetExportInfo {
    AssetExportInfo {
        kind: AssetKind::Video,
        asset_name: sequence_name.to_string(),
        sequence_name: sequence_name.to_string(),
        destination_host: "localhost".to_string(),
        destination_path: destination.to_path_buf(),
        resolved_path: format!("{}.mov", sequence_name),
        width: 1920,
        height: 1080,
        aspect_ratio: 1.778,
        fps: Some(24.0),
        source_in: 100,
        source_out: 111,
        record_in: 86_400,
        record_out: 86_411,
        ..Default::default()
    }
}

/// Write a placeholder movie where the asset says it was exported
pub fn write_media(asset: &AssetExportInfo) {
    std::fs::write(asset.output_path(), b"not really a quicktime").unwrap();
}
