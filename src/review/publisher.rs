// # Version Publisher
//
// Runs inside a deferred job once the host has finished writing an asset's movie:
//
// 1. Check the movie exists (nothing else happens if it does not)
// 2. Find or create the parent entity, thumbnailing it when newly created
// 3. Create the version record with a 1-based frame range
// 4. Upload the movie and remove the temporary file

use crate::config::Config;
use crate::jobs::{JobOperation, JobRunner};
use crate::remote::RemoteManager;
use crate::review::best_effort::{best_effort, remove_temp_file};
use crate::review::entity_resolver::EntityResolver;
use crate::review::error::ReviewError;
use crate::review::thumbnail::{ReadFrameCommand, ThumbnailExtractor};
use crate::review::types::{AssetExportInfo, FrameRange, RemoteEntity, VersionRecord};
use std::sync::Arc;
use tracing::{info, warn};

pub const VERSION_TYPE: &str = "Version";
/// Slot the service transcodes from
pub const MEDIA_FIELD: &str = "uploaded_movie";
/// Slot for media that is already playable and must not be transcoded
pub const ENCODED_MEDIA_FIELD: &str = "uploaded_movie_mp4";

/// Title of the version record: `"seq010 v003"`, or just the sequence name for
/// unversioned exports.
pub fn version_title(sequence_name: &str, version_number: u32) -> String {
    if version_number != 0 {
        format!("{} v{:03}", sequence_name, version_number)
    } else {
        sequence_name.to_string()
    }
}

/// Renormalize host source points into a 1-based range.
///
/// The host's out point is exclusive, so the frame count is `out - in` and the
/// range runs `1..=count`.
pub fn normalize_frame_range(source_in: i64, source_out: i64) -> FrameRange {
    let count = source_out - source_in;
    FrameRange {
        first: 1,
        last: count,
        count,
    }
}

/// Publish-time settings taken from `Config`
#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub entity_type: String,
    pub project_id: i64,
    pub sequence_task_template: Option<String>,
    pub version_task_template: Option<String>,
    pub bypass_server_transcoding: bool,
    pub department: String,
    pub user_id: Option<i64>,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishOutcome {
    pub parent: RemoteEntity,
    pub parent_created: bool,
    pub version: RemoteEntity,
}

pub struct VersionPublisher {
    remote: RemoteManager,
    resolver: Arc<EntityResolver>,
    thumbnails: ThumbnailExtractor,
    settings: PublishSettings,
}

impl VersionPublisher {
    pub fn new(
        remote: RemoteManager,
        resolver: Arc<EntityResolver>,
        thumbnails: ThumbnailExtractor,
        settings: PublishSettings,
    ) -> Self {
        Self {
            remote,
            resolver,
            thumbnails,
            settings,
        }
    }

    /// Publisher using the host's frame reader executable for thumbnails
    pub fn from_config(config: &Config, remote: RemoteManager) -> Self {
        let frame_reader = ReadFrameCommand::new(
            config.read_frame_path.clone(),
            config.destination_host.clone(),
        );
        let thumbnails = ThumbnailExtractor::new(
            Arc::new(frame_reader),
            remote.clone(),
            config.target_location.clone(),
        );
        let resolver = Arc::new(EntityResolver::new(remote.clone()));

        Self::new(remote, resolver, thumbnails, config.publish_settings())
    }

    pub async fn publish(
        &self,
        asset: &AssetExportInfo,
        comment: &str,
    ) -> Result<PublishOutcome, ReviewError> {
        let full_path = asset.output_path();
        if !tokio::fs::try_exists(&full_path).await.unwrap_or(false) {
            return Err(ReviewError::MediaNotFound(full_path));
        }

        info!(
            "Publishing {} for sequence '{}'",
            full_path.display(),
            asset.sequence_name
        );

        let task_template = match self.settings.version_task_template.as_deref() {
            Some(name) => Some(self.resolver.resolve_template(name).await?),
            None => None,
        };

        let resolution = self
            .resolver
            .resolve(
                &self.settings.entity_type,
                &asset.sequence_name,
                self.settings.project_id,
                self.settings.sequence_task_template.as_deref(),
            )
            .await?;

        if resolution.created {
            best_effort(
                "parent thumbnail",
                self.thumbnails
                    .extract(
                        &full_path,
                        self.settings.thumbnail_width,
                        self.settings.thumbnail_height,
                        &resolution.entity,
                    )
                    .await,
            );
        }

        let frame_range = normalize_frame_range(asset.source_in, asset.source_out);
        if frame_range.count <= 0 {
            warn!(
                "Source range {}..{} of '{}' is empty; publishing range {}",
                asset.source_in,
                asset.source_out,
                asset.sequence_name,
                frame_range.label()
            );
        }

        let record = VersionRecord {
            code: version_title(&asset.sequence_name, asset.version_number),
            project: RemoteEntity::new("Project", self.settings.project_id),
            entity: resolution.entity.clone(),
            description: comment.to_string(),
            frame_range,
            frame_rate: asset.fps,
            aspect_ratio: asset.aspect_ratio,
            department: self.settings.department.clone(),
            user: self.settings.user_id.map(|id| RemoteEntity::new("HumanUser", id)),
            task_template,
        };

        let version = self
            .remote
            .create(VERSION_TYPE, record.to_fields())
            .await?
            .entity();
        info!("Created version '{}' ({})", record.code, version.id);

        let media_field = if self.settings.bypass_server_transcoding {
            ENCODED_MEDIA_FIELD
        } else {
            MEDIA_FIELD
        };
        let upload = self.remote.upload(&version, &full_path, media_field).await;

        if upload.is_ok() && self.settings.bypass_server_transcoding {
            // No server-side transcode means no generated thumbnail either
            best_effort(
                "version thumbnail",
                self.thumbnails
                    .extract(
                        &full_path,
                        self.settings.thumbnail_width,
                        self.settings.thumbnail_height,
                        &version,
                    )
                    .await,
            );
        }

        best_effort("remove exported media", remove_temp_file(&full_path).await);
        upload?;

        info!(
            "Uploaded {} to version {} slot '{}'",
            full_path.display(),
            version.id,
            media_field
        );

        Ok(PublishOutcome {
            parent: resolution.entity,
            parent_created: resolution.created,
            version,
        })
    }
}

#[async_trait::async_trait]
impl JobRunner for VersionPublisher {
    async fn run(&self, operation: JobOperation) -> Result<(), ReviewError> {
        match operation {
            JobOperation::PublishVersion(payload) => {
                self.publish(&payload.asset, &payload.comment).await?;
                Ok(())
            }
        }
    }
}
