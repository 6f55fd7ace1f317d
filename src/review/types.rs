pub use crate::remote::RemoteEntity;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::path::PathBuf;

/// Kind of exported item as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssetKind {
    Video,
    Movie,
    Audio,
    Batch,
    BatchSetup,
    Clip,
    OpenClip,
    Image,
    Other(String),
}

impl AssetKind {
    /// Only movie files are turned into review versions
    pub fn is_reviewable(&self) -> bool {
        matches!(self, AssetKind::Video | AssetKind::Movie)
    }

    pub fn as_str(&self) -> &str {
        match self {
            AssetKind::Video => "video",
            AssetKind::Movie => "movie",
            AssetKind::Audio => "audio",
            AssetKind::Batch => "batch",
            AssetKind::BatchSetup => "batchSetup",
            AssetKind::Clip => "clip",
            AssetKind::OpenClip => "openClip",
            AssetKind::Image => "image",
            AssetKind::Other(kind) => kind,
        }
    }
}

impl From<String> for AssetKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "video" => AssetKind::Video,
            "movie" => AssetKind::Movie,
            "audio" => AssetKind::Audio,
            "batch" => AssetKind::Batch,
            "batchSetup" => AssetKind::BatchSetup,
            "clip" => AssetKind::Clip,
            "openClip" => AssetKind::OpenClip,
            "image" => AssetKind::Image,
            _ => AssetKind::Other(kind),
        }
    }
}

impl From<&str> for AssetKind {
    fn from(kind: &str) -> Self {
        AssetKind::from(kind.to_string())
    }
}

impl From<AssetKind> for String {
    fn from(kind: AssetKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields the pipeline itself attaches to an asset. Kept apart from the
/// host-owned fields so the host's values are never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineFields {
    /// Unique file name chosen for reviewable media
    pub resolved_path: Option<String>,
    /// Ask the host to render this asset in the foreground
    pub run_synchronously: bool,
}

/// Per-asset information supplied by the host export engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetExportInfo {
    pub kind: AssetKind,
    pub asset_name: String,
    pub sequence_name: String,
    pub shot_name: Option<String>,
    pub destination_host: String,
    pub destination_path: PathBuf,
    /// Host's default file name relative to `destination_path`
    pub resolved_path: String,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f64,
    pub depth: Option<String>,
    pub fps: Option<f64>,
    pub sequence_fps: Option<f64>,
    pub source_in: i64,
    pub source_out: i64,
    pub record_in: i64,
    pub record_out: i64,
    pub track: i32,
    pub version_name: Option<String>,
    pub version_number: u32,
    pub is_background: bool,
    pub background_job_id: Option<String>,
    pub pipeline: PipelineFields,
}

impl Default for AssetExportInfo {
    fn default() -> Self {
        Self {
            kind: AssetKind::Other(String::new()),
            asset_name: String::new(),
            sequence_name: String::new(),
            shot_name: None,
            destination_host: String::new(),
            destination_path: PathBuf::new(),
            resolved_path: String::new(),
            width: 0,
            height: 0,
            aspect_ratio: 0.0,
            depth: None,
            fps: None,
            sequence_fps: None,
            source_in: 0,
            source_out: 0,
            record_in: 0,
            record_out: 0,
            track: 0,
            version_name: None,
            version_number: 0,
            is_background: false,
            background_job_id: None,
            pipeline: PipelineFields::default(),
        }
    }
}

impl AssetExportInfo {
    /// File name the media was written under: ours if we picked one, else the host's
    pub fn output_file_name(&self) -> &str {
        self.pipeline
            .resolved_path
            .as_deref()
            .unwrap_or(&self.resolved_path)
    }

    pub fn output_path(&self) -> PathBuf {
        self.destination_path.join(self.output_file_name())
    }
}

/// Session-level export settings exchanged with the host before export starts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportInfo {
    pub destination_host: String,
    pub destination_path: PathBuf,
    pub preset_path: PathBuf,
    pub abort: bool,
    pub abort_message: Option<String>,
}

impl ExportInfo {
    pub fn abort_with(&mut self, message: impl Into<String>) {
        self.abort = true;
        self.abort_message = Some(message.into());
    }
}

/// Frame range renormalized to start at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub first: i64,
    pub last: i64,
    pub count: i64,
}

impl FrameRange {
    pub fn label(&self) -> String {
        format!("{}-{}", self.first, self.last)
    }
}

/// Child review record linked to a parent entity
#[derive(Debug, Clone, PartialEq)]
pub struct VersionRecord {
    pub code: String,
    pub project: RemoteEntity,
    pub entity: RemoteEntity,
    pub description: String,
    pub frame_range: FrameRange,
    pub frame_rate: Option<f64>,
    pub aspect_ratio: f64,
    pub department: String,
    pub user: Option<RemoteEntity>,
    pub task_template: Option<RemoteEntity>,
}

impl VersionRecord {
    /// Remote field map for `create("Version", ..)`
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("code".into(), json!(self.code));
        fields.insert("project".into(), self.project.link());
        fields.insert("entity".into(), self.entity.link());
        fields.insert("description".into(), json!(self.description));
        fields.insert("first_frame".into(), json!(self.frame_range.first));
        fields.insert("last_frame".into(), json!(self.frame_range.last));
        fields.insert("frame_count".into(), json!(self.frame_range.count));
        fields.insert("frame_range".into(), json!(self.frame_range.label()));
        fields.insert("frame_aspect_ratio".into(), json!(self.aspect_ratio));
        fields.insert("movie_aspect_ratio".into(), json!(self.aspect_ratio));
        fields.insert("department".into(), json!(self.department));

        if let Some(fps) = self.frame_rate {
            fields.insert("frame_rate".into(), json!(fps));
        }
        if let Some(user) = &self.user {
            fields.insert("created_by".into(), user.link());
            fields.insert("user".into(), user.link());
        }
        if let Some(template) = &self.task_template {
            fields.insert("task_template".into(), template.link());
        }

        fields
    }
}
