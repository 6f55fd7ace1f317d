// # Review Module
//
// Export-to-review pipeline:
//
// - **ReviewOrchestrator**: Handles the host's export callbacks and session state
// - **PathResolver**: Unique movie names for reviewable assets
// - **VersionPublisher**: Creates the version record and uploads media (runs as a job)
// - **EntityResolver**: Find-or-create of the parent entity
// - **ThumbnailExtractor**: Frame grab via the host's frame reader, uploaded as thumbnail
//
// Public API:
// - `ReviewOrchestrator` + `Collaborators`: Wire up and receive callbacks
// - `VersionPublisher`: Execute publish jobs (also a `JobRunner`)
// - `AssetExportInfo` / `ExportInfo`: Host data passed through the callbacks

pub mod best_effort;
pub mod collaborators;
pub mod entity_resolver;
pub mod error;
pub mod orchestrator;
pub mod path_resolver;
pub mod publisher;
pub mod session;
pub mod thumbnail;
pub mod types;

pub use collaborators::{
    CommentPrompt, FixedComment, LogMetrics, LogSummaryReporter, MetricsSink, SummaryReporter,
};
pub use entity_resolver::{EntityResolver, Resolution};
pub use error::ReviewError;
pub use orchestrator::{Collaborators, ReviewOrchestrator};
pub use path_resolver::resolve_output_path;
pub use publisher::{
    normalize_frame_range, version_title, PublishOutcome, PublishSettings, VersionPublisher,
};
pub use session::{ExportSession, SessionPhase, SessionRegistry};
pub use thumbnail::{FrameReader, ReadFrameCommand, ThumbnailExtractor, ThumbnailOutcome};
pub use types::{
    AssetExportInfo, AssetKind, ExportInfo, FrameRange, PipelineFields, RemoteEntity,
    VersionRecord,
};
