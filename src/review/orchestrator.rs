// # Review Orchestrator
//
// Entry point for the host's export callbacks:
//
// - `on_pre_export`: collect the comment, point the host at our preset and temp folder
// - `on_adjust_path`: give each review movie a unique file name
// - `on_asset_exported`: queue a publish job, chained after the asset's own render job
// - `on_export_complete`: report whether anything was submitted
//
// Callbacks are synchronous and return promptly; the only blocking step is
// waiting for the user's comment. Publishing happens later inside the job service.

use crate::config::Config;
use crate::jobs::{BackgroundJob, JobId, JobOperation, JobScheduler, PublishPayload};
use crate::preset::{ExportSettings, GeneratedPresetSettings};
use crate::review::best_effort::best_effort;
use crate::review::collaborators::{
    CommentPrompt, FixedComment, LogMetrics, LogSummaryReporter, MetricsSink, SummaryReporter,
};
use crate::review::error::ReviewError;
use crate::review::path_resolver::resolve_output_path;
use crate::review::session::{SessionPhase, SessionRegistry};
use crate::review::types::{AssetExportInfo, ExportInfo};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const USAGE_METRIC: &str = "Export to review";
const PUBLISH_JOB_TITLE: &str = "Uploading media for review";

/// Everything the orchestrator calls out to
pub struct Collaborators {
    pub scheduler: Arc<dyn JobScheduler>,
    pub settings: Arc<dyn ExportSettings>,
    pub comment_prompt: Arc<dyn CommentPrompt>,
    pub summary: Arc<dyn SummaryReporter>,
    pub metrics: Arc<dyn MetricsSink>,
}

impl Collaborators {
    /// Non-interactive wiring: a fixed comment, generated presets, and summary
    /// and metrics written to the log
    pub fn unattended(
        config: &Config,
        scheduler: Arc<dyn JobScheduler>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            scheduler,
            settings: Arc::new(GeneratedPresetSettings::new(config)),
            comment_prompt: Arc::new(FixedComment(comment.into())),
            summary: Arc::new(LogSummaryReporter),
            metrics: Arc::new(LogMetrics),
        }
    }
}

pub struct ReviewOrchestrator {
    sessions: SessionRegistry,
    collaborators: Collaborators,
    background_export: bool,
}

impl ReviewOrchestrator {
    pub fn new(collaborators: Collaborators, background_export: bool) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            collaborators,
            background_export,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Start a session. Cancelling comment entry sets `info.abort` and is not an error.
    pub fn on_pre_export(&self, session_id: &str, info: &mut ExportInfo) -> Result<(), ReviewError> {
        let session = self.sessions.begin(session_id);

        best_effort(
            "usage metric",
            self.collaborators.metrics.emit(USAGE_METRIC),
        );

        session.advance(SessionPhase::AwaitingUserInput);
        let comment = match self.collaborators.comment_prompt.request_comment() {
            Some(comment) => comment,
            None => {
                info!("Session {}: user cancelled review export", session_id);
                session.cancel();
                info.abort_with(ReviewError::Cancelled.to_string());
                return Ok(());
            }
        };
        session.set_comment(comment);

        info.destination_host = self.collaborators.settings.destination_host();
        info.destination_path = self.collaborators.settings.target_location();
        info.preset_path = match self.collaborators.settings.export_preset() {
            Ok(path) => path,
            Err(e) => {
                session.cancel();
                info.abort_with(format!("Could not prepare export preset: {}", e));
                return Err(e);
            }
        };

        session.advance(SessionPhase::ExportInProgress);
        info!(
            "Session {}: starting review export with preset '{}'",
            session_id,
            info.preset_path.display()
        );
        Ok(())
    }

    /// Assign a unique output name to review movies; other assets keep the host's path
    pub fn on_adjust_path(&self, session_id: &str, asset: &mut AssetExportInfo) {
        let Some(resolved_path) = resolve_output_path(asset) else {
            debug!(
                "Session {}: ignoring {} asset '{}'",
                session_id, asset.kind, asset.asset_name
            );
            return;
        };

        debug!(
            "Session {}: '{}' will be written as {}",
            session_id, asset.asset_name, resolved_path
        );
        asset.pipeline.resolved_path = Some(resolved_path);
        asset.pipeline.run_synchronously = !self.background_export;
    }

    /// Queue the publish job for a finished asset. Returns the job id, or
    /// `None` if the asset is not submitted for review.
    pub fn on_asset_exported(
        &self,
        session_id: &str,
        asset: &AssetExportInfo,
    ) -> Result<Option<JobId>, ReviewError> {
        if !asset.kind.is_reviewable() {
            return Ok(None);
        }

        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| ReviewError::UnknownSession(session_id.to_string()))?;

        if session.phase() < SessionPhase::ExportInProgress {
            warn!(
                "Session {}: asset '{}' exported after the session was aborted",
                session_id, asset.asset_name
            );
            return Ok(None);
        }

        let predecessor = if asset.is_background {
            asset.background_job_id.clone().map(JobId::from)
        } else {
            None
        };

        let job = BackgroundJob {
            title: PUBLISH_JOB_TITLE.to_string(),
            description: format!(
                "Creates a review version for '{}' from {}",
                asset.sequence_name,
                asset.output_file_name()
            ),
            predecessor,
            operation: JobOperation::PublishVersion(PublishPayload {
                asset: asset.clone(),
                comment: session.comment().to_string(),
            }),
            execution_host: Some(asset.destination_host.clone()).filter(|h| !h.is_empty()),
        };

        let job_id = self.collaborators.scheduler.submit(job)?;
        session.mark_submitted();
        session.advance(SessionPhase::JobsScheduled);

        info!(
            "Session {}: queued publish job {} for '{}'",
            session_id, job_id, asset.sequence_name
        );
        Ok(Some(job_id))
    }

    /// Finish the session and report the summary. Returns the reported outcome,
    /// or `None` when the session was cancelled or unknown.
    pub fn on_export_complete(&self, session_id: &str, _info: &ExportInfo) -> Option<bool> {
        let Some(session) = self.sessions.finish(session_id) else {
            warn!("Session {}: export completed for unknown session", session_id);
            return None;
        };

        if session.phase() < SessionPhase::ExportInProgress {
            debug!("Session {}: cancelled, no summary", session_id);
            return None;
        }

        session.advance(SessionPhase::SummaryReady);
        let success = session.submission_occurred();
        self.collaborators.summary.report(success);
        Some(success)
    }
}
