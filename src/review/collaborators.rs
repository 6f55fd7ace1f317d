// Interactive and reporting collaborators the orchestrator calls out to.
// Dialog rendering lives with the host; these traits only carry the results.

use crate::review::error::ReviewError;
use tracing::{debug, info, warn};

/// Obtains the user's review comment. `None` means the user cancelled.
pub trait CommentPrompt: Send + Sync {
    fn request_comment(&self) -> Option<String>;
}

/// Shows the session-level outcome once export completes
pub trait SummaryReporter: Send + Sync {
    fn report(&self, success: bool);
}

/// Usage metric destination
pub trait MetricsSink: Send + Sync {
    fn emit(&self, event: &str) -> Result<(), ReviewError>;
}

/// Comment supplied up front, e.g. from a command line
pub struct FixedComment(pub String);

impl CommentPrompt for FixedComment {
    fn request_comment(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Writes the summary to the log
pub struct LogSummaryReporter;

impl SummaryReporter for LogSummaryReporter {
    fn report(&self, success: bool) {
        if success {
            info!("Review submission started, media will be uploaded in the background");
        } else {
            warn!("Nothing was submitted for review in this export session");
        }
    }
}

/// Records metric events as debug log lines
pub struct LogMetrics;

impl MetricsSink for LogMetrics {
    fn emit(&self, event: &str) -> Result<(), ReviewError> {
        debug!(event, "Usage metric");
        Ok(())
    }
}
