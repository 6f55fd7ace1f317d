use crate::review::error::ReviewError;
use std::fmt::Display;
use std::path::Path;
use tracing::{debug, warn};

/// Run the result of a side step through the log instead of the caller.
///
/// Failures become a warning and `None`; the caller carries on.
pub fn best_effort<T, E: Display>(operation: &str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(operation, error = %e, "Best-effort step failed, continuing");
            None
        }
    }
}

/// Delete a temporary file the pipeline produced
pub async fn remove_temp_file(path: &Path) -> Result<(), ReviewError> {
    tokio::fs::remove_file(path)
        .await
        .map_err(|source| ReviewError::Cleanup {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Removed temporary file {}", path.display());
    Ok(())
}
