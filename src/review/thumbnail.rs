use crate::remote::RemoteManager;
use crate::review::best_effort::{best_effort, remove_temp_file};
use crate::review::error::ReviewError;
use crate::review::types::RemoteEntity;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Renders one still frame of a media file to a JPEG
#[async_trait::async_trait]
pub trait FrameReader: Send + Sync {
    async fn read_frame(
        &self,
        media_path: &Path,
        width: u32,
        height: u32,
        output_path: &Path,
    ) -> Result<(), ReviewError>;
}

/// Host-provided frame reader executable.
///
/// Invoked as `read_frame -c <clip> -h <host> -W <width> -H <height> -L`; the
/// image is read from stdout and written to `output_path`.
#[derive(Debug, Clone)]
pub struct ReadFrameCommand {
    program: PathBuf,
    server_host: String,
}

impl ReadFrameCommand {
    pub fn new(program: impl Into<PathBuf>, server_host: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            server_host: server_host.into(),
        }
    }
}

#[async_trait::async_trait]
impl FrameReader for ReadFrameCommand {
    async fn read_frame(
        &self,
        media_path: &Path,
        width: u32,
        height: u32,
        output_path: &Path,
    ) -> Result<(), ReviewError> {
        debug!(
            program = %self.program.display(),
            media = %media_path.display(),
            width,
            height,
            "Extracting frame"
        );

        let output = Command::new(&self.program)
            .arg("-c")
            .arg(media_path)
            .arg("-h")
            .arg(&self.server_host)
            .arg("-W")
            .arg(width.to_string())
            .arg("-H")
            .arg(height.to_string())
            // lowest resolution that fits the bounds
            .arg("-L")
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(ReviewError::ExternalTool {
                tool: self.program.display().to_string(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if output.stdout.is_empty() {
            return Err(ReviewError::ExternalTool {
                tool: self.program.display().to_string(),
                exit_code: output.status.code(),
                stderr: "no image data on stdout".to_string(),
            });
        }

        // The image arrives on stdout
        tokio::fs::write(output_path, &output.stdout).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailOutcome {
    Uploaded,
    /// Frame extraction failed; nothing was uploaded
    Skipped,
}

/// Extracts a thumbnail from rendered media and attaches it to a remote entity
#[derive(Clone)]
pub struct ThumbnailExtractor {
    frame_reader: Arc<dyn FrameReader>,
    remote: RemoteManager,
    scratch_dir: PathBuf,
}

impl ThumbnailExtractor {
    pub fn new(
        frame_reader: Arc<dyn FrameReader>,
        remote: RemoteManager,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            frame_reader,
            remote,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// A failed extraction is logged and reported as `Skipped`. Upload errors are
    /// returned, after the temporary image has been removed.
    pub async fn extract(
        &self,
        media_path: &Path,
        width: u32,
        height: u32,
        target: &RemoteEntity,
    ) -> Result<ThumbnailOutcome, ReviewError> {
        let thumb_path = self
            .scratch_dir
            .join(format!("thumb_{}.jpg", Uuid::new_v4().simple()));

        if let Err(e) = self
            .frame_reader
            .read_frame(media_path, width, height, &thumb_path)
            .await
        {
            warn!(
                "Thumbnail extraction failed for {}: {}",
                media_path.display(),
                e
            );
            if tokio::fs::try_exists(&thumb_path).await.unwrap_or(false) {
                best_effort("remove partial thumbnail", remove_temp_file(&thumb_path).await);
            }
            return Ok(ThumbnailOutcome::Skipped);
        }

        let upload = self.remote.upload_thumbnail(target, &thumb_path).await;
        best_effort("remove thumbnail", remove_temp_file(&thumb_path).await);
        upload?;

        info!(
            "Uploaded thumbnail for {} {}",
            target.entity_type, target.id
        );
        Ok(ThumbnailOutcome::Uploaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeFrameReader, MockRemoteService};
    use tempfile::TempDir;

    fn extractor(
        reader: Arc<FakeFrameReader>,
    ) -> (ThumbnailExtractor, Arc<MockRemoteService>, TempDir) {
        let scratch = TempDir::new().unwrap();
        let mock = Arc::new(MockRemoteService::new());
        let extractor = ThumbnailExtractor::new(
            reader,
            RemoteManager::from_service(mock.clone()),
            scratch.path(),
        );
        (extractor, mock, scratch)
    }

    fn scratch_is_empty(dir: &TempDir) -> bool {
        std::fs::read_dir(dir.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_uploads_and_cleans_up() {
        let (extractor, mock, scratch) = extractor(Arc::new(FakeFrameReader::succeeding()));
        let target = RemoteEntity::new("Sequence", 4);

        let outcome = extractor
            .extract(Path::new("/media/seq010.mov"), 1280, 720, &target)
            .await
            .unwrap();

        assert_eq!(outcome, ThumbnailOutcome::Uploaded);
        assert_eq!(mock.thumbnail_uploads(), vec![target]);
        assert!(scratch_is_empty(&scratch));
    }

    #[tokio::test]
    async fn test_tool_failure_is_skipped() {
        let reader = Arc::new(FakeFrameReader::failing(1));
        let (extractor, mock, scratch) = extractor(reader.clone());

        let outcome = extractor
            .extract(Path::new("/media/seq010.mov"), 1280, 720, &RemoteEntity::new("Sequence", 4))
            .await
            .unwrap();

        assert_eq!(outcome, ThumbnailOutcome::Skipped);
        assert_eq!(reader.calls(), 1);
        assert!(mock.thumbnail_uploads().is_empty());
        assert!(scratch_is_empty(&scratch));
    }

    #[tokio::test]
    async fn test_upload_failure_still_cleans_up() {
        let (extractor, mock, scratch) = extractor(Arc::new(FakeFrameReader::succeeding()));
        mock.set_fail_uploads(true);

        let result = extractor
            .extract(Path::new("/media/seq010.mov"), 1280, 720, &RemoteEntity::new("Sequence", 4))
            .await;

        assert!(matches!(result, Err(ReviewError::Transport(_))));
        assert!(scratch_is_empty(&scratch));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_non_zero_exit_is_external_tool_error() {
        let scratch = TempDir::new().unwrap();
        let command = ReadFrameCommand::new("false", "localhost");

        let err = command
            .read_frame(
                Path::new("/media/seq010.mov"),
                64,
                64,
                &scratch.path().join("out.jpg"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ReviewError::ExternalTool { exit_code: Some(1), .. }));
        assert!(!scratch.path().join("out.jpg").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_stdout_lands_in_output_file() {
        let scratch = TempDir::new().unwrap();
        let output_path = scratch.path().join("out.jpg");
        let command = ReadFrameCommand::new("echo", "hostA");

        command
            .read_frame(Path::new("/m.mov"), 64, 32, &output_path)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&output_path).unwrap();
        assert_eq!(written.trim_end(), "-c /m.mov -h hostA -W 64 -H 32 -L");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_without_output_is_external_tool_error() {
        let scratch = TempDir::new().unwrap();
        let output_path = scratch.path().join("out.jpg");
        let command = ReadFrameCommand::new("true", "localhost");

        let err = command
            .read_frame(Path::new("/m.mov"), 64, 32, &output_path)
            .await
            .unwrap_err();

        assert!(matches!(err, ReviewError::ExternalTool { exit_code: Some(0), .. }));
        assert!(!output_path.exists());
    }
}
