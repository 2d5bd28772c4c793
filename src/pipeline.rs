//! The download-merge pipeline.
//!
//! One run owns one [`Workspace`]. Both tracks download concurrently into
//! it; once both are complete the muxer combines them, and the workspace is
//! torn down afterwards whatever happened.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tubemux_av::{MergeDestination, MergeJob, Muxer, Workspace};
use tubemux_source::{MediaKind, MediaSource};

use crate::acquire::{AcquireError, Track};
use crate::error::PipelineError;
use crate::output::OutputTarget;

/// Workspace file holding the video track.
const VIDEO_FILE: &str = "video.stream";

/// Workspace file holding the audio track.
const AUDIO_FILE: &str = "audio.stream";

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The merged file now lives at this path.
    File(PathBuf),
    /// The merged container went to standard output.
    Streamed,
}

/// Download-merge pipeline wired to a media source and a muxer.
pub struct Pipeline {
    source: Arc<dyn MediaSource>,
    muxer: Arc<dyn Muxer>,
    temp_root: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(source: Arc<dyn MediaSource>, muxer: Arc<dyn Muxer>) -> Self {
        Self {
            source,
            muxer,
            temp_root: None,
        }
    }

    /// Create workspaces under `root` instead of the system temp directory.
    pub fn with_temp_root(mut self, root: Option<PathBuf>) -> Self {
        self.temp_root = root;
        self
    }

    /// Run the whole pipeline for one source.
    ///
    /// The workspace is destroyed before this returns, on success and on
    /// every error path after it was created.
    pub async fn run(
        &self,
        source_id: &str,
        output: &OutputTarget,
    ) -> Result<RunOutcome, PipelineError> {
        let workspace =
            Workspace::create(self.temp_root.as_deref()).map_err(PipelineError::Workspace)?;
        tracing::debug!("workspace {:?}", workspace.path());

        let result = self.run_in(&workspace, source_id, output).await;

        workspace.destroy();
        result
    }

    async fn run_in(
        &self,
        workspace: &Workspace,
        source_id: &str,
        output: &OutputTarget,
    ) -> Result<RunOutcome, PipelineError> {
        let mut video = Track::video(workspace.temp_file(VIDEO_FILE));
        let mut audio = Track::audio(workspace.temp_file(AUDIO_FILE));

        tracing::info!("Downloading from: {source_id}");
        self.download(source_id, &mut video, &mut audio).await?;
        tracing::info!("Video and audio downloaded successfully.");

        tracing::info!("Merging video and audio...");
        self.merge(workspace, video.path(), audio.path(), output).await
    }

    /// Download both tracks concurrently and wait until both have settled.
    ///
    /// If either fails, every track file is removed before returning. When
    /// both fail the video error is the one reported.
    async fn download(
        &self,
        source_id: &str,
        video: &mut Track,
        audio: &mut Track,
    ) -> Result<(), PipelineError> {
        let source = self.source.as_ref();
        let (video_result, audio_result) = tokio::join!(
            video.acquire(source, source_id),
            audio.acquire(source, source_id),
        );

        let failure: Option<(MediaKind, AcquireError)> = match (video_result, audio_result) {
            (Ok(_), Ok(_)) => None,
            (Err(video_err), audio_result) => {
                if let Err(audio_err) = audio_result {
                    tracing::warn!("audio track also failed: {audio_err}");
                }
                Some((MediaKind::Video, video_err))
            }
            (Ok(_), Err(audio_err)) => Some((MediaKind::Audio, audio_err)),
        };

        match failure {
            None => Ok(()),
            Some((track, source)) => {
                // The sibling may have completed; its file is useless now.
                video.discard();
                audio.discard();
                Err(PipelineError::Acquire { track, source })
            }
        }
    }

    async fn merge(
        &self,
        workspace: &Workspace,
        video: &Path,
        audio: &Path,
        output: &OutputTarget,
    ) -> Result<RunOutcome, PipelineError> {
        match output {
            OutputTarget::Stdout => {
                let job = MergeJob::for_stdout(video, audio);
                self.muxer.merge(&job).await.map_err(PipelineError::Merge)?;
                tracing::info!("Merged video and audio and sent to stdout successfully!");
                Ok(RunOutcome::Streamed)
            }
            OutputTarget::File { path, format } => {
                // Mux inside the workspace so a failed merge never leaves a
                // partial file at the destination.
                let produced = workspace.temp_file(&format!("merged.{}", format.extension()));
                let job = MergeJob::new(
                    video,
                    audio,
                    MergeDestination::File(produced.clone()),
                    *format,
                );
                self.muxer.merge(&job).await.map_err(PipelineError::Merge)?;

                let final_path = workspace
                    .finalize(&produced, path)
                    .map_err(PipelineError::Merge)?;
                tracing::info!("Merged video and audio into {}", final_path.display());
                Ok(RunOutcome::File(final_path))
            }
        }
    }
}
