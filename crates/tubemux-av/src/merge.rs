//! Muxing a video-only and an audio-only file into one container.
//!
//! The video elementary stream is copied verbatim and the audio stream is
//! re-encoded to AAC. Output goes either to a file or to this process's
//! standard output.

use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;

use crate::command::{StdoutMode, ToolCommand};
use crate::tools::{ToolRegistry, FFMPEG};
use crate::{Error, Result};

/// Number of trailing diagnostic lines kept for error reports.
const DIAGNOSTIC_TAIL: usize = 20;

/// Audio codec every merge encodes to.
pub const AUDIO_CODEC: &str = "aac";

/// ffmpeg log levels accepted by [`FfmpegMuxer::with_loglevel`].
pub const LOG_LEVELS: &[&str] = &[
    "quiet", "panic", "fatal", "error", "warning", "info", "verbose", "debug", "trace",
];

/// Target container of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerFormat {
    /// MPEG-4 Part 14.
    #[default]
    Mp4,
    /// QuickTime.
    Mov,
}

impl ContainerFormat {
    /// Name passed to ffmpeg's `-f`.
    pub fn ffmpeg_name(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Mov => "mov",
        }
    }

    /// File extension for this container.
    pub fn extension(&self) -> &'static str {
        self.ffmpeg_name()
    }

    /// Pick the container from a path's extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedContainer`] for anything other than
    /// `.mp4` or `.mov` (case-insensitive), including no extension at all.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        ext.parse().map_err(|_| {
            Error::UnsupportedContainer(format!(
                "{} (expected a .mp4 or .mov extension)",
                path.display()
            ))
        })
    }
}

impl FromStr for ContainerFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp4" => Ok(ContainerFormat::Mp4),
            "mov" => Ok(ContainerFormat::Mov),
            _ => Err(format!("unsupported container: {s}")),
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ffmpeg_name())
    }
}

/// Where the merged container is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeDestination {
    /// A file path.
    File(PathBuf),
    /// This process's standard output.
    Stdout,
}

impl fmt::Display for MergeDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeDestination::File(path) => write!(f, "{}", path.display()),
            MergeDestination::Stdout => f.write_str("<stdout>"),
        }
    }
}

/// One merge of a completed video file and a completed audio file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeJob {
    pub video: PathBuf,
    pub audio: PathBuf,
    pub destination: MergeDestination,
    pub format: ContainerFormat,
}

impl MergeJob {
    /// Merge into a file with an explicit container format.
    pub fn new(
        video: impl Into<PathBuf>,
        audio: impl Into<PathBuf>,
        destination: MergeDestination,
        format: ContainerFormat,
    ) -> Self {
        let format = match destination {
            // Nothing to derive a format from on a pipe.
            MergeDestination::Stdout => ContainerFormat::Mp4,
            MergeDestination::File(_) => format,
        };
        Self {
            video: video.into(),
            audio: audio.into(),
            destination,
            format,
        }
    }

    /// Merge into standard output; the container is always MP4.
    pub fn for_stdout(video: impl Into<PathBuf>, audio: impl Into<PathBuf>) -> Self {
        Self::new(video, audio, MergeDestination::Stdout, ContainerFormat::Mp4)
    }

    /// Check that both inputs exist.
    pub fn validate_inputs(&self) -> Result<()> {
        for input in [&self.video, &self.audio] {
            if !input.is_file() {
                return Err(Error::file_not_found(input));
            }
        }
        Ok(())
    }
}

/// Something that can carry out a [`MergeJob`].
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Run the merge, resolving only once the output is complete.
    async fn merge(&self, job: &MergeJob) -> Result<()>;
}

/// [`Muxer`] backed by the ffmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    ffmpeg: PathBuf,
    loglevel: String,
}

impl FfmpegMuxer {
    /// Create a muxer running the given ffmpeg binary.
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            loglevel: "warning".to_string(),
        }
    }

    /// Create a muxer using the ffmpeg found by the registry.
    pub fn from_registry(tools: &ToolRegistry) -> Result<Self> {
        Ok(Self::new(tools.require(FFMPEG)?))
    }

    /// Set the `-loglevel` passed to ffmpeg.
    pub fn with_loglevel(mut self, level: impl Into<String>) -> Self {
        self.loglevel = level.into();
        self
    }

    /// Build the ffmpeg invocation for a job.
    pub fn command(&self, job: &MergeJob) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.ffmpeg.clone());
        cmd.args(["-hide_banner", "-nostats", "-loglevel"]);
        cmd.arg(self.loglevel.as_str());
        cmd.arg("-y");
        cmd.arg("-i").arg(job.video.to_string_lossy());
        cmd.arg("-i").arg(job.audio.to_string_lossy());
        cmd.args(["-map", "0:v:0", "-map", "1:a:0"]);
        cmd.args(["-c:v", "copy", "-c:a", AUDIO_CODEC]);
        cmd.arg("-f").arg(job.format.ffmpeg_name());

        match &job.destination {
            MergeDestination::File(path) => {
                cmd.arg(path.to_string_lossy());
            }
            MergeDestination::Stdout => {
                // A pipe cannot be seeked back to write the moov atom.
                cmd.args(["-movflags", "frag_keyframe+empty_moov", "pipe:1"]);
                cmd.stdout(StdoutMode::Inherit);
            }
        }

        cmd
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn merge(&self, job: &MergeJob) -> Result<()> {
        job.validate_inputs()?;

        tracing::info!(
            "merging {:?} + {:?} -> {} ({})",
            job.video,
            job.audio,
            job.destination,
            job.format
        );

        let mut process = self
            .command(job)
            .spawn()
            .map_err(|e| Error::merge(e.to_string(), Vec::new()))?;

        let mut tail: VecDeque<String> = VecDeque::with_capacity(DIAGNOSTIC_TAIL);
        while let Some(line) = process.next_line().await {
            tracing::info!(tool = FFMPEG, "{line}");
            if tail.len() == DIAGNOSTIC_TAIL {
                tail.pop_front();
            }
            tail.push_back(line);
        }

        let status = process
            .wait()
            .await
            .map_err(|e| Error::merge(e.to_string(), tail.iter().cloned().collect()))?;

        if !status.success() {
            let diagnostics: Vec<String> = tail.into_iter().collect();
            let message = match diagnostics.last() {
                Some(last) => format!("{FFMPEG} exited with {status}: {last}"),
                None => format!("{FFMPEG} exited with {status}"),
            };
            return Err(Error::merge(message, diagnostics));
        }

        tracing::info!("merge complete");
        Ok(())
    }
}
