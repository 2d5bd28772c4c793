//! # tubemux-av
//!
//! External tool plumbing for tubemux.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find ffmpeg and yt-dlp, with
//!   optional path overrides from config.
//! - **Command execution** ([`ToolCommand`], [`ToolProcess`]) -- async
//!   builder for one-shot tool runs and a handle for long-running ones whose
//!   stderr is read line by line.
//! - **Workspace management** ([`Workspace`]) -- a uniquely named scratch
//!   directory per run, with guaranteed best-effort teardown.
//! - **Muxing** ([`Muxer`], [`FfmpegMuxer`]) -- copy the video stream,
//!   encode the audio stream to AAC, write MP4/MOV to a file or stdout.
//!
//! ## Example
//!
//! ```no_run
//! use tubemux_av::{FfmpegMuxer, MergeJob, Muxer, ToolRegistry, ToolsConfig};
//!
//! # async fn example() -> tubemux_av::Result<()> {
//! let tools = ToolRegistry::discover(&ToolsConfig::default());
//! let muxer = FfmpegMuxer::from_registry(&tools)?;
//! muxer.merge(&MergeJob::for_stdout("video.mp4", "audio.webm")).await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
mod error;
pub mod merge;
pub mod tools;
pub mod workspace;

// Re-exports
pub use command::{StdoutMode, ToolCommand, ToolOutput, ToolProcess};
pub use error::{Error, Result};
pub use merge::{ContainerFormat, FfmpegMuxer, MergeDestination, MergeJob, Muxer};
pub use tools::{ToolInfo, ToolRegistry, ToolsConfig};
pub use workspace::Workspace;
