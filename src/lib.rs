//! tubemux - fetch the best video and audio streams of a media item and
//! mux them into a single MP4/MOV container.
//!
//! This library crate exposes the pipeline for the binary and for
//! integration testing.

pub mod acquire;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;

pub use acquire::{acquire, AcquireError, Track, TrackState};
pub use error::PipelineError;
pub use output::OutputTarget;
pub use pipeline::{Pipeline, RunOutcome};
