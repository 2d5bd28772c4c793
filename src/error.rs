//! Errors surfaced by a pipeline run.

use tubemux_source::MediaKind;

use crate::acquire::AcquireError;

/// Every way a run can fail. All variants are fatal.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Bad destination or settings, detected before any download.
    #[error("configuration error: {0}")]
    Config(String),

    /// The scratch directory could not be created.
    #[error("{0}")]
    Workspace(#[source] tubemux_av::Error),

    /// One of the tracks could not be downloaded.
    #[error("{track} track failed: {source}")]
    Acquire {
        track: MediaKind,
        #[source]
        source: AcquireError,
    },

    /// The transcoder could not be launched or did not finish cleanly.
    #[error("{0}")]
    Merge(#[source] tubemux_av::Error),
}

impl PipelineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Transcoder diagnostics attached to a merge failure.
    pub fn diagnostics(&self) -> &[String] {
        match self {
            Self::Merge(e) => e.diagnostics(),
            _ => &[],
        }
    }
}
