//! Error types for tubemux-av.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while preparing or running a mux.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// An external tool could not be launched or did not exit cleanly.
    #[error("tool execution failed: {tool}: {message}")]
    ToolFailed { tool: String, message: String },

    /// The merge step failed. Carries the transcoder's diagnostic text.
    #[error("merge failed: {message}")]
    Merge {
        message: String,
        diagnostics: Vec<String>,
    },

    /// The scratch directory could not be created or finalized.
    #[error("workspace error: {0}")]
    Workspace(String),

    /// The requested container is not supported.
    #[error("unsupported container: {0}")]
    UnsupportedContainer(String),

    /// The specified file was not found.
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool execution failed error.
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a merge error with the captured diagnostic lines.
    pub fn merge(message: impl Into<String>, diagnostics: Vec<String>) -> Self {
        Self::Merge {
            message: message.into(),
            diagnostics,
        }
    }

    /// Create a workspace error.
    pub fn workspace(message: impl Into<String>) -> Self {
        Self::Workspace(message.into())
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Diagnostic text captured from the failing process, if any.
    pub fn diagnostics(&self) -> &[String] {
        match self {
            Self::Merge { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}
