//! Where the merged container ends up.

use std::fmt;
use std::path::{Path, PathBuf};

use tubemux_av::ContainerFormat;

use crate::error::PipelineError;

/// `--output` value that explicitly selects standard output.
pub const STDOUT_MARKER: &str = "-";

/// File name used when `--output` is given without a value.
pub const DEFAULT_OUTPUT: &str = "output.mp4";

/// Resolved destination of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Write a file; the container follows the file extension.
    File {
        path: PathBuf,
        format: ContainerFormat,
    },
    /// Stream fragmented MP4 to standard output.
    Stdout,
}

impl OutputTarget {
    /// Work out the destination from the `--output` value.
    ///
    /// Runs before anything touches the network or the filesystem, so every
    /// rejection here happens up front.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] when the extension is not `.mp4` or
    /// `.mov`, when the file's directory does not exist, or when the output
    /// would go to an interactive terminal.
    pub fn resolve(
        requested: Option<&Path>,
        stdout_is_terminal: bool,
    ) -> Result<Self, PipelineError> {
        match requested {
            Some(path) if path != Path::new(STDOUT_MARKER) => {
                let format = ContainerFormat::from_path(path)
                    .map_err(|e| PipelineError::config(e.to_string()))?;

                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    if !parent.is_dir() {
                        return Err(PipelineError::config(format!(
                            "output directory does not exist: {}",
                            parent.display()
                        )));
                    }
                }

                Ok(OutputTarget::File {
                    path: path.to_path_buf(),
                    format,
                })
            }
            _ if stdout_is_terminal => Err(PipelineError::config(
                "refusing to write video data to a terminal; \
                 pipe the output to a file or another process, or pass --output <file>",
            )),
            _ => Ok(OutputTarget::Stdout),
        }
    }

    /// Container format of the final output.
    pub fn format(&self) -> ContainerFormat {
        match self {
            OutputTarget::File { format, .. } => *format,
            OutputTarget::Stdout => ContainerFormat::Mp4,
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::File { path, format } => write!(f, "{} ({format})", path.display()),
            OutputTarget::Stdout => f.write_str("<stdout> (mp4)"),
        }
    }
}
