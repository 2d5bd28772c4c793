//! Error types for tubemux-source.

use crate::variant::MediaKind;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving or opening remote streams.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The resolver tool is not installed.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// The source could not be resolved into streams.
    #[error("failed to resolve {source_id}: {message}")]
    Resolve { source_id: String, message: String },

    /// The source has no rendition of the requested kind.
    #[error("no {0} variants available")]
    NoVariant(MediaKind),

    /// The stream request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a resolve error.
    pub fn resolve(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolve {
            source_id: source_id.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_variant_display() {
        assert_eq!(
            Error::NoVariant(MediaKind::Audio).to_string(),
            "no audio variants available"
        );
    }
}
