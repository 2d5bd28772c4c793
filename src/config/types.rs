use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use tubemux_av::ToolsConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub merge: MergeConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    /// Directory under which per-run scratch directories are created
    /// (default: the system temp directory)
    #[serde(default)]
    pub temp_root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Upper bound for one yt-dlp metadata lookup, in seconds
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout_secs: u64,

    /// User agent sent with stream downloads
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_secs: default_resolve_timeout(),
            user_agent: None,
        }
    }
}

impl SourceConfig {
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }
}

fn default_resolve_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MergeConfig {
    /// ffmpeg -loglevel; its diagnostics are forwarded to stderr
    #[serde(default = "default_loglevel")]
    pub loglevel: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            loglevel: default_loglevel(),
        }
    }
}

fn default_loglevel() -> String {
    "warning".to_string()
}
