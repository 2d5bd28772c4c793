mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;
    expand_paths(&mut config);

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./tubemux.toml",
        "~/.config/tubemux/config.toml",
        "/etc/tubemux/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

/// Expand `~` in configured paths
fn expand_paths(config: &mut Config) {
    for path in [
        &mut config.tools.ffmpeg_path,
        &mut config.tools.ytdlp_path,
        &mut config.workspace.temp_root,
    ]
    .into_iter()
    .flatten()
    {
        *path = expand(path);
    }
}

/// Validate configuration
fn validate_config(config: &Config) -> std::result::Result<(), PipelineError> {
    if config.source.resolve_timeout_secs == 0 {
        return Err(PipelineError::config(
            "source.resolve_timeout_secs must be greater than 0",
        ));
    }

    if !tubemux_av::merge::LOG_LEVELS.contains(&config.merge.loglevel.as_str()) {
        return Err(PipelineError::config(format!(
            "merge.loglevel '{}' is not one of: {}",
            config.merge.loglevel,
            tubemux_av::merge::LOG_LEVELS.join(", ")
        )));
    }

    if let Some(root) = &config.workspace.temp_root {
        if root.exists() && !root.is_dir() {
            return Err(PipelineError::config(format!(
                "workspace.temp_root is not a directory: {:?}",
                root
            )));
        }
    }

    Ok(())
}
