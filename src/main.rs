mod cli;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use tubemux::{config, OutputTarget, Pipeline, RunOutcome};
use tubemux_av::{FfmpegMuxer, ToolRegistry};
use tubemux_source::YtDlpSource;

async fn run_pipeline(
    source_id: &str,
    output: &OutputTarget,
    temp_root: Option<PathBuf>,
    config: &config::Config,
) -> Result<()> {
    let tools = ToolRegistry::discover(&config.tools);

    let mut source =
        YtDlpSource::from_registry(&tools)?.with_timeout(config.source.resolve_timeout());
    if let Some(ref user_agent) = config.source.user_agent {
        source = source.with_user_agent(user_agent)?;
    }

    let muxer = FfmpegMuxer::from_registry(&tools)
        .map_err(tubemux::PipelineError::Merge)?
        .with_loglevel(config.merge.loglevel.as_str());

    let pipeline = Pipeline::new(Arc::new(source), Arc::new(muxer)).with_temp_root(temp_root);

    match pipeline.run(source_id, output).await? {
        RunOutcome::File(path) => tracing::info!("Output: {}", path.display()),
        RunOutcome::Streamed => tracing::debug!("Output streamed to stdout"),
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "tubemux=debug,tubemux_av=debug,tubemux_source=debug".to_string()
        } else {
            "tubemux=info,tubemux_av=info,tubemux_source=info".to_string()
        }
    });

    // stdout may carry the merged container, so logs always go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = config::load_config_or_default(cli.config.as_deref())?;

    if cli.check_tools {
        return check_tools(&config);
    }

    let source_id = cli.source.as_deref().context("no source given")?;
    let output = OutputTarget::resolve(cli.output.as_deref(), std::io::stdout().is_terminal())?;
    let temp_root = cli.temp_dir.or_else(|| config.workspace.temp_root.clone());

    if cli.dry_run {
        return dry_run(source_id, &output, temp_root.as_deref());
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_pipeline(source_id, &output, temp_root, &config))
}

fn dry_run(
    source_id: &str,
    output: &OutputTarget,
    temp_root: Option<&std::path::Path>,
) -> Result<()> {
    let temp_root = temp_root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(std::env::temp_dir);

    eprintln!("Source:      {}", source_id);
    eprintln!("Destination: {}", output);
    eprintln!("Video:       highest quality, copied");
    eprintln!("Audio:       highest quality, encoded to {}", tubemux_av::merge::AUDIO_CODEC);
    eprintln!("Workspace:   {}", temp_root.display());
    eprintln!("\n[DRY RUN] Nothing was downloaded");

    Ok(())
}

fn check_tools(config: &config::Config) -> Result<()> {
    eprintln!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        let mut line = format!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            line.push_str(&format!(" ({})", version));
        }
        if let Some(ref path) = tool.path {
            line.push_str(&format!(" - {}", path.display()));
        }
        eprintln!("{line}");
    }

    eprintln!();
    if all_ok {
        eprintln!("All required tools are available!");
        Ok(())
    } else {
        anyhow::bail!(
            "Some tools are missing. Install ffmpeg and yt-dlp or set their paths in the config file."
        )
    }
}
