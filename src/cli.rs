use clap::Parser;
use std::path::PathBuf;

use tubemux::output::DEFAULT_OUTPUT;

#[derive(Parser)]
#[command(name = "tubemux")]
#[command(
    author,
    version,
    about = "Download the highest quality video and audio of a media item and merge them into one file",
    after_help = "With no --output, the merged MP4 is streamed to stdout, which must be a pipe or a file."
)]
pub struct Cli {
    /// Media URL or identifier to download
    #[arg(required_unless_present = "check_tools")]
    pub source: Option<String>,

    /// Write the merged file here (.mp4 or .mov; `output.mp4` if no value, `-` for stdout)
    #[arg(short, long, num_args = 0..=1, default_missing_value = DEFAULT_OUTPUT)]
    pub output: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory to create the temporary workspace in
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Validate the destination and show what would be done without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// Check that required external tools are available
    #[arg(long)]
    pub check_tools: bool,
}
