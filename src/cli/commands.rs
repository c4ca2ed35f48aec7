use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "qc", about = concat!("qc v", env!("CARGO_PKG_VERSION"), " - quick capture for markdown tasks and notes"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: ./quickcap.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Turn text into task lines
    Task(CaptureArgs),
    /// Turn text into a note with a metadata preamble
    Note(NoteArgs),
    /// Find date phrases in one line
    Scan(ScanArgs),
    /// Pull shorthand markers and tags out of text
    Extract(ExtractArgs),
    /// Show or set the default capture mode
    Mode(ModeArgs),
}

// ---------------------------------------------------------------------------
// Capture args
// ---------------------------------------------------------------------------

/// Text plus the structured controls. Values given here are pinned and win
/// over anything inferred from the text.
#[derive(Args)]
pub struct CaptureArgs {
    /// Text to capture (read from stdin if omitted)
    pub text: Vec<String>,
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
    /// Scheduled date (YYYY-MM-DD)
    #[arg(long)]
    pub scheduled: Option<String>,
    /// Priority (1-5, or lowest/low/medium/high/highest)
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long)]
    pub project: Option<String>,
    #[arg(long)]
    pub context: Option<String>,
    /// Recurrence, stored verbatim (e.g. "every week")
    #[arg(long)]
    pub repeat: Option<String>,
    /// Status symbol or name (x, completed, in-progress, ...)
    #[arg(long)]
    pub status: Option<String>,
    /// Tag(s) to add
    #[arg(long)]
    pub tag: Vec<String>,
    /// Metadata vocabulary: symbol or bracket (default: from config)
    #[arg(long)]
    pub vocab: Option<String>,
    /// Reference date for relative phrases (default: today)
    #[arg(long)]
    pub today: Option<String>,
}

#[derive(Args)]
pub struct NoteArgs {
    #[command(flatten)]
    pub capture: CaptureArgs,
    /// Template to merge the content into (overrides the configured one)
    #[arg(long)]
    pub template: Option<String>,
    /// Directory templates are resolved against (default: current directory)
    #[arg(long)]
    pub template_root: Option<PathBuf>,
    /// Also print the file name the note would be saved under
    #[arg(long)]
    pub name: bool,
}

// ---------------------------------------------------------------------------
// Inspection args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ScanArgs {
    /// The line to scan
    pub line: String,
    /// Reference date for relative phrases (default: today)
    #[arg(long)]
    pub today: Option<String>,
}

#[derive(Args)]
pub struct ExtractArgs {
    /// Text to scan (read from stdin if omitted)
    pub text: Vec<String>,
}

#[derive(Args)]
pub struct ModeArgs {
    /// New default mode: inline-task or document (prints the current one if omitted)
    pub mode: Option<String>,
}
