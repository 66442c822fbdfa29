//! Clap derive structures for the `mmp` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// mmp -- follow printers, events, and the asset library from a terminal
#[derive(Debug, Parser)]
#[command(
    name = "mmp",
    version,
    about = "Watch Maker Management Platform events and browse its asset library",
    long_about = "A terminal client for a Maker Management Platform backend.\n\n\
        Streams push events over a single SSE connection, folds partial\n\
        printer updates into live state, and walks the asset tree lazily.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend API root (overrides the config file)
    #[arg(long, short = 'b', env = "MMP_BACKEND", global = true)]
    pub backend: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "MMP_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "MMP_INSECURE", global = true)]
    pub insecure: bool,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MMP_OUTPUT",
        default_value = "plain",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Human-readable text (default)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream cumulative state for one or more events
    #[command(alias = "ev")]
    Events(EventsArgs),

    /// Follow a printer's bed, extruder, and job status
    #[command(alias = "p")]
    Printer(PrinterArgs),

    /// Browse the asset library
    #[command(alias = "t")]
    Tree(TreeArgs),

    /// Check the push connection to the backend
    Status,

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Streaming ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct EventsArgs {
    /// Event names, e.g. system.state.asset.event
    #[arg(required = true, num_args = 1..)]
    pub events: Vec<String>,

    /// Stop after this many updates
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

#[derive(Debug, Args)]
pub struct PrinterArgs {
    /// Printer UUID
    pub uuid: String,

    /// Stop after this many updates
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

// ── Tree ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Expand the path from the root down to this asset
    #[arg(long, short = 'r')]
    pub reveal: Option<String>,

    /// Folder levels to expand below the root
    #[arg(long, short = 'd', default_value = "1")]
    pub depth: usize,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the effective configuration
    Show,

    /// Write a default config file
    Init {
        /// Backend API root to store
        #[arg(long)]
        backend: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
