//! Clap derive structures for the `netpulse` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. This
//! file is also compiled by `build.rs` for man page generation, so it may
//! only depend on `clap`, `clap_complete` and `std`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// netpulse -- connection speed tests and local network discovery
#[derive(Debug, Parser)]
#[command(
    name = "netpulse",
    version,
    about = "Measure network speed and discover devices on your local network",
    long_about = "Runs latency, download and upload measurements against a reference\n\
        server and sweeps the local /24 subnet to find and identify devices.\n\n\
        Results are kept in a local history that can be listed or exported as CSV.",
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
    /// Output format (defaults to the `[defaults] output` config value)
    #[arg(long, short = 'o', env = "NETPULSE_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, env = "NETPULSE_COLOR", global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Path to the config file
    #[arg(long, env = "NETPULSE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory for result history and the scan cache
    #[arg(long, env = "NETPULSE_DATA_DIR", global = true, hide_env = true)]
    pub data_dir: Option<PathBuf>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
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
    /// Run a full speed test: latency, download and upload
    #[command(alias = "s")]
    Speed(SpeedArgs),

    /// Measure latency and jitter against the reference host
    Ping(PingArgs),

    /// Discover devices on the local /24 subnet
    #[command(alias = "discover")]
    Scan(ScanArgs),

    /// Browse and manage stored measurement results
    #[command(alias = "h")]
    History(HistoryArgs),

    /// Export stored results as CSV
    Export(ExportArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SPEED
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SpeedArgs {
    /// Reference URL for latency probes (overrides config)
    #[arg(long)]
    pub reference_url: Option<String>,

    /// Download URL (overrides config)
    #[arg(long)]
    pub download_url: Option<String>,

    /// Upload URL (overrides config)
    #[arg(long)]
    pub upload_url: Option<String>,

    /// Whole-test time limit in seconds (overrides config)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Do not record the result in history
    #[arg(long)]
    pub no_save: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PING
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PingArgs {
    /// URL to probe (defaults to the configured reference URL)
    #[arg(long)]
    pub url: Option<String>,

    /// Number of samples to take
    #[arg(long, short = 'c')]
    pub count: Option<usize>,

    /// Delay between samples in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SCAN
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Subnet to scan, e.g. "192.168.1" (defaults to the local network)
    #[arg(long, short = 's')]
    pub subnet: Option<String>,

    /// Ignore the cached result and scan again
    #[arg(long, short = 'r')]
    pub refresh: bool,

    /// Maximum number of addresses probed at once (overrides config)
    #[arg(long)]
    pub concurrency: Option<usize>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  HISTORY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommand,
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List stored results, newest first
    #[command(alias = "ls")]
    List {
        /// Show at most this many results
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Delete one result
    #[command(alias = "rm")]
    Delete {
        /// Result ID (as shown by `history list -o plain`)
        id: String,
    },

    /// Delete every stored result
    Clear,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  EXPORT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Write CSV to this file instead of stdout
    #[arg(long, short = 'f')]
    pub output_file: Option<PathBuf>,

    /// Export only the most recent results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file populated with the defaults
    Init {
        /// Overwrite an existing file without asking
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
