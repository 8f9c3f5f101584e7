//! CLI configuration: thin wrapper around `netpulse_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` overrides (`--config`,
//! `--data-dir`, `--output`, `--color`).

use std::path::PathBuf;

use clap::ValueEnum;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use netpulse_config::{Config, save_config_to};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Config file location: `--config` flag, then the platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(netpulse_config::config_path)
}

/// Data directory: `--data-dir` flag, then the platform default.
pub fn data_dir(global: &GlobalOpts) -> PathBuf {
    global
        .data_dir
        .clone()
        .unwrap_or_else(netpulse_config::data_dir)
}

pub fn history_path(global: &GlobalOpts) -> PathBuf {
    data_dir(global).join("history.json")
}

pub fn scan_cache_path(global: &GlobalOpts) -> PathBuf {
    data_dir(global).join("last-scan.json")
}

/// Load the layered config. A missing file yields the defaults; a
/// malformed one is an error.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(netpulse_config::load_config_from(&config_path(global))?)
}

/// Output format: flag (or `NETPULSE_OUTPUT`), then `[defaults] output`.
pub fn output_format(global: &GlobalOpts, config: &Config) -> OutputFormat {
    global.output.clone().unwrap_or_else(|| {
        OutputFormat::from_str(&config.defaults.output, true).unwrap_or(OutputFormat::Table)
    })
}

/// Color mode: flag (or `NETPULSE_COLOR`), then `[defaults] color`.
pub fn color_mode(global: &GlobalOpts, config: &Config) -> ColorMode {
    global.color.clone().unwrap_or_else(|| {
        ColorMode::from_str(&config.defaults.color, true).unwrap_or(ColorMode::Auto)
    })
}
