//! Command handlers, one module per top-level subcommand.

pub mod config_cmd;
pub mod export;
pub mod history;
pub mod ping;
pub mod scan;
pub mod speed;
pub mod util;

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::history_store::FileHistory;
use crate::output;

/// Everything a handler needs besides its own arguments.
pub struct Context {
    pub config: Config,
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
    pub yes: bool,
}

impl Context {
    pub fn resolve(global: &GlobalOpts, config: Config) -> Self {
        let format = config::output_format(global, &config);
        let color = output::should_color(&config::color_mode(global, &config));
        Self {
            config,
            format,
            color,
            quiet: global.quiet,
            yes: global.yes,
        }
    }

    /// Live progress is only drawn for interactive table output.
    pub fn shows_progress(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Table
    }
}

pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let store = || FileHistory::new(config::history_path(global));
    match cmd {
        Command::Speed(args) => speed::handle(args, ctx, &store()).await,
        Command::Ping(args) => ping::handle(args, ctx).await,
        Command::Scan(args) => scan::handle(args, ctx, &config::scan_cache_path(global)).await,
        Command::History(args) => history::handle(args, ctx, &store()),
        Command::Export(args) => export::handle(args, ctx, &store()),
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
