//! CSV export of stored results.

use std::io::Write;

use netpulse_core::{HistoryStore, export};

use crate::cli::ExportArgs;
use crate::error::CliError;

use super::Context;

pub fn handle(args: ExportArgs, ctx: &Context, store: &dyn HistoryStore) -> Result<(), CliError> {
    let results = match args.limit {
        Some(n) => store.recent(n)?,
        None => store.list()?,
    };
    let csv = export::to_csv(&results);

    match args.output_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, csv)?;
            if !ctx.quiet {
                eprintln!("Exported {} results to {}", results.len(), path.display());
            }
        }
        None => {
            if !ctx.quiet {
                std::io::stdout().lock().write_all(csv.as_bytes())?;
            }
        }
    }
    Ok(())
}
