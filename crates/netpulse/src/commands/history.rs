//! History command handlers, plus the result views shared with `speed`.

use tabled::Tabled;

use netpulse_core::{HistoryStore, MeasurementResult};

use crate::cli::{HistoryArgs, HistoryCommand};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(crate) struct ResultRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Date (UTC)")]
    date: String,
    #[tabled(rename = "Download")]
    download: String,
    #[tabled(rename = "Upload")]
    upload: String,
    #[tabled(rename = "Ping")]
    ping: String,
    #[tabled(rename = "Jitter")]
    jitter: String,
    #[tabled(rename = "Connection")]
    connection: String,
    #[tabled(rename = "Quality")]
    quality: String,
}

impl ResultRow {
    pub(crate) fn new(r: &MeasurementResult, color: bool) -> Self {
        let mut id = r.id.to_string();
        id.truncate(8);
        Self {
            id,
            date: r.timestamp.format(DATE_FORMAT).to_string(),
            download: format!("{:.2} Mbps", r.download_mbps),
            upload: format!("{:.2} Mbps", r.upload_mbps),
            ping: format!("{:.1} ms", r.ping_ms),
            jitter: format!("{:.1} ms", r.jitter_ms),
            connection: r.connection_type.clone(),
            quality: output::quality_label(r.quality, color),
        }
    }
}

pub(crate) fn detail(r: &MeasurementResult, color: bool) -> String {
    [
        format!("Download:   {:.2} Mbps", r.download_mbps),
        format!("Upload:     {:.2} Mbps", r.upload_mbps),
        format!("Ping:       {:.1} ms", r.ping_ms),
        format!("Jitter:     {:.1} ms", r.jitter_ms),
        format!("Quality:    {}", output::quality_label(r.quality, color)),
        format!("Connection: {}", r.connection_type),
        format!("Server:     {}", r.server_label),
        format!("Date:       {} UTC", r.timestamp.format(DATE_FORMAT)),
        output::muted(&format!("ID:         {}", r.id), color),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: HistoryArgs, ctx: &Context, store: &dyn HistoryStore) -> Result<(), CliError> {
    match args.command {
        HistoryCommand::List { limit } => {
            let results = match limit {
                Some(n) => store.recent(n)?,
                None => store.list()?,
            };
            if results.is_empty() && ctx.shows_progress() {
                eprintln!("No results yet. Run: netpulse speed");
                return Ok(());
            }
            let out = output::render_list(
                &ctx.format,
                &results,
                |r| ResultRow::new(r, ctx.color),
                |r| r.id.to_string(),
            )?;
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        HistoryCommand::Delete { id } => {
            let parsed = util::parse_result_id(&id)?;
            if !util::confirm(&format!("Delete result {parsed}?"), "history delete", ctx.yes)? {
                return Ok(());
            }
            if !store.delete(parsed)? {
                return Err(CliError::NotFound {
                    resource_type: "result".into(),
                    identifier: id,
                    list_command: "history list".into(),
                });
            }
            if !ctx.quiet {
                eprintln!("Result deleted");
            }
            Ok(())
        }

        HistoryCommand::Clear => {
            let count = store.list()?.len();
            if count == 0 {
                if !ctx.quiet {
                    eprintln!("History is already empty");
                }
                return Ok(());
            }
            if !util::confirm(
                &format!("Delete all {count} stored results? This cannot be undone."),
                "history clear",
                ctx.yes,
            )? {
                return Ok(());
            }
            let removed = store.clear()?;
            if !ctx.quiet {
                eprintln!("Deleted {removed} results");
            }
            Ok(())
        }
    }
}
