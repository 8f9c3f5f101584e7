//! Subnet discovery with a persisted result cache.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use indicatif::ProgressBar;
use tabled::Tabled;
use tracing::{debug, warn};

use netpulse_core::{
    DiscoveredDevice, LocalNetwork, ScanCache, ScanProgress, ScanResult, Scanner, SubnetPrefix,
    Subscription,
};

use crate::cli::ScanArgs;
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    device_type: String,
    #[tabled(rename = "Manufacturer")]
    manufacturer: String,
    #[tabled(rename = "Response")]
    response: String,
    #[tabled(rename = "Source")]
    source: String,
}

impl DeviceRow {
    fn new(d: &DiscoveredDevice, color: bool) -> Self {
        let name = if d.is_local {
            format!("{} {}", d.display_name, output::muted("(local)", color))
        } else {
            d.display_name.clone()
        };
        Self {
            address: d.address.to_string(),
            name,
            device_type: d.device_type.to_string(),
            manufacturer: d.manufacturer.clone().unwrap_or_default(),
            response: if d.is_local {
                String::new()
            } else {
                format!("{} ms", d.response_time.as_millis())
            },
            source: d.identified_by.clone().unwrap_or_default(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ScanArgs, ctx: &Context, cache_path: &Path) -> Result<(), CliError> {
    let mut config = ctx.config.scan_config()?;
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
        config.validate()?;
    }

    let requested = args
        .subnet
        .as_deref()
        .map(str::parse::<SubnetPrefix>)
        .transpose()?;
    let local = LocalNetwork::detect().await;
    let prefix = match requested {
        Some(prefix) => prefix,
        None => local.as_ref().map(|l| l.prefix).map_err(Clone::clone)?,
    };

    let cache = ScanCache::new(config.cache_window);
    if let Some(previous) = load_cached(cache_path) {
        cache.store(previous);
    }
    if !args.refresh {
        let now = Utc::now();
        if let Some(hit) = cache.get_fresh(now).filter(|r| r.subnet_prefix == prefix) {
            if !ctx.quiet {
                let age = Duration::from_secs(hit.age(now).as_secs());
                eprintln!(
                    "Cached scan from {} ago (use --refresh to scan again)",
                    humantime::format_duration(age)
                );
            }
            render(&hit, ctx)?;
            return Ok(());
        }
    }

    let mut scanner = Scanner::system(config)?;
    if let Ok(local) = local {
        scanner = scanner.with_local(local);
    }

    let bar = util::progress_bar(0, ctx.shows_progress());
    bar.set_message(format!("Scanning {prefix}.0/24"));
    let interrupt = util::cancel_on_ctrl_c();
    let (report, ()) = tokio::join!(
        scanner.scan(prefix, &interrupt),
        follow_progress(scanner.subscribe(), &bar)
    );
    bar.finish_and_clear();

    render(&report.result, ctx)?;

    if let Some(error) = &report.error {
        if !ctx.quiet {
            eprintln!("warning: {error}; results are incomplete");
        }
        if interrupt.is_cancelled() {
            return Err(CliError::Cancelled);
        }
        return Ok(());
    }

    save_cached(cache_path, &report.result);
    Ok(())
}

fn render(result: &ScanResult, ctx: &Context) -> Result<(), CliError> {
    let out = output::render_list(
        &ctx.format,
        &result.devices,
        |d| DeviceRow::new(d, ctx.color),
        |d| d.address.to_string(),
    )?;
    output::print_output(&out, ctx.quiet);
    if ctx.shows_progress() {
        eprintln!(
            "{} devices on {}.0/24, scanned in {:.1}s",
            result.devices.len(),
            result.subnet_prefix,
            result.scan_duration.as_secs_f64()
        );
    }
    Ok(())
}

async fn follow_progress(mut progress: Subscription<ScanProgress>, bar: &ProgressBar) {
    while let Some(p) = progress.changed().await {
        bar.set_length(u64::try_from(p.total).unwrap_or(u64::MAX));
        bar.set_position(u64::try_from(p.processed).unwrap_or(u64::MAX));
        bar.set_message(format!("{} found", p.reachable));
        if p.finished {
            break;
        }
    }
}

// ── Cache persistence ───────────────────────────────────────────────

fn load_cached(path: &Path) -> Option<ScanResult> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(result) => Some(result),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "ignoring unreadable scan cache");
            None
        }
    }
}

/// Write the cache file. Failures are logged and otherwise ignored.
fn save_cached(path: &Path, result: &ScanResult) {
    let written = path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| {
            let json = serde_json::to_string_pretty(result).map_err(std::io::Error::other)?;
            std::fs::write(path, json)
        });
    if let Err(e) = written {
        warn!(path = %path.display(), error = %e, "failed to save scan cache");
    }
}
