//! Speed test: drives the orchestrator and renders its progress.

use std::time::Duration;

use bytesize::ByteSize;
use indicatif::ProgressBar;
use owo_colors::OwoColorize;
use url::Url;

use netpulse_core::{
    AlertPolicy, HistoryStore, MeasurementConfig, MeasurementPhase, MeasurementResult,
    MeasurementSnapshot, Orchestrator, Subscription,
};

use crate::cli::SpeedArgs;
use crate::error::CliError;
use crate::output;

use super::history::detail;
use super::{Context, util};

pub async fn handle(
    args: SpeedArgs,
    ctx: &Context,
    store: &dyn HistoryStore,
) -> Result<(), CliError> {
    let mut config = ctx.config.measurement_config()?;
    apply_overrides(&mut config, &args)?;
    let alerts = ctx.config.alert_policy()?;
    let payload = ByteSize::b(u64::try_from(config.upload_bytes).unwrap_or(u64::MAX));

    let orchestrator = Orchestrator::system(config)?;
    let bar = util::progress_bar(100, ctx.shows_progress());
    let watcher = tokio::spawn(follow_progress(
        orchestrator.subscribe(),
        bar.clone(),
        payload,
    ));

    let interrupt = util::cancel_on_ctrl_c();
    orchestrator.start()?;
    let outcome = tokio::select! {
        outcome = orchestrator.wait() => outcome,
        () = interrupt.cancelled() => {
            orchestrator.cancel();
            orchestrator.wait().await
        }
    };
    watcher.abort();
    bar.finish_and_clear();

    let result = outcome?;
    if !args.no_save {
        store.append(result.clone())?;
    }

    let out = output::render_single(
        &ctx.format,
        &result,
        |r| detail(r, ctx.color),
        |r| r.id.to_string(),
    )?;
    output::print_output(&out, ctx.quiet);
    warn_if_slow(&alerts, &result, ctx.color);
    Ok(())
}

fn parse_override(field: &str, raw: &str) -> Result<Url, CliError> {
    let url = Url::parse(raw).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CliError::Validation {
            field: field.into(),
            reason: format!("expected an http(s) URL, got '{raw}'"),
        });
    }
    Ok(url)
}

fn apply_overrides(config: &mut MeasurementConfig, args: &SpeedArgs) -> Result<(), CliError> {
    if let Some(raw) = &args.reference_url {
        config.reference_url = parse_override("reference-url", raw)?;
    }
    if let Some(raw) = &args.download_url {
        config.download_url = parse_override("download-url", raw)?;
    }
    if let Some(raw) = &args.upload_url {
        config.upload_url = parse_override("upload-url", raw)?;
    }
    if let Some(secs) = args.timeout {
        config.test_timeout = Duration::from_secs(secs);
    }
    config.validate()?;
    Ok(())
}

async fn follow_progress(
    mut states: Subscription<MeasurementSnapshot>,
    bar: ProgressBar,
    payload: ByteSize,
) {
    while let Some(snap) = states.changed().await {
        bar.set_position(percent(snap.fraction));
        bar.set_message(phase_message(&snap, payload));
        if snap.phase.is_terminal() {
            break;
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn percent(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u64
}

fn phase_message(snap: &MeasurementSnapshot, payload: ByteSize) -> String {
    match (snap.phase, snap.metric) {
        (MeasurementPhase::Ping, Some(ms)) => format!("Ping {ms:.1} ms"),
        (MeasurementPhase::Download, Some(mbps)) => format!("Download {mbps:.2} Mbps"),
        (MeasurementPhase::Upload, Some(mbps)) => format!("Upload {mbps:.2} Mbps ({payload})"),
        (MeasurementPhase::Upload, None) => format!("Upload ({payload})"),
        (phase, _) => phase.to_string(),
    }
}

fn warn_if_slow(policy: &AlertPolicy, result: &MeasurementResult, color: bool) {
    if !policy.should_alert(result) {
        return;
    }
    let message = format!(
        "Download speed {:.2} Mbps is below the alert threshold of {:.2} Mbps",
        result.download_mbps, policy.threshold_mbps
    );
    tracing::warn!(
        download_mbps = result.download_mbps,
        threshold_mbps = policy.threshold_mbps,
        "low speed alert"
    );
    if color {
        eprintln!("{} {message}", "warning:".yellow().bold());
    } else {
        eprintln!("warning: {message}");
    }
}
