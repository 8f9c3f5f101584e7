//! Latency-only measurement.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use netpulse_api::{NetProber, ProbeTarget, TransportConfig};
use netpulse_core::{CoreError, LatencyProber, LatencySample};

use crate::cli::PingArgs;
use crate::error::CliError;
use crate::output;

use super::{Context, util};

/// What `netpulse ping` reports.
#[derive(Debug, Serialize)]
struct PingSummary {
    target: String,
    attempted: usize,
    succeeded: usize,
    average_ms: f64,
    jitter_ms: f64,
    min_ms: f64,
    max_ms: f64,
    /// Per-probe round trip in issue order, `None` for failed probes.
    samples_ms: Vec<Option<f64>>,
}

impl PingSummary {
    fn from_sample(sample: &LatencySample) -> Self {
        let ok = sample.successful_ms();
        Self {
            target: sample.host.clone(),
            attempted: sample.outcomes.len(),
            succeeded: ok.len(),
            average_ms: sample.average_latency_ms().unwrap_or_default(),
            jitter_ms: sample.jitter_ms(),
            min_ms: ok.iter().copied().reduce(f64::min).unwrap_or_default(),
            max_ms: ok.iter().copied().reduce(f64::max).unwrap_or_default(),
            samples_ms: sample
                .outcomes
                .iter()
                .map(|o| o.succeeded.then(|| o.elapsed_ms()))
                .collect(),
        }
    }
}

fn detail(s: &PingSummary) -> String {
    let samples = s
        .samples_ms
        .iter()
        .map(|ms| ms.map_or_else(|| "x".into(), |ms| format!("{ms:.1}")))
        .collect::<Vec<_>>()
        .join(" ");
    [
        format!("Target:   {}", s.target),
        format!("Received: {}/{}", s.succeeded, s.attempted),
        format!("Average:  {:.1} ms", s.average_ms),
        format!("Jitter:   {:.1} ms", s.jitter_ms),
        format!("Min/Max:  {:.1} / {:.1} ms", s.min_ms, s.max_ms),
        format!("Samples:  {samples}"),
    ]
    .join("\n")
}

pub async fn handle(args: PingArgs, ctx: &Context) -> Result<(), CliError> {
    let config = ctx.config.measurement_config()?;
    let url = match args.url {
        Some(raw) => raw.parse().map_err(|e| CliError::Validation {
            field: "url".into(),
            reason: format!("invalid URL '{raw}': {e}"),
        })?,
        None => config.reference_url.clone(),
    };

    let prober = NetProber::new(&TransportConfig::default()).map_err(CoreError::from)?;
    let mut latency = LatencyProber::from_config(Arc::new(prober), &config);
    if let Some(count) = args.count {
        if count == 0 {
            return Err(CliError::Validation {
                field: "count".into(),
                reason: "must be at least 1".into(),
            });
        }
        latency = latency.with_sample_count(count);
    }
    if let Some(ms) = args.interval_ms {
        latency = latency.with_inter_sample_delay(Duration::from_millis(ms));
    }

    let target = ProbeTarget::head(url);
    let total = u64::try_from(latency.sample_count()).unwrap_or(u64::MAX);
    let bar = util::progress_bar(total, ctx.shows_progress());
    let interrupt = util::cancel_on_ctrl_c();
    let measured = latency
        .measure_latency(&target, &interrupt, |done, _, outcome| {
            bar.set_position(u64::try_from(done).unwrap_or(u64::MAX));
            if outcome.succeeded {
                bar.set_message(format!("{:.1} ms", outcome.elapsed_ms()));
            } else {
                bar.set_message("no reply");
            }
        })
        .await;
    bar.finish_and_clear();

    let summary = PingSummary::from_sample(&measured?);
    let out = output::render_single(&ctx.format, &summary, detail, |s| {
        format!("{:.1}", s.average_ms)
    })?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use netpulse_api::{ProbeErrorKind, ProbeOutcome};

    use super::*;

    #[test]
    fn summary_keeps_failed_probes_in_place() {
        let sample = LatencySample::new(
            "HEAD http://ref/",
            vec![
                ProbeOutcome::success("HEAD http://ref/", Duration::from_millis(20)),
                ProbeOutcome::failure(
                    "HEAD http://ref/",
                    Duration::from_millis(1000),
                    ProbeErrorKind::Timeout,
                ),
                ProbeOutcome::success("HEAD http://ref/", Duration::from_millis(30)),
            ],
        );
        let summary = PingSummary::from_sample(&sample);
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.samples_ms, vec![Some(20.0), None, Some(30.0)]);
        assert!((summary.average_ms - 25.0).abs() < 1e-9);
        assert!((summary.jitter_ms - 10.0).abs() < 1e-9);
        assert!((summary.min_ms - 20.0).abs() < 1e-9);
        assert!((summary.max_ms - 30.0).abs() < 1e-9);

        let text = detail(&summary);
        assert!(text.contains("Received: 2/3"));
        assert!(text.contains("20.0 x 30.0"));
    }
}
