// ── Latency samples ──

use serde::{Deserialize, Serialize};

use netpulse_api::ProbeOutcome;

/// The ordered probe outcomes collected against one reference host.
///
/// Order is the order the probes were issued in; jitter depends on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySample {
    pub host: String,
    pub outcomes: Vec<ProbeOutcome>,
}

impl LatencySample {
    pub fn new(host: impl Into<String>, outcomes: Vec<ProbeOutcome>) -> Self {
        Self {
            host: host.into(),
            outcomes,
        }
    }

    /// Round-trip times of the successful probes, in issue order.
    pub fn successful_ms(&self) -> Vec<f64> {
        self.outcomes
            .iter()
            .filter(|o| o.succeeded)
            .map(ProbeOutcome::elapsed_ms)
            .collect()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    /// Arithmetic mean of the successful samples, `None` if none succeeded.
    pub fn average_latency_ms(&self) -> Option<f64> {
        mean(&self.successful_ms())
    }

    /// Mean absolute difference between consecutive successful samples.
    pub fn jitter_ms(&self) -> f64 {
        jitter(&self.successful_ms())
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Jitter over an ordered series. Zero for fewer than two values.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn jitter(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let total: f64 = values.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    total / (values.len() - 1) as f64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use netpulse_api::ProbeErrorKind;

    use super::*;

    fn ok(ms: u64) -> ProbeOutcome {
        ProbeOutcome::success("HEAD http://ref/", Duration::from_millis(ms))
    }

    fn failed() -> ProbeOutcome {
        ProbeOutcome::failure(
            "HEAD http://ref/",
            Duration::from_millis(1000),
            ProbeErrorKind::Timeout,
        )
    }

    #[test]
    fn reference_scenario() {
        let sample = LatencySample::new("ref", [20, 25, 22, 30, 24].map(ok).to_vec());
        let avg = sample.average_latency_ms().unwrap();
        assert!((avg - 24.2).abs() < 1e-9, "avg = {avg}");
        assert!((sample.jitter_ms() - 5.5).abs() < 1e-9);
    }

    #[test]
    fn failed_samples_are_skipped_but_order_kept() {
        // 20, (fail), 30, 10 -> diffs |30-20|, |10-30| = 10, 20 -> 15
        let sample = LatencySample::new("ref", vec![ok(20), failed(), ok(30), ok(10)]);
        assert_eq!(sample.success_count(), 3);
        assert!((sample.jitter_ms() - 15.0).abs() < 1e-9);
        assert!((sample.average_latency_ms().unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn jitter_is_zero_below_two_samples() {
        let one = LatencySample::new("ref", vec![failed(), ok(42)]);
        assert!(one.jitter_ms().abs() < f64::EPSILON);
        assert!((one.average_latency_ms().unwrap() - 42.0).abs() < 1e-9);

        let none = LatencySample::new("ref", vec![failed(), failed()]);
        assert!(none.jitter_ms().abs() < f64::EPSILON);
        assert_eq!(none.average_latency_ms(), None);
    }

    #[test]
    fn jitter_is_never_negative() {
        let series = [50.0, 10.0, 90.0, 90.0, 5.0];
        assert!(jitter(&series) >= 0.0);
        assert!(jitter(&[]).abs() < f64::EPSILON);
    }
}
