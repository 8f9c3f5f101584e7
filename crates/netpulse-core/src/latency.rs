// ── Latency prober ──
//
// Repeats the probe primitive against one reference host, strictly one
// probe at a time, and folds the outcomes into a `LatencySample`.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use netpulse_api::{ProbeOutcome, ProbeTarget, Prober};

use crate::config::{DEFAULT_INTER_SAMPLE_DELAY, DEFAULT_SAMPLE_COUNT, MeasurementConfig};
use crate::error::CoreError;
use crate::model::LatencySample;

/// Measures round-trip latency and jitter against a single host.
#[derive(Clone)]
pub struct LatencyProber {
    prober: Arc<dyn Prober>,
    sample_count: usize,
    inter_sample_delay: Duration,
    probe_timeout: Duration,
}

impl LatencyProber {
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self {
            prober,
            sample_count: DEFAULT_SAMPLE_COUNT,
            inter_sample_delay: DEFAULT_INTER_SAMPLE_DELAY,
            probe_timeout: Duration::from_secs(3),
        }
    }

    pub fn from_config(prober: Arc<dyn Prober>, config: &MeasurementConfig) -> Self {
        Self {
            prober,
            sample_count: config.sample_count,
            inter_sample_delay: config.inter_sample_delay,
            probe_timeout: config.probe_timeout,
        }
    }

    pub fn with_sample_count(mut self, count: usize) -> Self {
        self.sample_count = count;
        self
    }

    pub fn with_inter_sample_delay(mut self, delay: Duration) -> Self {
        self.inter_sample_delay = delay;
        self
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Probe `target` `sample_count` times, sleeping between probes.
    ///
    /// `on_sample(completed, total, outcome)` fires after every probe. A
    /// failed probe is kept in the sample and skipped by the statistics;
    /// only a run where nothing succeeded is an error.
    pub async fn measure_latency<F>(
        &self,
        target: &ProbeTarget,
        cancel: &CancellationToken,
        mut on_sample: F,
    ) -> Result<LatencySample, CoreError>
    where
        F: FnMut(usize, usize, &ProbeOutcome) + Send,
    {
        let total = self.sample_count;
        let mut outcomes = Vec::with_capacity(total);

        for index in 0..total {
            if index > 0 {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(CoreError::TestCancelled),
                    () = tokio::time::sleep(self.inter_sample_delay) => {}
                }
            }

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CoreError::TestCancelled),
                outcome = self.prober.probe(target, self.probe_timeout) => outcome,
            };
            trace!(
                %target,
                succeeded = outcome.succeeded,
                elapsed_ms = outcome.elapsed_ms(),
                "latency probe"
            );
            on_sample(index + 1, total, &outcome);
            outcomes.push(outcome);
        }

        let sample = LatencySample::new(target.to_string(), outcomes);
        if sample.success_count() == 0 {
            return Err(CoreError::InsufficientSamples {
                host: target.to_string(),
                attempted: total,
            });
        }

        debug!(
            %target,
            ok = sample.success_count(),
            attempted = total,
            avg_ms = sample.average_latency_ms(),
            jitter_ms = sample.jitter_ms(),
            "latency measured"
        );
        Ok(sample)
    }

    /// [`measure_latency`](Self::measure_latency) without a progress callback.
    pub async fn measure(
        &self,
        target: &ProbeTarget,
        cancel: &CancellationToken,
    ) -> Result<LatencySample, CoreError> {
        self.measure_latency(target, cancel, |_, _, _| {}).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use netpulse_api::ProbeErrorKind;
    use tokio::time::Instant;

    use super::*;

    /// Replays scripted outcomes and records when each probe started.
    struct ScriptedProber {
        script: Mutex<VecDeque<Option<u64>>>,
        started: Mutex<Vec<Instant>>,
    }

    impl ScriptedProber {
        fn new(script: impl IntoIterator<Item = Option<u64>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into_iter().collect()),
                started: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn probe(&self, target: &ProbeTarget, _timeout: Duration) -> ProbeOutcome {
            self.started.lock().unwrap().push(Instant::now());
            let next = self.script.lock().unwrap().pop_front().flatten();
            match next {
                Some(ms) => ProbeOutcome::success(target, Duration::from_millis(ms)),
                None => {
                    ProbeOutcome::failure(target, Duration::from_millis(1), ProbeErrorKind::Timeout)
                }
            }
        }
    }

    fn target() -> ProbeTarget {
        ProbeTarget::parse_head("http://reference.test/").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn computes_average_and_jitter() {
        let fake = ScriptedProber::new([Some(20), Some(25), Some(22), Some(30), Some(24)]);
        let prober = LatencyProber::new(fake.clone());

        let sample = prober.measure(&target(), &CancellationToken::new()).await.unwrap();

        assert!((sample.average_latency_ms().unwrap() - 24.2).abs() < 1e-9);
        assert!((sample.jitter_ms() - 5.5).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn probes_are_sequential_and_spaced() {
        let fake = ScriptedProber::new([Some(10); 5]);
        let prober = LatencyProber::new(fake.clone());

        prober.measure(&target(), &CancellationToken::new()).await.unwrap();

        let started = fake.started.lock().unwrap();
        assert_eq!(started.len(), 5);
        for pair in started.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(200));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn one_dropped_probe_degrades_gracefully() {
        let fake = ScriptedProber::new([Some(20), None, Some(22), Some(30), Some(24)]);
        let mut seen = Vec::new();
        let sample = LatencyProber::new(fake)
            .measure_latency(&target(), &CancellationToken::new(), |done, total, o| {
                seen.push((done, total, o.succeeded));
            })
            .await
            .unwrap();

        assert_eq!(sample.success_count(), 4);
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[1], (2, 5, false));
    }

    #[tokio::test(start_paused = true)]
    async fn single_success_has_zero_jitter() {
        let fake = ScriptedProber::new([None, None, Some(40), None, None]);
        let sample = LatencyProber::new(fake)
            .measure(&target(), &CancellationToken::new())
            .await
            .unwrap();
        assert!((sample.jitter_ms()).abs() < f64::EPSILON);
        assert!((sample.average_latency_ms().unwrap() - 40.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn all_failures_are_insufficient_samples() {
        let fake = ScriptedProber::new([None; 5]);
        let err = LatencyProber::new(fake)
            .measure(&target(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientSamples { attempted: 5, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_probes_nothing() {
        let fake = ScriptedProber::new([Some(10); 5]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = LatencyProber::new(fake.clone()).measure(&target(), &cancel).await.unwrap_err();

        assert_eq!(err, CoreError::TestCancelled);
        assert!(fake.started.lock().unwrap().is_empty());
    }
}
