// ── Measurement orchestrator ──
//
// Drives a measurement run through `Idle → Connecting → Ping → Download →
// Upload → Complete`, with `Error` reachable from any in-flight phase.
// The run executes on one spawned task; callers observe it through a
// `watch` channel and control it only with `start()` and `cancel()`.
// Every snapshot carries the number of the run it belongs to, and a task
// only writes while the channel still holds its own run.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use netpulse_api::{NetProber, ProbeTarget, Prober, TransferClient, TransportConfig};

use crate::classify::{classify, connection_type_label};
use crate::config::MeasurementConfig;
use crate::error::CoreError;
use crate::latency::LatencyProber;
use crate::local::{NetworkMonitor, SystemNetworkMonitor};
use crate::model::{MeasurementPhase, MeasurementResult};
use crate::stream::Subscription;
use crate::throughput::ThroughputMeter;

// ── Phase weights ────────────────────────────────────────────────────

/// Share of overall progress taken by the ping phase.
pub const PING_WEIGHT: f64 = 0.2;
/// Share of overall progress taken by the download phase.
pub const DOWNLOAD_WEIGHT: f64 = 0.4;
/// Share of overall progress taken by the upload phase.
pub const UPLOAD_WEIGHT: f64 = 0.4;

const DOWNLOAD_START: f64 = PING_WEIGHT;
const UPLOAD_START: f64 = PING_WEIGHT + DOWNLOAD_WEIGHT;

// ── MeasurementSnapshot ──────────────────────────────────────────────

/// Everything an observer needs to render a run.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSnapshot {
    /// Sequence number of the run, bumped by every `start()`. `0` before
    /// the first run.
    pub run: u64,
    pub phase: MeasurementPhase,
    /// Overall progress, `0.0..=1.0`, never decreasing within a run.
    pub fraction: f64,
    /// Latest value of the phase's metric (ms for ping, Mbps otherwise).
    pub metric: Option<f64>,
    pub result: Option<MeasurementResult>,
    pub error: Option<CoreError>,
}

impl MeasurementSnapshot {
    fn idle() -> Self {
        Self {
            run: 0,
            phase: MeasurementPhase::Idle,
            fraction: 0.0,
            metric: None,
            result: None,
            error: None,
        }
    }

    /// Whether a task for `run` may still write into this snapshot.
    fn owned_by(&self, run: u64) -> bool {
        self.run == run && self.phase.is_in_flight()
    }

    /// The terminal outcome, once there is one.
    pub fn outcome(&self) -> Option<Result<MeasurementResult, CoreError>> {
        match (&self.result, &self.error) {
            (_, Some(err)) => Some(Err(err.clone())),
            (Some(result), None) => Some(Ok(result.clone())),
            (None, None) => None,
        }
    }
}

// ── Orchestrator ─────────────────────────────────────────────────────

/// Runs one measurement at a time.
///
/// Cheaply cloneable via `Arc<OrchestratorInner>`; clones share state, so
/// `cancel()` may be called from any task.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    config: MeasurementConfig,
    prober: Arc<dyn Prober>,
    meter: ThroughputMeter,
    monitor: Arc<dyn NetworkMonitor>,
    state: watch::Sender<MeasurementSnapshot>,
    run: Mutex<RunSlot>,
}

#[derive(Default)]
struct RunSlot {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Orchestrator {
    pub fn new(
        config: MeasurementConfig,
        prober: Arc<dyn Prober>,
        meter: ThroughputMeter,
        monitor: Arc<dyn NetworkMonitor>,
    ) -> Self {
        let (state, _) = watch::channel(MeasurementSnapshot::idle());
        Self {
            inner: Arc::new(OrchestratorInner {
                config,
                prober,
                meter,
                monitor,
                state,
                run: Mutex::new(RunSlot::default()),
            }),
        }
    }

    /// Orchestrator wired to the real network.
    pub fn system(config: MeasurementConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let http = TransportConfig::default().build_client()?;
        Ok(Self::new(
            config,
            Arc::new(NetProber::with_client(http.clone())),
            ThroughputMeter::new(TransferClient::with_client(http)),
            Arc::new(SystemNetworkMonitor),
        ))
    }

    pub fn config(&self) -> &MeasurementConfig {
        &self.inner.config
    }

    /// Current state.
    pub fn snapshot(&self) -> MeasurementSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn phase(&self) -> MeasurementPhase {
        self.inner.state.borrow().phase
    }

    pub fn subscribe(&self) -> Subscription<MeasurementSnapshot> {
        Subscription::new(self.inner.state.subscribe())
    }

    // ── Control surface ──────────────────────────────────────────────

    /// Begin a run. Only valid from `Idle`.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(&self) -> Result<(), CoreError> {
        let mut slot = self.lock_slot()?;

        let mut rejected = None;
        let mut run = 0;
        self.inner.state.send_if_modified(|snap| {
            if snap.phase == MeasurementPhase::Idle {
                run = snap.run + 1;
                *snap = MeasurementSnapshot {
                    run,
                    phase: MeasurementPhase::Connecting,
                    ..MeasurementSnapshot::idle()
                };
                true
            } else {
                rejected = Some(snap.phase);
                false
            }
        });
        if let Some(phase) = rejected {
            return Err(CoreError::InvalidState {
                state: phase.to_string(),
            });
        }

        let cancel = CancellationToken::new();
        slot.cancel = cancel.clone();
        slot.handle = Some(tokio::spawn(run_measurement(self.inner.clone(), run, cancel)));
        info!(run, server = %self.inner.config.server_label, "measurement started");
        Ok(())
    }

    /// Cancel the in-flight run. Idempotent; a no-op when nothing runs.
    pub fn cancel(&self) {
        if let Ok(slot) = self.inner.run.lock() {
            slot.cancel.cancel();
        }
        let changed = self.inner.state.send_if_modified(|snap| {
            if snap.phase.is_in_flight() {
                snap.phase = MeasurementPhase::Error;
                snap.error = Some(CoreError::TestCancelled);
                snap.result = None;
                true
            } else {
                false
            }
        });
        if changed {
            info!("measurement cancelled");
        }
    }

    /// Return a finished orchestrator to `Idle`.
    ///
    /// The previous run's task is aborted if it is still unwinding, and
    /// anything it would still publish is dropped.
    pub fn reset(&self) -> Result<(), CoreError> {
        let mut slot = self.lock_slot()?;
        let phase = self.phase();
        if phase.is_in_flight() {
            return Err(CoreError::InvalidState {
                state: phase.to_string(),
            });
        }
        slot.cancel.cancel();
        if let Some(handle) = slot.handle.take() {
            handle.abort();
        }
        self.inner.state.send_modify(|snap| {
            *snap = MeasurementSnapshot {
                run: snap.run,
                ..MeasurementSnapshot::idle()
            };
        });
        Ok(())
    }

    /// Wait for the current run to reach a terminal phase.
    pub async fn wait(&self) -> Result<MeasurementResult, CoreError> {
        let mut rx = self.inner.state.subscribe();
        if rx.borrow().phase == MeasurementPhase::Idle {
            return Err(CoreError::InvalidState {
                state: MeasurementPhase::Idle.to_string(),
            });
        }
        let snapshot = rx
            .wait_for(|snap| snap.phase.is_terminal())
            .await
            .map_err(|_| CoreError::Internal("measurement state channel closed".into()))?
            .clone();
        snapshot
            .outcome()
            .unwrap_or_else(|| Err(CoreError::Internal("terminal state without outcome".into())))
    }

    /// `start()` then `wait()`.
    pub async fn run(&self) -> Result<MeasurementResult, CoreError> {
        self.start()?;
        self.wait().await
    }

    fn lock_slot(&self) -> Result<std::sync::MutexGuard<'_, RunSlot>, CoreError> {
        self.inner
            .run
            .lock()
            .map_err(|_| CoreError::Internal("orchestrator lock poisoned".into()))
    }
}

// ── Run task ─────────────────────────────────────────────────────────

async fn run_measurement(inner: Arc<OrchestratorInner>, run: u64, cancel: CancellationToken) {
    let timeout = inner.config.test_timeout;
    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CoreError::TestCancelled),
        timed = tokio::time::timeout(timeout, execute(&inner, run, &cancel)) => {
            timed.unwrap_or_else(|_| {
                warn!(timeout_ms = timeout.as_millis(), "measurement hit its time ceiling");
                cancel.cancel();
                Err(CoreError::TestCancelled)
            })
        }
    };

    let accepted = inner.state.send_if_modified(|snap| {
        if !snap.owned_by(run) {
            return false;
        }
        match &outcome {
            Ok(result) => {
                snap.phase = MeasurementPhase::Complete;
                snap.fraction = 1.0;
                snap.result = Some(result.clone());
            }
            Err(err) => {
                snap.phase = MeasurementPhase::Error;
                snap.error = Some(err.clone());
            }
        }
        true
    });

    match outcome {
        Ok(result) if accepted => info!(
            download_mbps = result.download_mbps,
            upload_mbps = result.upload_mbps,
            ping_ms = result.ping_ms,
            quality = %result.quality,
            "measurement complete"
        ),
        Err(err) if accepted => warn!(error = %err, "measurement failed"),
        _ => debug!(run, "measurement outcome superseded"),
    }
}

async fn execute(
    inner: &OrchestratorInner,
    run: u64,
    cancel: &CancellationToken,
) -> Result<MeasurementResult, CoreError> {
    let config = &inner.config;
    let progress = Progress {
        state: &inner.state,
        run,
        cancel,
    };

    // Connecting
    let interface = inner
        .monitor
        .current_interface()
        .await
        .ok_or(CoreError::NetworkUnavailable)?;
    debug!(?interface, "network available");

    // Ping
    progress.update(MeasurementPhase::Ping, 0.0, None);
    let latency = LatencyProber::from_config(inner.prober.clone(), config);
    let target = ProbeTarget::head(config.reference_url.clone());
    let sample = latency
        .measure_latency(&target, cancel, |done, total, outcome| {
            let fraction = PING_WEIGHT * ratio(done, total);
            let metric = outcome.succeeded.then(|| outcome.elapsed_ms());
            progress.update(MeasurementPhase::Ping, fraction, metric);
        })
        .await?;
    let ping_ms = sample
        .average_latency_ms()
        .ok_or_else(|| CoreError::InsufficientSamples {
            host: sample.host.clone(),
            attempted: sample.outcomes.len(),
        })?;
    let jitter_ms = sample.jitter_ms();
    progress.update(MeasurementPhase::Ping, PING_WEIGHT, Some(ping_ms));

    // Download
    progress.update(MeasurementPhase::Download, DOWNLOAD_START, None);
    let download_mbps = inner
        .meter
        .measure_download(&config.download_url, config.transfer_timeout, cancel, |p| {
            let fraction = DOWNLOAD_START + DOWNLOAD_WEIGHT * p.fraction;
            progress.update(MeasurementPhase::Download, fraction, Some(p.instantaneous_mbps));
        })
        .await?;

    // Upload
    progress.update(MeasurementPhase::Upload, UPLOAD_START, Some(download_mbps));
    let upload_mbps = inner
        .meter
        .measure_upload(
            &config.upload_url,
            config.upload_bytes,
            config.transfer_timeout,
            cancel,
        )
        .await?;
    progress.update(MeasurementPhase::Upload, UPLOAD_START + UPLOAD_WEIGHT, Some(upload_mbps));

    Ok(MeasurementResult {
        id: Uuid::new_v4(),
        timestamp: Utc::now(),
        download_mbps,
        upload_mbps,
        ping_ms,
        jitter_ms,
        connection_type: connection_type_label(interface).to_string(),
        server_label: config.server_label.clone(),
        quality: classify(download_mbps),
    })
}

#[allow(clippy::cast_precision_loss)]
fn ratio(done: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        done as f64 / total as f64
    }
}

/// Writes progress into the watch channel.
///
/// Updates are dropped once the run is cancelled, terminal or superseded
/// by a later run, and the fraction is clamped so it never moves backwards.
struct Progress<'a> {
    state: &'a watch::Sender<MeasurementSnapshot>,
    run: u64,
    cancel: &'a CancellationToken,
}

impl Progress<'_> {
    fn update(&self, phase: MeasurementPhase, fraction: f64, metric: Option<f64>) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.state.send_if_modified(|snap| {
            if !snap.owned_by(self.run) {
                return false;
            }
            let entering = snap.phase != phase;
            snap.phase = phase;
            snap.fraction = fraction.clamp(snap.fraction, 1.0);
            if metric.is_some() || entering {
                snap.metric = metric;
            }
            true
        });
    }
}
