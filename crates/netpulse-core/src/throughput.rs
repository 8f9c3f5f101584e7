// ── Throughput meter ──
//
// Streams a download chunk by chunk and posts a fixed-size upload,
// turning bytes over wall-clock time into Mbps. Every network await is
// raced against the cancellation token and the transfer deadline.

use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

use netpulse_api::{Download, TransferClient};

use crate::error::CoreError;
use crate::model::{MeasurementPhase, ThroughputSample};

/// Bytes received between two download progress reports.
pub const PROGRESS_QUANTUM_BYTES: u64 = 256 * 1024;

/// One progress report from a running transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferProgress {
    pub phase: MeasurementPhase,
    /// Share of the transfer done, `0.0..=1.0`.
    pub fraction: f64,
    /// Rate over the interval since the previous report.
    pub instantaneous_mbps: f64,
}

/// Measures download and upload rates against HTTP endpoints.
#[derive(Debug, Clone)]
pub struct ThroughputMeter {
    client: TransferClient,
}

impl ThroughputMeter {
    pub fn new(client: TransferClient) -> Self {
        Self { client }
    }

    /// Download `url` and return the rate in Mbps.
    ///
    /// The body is consumed incrementally and discarded. `on_progress`
    /// fires once per [`PROGRESS_QUANTUM_BYTES`] received and once at the
    /// end. The fraction uses `Content-Length` when the server sends one,
    /// otherwise elapsed time against `timeout`.
    pub async fn measure_download<F>(
        &self,
        url: &Url,
        timeout: Duration,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<f64, CoreError>
    where
        F: FnMut(TransferProgress) + Send,
    {
        let start = Instant::now();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let mut download: Download = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CoreError::TestCancelled),
            () = &mut deadline => return Err(transfer_timeout("Download", timeout)),
            opened = self.client.open_download(url) => opened?,
        };
        let expected = download.content_length().filter(|len| *len > 0);

        let mut received: u64 = 0;
        let mut reported: u64 = 0;
        let mut last_report = Instant::now();

        loop {
            let chunk = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CoreError::TestCancelled),
                () = &mut deadline => return Err(transfer_timeout("Download", timeout)),
                chunk = download.next_chunk() => chunk?,
            };
            let Some(chunk) = chunk else { break };
            received += chunk.len() as u64;

            let now = Instant::now();
            if let Some(instantaneous_mbps) =
                interval_rate(received - reported, now.duration_since(last_report))
            {
                on_progress(TransferProgress {
                    phase: MeasurementPhase::Download,
                    fraction: fraction(received, expected, start.elapsed(), timeout),
                    instantaneous_mbps,
                });
                trace!(received, instantaneous_mbps, "download progress");
                reported = received;
                last_report = now;
            }
        }

        let sample = ThroughputSample::new(received, start.elapsed());
        let mbps = sample.mbps()?;
        on_progress(TransferProgress {
            phase: MeasurementPhase::Download,
            fraction: 1.0,
            instantaneous_mbps: mbps,
        });
        debug!(
            %url,
            bytes = received,
            elapsed_ms = sample.elapsed.as_millis(),
            mbps,
            "download measured"
        );
        Ok(mbps)
    }

    /// POST a synthetic `payload_size` byte body to `url` and return the
    /// rate in Mbps, timed from send until the response arrives.
    pub async fn measure_upload(
        &self,
        url: &Url,
        payload_size: usize,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<f64, CoreError> {
        let payload = synthetic_payload(payload_size);
        let bytes = payload.len() as u64;

        let start = Instant::now();
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CoreError::TestCancelled),
            () = tokio::time::sleep(timeout) => return Err(transfer_timeout("Upload", timeout)),
            sent = self.client.upload(url, payload) => { sent?; }
        }

        let sample = ThroughputSample::new(bytes, start.elapsed());
        let mbps = sample.mbps()?;
        debug!(%url, bytes, elapsed_ms = sample.elapsed.as_millis(), mbps, "upload measured");
        Ok(mbps)
    }
}

/// A non-repeating-looking byte pattern so transparent compression on the
/// path cannot shrink the upload.
fn synthetic_payload(size: usize) -> Bytes {
    let mut state: u32 = 0x9E37_79B9;
    let body: Vec<u8> = (0..size)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state.to_le_bytes()[0]
        })
        .collect();
    Bytes::from(body)
}

#[allow(clippy::cast_precision_loss)]
fn fraction(received: u64, expected: Option<u64>, elapsed: Duration, timeout: Duration) -> f64 {
    let raw = match expected {
        Some(total) => received as f64 / total as f64,
        None => elapsed.as_secs_f64() / timeout.as_secs_f64(),
    };
    raw.clamp(0.0, 1.0)
}

/// Rate for a progress report covering `bytes` received over `interval`.
///
/// `None` until a full quantum has arrived, and also while the interval
/// is too short to have a defined rate; those bytes roll into the next
/// report.
fn interval_rate(bytes: u64, interval: Duration) -> Option<f64> {
    if bytes < PROGRESS_QUANTUM_BYTES {
        return None;
    }
    ThroughputSample::new(bytes, interval).mbps().ok()
}

fn transfer_timeout(operation: &str, timeout: Duration) -> CoreError {
    CoreError::Timeout {
        operation: operation.into(),
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn payload_has_requested_size_and_varies() {
        let payload = synthetic_payload(4096);
        assert_eq!(payload.len(), 4096);
        assert!(payload.iter().any(|b| *b != payload[0]));
    }

    #[test]
    fn fraction_prefers_content_length() {
        let f = fraction(500, Some(1000), Duration::from_secs(9), Duration::from_secs(10));
        assert!((f - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn fraction_falls_back_to_time_and_clamps() {
        let f = fraction(500, None, Duration::from_secs(5), Duration::from_secs(10));
        assert!((f - 0.5).abs() < f64::EPSILON);
        let over = fraction(2000, Some(1000), Duration::ZERO, Duration::from_secs(10));
        assert!((over - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn progress_waits_for_a_full_quantum_and_a_defined_rate() {
        let second = Duration::from_secs(1);
        assert_eq!(interval_rate(PROGRESS_QUANTUM_BYTES - 1, second), None);
        assert_eq!(interval_rate(PROGRESS_QUANTUM_BYTES, Duration::ZERO), None);

        let mbps = interval_rate(PROGRESS_QUANTUM_BYTES, second).unwrap();
        assert!((mbps - 2.097_152).abs() < 1e-9);
    }
}
