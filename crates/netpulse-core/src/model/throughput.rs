// ── Throughput samples ──

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Cumulative bytes moved after `elapsed` time of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThroughputSample {
    pub bytes_transferred: u64,
    pub elapsed: Duration,
}

impl ThroughputSample {
    pub fn new(bytes_transferred: u64, elapsed: Duration) -> Self {
        Self {
            bytes_transferred,
            elapsed,
        }
    }

    /// Rate in megabits per second. Errors when no time has elapsed.
    pub fn mbps(&self) -> Result<f64, CoreError> {
        rate_mbps(self.bytes_transferred, self.elapsed)
    }
}

/// `(bytes × 8) / (seconds × 1e6)`.
///
/// Zero elapsed time has no defined rate and is reported as
/// [`CoreError::UndefinedRate`] instead of infinity or NaN.
#[allow(clippy::cast_precision_loss)]
pub fn rate_mbps(bytes: u64, elapsed: Duration) -> Result<f64, CoreError> {
    let seconds = elapsed.as_secs_f64();
    if seconds <= 0.0 {
        return Err(CoreError::UndefinedRate { bytes });
    }
    Ok((bytes as f64 * 8.0) / (seconds * 1_000_000.0))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ten_megabytes_in_two_seconds_is_forty_mbps() {
        let rate = rate_mbps(10_000_000, Duration::from_secs(2)).unwrap();
        assert!((rate - 40.0).abs() < 1e-9);
    }

    #[test]
    fn zero_elapsed_is_an_error() {
        let err = rate_mbps(1024, Duration::ZERO).unwrap_err();
        assert_eq!(err, CoreError::UndefinedRate { bytes: 1024 });

        let sample = ThroughputSample::new(0, Duration::ZERO);
        assert!(sample.mbps().is_err());
    }

    #[test]
    fn zero_bytes_over_time_is_zero() {
        let rate = rate_mbps(0, Duration::from_millis(500)).unwrap();
        assert!(rate.abs() < f64::EPSILON);
    }
}
