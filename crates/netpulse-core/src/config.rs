// ── Runtime engine configuration ──
//
// These types describe *how* to measure and scan. They never touch disk:
// the config crate (or a test) constructs them and hands them in.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CoreError;
use crate::model::MeasurementResult;

pub const DEFAULT_REFERENCE_URL: &str = "https://www.google.com/generate_204";
pub const DEFAULT_DOWNLOAD_URL: &str = "https://speed.cloudflare.com/__down?bytes=25000000";
pub const DEFAULT_UPLOAD_URL: &str = "https://speed.cloudflare.com/__up";
pub const DEFAULT_SERVER_LABEL: &str = "Cloudflare";

/// Probes per latency measurement.
pub const DEFAULT_SAMPLE_COUNT: usize = 5;
/// Pause between consecutive latency probes.
pub const DEFAULT_INTER_SAMPLE_DELAY: Duration = Duration::from_millis(200);
/// Synthetic upload payload size.
pub const DEFAULT_UPLOAD_BYTES: usize = 2_000_000;
/// Maximum probes in flight during a subnet scan.
pub const DEFAULT_SCAN_CONCURRENCY: usize = 20;
/// Ports tried in the HTTP fingerprint stage, in order.
pub const DEFAULT_HTTP_PORTS: [u16; 6] = [80, 8080, 443, 8443, 8000, 8888];
/// Ports whose TCP handshake marks a host reachable, in order.
pub const DEFAULT_REACHABILITY_PORTS: [u16; 7] = [80, 443, 22, 445, 139, 62078, 8080];

/// Configuration for one measurement run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementConfig {
    /// Host probed for latency and jitter.
    pub reference_url: Url,
    pub download_url: Url,
    pub upload_url: Url,
    pub upload_bytes: usize,
    pub sample_count: usize,
    pub inter_sample_delay: Duration,
    /// Deadline for a single latency probe.
    pub probe_timeout: Duration,
    /// Deadline for one download or upload.
    pub transfer_timeout: Duration,
    /// Hard ceiling for the whole run. Reaching it counts as a cancel.
    pub test_timeout: Duration,
    pub server_label: String,
}

impl MeasurementConfig {
    /// Build a config around explicit endpoints, with default tuning.
    pub fn new(reference_url: Url, download_url: Url, upload_url: Url) -> Self {
        Self {
            reference_url,
            download_url,
            upload_url,
            upload_bytes: DEFAULT_UPLOAD_BYTES,
            sample_count: DEFAULT_SAMPLE_COUNT,
            inter_sample_delay: DEFAULT_INTER_SAMPLE_DELAY,
            probe_timeout: Duration::from_secs(3),
            transfer_timeout: Duration::from_secs(30),
            test_timeout: Duration::from_secs(90),
            server_label: DEFAULT_SERVER_LABEL.into(),
        }
    }

    /// The public default endpoints.
    pub fn public_defaults() -> Result<Self, CoreError> {
        let parse = |s: &str| {
            Url::parse(s).map_err(|e| CoreError::Config {
                message: format!("invalid default URL {s}: {e}"),
            })
        };
        Ok(Self::new(
            parse(DEFAULT_REFERENCE_URL)?,
            parse(DEFAULT_DOWNLOAD_URL)?,
            parse(DEFAULT_UPLOAD_URL)?,
        ))
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.sample_count == 0 {
            return Err(CoreError::Config {
                message: "sample_count must be at least 1".into(),
            });
        }
        if self.upload_bytes == 0 {
            return Err(CoreError::Config {
                message: "upload_bytes must be at least 1".into(),
            });
        }
        for (name, value) in [
            ("probe_timeout", self.probe_timeout),
            ("transfer_timeout", self.transfer_timeout),
            ("test_timeout", self.test_timeout),
        ] {
            if value.is_zero() {
                return Err(CoreError::Config {
                    message: format!("{name} must be greater than zero"),
                });
            }
        }
        Ok(())
    }
}

/// Configuration for one subnet scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Upper bound on probes in flight at any instant.
    pub concurrency: usize,
    /// Deadline for one reachability probe.
    pub probe_timeout: Duration,
    pub reachability_ports: Vec<u16>,
    pub http_ports: Vec<u16>,
    /// Deadline for one name lookup or banner fetch.
    pub fingerprint_timeout: Duration,
    /// Hard ceiling for the whole scan. Reaching it counts as a cancel.
    pub scan_timeout: Duration,
    /// How long a cached scan result stays usable.
    pub cache_window: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_SCAN_CONCURRENCY,
            probe_timeout: Duration::from_millis(500),
            reachability_ports: DEFAULT_REACHABILITY_PORTS.to_vec(),
            http_ports: DEFAULT_HTTP_PORTS.to_vec(),
            fingerprint_timeout: Duration::from_secs(2),
            scan_timeout: Duration::from_secs(120),
            cache_window: Duration::from_secs(300),
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.concurrency == 0 {
            return Err(CoreError::Config {
                message: "concurrency must be at least 1".into(),
            });
        }
        if self.reachability_ports.is_empty() {
            return Err(CoreError::Config {
                message: "at least one reachability port is required".into(),
            });
        }
        if self.probe_timeout.is_zero() || self.scan_timeout.is_zero() {
            return Err(CoreError::Config {
                message: "scan timeouts must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

/// Low-speed alert setting read from the user's preferences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertPolicy {
    pub enabled: bool,
    pub threshold_mbps: f64,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_mbps: 10.0,
        }
    }
}

impl AlertPolicy {
    /// Whether an external notifier should be signalled for `result`.
    pub fn should_alert(&self, result: &MeasurementResult) -> bool {
        self.enabled && result.download_mbps < self.threshold_mbps
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::model::QualityClass;

    fn result(download_mbps: f64) -> MeasurementResult {
        MeasurementResult {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            download_mbps,
            upload_mbps: 5.0,
            ping_ms: 20.0,
            jitter_ms: 2.0,
            connection_type: "Wi-Fi".into(),
            server_label: "test".into(),
            quality: QualityClass::Poor,
        }
    }

    #[test]
    fn alert_requires_enabled_and_below_threshold() {
        let policy = AlertPolicy {
            enabled: true,
            threshold_mbps: 20.0,
        };
        assert!(policy.should_alert(&result(19.9)));
        assert!(!policy.should_alert(&result(20.0)));

        let disabled = AlertPolicy {
            enabled: false,
            ..policy
        };
        assert!(!disabled.should_alert(&result(1.0)));
    }

    #[test]
    fn public_defaults_are_valid() {
        let config = MeasurementConfig::public_defaults().unwrap();
        assert_eq!(config.sample_count, 5);
        assert_eq!(config.inter_sample_delay, Duration::from_millis(200));
        config.validate().unwrap();
        ScanConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = ScanConfig {
            concurrency: 0,
            ..ScanConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config { .. })));
    }
}
