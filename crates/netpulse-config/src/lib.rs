//! Configuration for netpulse.
//!
//! TOML file + `NETPULSE_*` environment layering via figment, platform
//! path resolution, and translation into the runtime configs the engines
//! take (`MeasurementConfig`, `ScanConfig`, `AlertPolicy`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use netpulse_core::config::{
    DEFAULT_DOWNLOAD_URL, DEFAULT_HTTP_PORTS, DEFAULT_INTER_SAMPLE_DELAY,
    DEFAULT_REACHABILITY_PORTS, DEFAULT_REFERENCE_URL, DEFAULT_SAMPLE_COUNT,
    DEFAULT_SCAN_CONCURRENCY, DEFAULT_SERVER_LABEL, DEFAULT_UPLOAD_BYTES, DEFAULT_UPLOAD_URL,
};
use netpulse_core::{AlertPolicy, MeasurementConfig, ScanConfig};

const ENV_PREFIX: &str = "NETPULSE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<netpulse_core::CoreError> for ConfigError {
    fn from(err: netpulse_core::CoreError) -> Self {
        Self::Validation {
            field: "config".into(),
            reason: err.to_string(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub measurement: Measurement,

    #[serde(default)]
    pub discovery: Discovery,

    #[serde(default)]
    pub alerts: Alerts,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Defaults {
    /// Output format: table, json, json-compact, yaml, plain.
    pub output: String,
    /// Color mode: auto, always, never.
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: "table".into(),
            color: "auto".into(),
        }
    }
}

/// `[measurement]`: endpoints and timing for speed tests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Measurement {
    pub reference_url: String,
    pub download_url: String,
    pub upload_url: String,
    pub server_label: String,
    pub upload_bytes: usize,
    pub sample_count: usize,
    pub sample_delay_ms: u64,
    pub probe_timeout_ms: u64,
    pub transfer_timeout_secs: u64,
    pub test_timeout_secs: u64,
}

impl Default for Measurement {
    fn default() -> Self {
        Self {
            reference_url: DEFAULT_REFERENCE_URL.into(),
            download_url: DEFAULT_DOWNLOAD_URL.into(),
            upload_url: DEFAULT_UPLOAD_URL.into(),
            server_label: DEFAULT_SERVER_LABEL.into(),
            upload_bytes: DEFAULT_UPLOAD_BYTES,
            sample_count: DEFAULT_SAMPLE_COUNT,
            sample_delay_ms: millis(DEFAULT_INTER_SAMPLE_DELAY),
            probe_timeout_ms: 3_000,
            transfer_timeout_secs: 30,
            test_timeout_secs: 90,
        }
    }
}

/// `[discovery]`: subnet scan tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Discovery {
    pub concurrency: usize,
    pub probe_timeout_ms: u64,
    pub reachability_ports: Vec<u16>,
    pub http_ports: Vec<u16>,
    pub fingerprint_timeout_ms: u64,
    pub scan_timeout_secs: u64,
    pub cache_secs: u64,
}

impl Default for Discovery {
    fn default() -> Self {
        let scan = ScanConfig::default();
        Self {
            concurrency: DEFAULT_SCAN_CONCURRENCY,
            probe_timeout_ms: millis(scan.probe_timeout),
            reachability_ports: DEFAULT_REACHABILITY_PORTS.to_vec(),
            http_ports: DEFAULT_HTTP_PORTS.to_vec(),
            fingerprint_timeout_ms: millis(scan.fingerprint_timeout),
            scan_timeout_secs: scan.scan_timeout.as_secs(),
            cache_secs: scan.cache_window.as_secs(),
        }
    }
}

/// `[alerts]`: low-speed alert preference.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Alerts {
    pub enabled: bool,
    pub threshold_mbps: f64,
}

impl Default for Alerts {
    fn default() -> Self {
        let policy = AlertPolicy::default();
        Self {
            enabled: policy.enabled,
            threshold_mbps: policy.threshold_mbps,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "netpulse", "netpulse")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".config", "netpulse", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory holding result history and the scan cache.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "netpulse"]),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

pub fn history_path() -> PathBuf {
    data_dir().join("history.json")
}

pub fn scan_cache_path() -> PathBuf {
    data_dir().join("last-scan.json")
}

// ── Loading ─────────────────────────────────────────────────────────

/// Defaults, then the TOML file at `path`, then `NETPULSE_*` variables
/// (`NETPULSE_ALERTS__THRESHOLD_MBPS=20`).
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment_for(path).extract()?;
    Ok(config)
}

/// Load config, falling back to defaults when it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Saving ──────────────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to runtime configs ──────────────────────────────────

fn parse_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{value}': {e}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("expected an http(s) URL, got '{value}'"),
        });
    }
    Ok(url)
}

impl Config {
    /// Build the measurement config.
    pub fn measurement_config(&self) -> Result<MeasurementConfig, ConfigError> {
        let m = &self.measurement;
        let mut config = MeasurementConfig::new(
            parse_url("measurement.reference_url", &m.reference_url)?,
            parse_url("measurement.download_url", &m.download_url)?,
            parse_url("measurement.upload_url", &m.upload_url)?,
        );
        config.server_label.clone_from(&m.server_label);
        config.upload_bytes = m.upload_bytes;
        config.sample_count = m.sample_count;
        config.inter_sample_delay = Duration::from_millis(m.sample_delay_ms);
        config.probe_timeout = Duration::from_millis(m.probe_timeout_ms);
        config.transfer_timeout = Duration::from_secs(m.transfer_timeout_secs);
        config.test_timeout = Duration::from_secs(m.test_timeout_secs);
        config.validate()?;
        Ok(config)
    }

    /// Build the scan config.
    pub fn scan_config(&self) -> Result<ScanConfig, ConfigError> {
        let d = &self.discovery;
        let config = ScanConfig {
            concurrency: d.concurrency,
            probe_timeout: Duration::from_millis(d.probe_timeout_ms),
            reachability_ports: d.reachability_ports.clone(),
            http_ports: d.http_ports.clone(),
            fingerprint_timeout: Duration::from_millis(d.fingerprint_timeout_ms),
            scan_timeout: Duration::from_secs(d.scan_timeout_secs),
            cache_window: Duration::from_secs(d.cache_secs),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn alert_policy(&self) -> Result<AlertPolicy, ConfigError> {
        let threshold = self.alerts.threshold_mbps;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Validation {
                field: "alerts.threshold_mbps".into(),
                reason: format!("must be a non-negative number, got {threshold}"),
            });
        }
        Ok(AlertPolicy {
            enabled: self.alerts.enabled,
            threshold_mbps: threshold,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_translate_cleanly() {
        let config = Config::default();
        let measurement = config.measurement_config().unwrap();
        assert_eq!(measurement.sample_count, 5);
        assert_eq!(measurement.inter_sample_delay, Duration::from_millis(200));

        let scan = config.scan_config().unwrap();
        assert_eq!(scan, ScanConfig::default());
        assert!(!config.alert_policy().unwrap().enabled);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[measurement]
server_label = "office"
sample_count = 8

[discovery]
concurrency = 8
http_ports = [80, 8080]

[alerts]
enabled = true
threshold_mbps = 25.0
"#,
        )
        .unwrap();

        let config: Config = figment_for(&path).extract().unwrap();

        assert_eq!(config.measurement.server_label, "office");
        assert_eq!(config.measurement.sample_count, 8);
        assert_eq!(config.measurement.download_url, DEFAULT_DOWNLOAD_URL);
        assert_eq!(config.discovery.concurrency, 8);
        assert_eq!(config.discovery.http_ports, vec![80, 8080]);
        assert_eq!(config.defaults, Defaults::default());

        let policy = config.alert_policy().unwrap();
        assert!(policy.enabled);
        assert!((policy.threshold_mbps - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config: Config = figment_for(&dir.path().join("absent.toml")).extract().unwrap();
        assert_eq!(config.discovery, Discovery::default());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.alerts.enabled = true;
        config.discovery.concurrency = 4;

        save_config_to(&config, &path).unwrap();
        let loaded: Config = figment_for(&path).extract().unwrap();

        assert_eq!(loaded.discovery.concurrency, 4);
        assert!(loaded.alerts.enabled);
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut config = Config::default();
        config.measurement.download_url = "ftp://example.com/file".into();
        assert!(matches!(
            config.measurement_config(),
            Err(ConfigError::Validation { .. })
        ));

        let mut config = Config::default();
        config.discovery.concurrency = 0;
        assert!(config.scan_config().is_err());

        let mut config = Config::default();
        config.alerts.threshold_mbps = -1.0;
        assert!(config.alert_policy().is_err());
    }
}
