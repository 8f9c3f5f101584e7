// ── Core error types ──
//
// User-facing errors from netpulse-core. Consumers never see raw HTTP
// status codes or socket errors; the `From<netpulse_api::Error>` impl
// translates transport failures into the measurement taxonomy.
//
// `Clone` so a terminal error can be published through the orchestrator's
// watch channel as well as returned to the caller.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Availability ─────────────────────────────────────────────────
    #[error("No network connection available")]
    NetworkUnavailable,

    #[error("Server unavailable at {url}: {reason}")]
    ServerUnavailable { url: String, reason: String },

    #[error("Could not determine the local network: {reason}")]
    NoLocalNetwork { reason: String },

    // ── Run control ──────────────────────────────────────────────────
    #[error("Test cancelled")]
    TestCancelled,

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Cannot start: a measurement is already {state}")]
    InvalidState { state: String },

    // ── Data ─────────────────────────────────────────────────────────
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("No usable latency samples from {host} ({attempted} attempted)")]
    InsufficientSamples { host: String, attempted: usize },

    #[error("Transfer rate undefined: {bytes} bytes in zero elapsed time")]
    UndefinedRate { bytes: u64 },

    #[error("Invalid subnet prefix '{input}': expected three octets such as 192.168.1")]
    InvalidSubnet { input: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` for the user- or deadline-initiated cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::TestCancelled)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<netpulse_api::Error> for CoreError {
    fn from(err: netpulse_api::Error) -> Self {
        match err {
            ref e if e.is_timeout() => CoreError::Timeout {
                operation: "Request".into(),
                timeout_ms: 0,
            },
            netpulse_api::Error::Status { status, url } => CoreError::InvalidResponse {
                message: format!("HTTP {status} from {url}"),
            },
            netpulse_api::Error::Transport(e) => CoreError::ServerUnavailable {
                url: e
                    .url()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "<unknown>".into()),
                reason: e.to_string(),
            },
            netpulse_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            netpulse_api::Error::ClientBuild(msg) => CoreError::Config { message: msg },
        }
    }
}
