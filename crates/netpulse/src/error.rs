//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use netpulse_config::ConfigError;
use netpulse_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const CANCELLED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum CliError {
    // ── Connectivity ─────────────────────────────────────────────────

    #[error("No network connection available")]
    #[diagnostic(
        code(netpulse::network_unavailable),
        help("Check that this machine has an active network interface with a default route.")
    )]
    NetworkUnavailable,

    #[error("Server unavailable at {url}")]
    #[diagnostic(
        code(netpulse::server_unavailable),
        help(
            "{reason}\n\
             Check the [measurement] URLs with: netpulse config show"
        )
    )]
    ServerUnavailable { url: String, reason: String },

    #[error("No usable latency samples from {host} ({attempted} attempted)")]
    #[diagnostic(
        code(netpulse::insufficient_samples),
        help("Every probe failed. Check that the reference host is reachable from this network.")
    )]
    InsufficientSamples { host: String, attempted: usize },

    #[error("Could not determine the local network")]
    #[diagnostic(
        code(netpulse::no_local_network),
        help(
            "{reason}\n\
             Pass the subnet explicitly, e.g.: netpulse scan --subnet 192.168.1"
        )
    )]
    NoLocalNetwork { reason: String },

    // ── Run control ──────────────────────────────────────────────────

    #[error("Cancelled")]
    #[diagnostic(code(netpulse::cancelled))]
    Cancelled,

    #[error("{operation} timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(netpulse::timeout),
        help("Raise the limit in the config file or with --timeout, or retry on a quieter network.")
    )]
    Timeout { operation: String, timeout_ms: u64 },

    // ── Measurement ──────────────────────────────────────────────────

    #[error("Measurement failed: {message}")]
    #[diagnostic(code(netpulse::measurement))]
    Measurement { message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(netpulse::not_found),
        help("Run: netpulse {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(netpulse::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(netpulse::config),
        help("Inspect the file with: netpulse config show")
    )]
    Config(Box<figment::Error>),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(netpulse::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Output ───────────────────────────────────────────────────────

    #[error("Failed to render {format} output: {reason}")]
    #[diagnostic(code(netpulse::output))]
    Output { format: &'static str, reason: String },

    // ── IO / Internal ─────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(netpulse::internal))]
    Internal(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NetworkUnavailable
            | Self::ServerUnavailable { .. }
            | Self::InsufficientSamples { .. }
            | Self::NoLocalNetwork { .. } => exit_code::CONNECTION,
            Self::Cancelled => exit_code::CANCELLED,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NetworkUnavailable => CliError::NetworkUnavailable,

            CoreError::ServerUnavailable { url, reason } => {
                CliError::ServerUnavailable { url, reason }
            }

            CoreError::NoLocalNetwork { reason } => CliError::NoLocalNetwork { reason },

            CoreError::InsufficientSamples { host, attempted } => {
                CliError::InsufficientSamples { host, attempted }
            }

            CoreError::TestCancelled => CliError::Cancelled,

            CoreError::Timeout {
                operation,
                timeout_ms,
            } => CliError::Timeout {
                operation,
                timeout_ms,
            },

            CoreError::InvalidSubnet { input } => CliError::Validation {
                field: "subnet".into(),
                reason: format!("'{input}' is not a prefix such as 192.168.1"),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            err @ (CoreError::InvalidResponse { .. }
            | CoreError::UndefinedRate { .. }
            | CoreError::InvalidState { .. }) => CliError::Measurement {
                message: err.to_string(),
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Figment(err) => CliError::Config(err),
            ConfigError::Io(err) => CliError::Io(err),
            ConfigError::Serialization(err) => CliError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_and_timeouts_have_distinct_exit_codes() {
        assert_eq!(
            CliError::from(CoreError::TestCancelled).exit_code(),
            exit_code::CANCELLED
        );
        let timeout = CliError::from(CoreError::Timeout {
            operation: "Download".into(),
            timeout_ms: 30_000,
        });
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);
        assert_eq!(timeout.to_string(), "Download timed out after 30000ms");
    }

    #[test]
    fn bad_subnet_is_a_usage_error() {
        let err = CliError::from(CoreError::InvalidSubnet {
            input: "10.0".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn connectivity_failures_share_an_exit_code() {
        for err in [
            CoreError::NetworkUnavailable,
            CoreError::NoLocalNetwork {
                reason: "no route".into(),
            },
            CoreError::InsufficientSamples {
                host: "HEAD https://ref/".into(),
                attempted: 5,
            },
        ] {
            assert_eq!(CliError::from(err).exit_code(), exit_code::CONNECTION);
        }
    }
}
