use thiserror::Error;

/// Top-level error type for the `netpulse-api` crate.
///
/// Covers the transport-level failure modes of the transfer calls
/// (download, upload, banner fetch). Plain probes never return this type:
/// they fold every ordinary network failure into a [`ProbeOutcome`].
/// `netpulse-core` maps these into the user-facing taxonomy.
///
/// [`ProbeOutcome`]: crate::ProbeOutcome
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, reset, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Response ────────────────────────────────────────────────────
    /// The server answered, but not with a success status.
    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },
}

impl Error {
    /// Returns `true` if the failure was a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }

    /// Returns `true` if no connection to the server could be established.
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_connect())
    }
}
