// ── Probe primitive ──
//
// One bounded-timeout network operation against one target. Ordinary
// network failures never surface as `Err`: they are folded into a
// `ProbeOutcome` with `succeeded = false` and an error kind.

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tracing::trace;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// HTTP method used by an HTTP probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeMethod {
    Head,
    Get,
}

/// What a single probe is aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeTarget {
    /// An HTTP request. Any response, including 4xx/5xx, is a success.
    Http { url: Url, method: ProbeMethod },
    /// A bare TCP connect. Completing the handshake is a success.
    Tcp(SocketAddr),
}

impl ProbeTarget {
    pub fn head(url: Url) -> Self {
        Self::Http {
            url,
            method: ProbeMethod::Head,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::Http {
            url,
            method: ProbeMethod::Get,
        }
    }

    pub fn tcp(addr: SocketAddr) -> Self {
        Self::Tcp(addr)
    }

    /// Parse a URL string into a `HEAD` probe target.
    pub fn parse_head(url: &str) -> Result<Self, Error> {
        Ok(Self::head(Url::parse(url)?))
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { url, method } => {
                let verb = match method {
                    ProbeMethod::Head => "HEAD",
                    ProbeMethod::Get => "GET",
                };
                write!(f, "{verb} {url}")
            }
            Self::Tcp(addr) => write!(f, "tcp://{addr}"),
        }
    }
}

/// Why a probe did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    Timeout,
    Refused,
    DnsFailure,
    Tls,
    Unreachable,
    Cancelled,
    Other,
}

/// Result of a single probe. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub target: String,
    pub succeeded: bool,
    pub elapsed: Duration,
    pub error_kind: Option<ProbeErrorKind>,
}

impl ProbeOutcome {
    pub fn success(target: impl ToString, elapsed: Duration) -> Self {
        Self {
            target: target.to_string(),
            succeeded: true,
            elapsed,
            error_kind: None,
        }
    }

    pub fn failure(target: impl ToString, elapsed: Duration, kind: ProbeErrorKind) -> Self {
        Self {
            target: target.to_string(),
            succeeded: false,
            elapsed,
            error_kind: Some(kind),
        }
    }

    pub fn cancelled(target: impl ToString, elapsed: Duration) -> Self {
        Self::failure(target, elapsed, ProbeErrorKind::Cancelled)
    }

    /// Elapsed time in fractional milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Issues a single bounded-timeout probe.
///
/// Implementations must honor exactly one timeout per call and must not
/// return early without a result: every failure is reported through the
/// outcome. Dropping the returned future cancels the underlying connection.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &ProbeTarget, timeout: Duration) -> ProbeOutcome;
}

/// The real probe primitive backed by a shared `reqwest::Client` pool
/// (HTTP targets) and tokio sockets (TCP targets).
#[derive(Debug, Clone)]
pub struct NetProber {
    http: reqwest::Client,
}

impl NetProber {
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
        })
    }

    /// Wrap an existing client (shares its connection pool).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn attempt(&self, target: &ProbeTarget) -> Result<(), ProbeErrorKind> {
        match target {
            ProbeTarget::Http { url, method } => {
                let request = match method {
                    ProbeMethod::Head => self.http.head(url.clone()),
                    ProbeMethod::Get => self.http.get(url.clone()),
                };
                // Status is deliberately ignored: reachability, not correctness.
                let resp = request.send().await.map_err(|e| classify_reqwest(&e))?;
                trace!(status = resp.status().as_u16(), %url, "probe response");
                Ok(())
            }
            ProbeTarget::Tcp(addr) => {
                let _stream = TcpStream::connect(addr)
                    .await
                    .map_err(|e| classify_io(&e))?;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Prober for NetProber {
    async fn probe(&self, target: &ProbeTarget, timeout: Duration) -> ProbeOutcome {
        let start = Instant::now();
        // On expiry the attempt future is dropped, which closes the socket.
        let result = tokio::time::timeout(timeout, self.attempt(target)).await;
        let elapsed = start.elapsed();

        match result {
            Ok(Ok(())) => ProbeOutcome::success(target, elapsed),
            Ok(Err(kind)) => {
                trace!(%target, ?kind, "probe failed");
                ProbeOutcome::failure(target, elapsed, kind)
            }
            Err(_) => ProbeOutcome::failure(target, elapsed, ProbeErrorKind::Timeout),
        }
    }
}

// ── Error classification ────────────────────────────────────────────

pub(crate) fn classify_io(err: &std::io::Error) -> ProbeErrorKind {
    use std::io::ErrorKind;
    match err.kind() {
        ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset => ProbeErrorKind::Refused,
        ErrorKind::TimedOut => ProbeErrorKind::Timeout,
        ErrorKind::HostUnreachable
        | ErrorKind::NetworkUnreachable
        | ErrorKind::AddrNotAvailable => ProbeErrorKind::Unreachable,
        _ => ProbeErrorKind::Other,
    }
}

/// Walk the reqwest error's source chain to find what actually went wrong.
pub(crate) fn classify_reqwest(err: &reqwest::Error) -> ProbeErrorKind {
    if err.is_timeout() {
        return ProbeErrorKind::Timeout;
    }

    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if let Some(io) = inner.downcast_ref::<std::io::Error>() {
            let kind = classify_io(io);
            if kind != ProbeErrorKind::Other {
                return kind;
            }
        }
        let text = inner.to_string().to_ascii_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup") {
            return ProbeErrorKind::DnsFailure;
        }
        if text.contains("certificate") || text.contains("tls") || text.contains("handshake") {
            return ProbeErrorKind::Tls;
        }
        source = inner.source();
    }

    if err.is_connect() {
        ProbeErrorKind::Refused
    } else {
        ProbeErrorKind::Other
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_each_target_kind() {
        let head = ProbeTarget::parse_head("http://example.com/").unwrap();
        assert_eq!(head.to_string(), "HEAD http://example.com/");

        let tcp = ProbeTarget::tcp("192.168.1.1:80".parse().unwrap());
        assert_eq!(tcp.to_string(), "tcp://192.168.1.1:80");
    }

    #[test]
    fn io_errors_map_to_kinds() {
        use std::io::{Error as IoError, ErrorKind};
        assert_eq!(
            classify_io(&IoError::from(ErrorKind::ConnectionRefused)),
            ProbeErrorKind::Refused
        );
        assert_eq!(
            classify_io(&IoError::from(ErrorKind::TimedOut)),
            ProbeErrorKind::Timeout
        );
        assert_eq!(
            classify_io(&IoError::from(ErrorKind::PermissionDenied)),
            ProbeErrorKind::Other
        );
    }

    #[test]
    fn failure_outcome_carries_kind() {
        let o = ProbeOutcome::failure(
            "tcp://10.0.0.1:22",
            Duration::from_millis(5),
            ProbeErrorKind::Refused,
        );
        assert!(!o.succeeded);
        assert_eq!(o.error_kind, Some(ProbeErrorKind::Refused));
        assert!((o.elapsed_ms() - 5.0).abs() < f64::EPSILON);
    }
}
