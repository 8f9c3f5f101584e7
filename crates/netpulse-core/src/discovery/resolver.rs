// ── Name resolution ──
//
// Reverse DNS and multicast DNS lookups. The system resolver asks `dig`
// for both unicast and mDNS PTR queries. Where `dig` is not installed
// (stock Windows, minimal containers) every lookup is a miss and the
// cascade moves on to the next stage.

use std::io::ErrorKind;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};

/// mDNS multicast group and port.
const MDNS_GROUP: &str = "224.0.0.251";
const MDNS_PORT: &str = "5353";

/// Looks up names for LAN addresses. Best-effort: `None` means nothing
/// was learned, whatever the reason.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Unicast PTR lookup against the configured DNS server.
    async fn reverse_lookup(&self, addr: Ipv4Addr) -> Option<String>;

    /// PTR lookup over multicast DNS (`.local` names).
    async fn multicast_lookup(&self, addr: Ipv4Addr) -> Option<String>;
}

/// Resolver that shells out to `dig`.
#[derive(Debug, Clone)]
pub struct DigResolver {
    program: PathBuf,
    timeout: Duration,
    /// Set once spawning the program failed with `NotFound`; shared by
    /// clones so the whole scan stops trying.
    missing: Arc<AtomicBool>,
}

impl DigResolver {
    pub fn new(timeout: Duration) -> Self {
        Self::with_program("dig", timeout)
    }

    /// Resolver running `program` instead of `dig` from `PATH`.
    pub fn with_program(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            missing: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn query(&self, addr: Ipv4Addr, server: Option<(&str, &str)>) -> Option<String> {
        if self.missing.load(Ordering::Relaxed) {
            return None;
        }
        let mut cmd = Command::new(&self.program);
        if let Some((host, port)) = server {
            cmd.arg(format!("@{host}")).args(["-p", port]);
        }
        cmd.args(["+short", "+time=1", "+tries=1", "-x"])
            .arg(addr.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                if !self.missing.swap(true, Ordering::Relaxed) {
                    debug!(
                        program = %self.program.display(),
                        "resolver not installed, name lookups disabled"
                    );
                }
                return None;
            }
            Ok(Err(e)) => {
                trace!(%addr, error = %e, "name lookup failed to run");
                return None;
            }
            Err(_) => {
                trace!(%addr, "name lookup timed out");
                return None;
            }
        };
        if !output.status.success() {
            return None;
        }
        parse_ptr_answer(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait]
impl NameResolver for DigResolver {
    async fn reverse_lookup(&self, addr: Ipv4Addr) -> Option<String> {
        self.query(addr, None).await
    }

    async fn multicast_lookup(&self, addr: Ipv4Addr) -> Option<String> {
        self.query(addr, Some((MDNS_GROUP, MDNS_PORT))).await
    }
}

/// A resolver that never learns anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

#[async_trait]
impl NameResolver for NoopResolver {
    async fn reverse_lookup(&self, _addr: Ipv4Addr) -> Option<String> {
        None
    }

    async fn multicast_lookup(&self, _addr: Ipv4Addr) -> Option<String> {
        None
    }
}

/// First usable name from `dig +short` output.
///
/// Comment lines (`;; connection timed out`) are skipped and the
/// trailing root dot is removed.
pub(crate) fn parse_ptr_answer(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with(';'))
        .map(|line| line.trim_end_matches('.').to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_answer() {
        assert_eq!(
            parse_ptr_answer("printer.lan.\nalias.lan.\n").as_deref(),
            Some("printer.lan")
        );
    }

    #[tokio::test]
    async fn missing_program_is_a_quiet_miss() {
        let resolver =
            DigResolver::with_program("/nonexistent/netpulse-dig", Duration::from_secs(1));
        let addr = Ipv4Addr::new(192, 168, 1, 20);

        assert_eq!(resolver.reverse_lookup(addr).await, None);
        assert!(resolver.missing.load(Ordering::Relaxed));
        assert_eq!(resolver.clone().multicast_lookup(addr).await, None);
    }

    #[test]
    fn skips_comments_and_blank_output() {
        assert_eq!(
            parse_ptr_answer(";; connection timed out; no servers could be reached\n"),
            None
        );
        assert_eq!(parse_ptr_answer("\n\n"), None);
        assert_eq!(parse_ptr_answer(".\n"), None);
    }
}
