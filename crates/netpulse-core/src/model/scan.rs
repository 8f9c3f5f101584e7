// ── Scan results ──

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::device::DiscoveredDevice;
use crate::error::CoreError;

/// First host suffix ever probed. `.0` is the network address.
pub const FIRST_HOST: u8 = 1;
/// Last host suffix ever probed. `.255` is the broadcast address.
pub const LAST_HOST: u8 = 254;

/// The first three octets of a /24 IPv4 subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubnetPrefix([u8; 3]);

impl SubnetPrefix {
    pub const fn new(a: u8, b: u8, c: u8) -> Self {
        Self([a, b, c])
    }

    /// The /24 prefix an address belongs to.
    pub fn of(addr: Ipv4Addr) -> Self {
        let [a, b, c, _] = addr.octets();
        Self([a, b, c])
    }

    pub fn host(self, suffix: u8) -> Ipv4Addr {
        let [a, b, c] = self.0;
        Ipv4Addr::new(a, b, c, suffix)
    }

    /// Every candidate host address, `.1` through `.254`.
    pub fn hosts(self) -> impl Iterator<Item = Ipv4Addr> {
        (FIRST_HOST..=LAST_HOST).map(move |suffix| self.host(suffix))
    }

    pub fn contains(self, addr: Ipv4Addr) -> bool {
        Self::of(addr) == self
    }
}

impl fmt::Display for SubnetPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{a}.{b}.{c}")
    }
}

impl FromStr for SubnetPrefix {
    type Err = CoreError;

    /// Accepts `192.168.1`, `192.168.1.0` and `192.168.1.0/24`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidSubnet {
            input: s.to_string(),
        };

        let trimmed = s.trim();
        let body = match trimmed.split_once('/') {
            Some((addr, "24")) => addr,
            Some(_) => return Err(invalid()),
            None => trimmed,
        };

        let octets: Vec<&str> = body.split('.').collect();
        let octets = match octets.as_slice() {
            [a, b, c] | [a, b, c, "0"] => [*a, *b, *c],
            _ => return Err(invalid()),
        };

        let mut out = [0u8; 3];
        for (slot, part) in out.iter_mut().zip(octets) {
            *slot = part.parse().map_err(|_| invalid())?;
        }
        Ok(Self(out))
    }
}

impl TryFrom<String> for SubnetPrefix {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SubnetPrefix> for String {
    fn from(value: SubnetPrefix) -> Self {
        value.to_string()
    }
}

/// Immutable snapshot of one subnet scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub scan_timestamp: DateTime<Utc>,
    pub subnet_prefix: SubnetPrefix,
    /// Sorted by address.
    pub devices: Vec<DiscoveredDevice>,
    pub scan_duration: Duration,
}

impl ScanResult {
    pub fn new(
        scan_timestamp: DateTime<Utc>,
        subnet_prefix: SubnetPrefix,
        mut devices: Vec<DiscoveredDevice>,
        scan_duration: Duration,
    ) -> Self {
        devices.sort_by_key(|d| d.address);
        Self {
            scan_timestamp,
            subnet_prefix,
            devices,
            scan_duration,
        }
    }

    /// Age relative to `now`. A timestamp in the future counts as zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.scan_timestamp).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.age(now) <= window
    }
}

/// What a scan hands back: devices found so far plus at most one error.
///
/// A cancelled or timed-out scan still returns its partial result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub result: ScanResult,
    pub error: Option<String>,
}

impl ScanReport {
    pub fn is_partial(&self) -> bool {
        self.error.is_some()
    }
}
