// ── Local network detection ──
//
// Finds the machine's outbound IPv4 address and the kind of interface
// carrying the default route. The UDP "connect" only selects a route; no
// packet is sent.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{InterfaceKind, SubnetPrefix};

/// Any routable address works; it is never contacted.
const ROUTE_PROBE_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 80);

/// The machine running the scan, as seen on its LAN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNetwork {
    pub address: Ipv4Addr,
    pub prefix: SubnetPrefix,
    pub hostname: Option<String>,
}

impl LocalNetwork {
    pub fn new(address: Ipv4Addr, hostname: Option<String>) -> Self {
        Self {
            address,
            prefix: SubnetPrefix::of(address),
            hostname,
        }
    }

    /// Detect the outbound IPv4 address and derive its /24 prefix.
    pub async fn detect() -> Result<Self, CoreError> {
        let address = outbound_ipv4().await?;
        let hostname = local_hostname().await;
        debug!(%address, ?hostname, "detected local network");
        Ok(Self::new(address, hostname))
    }
}

async fn outbound_ipv4() -> Result<Ipv4Addr, CoreError> {
    let no_network = |reason: String| CoreError::NoLocalNetwork { reason };

    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .map_err(|e| no_network(format!("cannot open socket: {e}")))?;
    socket
        .connect(ROUTE_PROBE_ADDR)
        .await
        .map_err(|e| no_network(format!("no IPv4 route: {e}")))?;
    let local = socket
        .local_addr()
        .map_err(|e| no_network(format!("no local address: {e}")))?;

    match local.ip() {
        IpAddr::V4(ip) if !ip.is_unspecified() && !ip.is_loopback() => Ok(ip),
        other => Err(no_network(format!("unusable local address {other}"))),
    }
}

async fn local_hostname() -> Option<String> {
    let from_file = tokio::fs::read_to_string("/etc/hostname")
        .await
        .ok()
        .map(|s| s.trim().to_string());
    from_file
        .or_else(|| std::env::var("HOSTNAME").ok())
        .or_else(|| std::env::var("COMPUTERNAME").ok())
        .filter(|name| !name.is_empty())
}

// ── Network monitor ─────────────────────────────────────────────────

/// Reports whether a usable network exists and what carries it.
#[async_trait]
pub trait NetworkMonitor: Send + Sync {
    /// `None` when there is no usable interface.
    async fn current_interface(&self) -> Option<InterfaceKind>;
}

/// Monitor backed by the host's routing table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNetworkMonitor;

#[async_trait]
impl NetworkMonitor for SystemNetworkMonitor {
    async fn current_interface(&self) -> Option<InterfaceKind> {
        outbound_ipv4().await.ok()?;
        let Some(name) = default_route_interface().await else {
            return Some(InterfaceKind::Unknown);
        };
        let wireless = tokio::fs::try_exists(format!("/sys/class/net/{name}/wireless"))
            .await
            .unwrap_or(false);
        if wireless {
            return Some(InterfaceKind::Wifi);
        }
        Some(interface_kind_from_name(&name))
    }
}

/// A monitor that always answers the same thing.
#[derive(Debug, Clone, Copy)]
pub struct StaticNetworkMonitor(pub Option<InterfaceKind>);

#[async_trait]
impl NetworkMonitor for StaticNetworkMonitor {
    async fn current_interface(&self) -> Option<InterfaceKind> {
        self.0
    }
}

/// Interface holding the default route, from `/proc/net/route`.
async fn default_route_interface() -> Option<String> {
    let table = tokio::fs::read_to_string("/proc/net/route").await.ok()?;
    parse_default_route(&table)
}

fn parse_default_route(table: &str) -> Option<String> {
    table.lines().skip(1).find_map(|line| {
        let mut fields = line.split_whitespace();
        let iface = fields.next()?;
        let destination = fields.next()?;
        (destination == "00000000").then(|| iface.to_string())
    })
}

/// Guess the interface kind from conventional interface names.
pub fn interface_kind_from_name(name: &str) -> InterfaceKind {
    const PREFIXES: &[(&str, InterfaceKind)] = &[
        ("wlan", InterfaceKind::Wifi),
        ("wlp", InterfaceKind::Wifi),
        ("wl", InterfaceKind::Wifi),
        ("wwan", InterfaceKind::Cellular),
        ("rmnet", InterfaceKind::Cellular),
        ("ppp", InterfaceKind::Cellular),
        ("pdp_ip", InterfaceKind::Cellular),
        ("tun", InterfaceKind::Vpn),
        ("tap", InterfaceKind::Vpn),
        ("utun", InterfaceKind::Vpn),
        ("wg", InterfaceKind::Vpn),
        ("tailscale", InterfaceKind::Vpn),
        ("eth", InterfaceKind::Ethernet),
        ("enp", InterfaceKind::Ethernet),
        ("eno", InterfaceKind::Ethernet),
        ("ens", InterfaceKind::Ethernet),
        ("en", InterfaceKind::Ethernet),
    ];
    PREFIXES
        .iter()
        .find(|(prefix, _)| name.starts_with(prefix))
        .map_or(InterfaceKind::Unknown, |(_, kind)| *kind)
}
