// ── Fingerprint cascade ──
//
// An ordered list of identification stages folded left to right into a
// `PartialDeviceInfo` accumulator. Each stage only fills fields that are
// still empty; the fold stops at the first conclusive answer.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;
use url::Url;

use netpulse_api::{DEFAULT_BANNER_LIMIT, TransferClient};

use super::banner::inspect_banner;
use super::resolver::NameResolver;
use crate::classify::{device_type_from_text, heuristic_for_address, manufacturer_from_text};
use crate::model::{DeviceType, PartialDeviceInfo};

/// One identification strategy.
#[async_trait]
pub trait FingerprintStage: Send + Sync {
    /// Short stable name, recorded as `identified_by`.
    fn name(&self) -> &'static str;

    /// What this stage learned about `addr`, if anything.
    async fn identify(&self, addr: Ipv4Addr) -> Option<PartialDeviceInfo>;
}

/// Ordered fingerprint stages.
#[derive(Clone, Default)]
pub struct Cascade {
    stages: Vec<Arc<dyn FingerprintStage>>,
}

impl Cascade {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reverse DNS, then mDNS, then HTTP banners, then the address
    /// heuristic.
    pub fn standard(
        resolver: Arc<dyn NameResolver>,
        http: TransferClient,
        http_ports: Vec<u16>,
        timeout: Duration,
    ) -> Self {
        Self::new()
            .with_stage(ReverseDnsStage::new(resolver.clone()))
            .with_stage(MulticastNameStage::new(resolver))
            .with_stage(HttpBannerStage::new(http, http_ports, timeout))
            .with_stage(HeuristicStage)
    }

    pub fn with_stage(mut self, stage: impl FingerprintStage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run stages in order until the accumulator is conclusive.
    pub async fn identify(&self, addr: Ipv4Addr) -> PartialDeviceInfo {
        let mut acc = PartialDeviceInfo::default();
        for stage in &self.stages {
            if acc.is_conclusive() {
                break;
            }
            if let Some(info) = stage.identify(addr).await {
                trace!(%addr, stage = stage.name(), ?info, "fingerprint stage");
                acc.merge_from(info, stage.name());
            }
        }
        acc
    }
}

/// Label shown for a device. Never empty.
pub fn display_name(info: &PartialDeviceInfo, addr: Ipv4Addr) -> String {
    if let Some(name) = info.name.as_deref().filter(|n| !n.trim().is_empty()) {
        return name.to_string();
    }
    let suffix = addr.octets()[3];
    // A type guessed from the address never reads as a known model.
    if info.sources.device_type == Some(HeuristicStage::NAME) {
        return match &info.manufacturer {
            Some(maker) => format!("{maker} device (.{suffix})"),
            None => heuristic_for_address(addr).1,
        };
    }
    if info.device_type == DeviceType::Unknown {
        return heuristic_for_address(addr).1;
    }
    match &info.manufacturer {
        Some(maker) => format!("{maker} {} (.{suffix})", info.device_type),
        None => format!("{} (.{suffix})", info.device_type),
    }
}

/// Stages that contributed to `info`, joined for display. `None` when
/// nothing was learned.
pub fn identified_by(info: &PartialDeviceInfo) -> Option<String> {
    let stages = info.sources.stages();
    (!stages.is_empty()).then(|| stages.join(", "))
}

/// Type and maker hints embedded in a host name.
fn info_from_hostname(name: String) -> PartialDeviceInfo {
    let device_type = device_type_from_text(&name);
    let manufacturer = manufacturer_from_text(&name);
    let mut info = PartialDeviceInfo::named(name).with_type(device_type);
    if let Some(maker) = manufacturer {
        info = info.with_manufacturer(maker);
    }
    info
}

// ── Stages ──────────────────────────────────────────────────────────

pub struct ReverseDnsStage {
    resolver: Arc<dyn NameResolver>,
}

impl ReverseDnsStage {
    pub const NAME: &'static str = "reverse-dns";

    pub fn new(resolver: Arc<dyn NameResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl FingerprintStage for ReverseDnsStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn identify(&self, addr: Ipv4Addr) -> Option<PartialDeviceInfo> {
        self.resolver.reverse_lookup(addr).await.map(info_from_hostname)
    }
}

pub struct MulticastNameStage {
    resolver: Arc<dyn NameResolver>,
}

impl MulticastNameStage {
    pub const NAME: &'static str = "mdns";

    pub fn new(resolver: Arc<dyn NameResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl FingerprintStage for MulticastNameStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn identify(&self, addr: Ipv4Addr) -> Option<PartialDeviceInfo> {
        let name = self.resolver.multicast_lookup(addr).await?;
        let name = name.strip_suffix(".local").map_or(name.clone(), str::to_string);
        Some(info_from_hostname(name))
    }
}

/// Fetches `/` on a fixed list of ports and inspects the first banner
/// that says anything.
pub struct HttpBannerStage {
    client: TransferClient,
    ports: Vec<u16>,
    timeout: Duration,
}

impl HttpBannerStage {
    pub const NAME: &'static str = "http";

    pub fn new(client: TransferClient, ports: Vec<u16>, timeout: Duration) -> Self {
        Self {
            client,
            ports,
            timeout,
        }
    }
}

fn banner_url(addr: Ipv4Addr, port: u16) -> Option<Url> {
    let scheme = if matches!(port, 443 | 8443) { "https" } else { "http" };
    Url::parse(&format!("{scheme}://{addr}:{port}/")).ok()
}

#[async_trait]
impl FingerprintStage for HttpBannerStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn identify(&self, addr: Ipv4Addr) -> Option<PartialDeviceInfo> {
        for &port in &self.ports {
            let Some(url) = banner_url(addr, port) else { continue };
            let fetched = tokio::time::timeout(
                self.timeout,
                self.client.fetch_banner(&url, DEFAULT_BANNER_LIMIT),
            )
            .await;
            let banner = match fetched {
                Ok(Ok(banner)) => banner,
                Ok(Err(e)) => {
                    trace!(%url, error = %e, "no banner");
                    continue;
                }
                Err(_) => {
                    trace!(%url, "banner fetch timed out");
                    continue;
                }
            };
            let info = inspect_banner(&banner);
            if !info.is_empty() {
                return Some(info);
            }
        }
        None
    }
}

/// Last resort keyed on the final octet. Always answers.
pub struct HeuristicStage;

impl HeuristicStage {
    pub const NAME: &'static str = "heuristic";
}

#[async_trait]
impl FingerprintStage for HeuristicStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn identify(&self, addr: Ipv4Addr) -> Option<PartialDeviceInfo> {
        let (device_type, _) = heuristic_for_address(addr);
        Some(PartialDeviceInfo::default().with_type(device_type))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use netpulse_api::TransportConfig;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::discovery::resolver::NoopResolver;

    /// Returns a fixed answer and counts calls.
    struct Fixed {
        name: &'static str,
        answer: Option<PartialDeviceInfo>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl FingerprintStage for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn identify(&self, _addr: Ipv4Addr) -> Option<PartialDeviceInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    fn fixed(name: &'static str, answer: Option<PartialDeviceInfo>) -> (Fixed, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Fixed {
                name,
                answer,
                calls: calls.clone(),
            },
            calls,
        )
    }

    const ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);

    #[tokio::test]
    async fn stops_at_first_conclusive_stage() {
        let (dns, _) = fixed("dns", Some(PartialDeviceInfo::named("router.lan")));
        let (http, http_calls) = fixed("http", Some(PartialDeviceInfo::named("other")));
        let cascade = Cascade::new().with_stage(dns).with_stage(http);

        let info = cascade.identify(ADDR).await;

        assert_eq!(info.name.as_deref(), Some("router.lan"));
        assert_eq!(info.sources.name, Some("dns"));
        assert_eq!(identified_by(&info).as_deref(), Some("dns"));
        assert_eq!(http_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn inconclusive_stages_accumulate() {
        let (dns, _) = fixed("dns", None);
        let (http, _) = fixed(
            "http",
            Some(PartialDeviceInfo::default().with_manufacturer("Synology")),
        );
        let cascade = Cascade::new()
            .with_stage(dns)
            .with_stage(http)
            .with_stage(HeuristicStage);

        let info = cascade.identify(Ipv4Addr::new(192, 168, 1, 50)).await;

        assert_eq!(info.manufacturer.as_deref(), Some("Synology"));
        assert_eq!(info.device_type, DeviceType::Computer);
        assert_eq!(info.sources.manufacturer, Some("http"));
        assert_eq!(info.sources.device_type, Some(HeuristicStage::NAME));
        assert_eq!(identified_by(&info).as_deref(), Some("heuristic, http"));
    }

    #[tokio::test]
    async fn guessed_type_is_not_shown_as_a_known_model() {
        let (http, _) = fixed(
            "http",
            Some(PartialDeviceInfo::default().with_manufacturer("Synology")),
        );
        let cascade = Cascade::new().with_stage(http).with_stage(HeuristicStage);
        let addr = Ipv4Addr::new(192, 168, 1, 50);

        let info = cascade.identify(addr).await;

        assert_eq!(display_name(&info, addr), "Synology device (.50)");
    }

    #[tokio::test]
    async fn heuristic_labels_gateway_as_router() {
        let cascade = Cascade::new().with_stage(HeuristicStage);
        let info = cascade.identify(ADDR).await;
        assert_eq!(info.device_type, DeviceType::Router);
        assert_eq!(display_name(&info, ADDR), "Gateway (.1)");
        assert_eq!(identified_by(&info).as_deref(), Some("heuristic"));
    }

    #[test]
    fn display_name_prefers_resolved_name() {
        let info = PartialDeviceInfo::named("nas-01").with_type(DeviceType::Nas);
        assert_eq!(display_name(&info, ADDR), "nas-01");

        let typed = PartialDeviceInfo::default()
            .with_type(DeviceType::Printer)
            .with_manufacturer("HP");
        assert_eq!(display_name(&typed, Ipv4Addr::new(10, 0, 0, 23)), "HP Printer (.23)");

        assert_eq!(
            display_name(&PartialDeviceInfo::default(), Ipv4Addr::new(10, 0, 0, 150)),
            "Mobile or IoT device (.150)"
        );
    }

    #[test]
    fn hostnames_carry_hints() {
        let info = info_from_hostname("Johns-iPhone.lan".into());
        assert_eq!(info.device_type, DeviceType::Mobile);
        assert_eq!(info.manufacturer.as_deref(), Some("Apple"));
    }

    #[test]
    fn standard_order() {
        let cascade = Cascade::standard(
            Arc::new(NoopResolver),
            TransferClient::new(&TransportConfig::default()).unwrap(),
            vec![80],
            Duration::from_millis(100),
        );
        assert_eq!(cascade.stage_names(), vec!["reverse-dns", "mdns", "http", "heuristic"]);
    }
}
