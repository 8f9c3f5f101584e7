// ── Discovery scanner ──
//
// Probes every host address of a /24 with a bounded worker pool, then
// fingerprints each reachable address through the cascade. Results and
// progress are owned by the single consumer loop in `scan_prefix`, so
// nothing shared is mutated from the workers.

mod banner;
mod cache;
mod cascade;
mod resolver;

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::StreamExt;
use futures_util::stream;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use netpulse_api::{NetProber, ProbeErrorKind, ProbeTarget, Prober, TransferClient, TransportConfig};

pub use banner::{extract_title, inspect_banner};
pub use cache::ScanCache;
pub use cascade::{
    Cascade, FingerprintStage, HeuristicStage, HttpBannerStage, MulticastNameStage,
    ReverseDnsStage, display_name, identified_by,
};
pub use resolver::{DigResolver, NameResolver, NoopResolver};

use crate::classify::heuristic_for_address;
use crate::config::ScanConfig;
use crate::error::CoreError;
use crate::local::LocalNetwork;
use crate::model::{
    DeviceType, DiscoveredDevice, PartialDeviceInfo, ScanReport, ScanResult, SubnetPrefix, scan,
};
use crate::stream::Subscription;

/// Label used for the scanning machine when it has no host name.
const LOCAL_FALLBACK_NAME: &str = "This device";
/// Per-address fingerprint budget, in multiples of the stage timeout.
const IDENTIFY_BUDGET_FACTOR: u32 = 4;

/// Observable scan progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanProgress {
    pub processed: usize,
    pub total: usize,
    pub reachable: usize,
    pub finished: bool,
}

impl ScanProgress {
    /// `processed / total`, `0.0` before a scan starts.
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }
}

/// Scans a local subnet for devices.
pub struct Scanner {
    prober: Arc<dyn Prober>,
    cascade: Cascade,
    config: ScanConfig,
    local: Option<LocalNetwork>,
    progress: watch::Sender<ScanProgress>,
}

impl Scanner {
    pub fn new(prober: Arc<dyn Prober>, cascade: Cascade, config: ScanConfig) -> Self {
        let (progress, _) = watch::channel(ScanProgress::default());
        Self {
            prober,
            cascade,
            config,
            local: None,
            progress,
        }
    }

    /// Scanner wired to real sockets, `dig` and HTTP banner fetches.
    pub fn system(config: ScanConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let mut transport = TransportConfig::lan();
        transport.connect_timeout = config.fingerprint_timeout;
        let http = transport.build_client()?;

        let cascade = Cascade::standard(
            Arc::new(DigResolver::new(config.fingerprint_timeout)),
            TransferClient::with_client(http.clone()),
            config.http_ports.clone(),
            config.fingerprint_timeout,
        );
        Ok(Self::new(Arc::new(NetProber::with_client(http)), cascade, config))
    }

    /// Treat `local` as the scanning machine: it is listed directly and
    /// never probed or fingerprinted.
    pub fn with_local(mut self, local: LocalNetwork) -> Self {
        self.local = Some(local);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn subscribe(&self) -> Subscription<ScanProgress> {
        Subscription::new(self.progress.subscribe())
    }

    pub fn progress(&self) -> ScanProgress {
        *self.progress.borrow()
    }

    /// Scan the subnet the machine is attached to.
    ///
    /// Fails only with [`CoreError::NoLocalNetwork`] when the local
    /// address cannot be determined; everything else is reported inside
    /// the returned [`ScanReport`].
    pub async fn scan_local(&self, cancel: &CancellationToken) -> Result<ScanReport, CoreError> {
        let local = match &self.local {
            Some(local) => local.clone(),
            None => LocalNetwork::detect().await?,
        };
        Ok(self.scan_prefix(local.prefix, Some(&local), cancel).await)
    }

    /// Scan `prefix`. Never fails: a cancelled or timed-out scan returns
    /// the devices found so far together with an error message.
    pub async fn scan(&self, prefix: SubnetPrefix, cancel: &CancellationToken) -> ScanReport {
        self.scan_prefix(prefix, self.local.as_ref(), cancel).await
    }

    async fn scan_prefix(
        &self,
        prefix: SubnetPrefix,
        local: Option<&LocalNetwork>,
        cancel: &CancellationToken,
    ) -> ScanReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let local = local.filter(|l| prefix.contains(l.address));

        let total = usize::from(scan::LAST_HOST - scan::FIRST_HOST) + 1;
        let mut progress = ScanProgress {
            total,
            ..ScanProgress::default()
        };
        let mut devices = Vec::new();

        if let Some(local) = local {
            devices.push(local_device(local));
            progress.processed += 1;
            progress.reachable += 1;
        }
        self.progress.send_replace(progress);

        info!(%prefix, concurrency = self.config.concurrency, "starting subnet scan");

        let local_addr = local.map(|l| l.address);
        let candidates: Vec<Ipv4Addr> = prefix.hosts().filter(|a| Some(*a) != local_addr).collect();

        let scan_cancel = cancel.child_token();
        let mut results = stream::iter(candidates)
            .map(|addr| self.examine(addr))
            .buffer_unordered(self.config.concurrency.max(1));

        let deadline = tokio::time::sleep(self.config.scan_timeout);
        tokio::pin!(deadline);

        let mut error = None;
        loop {
            tokio::select! {
                biased;
                () = scan_cancel.cancelled() => {
                    error = Some(format!(
                        "Scan cancelled after {} of {} addresses",
                        progress.processed, progress.total
                    ));
                    break;
                }
                () = &mut deadline => {
                    scan_cancel.cancel();
                    let timeout = CoreError::Timeout {
                        operation: "Scan".into(),
                        timeout_ms: u64::try_from(self.config.scan_timeout.as_millis())
                            .unwrap_or(u64::MAX),
                    };
                    warn!(%prefix, processed = progress.processed, "{timeout}");
                    error = Some(timeout.to_string());
                    break;
                }
                next = results.next() => {
                    let Some(found) = next else { break };
                    progress.processed += 1;
                    if let Some(device) = found {
                        debug!(
                            address = %device.address,
                            name = %device.display_name,
                            "device found"
                        );
                        progress.reachable += 1;
                        devices.push(device);
                    }
                    self.progress.send_replace(progress);
                }
            }
        }
        // Dropping the pool closes every in-flight probe.
        drop(results);

        progress.finished = true;
        self.progress.send_replace(progress);

        let result = ScanResult::new(started_at, prefix, devices, start.elapsed());
        info!(
            %prefix,
            devices = result.devices.len(),
            elapsed_ms = result.scan_duration.as_millis(),
            partial = error.is_some(),
            "subnet scan finished"
        );
        ScanReport { result, error }
    }

    /// Probe one address and, when it answers, fingerprint it.
    async fn examine(&self, addr: Ipv4Addr) -> Option<DiscoveredDevice> {
        let response_time = self.probe_host(addr).await?;

        let budget = self.config.fingerprint_timeout * IDENTIFY_BUDGET_FACTOR;
        let info = match tokio::time::timeout(budget, self.cascade.identify(addr)).await {
            Ok(info) => info,
            Err(_) => {
                debug!(%addr, "fingerprint budget exhausted");
                let mut info = PartialDeviceInfo::default();
                info.merge_from(
                    PartialDeviceInfo::default().with_type(heuristic_for_address(addr).0),
                    HeuristicStage::NAME,
                );
                info
            }
        };

        let identified_by = identified_by(&info);
        Some(DiscoveredDevice {
            address: addr,
            reachable: true,
            response_time,
            display_name: display_name(&info, addr),
            resolved_name: info.name,
            device_type: info.device_type,
            manufacturer: info.manufacturer,
            is_local: false,
            identified_by,
        })
    }

    /// Try each reachability port in order. A refused connection still
    /// proves the host is up.
    async fn probe_host(&self, addr: Ipv4Addr) -> Option<Duration> {
        for &port in &self.config.reachability_ports {
            let target = ProbeTarget::tcp(SocketAddr::from((addr, port)));
            let outcome = self.prober.probe(&target, self.config.probe_timeout).await;
            if outcome.succeeded || outcome.error_kind == Some(ProbeErrorKind::Refused) {
                return Some(outcome.elapsed);
            }
        }
        None
    }
}

fn local_device(local: &LocalNetwork) -> DiscoveredDevice {
    DiscoveredDevice {
        address: local.address,
        reachable: true,
        response_time: Duration::ZERO,
        resolved_name: local.hostname.clone(),
        display_name: local
            .hostname
            .clone()
            .unwrap_or_else(|| LOCAL_FALLBACK_NAME.to_string()),
        device_type: DeviceType::Computer,
        manufacturer: None,
        is_local: true,
        identified_by: Some("local".into()),
    }
}
