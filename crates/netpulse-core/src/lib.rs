//! Measurement and discovery engines for netpulse.
//!
//! - **[`Orchestrator`]**: Runs one speed measurement through the phase
//!   state machine (`Idle → Connecting → Ping → Download → Upload →
//!   Complete`, or `Error`). Exposes `start()` / `cancel()` and publishes a
//!   [`MeasurementSnapshot`] through a [`Subscription`].
//!
//! - **[`LatencyProber`]** / **[`ThroughputMeter`]**: The phase engines:
//!   sequential latency probes with jitter, streaming download and
//!   fixed-size upload rates.
//!
//! - **[`Scanner`]**: Bounded-concurrency /24 sweep followed by the
//!   fingerprint [`Cascade`] (reverse DNS, mDNS, HTTP banner, address
//!   heuristic) for every reachable host.
//!
//! - **[`classify`]**: Pure mappings into the quality and device
//!   taxonomies.
//!
//! - **Collaborator seams**: [`HistoryStore`], [`ScanCache`],
//!   [`export::to_csv`], [`AlertPolicy`]. The engines never persist or
//!   notify on their own.

pub mod classify;
pub mod config;
pub mod discovery;
pub mod error;
pub mod export;
pub mod history;
pub mod latency;
pub mod local;
pub mod model;
pub mod orchestrator;
pub mod stream;
pub mod throughput;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{AlertPolicy, MeasurementConfig, ScanConfig};
pub use discovery::{
    Cascade, DigResolver, FingerprintStage, NameResolver, ScanCache, ScanProgress, Scanner,
};
pub use error::CoreError;
pub use history::{HistoryStore, MemoryHistory};
pub use latency::LatencyProber;
pub use local::{LocalNetwork, NetworkMonitor, StaticNetworkMonitor, SystemNetworkMonitor};
pub use orchestrator::{MeasurementSnapshot, Orchestrator};
pub use stream::{Subscription, SubscriptionStream};
pub use throughput::{ThroughputMeter, TransferProgress};

pub use model::{
    DeviceType, DiscoveredDevice, InterfaceKind, LatencySample, MeasurementPhase,
    MeasurementResult, PartialDeviceInfo, ProbeErrorKind, ProbeOutcome, QualityClass, ScanReport,
    ScanResult, SubnetPrefix, ThroughputSample,
};
