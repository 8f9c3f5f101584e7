// ── Domain model ──
//
// Immutable value types produced by the engines and consumed by the
// external collaborators (history store, scan cache, exporters, UI).

pub mod device;
pub mod latency;
pub mod measurement;
pub mod scan;
pub mod throughput;

pub use device::{DeviceType, DiscoveredDevice, FieldSources, PartialDeviceInfo};
pub use latency::LatencySample;
pub use measurement::{InterfaceKind, MeasurementPhase, MeasurementResult, QualityClass};
pub use scan::{ScanReport, ScanResult, SubnetPrefix};
pub use throughput::{ThroughputSample, rate_mbps};

pub use netpulse_api::{ProbeErrorKind, ProbeOutcome};
