// ── Measurement domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Coarse quality bucket derived from download throughput.
///
/// Variants are ordered worst to best so the derived `Ord` matches
/// quality ordering.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QualityClass {
    Poor,
    Fair,
    Good,
    Excellent,
}

/// Kind of network interface carrying the default route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum InterfaceKind {
    Wifi,
    Cellular,
    Ethernet,
    Vpn,
    Unknown,
}

/// Stage of the measurement state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementPhase {
    Idle,
    Connecting,
    Ping,
    Download,
    Upload,
    Complete,
    Error,
}

impl MeasurementPhase {
    /// A run is in progress and can be cancelled.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::Ping | Self::Download | Self::Upload
        )
    }

    /// The run has ended, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// One completed measurement run. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub ping_ms: f64,
    pub jitter_ms: f64,
    pub connection_type: String,
    pub server_label: String,
    pub quality: QualityClass,
}
