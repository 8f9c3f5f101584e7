// ── Discovered device types ──

use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Device category guessed by the fingerprint cascade.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "title_case")]
#[non_exhaustive]
pub enum DeviceType {
    #[default]
    Unknown,
    Router,
    AccessPoint,
    Computer,
    Server,
    Mobile,
    Tablet,
    Printer,
    Nas,
    SmartTv,
    MediaPlayer,
    Camera,
    GameConsole,
    IotDevice,
}

/// Stage that filled each field of a [`PartialDeviceInfo`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldSources {
    pub name: Option<&'static str>,
    pub device_type: Option<&'static str>,
    pub manufacturer: Option<&'static str>,
}

impl FieldSources {
    /// Distinct contributing stages, in name, type, manufacturer order.
    pub fn stages(&self) -> Vec<&'static str> {
        let mut stages = Vec::new();
        for stage in [self.name, self.device_type, self.manufacturer].into_iter().flatten() {
            if !stages.contains(&stage) {
                stages.push(stage);
            }
        }
        stages
    }
}

/// What one fingerprint stage learned about an address.
///
/// Folding stages left to right only ever fills fields that are still
/// empty, so an earlier, more specific stage is never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialDeviceInfo {
    pub name: Option<String>,
    pub device_type: DeviceType,
    pub manufacturer: Option<String>,
    pub sources: FieldSources,
}

impl PartialDeviceInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Nothing was learned.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.device_type == DeviceType::Unknown
            && self.manufacturer.is_none()
    }

    /// Enough is known to stop the cascade.
    pub fn is_conclusive(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
            || self.device_type != DeviceType::Unknown
    }

    /// Fill still-empty fields from `other`.
    pub fn merge_from(&mut self, other: PartialDeviceInfo, stage: &'static str) {
        if self.name.is_none() {
            if let Some(name) = other.name.filter(|n| !n.trim().is_empty()) {
                self.name = Some(name);
                self.sources.name = Some(stage);
            }
        }
        if self.device_type == DeviceType::Unknown && other.device_type != DeviceType::Unknown {
            self.device_type = other.device_type;
            self.sources.device_type = Some(stage);
        }
        if self.manufacturer.is_none() && other.manufacturer.is_some() {
            self.manufacturer = other.manufacturer;
            self.sources.manufacturer = Some(stage);
        }
    }
}

/// A host found on the local subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub address: Ipv4Addr,
    pub reachable: bool,
    pub response_time: Duration,
    /// Name learned from the network (DNS, mDNS, HTTP), if any.
    pub resolved_name: Option<String>,
    /// Never empty: falls back to a synthesized label.
    pub display_name: String,
    pub device_type: DeviceType,
    pub manufacturer: Option<String>,
    /// The machine running the scan.
    pub is_local: bool,
    /// Fingerprint stages that identified the device, comma-separated.
    pub identified_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_never_overwrites_earlier_values() {
        let mut acc = PartialDeviceInfo::named("nas-01").with_type(DeviceType::Nas);
        acc.merge_from(
            PartialDeviceInfo::named("router")
                .with_type(DeviceType::Router)
                .with_manufacturer("Synology"),
            "http",
        );
        assert_eq!(acc.name.as_deref(), Some("nas-01"));
        assert_eq!(acc.device_type, DeviceType::Nas);
        assert_eq!(acc.manufacturer.as_deref(), Some("Synology"));
        assert_eq!(acc.sources.name, None);
        assert_eq!(acc.sources.device_type, None);
        assert_eq!(acc.sources.manufacturer, Some("http"));
        assert_eq!(acc.sources.stages(), vec!["http"]);
    }

    #[test]
    fn blank_names_do_not_count() {
        let mut acc = PartialDeviceInfo::default();
        acc.merge_from(PartialDeviceInfo::named("   "), "dns");
        assert!(acc.is_empty());
        assert!(!acc.is_conclusive());
        assert!(acc.sources.stages().is_empty());
    }

    #[test]
    fn each_field_remembers_its_stage() {
        let mut acc = PartialDeviceInfo::default();
        acc.merge_from(PartialDeviceInfo::default().with_manufacturer("Synology"), "http");
        acc.merge_from(PartialDeviceInfo::named("nas").with_type(DeviceType::Nas), "mdns");
        assert_eq!(
            acc.sources,
            FieldSources {
                name: Some("mdns"),
                device_type: Some("mdns"),
                manufacturer: Some("http"),
            }
        );
        assert_eq!(acc.sources.stages(), vec!["mdns", "http"]);
    }

    #[test]
    fn type_alone_is_conclusive() {
        let info = PartialDeviceInfo::default().with_type(DeviceType::Printer);
        assert!(info.is_conclusive());
    }

    #[test]
    fn device_type_display_is_title_case() {
        assert_eq!(DeviceType::SmartTv.to_string(), "Smart Tv");
        assert_eq!(DeviceType::Router.to_string(), "Router");
    }
}
