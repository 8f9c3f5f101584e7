// ── Classifier ──
//
// Pure mappings from raw measurements and fingerprint text into the
// domain taxonomy. No I/O, no state.

use std::net::Ipv4Addr;

use crate::model::{DeviceType, InterfaceKind, QualityClass};

/// Download rate at or above which a connection is `Excellent`.
pub const EXCELLENT_MBPS: f64 = 50.0;
/// Download rate at or above which a connection is `Good`.
pub const GOOD_MBPS: f64 = 25.0;
/// Download rate at or above which a connection is `Fair`.
pub const FAIR_MBPS: f64 = 10.0;

/// Map a download rate to its quality class. Boundaries belong to the
/// higher class. NaN and negative rates are `Poor`.
pub fn classify(download_mbps: f64) -> QualityClass {
    if download_mbps >= EXCELLENT_MBPS {
        QualityClass::Excellent
    } else if download_mbps >= GOOD_MBPS {
        QualityClass::Good
    } else if download_mbps >= FAIR_MBPS {
        QualityClass::Fair
    } else {
        QualityClass::Poor
    }
}

/// Human-readable label for the interface carrying the measurement.
pub fn connection_type_label(kind: InterfaceKind) -> &'static str {
    match kind {
        InterfaceKind::Wifi => "Wi-Fi",
        InterfaceKind::Cellular => "Cellular",
        InterfaceKind::Ethernet => "Ethernet",
        InterfaceKind::Vpn => "VPN",
        InterfaceKind::Unknown => "Unknown",
    }
}

// ── Device keyword tables ───────────────────────────────────────────
//
// Matched against lowercased host names, HTTP headers, page titles and
// body text. Earlier entries win, so more specific keywords come first.

const TYPE_KEYWORDS: &[(&str, DeviceType)] = &[
    ("access point", DeviceType::AccessPoint),
    ("unifi ap", DeviceType::AccessPoint),
    ("router", DeviceType::Router),
    ("gateway", DeviceType::Router),
    ("openwrt", DeviceType::Router),
    ("luci", DeviceType::Router),
    ("dd-wrt", DeviceType::Router),
    ("mikrotik", DeviceType::Router),
    ("routeros", DeviceType::Router),
    ("fritz!box", DeviceType::Router),
    ("fritzbox", DeviceType::Router),
    ("pfsense", DeviceType::Router),
    ("opnsense", DeviceType::Router),
    ("modem", DeviceType::Router),
    ("printer", DeviceType::Printer),
    ("laserjet", DeviceType::Printer),
    ("officejet", DeviceType::Printer),
    ("deskjet", DeviceType::Printer),
    ("pixma", DeviceType::Printer),
    ("ipp", DeviceType::Printer),
    ("cups", DeviceType::Printer),
    ("synology", DeviceType::Nas),
    ("diskstation", DeviceType::Nas),
    ("qnap", DeviceType::Nas),
    ("truenas", DeviceType::Nas),
    ("freenas", DeviceType::Nas),
    ("readynas", DeviceType::Nas),
    ("nas", DeviceType::Nas),
    ("smart tv", DeviceType::SmartTv),
    ("smarttv", DeviceType::SmartTv),
    ("bravia", DeviceType::SmartTv),
    ("webos", DeviceType::SmartTv),
    ("tizen", DeviceType::SmartTv),
    ("roku", DeviceType::MediaPlayer),
    ("chromecast", DeviceType::MediaPlayer),
    ("apple tv", DeviceType::MediaPlayer),
    ("appletv", DeviceType::MediaPlayer),
    ("sonos", DeviceType::MediaPlayer),
    ("plex", DeviceType::MediaPlayer),
    ("kodi", DeviceType::MediaPlayer),
    ("ipcam", DeviceType::Camera),
    ("camera", DeviceType::Camera),
    ("hikvision", DeviceType::Camera),
    ("dahua", DeviceType::Camera),
    ("axis", DeviceType::Camera),
    ("playstation", DeviceType::GameConsole),
    ("xbox", DeviceType::GameConsole),
    ("nintendo", DeviceType::GameConsole),
    ("ipad", DeviceType::Tablet),
    ("tablet", DeviceType::Tablet),
    ("iphone", DeviceType::Mobile),
    ("android", DeviceType::Mobile),
    ("galaxy", DeviceType::Mobile),
    ("pixel", DeviceType::Mobile),
    ("home assistant", DeviceType::IotDevice),
    ("hue bridge", DeviceType::IotDevice),
    ("philips hue", DeviceType::IotDevice),
    ("shelly", DeviceType::IotDevice),
    ("tasmota", DeviceType::IotDevice),
    ("esphome", DeviceType::IotDevice),
    ("esp32", DeviceType::IotDevice),
    ("esp8266", DeviceType::IotDevice),
    ("thermostat", DeviceType::IotDevice),
    ("macbook", DeviceType::Computer),
    ("imac", DeviceType::Computer),
    ("desktop", DeviceType::Computer),
    ("laptop", DeviceType::Computer),
    ("workstation", DeviceType::Computer),
    ("raspberrypi", DeviceType::Server),
    ("raspberry pi", DeviceType::Server),
    ("proxmox", DeviceType::Server),
    ("esxi", DeviceType::Server),
    ("server", DeviceType::Server),
];

const MANUFACTURER_KEYWORDS: &[(&str, &str)] = &[
    ("ubiquiti", "Ubiquiti"),
    ("unifi", "Ubiquiti"),
    ("netgear", "Netgear"),
    ("readynas", "Netgear"),
    ("tp-link", "TP-Link"),
    ("tplink", "TP-Link"),
    ("asus", "ASUS"),
    ("linksys", "Linksys"),
    ("d-link", "D-Link"),
    ("mikrotik", "MikroTik"),
    ("routeros", "MikroTik"),
    ("fritz", "AVM"),
    ("cisco", "Cisco"),
    ("huawei", "Huawei"),
    ("zyxel", "Zyxel"),
    ("synology", "Synology"),
    ("diskstation", "Synology"),
    ("qnap", "QNAP"),
    ("laserjet", "HP"),
    ("officejet", "HP"),
    ("deskjet", "HP"),
    ("hewlett", "HP"),
    ("epson", "Epson"),
    ("canon", "Canon"),
    ("pixma", "Canon"),
    ("brother", "Brother"),
    ("xerox", "Xerox"),
    ("bravia", "Sony"),
    ("playstation", "Sony"),
    ("sony", "Sony"),
    ("samsung", "Samsung"),
    ("galaxy", "Samsung"),
    ("tizen", "Samsung"),
    ("webos", "LG"),
    ("roku", "Roku"),
    ("sonos", "Sonos"),
    ("chromecast", "Google"),
    ("pixel", "Google"),
    ("iphone", "Apple"),
    ("ipad", "Apple"),
    ("macbook", "Apple"),
    ("imac", "Apple"),
    ("apple", "Apple"),
    ("xbox", "Microsoft"),
    ("nintendo", "Nintendo"),
    ("hikvision", "Hikvision"),
    ("dahua", "Dahua"),
    ("axis", "Axis"),
    ("philips hue", "Signify"),
    ("hue bridge", "Signify"),
    ("shelly", "Shelly"),
    ("espressif", "Espressif"),
    ("esp32", "Espressif"),
    ("esp8266", "Espressif"),
    ("raspberry", "Raspberry Pi"),
];

fn first_match<'a, T: Copy>(table: &'a [(&'a str, T)], text: &str) -> Option<T> {
    let text = text.to_ascii_lowercase();
    table
        .iter()
        .find(|(needle, _)| contains_word(&text, needle))
        .map(|(_, value)| *value)
}

/// `needle` occurs in `haystack` and is not glued to other letters, so
/// "nas" does not match "canasta" but does match "home-nas-01".
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        let boundary = |c: Option<char>| c.is_none_or(|c| !c.is_ascii_alphabetic());
        boundary(before) && boundary(after)
    })
}

/// Guess a device type from free text (hostname, banner, page title).
pub fn device_type_from_text(text: &str) -> DeviceType {
    first_match(TYPE_KEYWORDS, text).unwrap_or_default()
}

/// Guess a manufacturer from free text.
pub fn manufacturer_from_text(text: &str) -> Option<&'static str> {
    first_match(MANUFACTURER_KEYWORDS, text)
}

// ── Address heuristics ──────────────────────────────────────────────

/// Well-known gateway suffixes.
pub const GATEWAY_SUFFIXES: [u8; 2] = [1, 254];
/// Highest suffix treated as infrastructure (routers, switches, APs).
pub const INFRA_MAX_SUFFIX: u8 = 19;
/// Highest suffix treated as a statically addressed workstation.
pub const WORKSTATION_MAX_SUFFIX: u8 = 99;

/// Last-resort guess keyed on the final octet. Always produces a type
/// and a non-empty label.
pub fn heuristic_for_address(addr: Ipv4Addr) -> (DeviceType, String) {
    let suffix = addr.octets()[3];
    if GATEWAY_SUFFIXES.contains(&suffix) {
        (DeviceType::Router, format!("Gateway (.{suffix})"))
    } else if suffix <= INFRA_MAX_SUFFIX {
        (DeviceType::Router, format!("Network device (.{suffix})"))
    } else if suffix <= WORKSTATION_MAX_SUFFIX {
        (DeviceType::Computer, format!("Workstation (.{suffix})"))
    } else {
        (DeviceType::Mobile, format!("Mobile or IoT device (.{suffix})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_map_to_higher_class() {
        assert_eq!(classify(50.0), QualityClass::Excellent);
        assert_eq!(classify(25.0), QualityClass::Good);
        assert_eq!(classify(10.0), QualityClass::Fair);
    }

    #[test]
    fn just_below_boundaries_map_to_lower_class() {
        assert_eq!(classify(49.999), QualityClass::Good);
        assert_eq!(classify(24.999), QualityClass::Fair);
        assert_eq!(classify(9.999), QualityClass::Poor);
        assert_eq!(classify(0.0), QualityClass::Poor);
    }

    #[test]
    fn forty_mbps_is_good() {
        assert_eq!(classify(40.0), QualityClass::Good);
    }

    #[test]
    fn degenerate_rates_are_poor() {
        assert_eq!(classify(f64::NAN), QualityClass::Poor);
        assert_eq!(classify(-3.0), QualityClass::Poor);
        assert_eq!(classify(f64::INFINITY), QualityClass::Excellent);
    }

    #[test]
    fn classify_is_monotonic() {
        let mut previous = classify(0.0);
        for step in 0..=2_000 {
            let mbps = f64::from(step) * 0.05;
            let current = classify(mbps);
            assert!(current >= previous, "{mbps} Mbps dropped from {previous} to {current}");
            previous = current;
        }
    }

    #[test]
    fn labels_cover_every_interface() {
        assert_eq!(connection_type_label(InterfaceKind::Wifi), "Wi-Fi");
        assert_eq!(connection_type_label(InterfaceKind::Ethernet), "Ethernet");
        assert_eq!(connection_type_label(InterfaceKind::Cellular), "Cellular");
        assert_eq!(connection_type_label(InterfaceKind::Unknown), "Unknown");
    }

    #[test]
    fn keywords_respect_word_boundaries() {
        assert_eq!(device_type_from_text("home-nas-01.lan"), DeviceType::Nas);
        assert_eq!(device_type_from_text("canasta"), DeviceType::Unknown);
        assert_eq!(device_type_from_text("HP LaserJet Pro M404"), DeviceType::Printer);
        assert_eq!(manufacturer_from_text("HP LaserJet Pro M404"), Some("HP"));
    }

    #[test]
    fn specific_keywords_win() {
        assert_eq!(device_type_from_text("Synology DiskStation"), DeviceType::Nas);
        assert_eq!(device_type_from_text("UniFi AP AC Pro"), DeviceType::AccessPoint);
        assert_eq!(manufacturer_from_text("Synology DiskStation"), Some("Synology"));
    }

    #[test]
    fn heuristic_always_labels() {
        for suffix in 1..=254u8 {
            let (kind, label) = heuristic_for_address(Ipv4Addr::new(192, 168, 1, suffix));
            assert_ne!(kind, DeviceType::Unknown);
            assert!(!label.is_empty());
        }
    }

    #[test]
    fn heuristic_ranges() {
        let kind = |s| heuristic_for_address(Ipv4Addr::new(10, 0, 0, s)).0;
        assert_eq!(kind(1), DeviceType::Router);
        assert_eq!(kind(254), DeviceType::Router);
        assert_eq!(kind(10), DeviceType::Router);
        assert_eq!(kind(50), DeviceType::Computer);
        assert_eq!(kind(105), DeviceType::Mobile);
    }
}
