// ── HTTP banner inspection ──
//
// Pure extraction of identity hints from what a device's web server says
// about itself: headers, the auth realm, the page title and body text.

use netpulse_api::HttpBanner;

use crate::classify::{device_type_from_text, manufacturer_from_text};
use crate::model::{DeviceType, FieldSources, PartialDeviceInfo};

/// Titles that say nothing about the device.
const GENERIC_TITLES: &[&str] = &[
    "index",
    "index of",
    "home",
    "login",
    "log in",
    "sign in",
    "welcome",
    "redirect",
    "redirecting",
    "loading",
    "untitled",
    "document",
    "400 bad request",
    "401 unauthorized",
    "403 forbidden",
    "404 not found",
    "500 internal server error",
    "it works!",
    "welcome to nginx!",
];

/// Server headers that name generic web stacks, not devices.
const GENERIC_SERVERS: &[&str] = &[
    "nginx", "apache", "lighttpd", "httpd", "microsoft-iis", "caddy", "openresty",
];

/// Pull identity hints out of an HTTP banner.
pub fn inspect_banner(banner: &HttpBanner) -> PartialDeviceInfo {
    let title = extract_title(&banner.body);
    let realm = banner.header("www-authenticate").and_then(auth_realm);
    let server = banner.header("server").filter(|s| !is_generic_server(s));
    let powered_by = banner.header("x-powered-by");

    // Strongest signals first; body text only as a last resort.
    let signals: Vec<&str> = [title.as_deref(), realm.as_deref(), server, powered_by]
        .into_iter()
        .flatten()
        .collect();
    let headline = signals.join(" ");

    let mut device_type = device_type_from_text(&headline);
    if device_type == DeviceType::Unknown {
        device_type = device_type_from_text(&banner.body);
    }
    let manufacturer =
        manufacturer_from_text(&headline).or_else(|| manufacturer_from_text(&banner.body));

    let name = title
        .filter(|t| !is_generic_title(t))
        .or_else(|| realm.filter(|r| !is_generic_title(r)));

    PartialDeviceInfo {
        name,
        device_type,
        manufacturer: manufacturer.map(str::to_string),
        sources: FieldSources::default(),
    }
}

/// Text of the first `<title>` element, whitespace-collapsed and with the
/// common entities decoded.
pub fn extract_title(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let content_start = open + lower[open..].find('>')? + 1;
    let content_end = content_start + lower[content_start..].find("</title")?;
    let raw = html.get(content_start..content_end)?;

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let decoded = decode_entities(&collapsed);
    (!decoded.is_empty()).then_some(decoded)
}

/// `realm="..."` from a `WWW-Authenticate` header.
fn auth_realm(header: &str) -> Option<String> {
    let lower = header.to_ascii_lowercase();
    let start = lower.find("realm=")? + "realm=".len();
    let rest = header.get(start..)?;
    let realm = match rest.strip_prefix('"') {
        Some(quoted) => quoted.split('"').next()?,
        None => rest.split([',', ' ']).next()?,
    };
    let realm = realm.trim();
    (!realm.is_empty()).then(|| realm.to_string())
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

fn is_generic_title(title: &str) -> bool {
    let lower = title.trim().to_ascii_lowercase();
    lower.is_empty() || GENERIC_TITLES.contains(&lower.as_str())
}

fn is_generic_server(server: &str) -> bool {
    let lower = server.to_ascii_lowercase();
    GENERIC_SERVERS.iter().any(|g| lower.starts_with(g))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn banner(headers: &[(&str, &str)], body: &str) -> HttpBanner {
        HttpBanner {
            status: 200,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), (*v).to_string()))
                .collect(),
            body: body.to_string(),
        }
    }

    #[test]
    fn title_is_extracted_and_decoded() {
        let html = "<html><head><TITLE>\n  Tom &amp; Jerry's   NAS </TITLE></head>";
        assert_eq!(extract_title(html).as_deref(), Some("Tom & Jerry's NAS"));
        assert_eq!(extract_title("<html><body>no title</body>"), None);
        assert_eq!(extract_title("<title></title>"), None);
    }

    #[test]
    fn printer_identified_from_title() {
        let info = inspect_banner(&banner(
            &[("Server", "HP HTTP Server; HP LaserJet Pro M404")],
            "<title>HP LaserJet Pro M404dn</title>",
        ));
        assert_eq!(info.device_type, DeviceType::Printer);
        assert_eq!(info.manufacturer.as_deref(), Some("HP"));
        assert_eq!(info.name.as_deref(), Some("HP LaserJet Pro M404dn"));
    }

    #[test]
    fn router_identified_from_realm() {
        let info = inspect_banner(&banner(
            &[("WWW-Authenticate", "Basic realm=\"NETGEAR R7000 router\"")],
            "",
        ));
        assert_eq!(info.device_type, DeviceType::Router);
        assert_eq!(info.manufacturer.as_deref(), Some("Netgear"));
        assert_eq!(info.name.as_deref(), Some("NETGEAR R7000 router"));
    }

    #[test]
    fn generic_pages_yield_nothing() {
        let info = inspect_banner(&banner(
            &[("Server", "nginx/1.25.3")],
            "<title>Welcome to nginx!</title>",
        ));
        assert!(info.is_empty());
    }

    #[test]
    fn body_keywords_are_a_fallback() {
        let info = inspect_banner(&banner(
            &[],
            "<title>Login</title><script src=\"/webman/synology.js\"></script>",
        ));
        assert_eq!(info.device_type, DeviceType::Nas);
        assert_eq!(info.manufacturer.as_deref(), Some("Synology"));
        assert_eq!(info.name, None);
    }
}
