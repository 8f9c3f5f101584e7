// ── CSV export ──

use std::fmt::Write as _;

use crate::model::MeasurementResult;

/// Header row of the export format.
pub const CSV_HEADER: &str =
    "Date,Download Speed (Mbps),Upload Speed (Mbps),Ping (ms),Jitter (ms),Connection Type,Quality";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render results as CSV, one row per result, in the order given.
pub fn to_csv(results: &[MeasurementResult]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + results.len() * 80);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for r in results {
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{},{:.2},{:.2},{:.1},{:.1},{},{}",
            r.timestamp.format(DATE_FORMAT),
            r.download_mbps,
            r.upload_mbps,
            r.ping_ms,
            r.jitter_ms,
            escape(&r.connection_type),
            r.quality,
        );
    }
    out
}

/// RFC 4180 quoting: wrap in quotes when needed, double inner quotes.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use super::*;
    use crate::model::QualityClass;

    #[test]
    fn renders_header_and_rows() {
        let result = MeasurementResult {
            id: Uuid::nil(),
            timestamp: Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 5).unwrap(),
            download_mbps: 40.0,
            upload_mbps: 12.346,
            ping_ms: 24.2,
            jitter_ms: 5.5,
            connection_type: "Wi-Fi".into(),
            server_label: "Cloudflare".into(),
            quality: QualityClass::Good,
        };

        let csv = to_csv(&[result]);

        assert_eq!(
            csv,
            format!("{CSV_HEADER}\n2026-05-04 09:30:05,40.00,12.35,24.2,5.5,Wi-Fi,good\n")
        );
    }

    #[test]
    fn empty_export_is_header_only() {
        assert_eq!(to_csv(&[]), format!("{CSV_HEADER}\n"));
    }

    #[test]
    fn fields_with_delimiters_are_quoted() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("Wi-Fi, 5 GHz"), "\"Wi-Fi, 5 GHz\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
