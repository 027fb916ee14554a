//! Wire encoding of events.
//!
//! Renders an [`Event`] into the fixed-schema XML document consumers of the
//! wafer-map topics expect. Attribute order is part of the contract.
//! Consumers strip per-line leading/trailing whitespace before comparing,
//! so indentation is free but the line structure is not.

use std::borrow::Cow;
use std::fmt::Write;

use crate::event::Event;

/// Render an event as the notification XML document.
///
/// Pure function of the event's fields; rendering cannot fail. The
/// `wafermaptype` attribute is omitted for events without a wafer-map type
/// (legacy schema).
pub fn to_xml(event: &Event) -> String {
    let mut doc = String::with_capacity(256);
    doc.push_str("<?xml version=\"1.0\"?>\n");
    let _ = writeln!(
        doc,
        "<event type=\"{}\" from=\"{}\" date=\"{}\">",
        event.kind.wire_name(),
        escape_attr(&event.sender),
        event.at.format("%Y-%m-%dT%H:%M:%S"),
    );
    push_attribute(&mut doc, "hostname", &event.source.host);
    push_attribute(&mut doc, "port", &event.source.port.to_string());
    push_attribute(&mut doc, "path", &event.path);
    if let Some(wafermap_type) = &event.wafermap_type {
        push_attribute(&mut doc, "wafermaptype", wafermap_type);
    }
    doc.push_str("</event>");
    doc
}

fn push_attribute(doc: &mut String, key: &str, value: &str) {
    let _ = writeln!(
        doc,
        "  <attribute key=\"{}\" value=\"{}\" />",
        key,
        escape_attr(value)
    );
}

/// Escape the XML attribute-value specials.
///
/// Returns the input untouched when nothing needs escaping; existing
/// consumers compare documents byte-for-byte.
fn escape_attr(value: &str) -> Cow<'_, str> {
    if !value.chars().any(|c| matches!(c, '&' | '<' | '>' | '"')) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, Wmdb};
    use chrono::NaiveDate;

    fn make_event(wafermap_type: Option<&str>) -> Event {
        let at = NaiveDate::from_ymd_opt(2012, 12, 7)
            .unwrap()
            .and_hms_opt(8, 56, 0)
            .unwrap();
        Event::new(
            EventKind::NewWafermap,
            "sda.sensors.elex.be",
            at,
            Wmdb::new("sda.sensors.elex.be", 6913),
            wafermap_type.map(str::to_string),
            "/mnt/categorymaps/WC_A12345_1.th01",
        )
    }

    fn normalize(doc: &str) -> String {
        doc.lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_render_extended_schema() {
        let expected = "<?xml version=\"1.0\"?>\n\
            <event type=\"NEW_WAFERMAP_IN_WMDB\" from=\"sda.sensors.elex.be\" date=\"2012-12-07T08:56:00\">\n\
            <attribute key=\"hostname\" value=\"sda.sensors.elex.be\" />\n\
            <attribute key=\"port\" value=\"6913\" />\n\
            <attribute key=\"path\" value=\"/mnt/categorymaps/WC_A12345_1.th01\" />\n\
            <attribute key=\"wafermaptype\" value=\"catmap\" />\n\
            </event>";

        assert_eq!(normalize(&to_xml(&make_event(Some("catmap")))), expected);
    }

    #[test]
    fn test_render_legacy_schema_omits_wafermaptype() {
        let doc = to_xml(&make_event(None));
        assert!(!doc.contains("wafermaptype"));
        assert!(doc.contains("<attribute key=\"path\""));
        assert!(doc.trim_end().ends_with("</event>"));
    }

    #[test]
    fn test_render_is_pure() {
        let event = make_event(Some("catmap"));
        assert_eq!(to_xml(&event), to_xml(&event.clone()));
    }

    #[test]
    fn test_port_renders_as_plain_decimal() {
        for port in [0u16, 7, 80, 6913, 61613, u16::MAX] {
            let mut event = make_event(Some("catmap"));
            event.source.port = port;
            let doc = to_xml(&event);
            assert!(doc.contains(&format!("key=\"port\" value=\"{}\"", port)));
        }
    }

    #[test]
    fn test_attribute_escaping_only_touches_specials() {
        let mut event = make_event(Some("catmap"));
        event.path = "/maps/a&b<c>.th01".to_string();
        let doc = to_xml(&event);
        assert!(doc.contains("value=\"/maps/a&amp;b&lt;c&gt;.th01\""));

        // Clean inputs pass through byte-for-byte.
        assert!(matches!(escape_attr("/mnt/maps/x.th01"), Cow::Borrowed(_)));
    }
}
