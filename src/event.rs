//! Wafer-map change events.
//!
//! An [`Event`] describes one create/update/delete of a wafer-map file in
//! the wmdb. It is built once per occurrence, delivered, then discarded.

use chrono::NaiveDateTime;

/// Kind of wafer-map change being announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NewWafermap,
    UpdatedWafermap,
    DeletedWafermap,
}

impl EventKind {
    /// Symbolic name carried in the wire document's `type` attribute.
    pub fn wire_name(self) -> &'static str {
        match self {
            EventKind::NewWafermap => "NEW_WAFERMAP_IN_WMDB",
            EventKind::UpdatedWafermap => "UPDATED_WAFERMAP_IN_WMDB",
            EventKind::DeletedWafermap => "DELETED_WAFERMAP_IN_WMDB",
        }
    }
}

/// The wafer-map database where a change originated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wmdb {
    /// Hostname of the wmdb.
    pub host: String,
    /// Port of the wmdb file service.
    pub port: u16,
}

impl Wmdb {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// One wafer-map change occurrence.
///
/// Every field is set at construction; no partial events exist. The
/// rendered document is a pure function of these fields - the timestamp is
/// captured here, not at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    /// Fully qualified hostname of the process raising the event.
    pub sender: String,
    /// Occurrence time, second precision, no timezone.
    pub at: NaiveDateTime,
    pub source: Wmdb,
    /// Absent on events using the legacy schema.
    pub wafermap_type: Option<String>,
    /// Filesystem path of the affected wafer map.
    pub path: String,
}

impl Event {
    pub fn new(
        kind: EventKind,
        sender: impl Into<String>,
        at: NaiveDateTime,
        source: Wmdb,
        wafermap_type: Option<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            sender: sender.into(),
            at,
            source,
            wafermap_type,
            path: path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_wire_names() {
        assert_eq!(EventKind::NewWafermap.wire_name(), "NEW_WAFERMAP_IN_WMDB");
        assert_eq!(
            EventKind::UpdatedWafermap.wire_name(),
            "UPDATED_WAFERMAP_IN_WMDB"
        );
        assert_eq!(
            EventKind::DeletedWafermap.wire_name(),
            "DELETED_WAFERMAP_IN_WMDB"
        );
    }

    #[test]
    fn test_event_construction() {
        let at = NaiveDate::from_ymd_opt(2012, 12, 7)
            .unwrap()
            .and_hms_opt(8, 56, 0)
            .unwrap();
        let event = Event::new(
            EventKind::NewWafermap,
            "sda.sensors.elex.be",
            at,
            Wmdb::new("sda.sensors.elex.be", 6913),
            Some("catmap".to_string()),
            "/mnt/categorymaps/WC_A12345_1.th01",
        );

        assert_eq!(event.source.port, 6913);
        assert_eq!(event.wafermap_type.as_deref(), Some("catmap"));
        assert_eq!(event, event.clone());
    }
}
