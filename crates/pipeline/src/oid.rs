//! Deterministic operation ids.
//!
//! `YYYYMMDD-NNNNN` from the ingest date and the source message sequence, so
//! redelivery of the same logical message always lands on the same oid, and
//! every sink can key on it.

use common::models::SignalEvent;

pub fn derive_oid(event: &SignalEvent) -> Option<String> {
    let ts = event.ts_ingest.or(event.ts_utc)?;
    let seq = event.msg_id.rem_euclid(100_000);
    Some(format!("{}-{:05}", ts.format("%Y%m%d"), seq))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::models::EventKind;

    fn event(msg_id: i64, revision: i64) -> SignalEvent {
        SignalEvent {
            kind: EventKind::New,
            channel_id: "100".to_string(),
            channel_username: None,
            channel_title: None,
            msg_id,
            revision,
            ts_utc: None,
            sender_id: None,
            text: "x".to_string(),
            ts_ingest: Some(Utc.with_ymd_and_hms(2026, 8, 7, 10, 30, 0).unwrap()),
        }
    }

    #[test]
    fn same_logical_message_maps_to_the_same_oid() {
        assert_eq!(derive_oid(&event(55, 1)), derive_oid(&event(55, 2)));
        assert_eq!(derive_oid(&event(55, 1)).as_deref(), Some("20260807-00055"));
    }

    #[test]
    fn sequence_wraps_at_five_digits() {
        assert_eq!(
            derive_oid(&event(1_234_567, 1)).as_deref(),
            Some("20260807-34567")
        );
    }

    #[test]
    fn missing_timestamps_yield_no_oid() {
        let mut e = event(55, 1);
        e.ts_ingest = None;
        assert_eq!(derive_oid(&e), None);
    }
}
