//! Decoding of the loose inbound field map into a typed [`SignalEvent`].
//!
//! Listeners have shipped several spellings of the same fields over time;
//! every alias is resolved here, once, at the boundary. Anything missing the
//! structural minimum (text, channel, message id, ingest timestamp) is a
//! MalformedEvent and gets dead-lettered.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use common::models::{EventKind, SignalEvent};

use crate::error::PipelineError;

fn first_of<'a>(fields: &'a HashMap<String, String>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| fields.get(*name))
        .map(|s| s.as_str())
        .filter(|s| !s.is_empty())
}

fn parse_ts(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

pub fn decode(fields: &HashMap<String, String>) -> Result<SignalEvent, PipelineError> {
    let text = first_of(fields, &["text", "raw", "text/raw"])
        .ok_or_else(|| PipelineError::Malformed("no text field".to_string()))?
        .to_string();

    let channel_id = first_of(fields, &["channel_id", "ch_id", "chat_id", "ch"])
        .ok_or_else(|| PipelineError::Malformed("no channel id field".to_string()))?
        .to_string();

    let msg_id = first_of(fields, &["msg_id"])
        .ok_or_else(|| PipelineError::Malformed("no msg_id field".to_string()))?
        .parse::<i64>()
        .map_err(|_| PipelineError::Malformed("msg_id is not an integer".to_string()))?;

    let ts_ingest = parse_ts(first_of(fields, &["ts_ingest", "ts_redis_ingest"]));
    if ts_ingest.is_none() {
        return Err(PipelineError::Malformed(
            "no parseable ingest timestamp".to_string(),
        ));
    }

    let revision = first_of(fields, &["revision", "rev"])
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(1);

    let kind = match first_of(fields, &["type"]) {
        Some("edit") => EventKind::Edit,
        _ => EventKind::New,
    };

    Ok(SignalEvent {
        kind,
        channel_id,
        channel_username: first_of(fields, &["channel_username", "channel"]).map(str::to_string),
        channel_title: first_of(fields, &["channel_title", "title"]).map(str::to_string),
        msg_id,
        revision,
        ts_utc: parse_ts(first_of(fields, &["ts_utc"])),
        sender_id: first_of(fields, &["sender_id"]).map(str::to_string),
        text,
        ts_ingest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_fields() -> HashMap<String, String> {
        let mut m = HashMap::new();
        m.insert("type".to_string(), "new".to_string());
        m.insert("channel_id".to_string(), "100".to_string());
        m.insert("msg_id".to_string(), "55".to_string());
        m.insert("revision".to_string(), "1".to_string());
        m.insert(
            "ts_ingest".to_string(),
            "2026-08-07T10:00:00.000Z".to_string(),
        );
        m.insert("text".to_string(), "XAUUSD BUY @3814.5".to_string());
        m
    }

    #[test]
    fn decodes_a_complete_event() {
        let event = decode(&base_fields()).unwrap();
        assert_eq!(event.kind, EventKind::New);
        assert_eq!(event.identity(), ("100", 55, 1));
        assert!(event.ts_ingest.is_some());
    }

    #[test]
    fn field_aliases_resolve_at_the_boundary() {
        let mut fields = base_fields();
        fields.remove("text");
        fields.insert("raw".to_string(), "sell gold".to_string());
        fields.remove("channel_id");
        fields.insert("ch_id".to_string(), "-200".to_string());
        fields.remove("ts_ingest");
        fields.insert(
            "ts_redis_ingest".to_string(),
            "2026-08-07T10:00:00+00:00".to_string(),
        );

        let event = decode(&fields).unwrap();
        assert_eq!(event.text, "sell gold");
        assert_eq!(event.channel_id, "-200");
    }

    #[test]
    fn edits_carry_their_revision() {
        let mut fields = base_fields();
        fields.insert("type".to_string(), "edit".to_string());
        fields.insert("revision".to_string(), "3".to_string());
        let event = decode(&fields).unwrap();
        assert_eq!(event.kind, EventKind::Edit);
        assert_eq!(event.revision, 3);
    }

    #[test]
    fn missing_revision_defaults_to_one() {
        let mut fields = base_fields();
        fields.remove("revision");
        assert_eq!(decode(&fields).unwrap().revision, 1);
    }

    #[test]
    fn structural_gaps_are_malformed() {
        for missing in ["text", "channel_id", "msg_id", "ts_ingest"] {
            let mut fields = base_fields();
            fields.remove(missing);
            assert!(
                matches!(decode(&fields), Err(PipelineError::Malformed(_))),
                "expected malformed without {missing}"
            );
        }
    }

    #[test]
    fn non_numeric_msg_id_is_malformed() {
        let mut fields = base_fields();
        fields.insert("msg_id".to_string(), "abc".to_string());
        assert!(matches!(decode(&fields), Err(PipelineError::Malformed(_))));
    }
}
