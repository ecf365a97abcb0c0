//! ⏱️ Datetime extractor — fishes one timestamp out of the `entity` metadata soup.
//!
//! The platform writes `entity.created` as `[{"value": "2025-06-03T10:15:00+02:00"}]`.
//! Sometimes. Other times the list is empty, the key is gone, or the value is a string that
//! only looks like a date if you squint. All of those become `None`. No drama. 🦆

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

use crate::errors::ParseError;

/// 📐 Output format for every timestamp column.
pub(crate) const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// -- 🧭 naive layouts, tried in order after RFC 3339 gives up
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

// -- 🌍 offset layouts RFC 3339 is too strict for (no seconds, `+0200`, space separator)
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

/// 🔍 `entity[key][0]["value"]`, if every step of that path exists.
pub(crate) fn entity_value<'a>(entity: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    entity.get(key)?.as_array()?.first()?.get("value")
}

/// ⏱️ Parse an ISO-8601 timestamp into the wall-clock time it was written in.
///
/// The offset is dropped, not converted: `10:15+02:00` stays `10:15`.
/// A bare date is midnight.
pub(crate) fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, ParseError> {
    let raw = raw.trim();

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Ok(with_offset.naive_local());
    }
    for format in OFFSET_FORMATS {
        if let Ok(with_offset) = DateTime::parse_from_str(raw, format) {
            return Ok(with_offset.naive_local());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ParseError::Timestamp(raw.to_string()))
}

/// ⏱️ Read `entity[key]` and reformat it as `YYYY-MM-DD HH:MM:SS`, or `None`.
pub(crate) fn extract(entity: &Map<String, Value>, key: &str) -> Option<String> {
    let raw = entity_value(entity, key)?.as_str()?;
    parse_timestamp(raw)
        .ok()
        .map(|ts| ts.format(OUTPUT_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn the_one_where_the_offset_is_politely_ignored() {
        let e = entity(json!({"created": [{"value": "2025-06-03T10:15:00+02:00"}]}));
        assert_eq!(extract(&e, "created").as_deref(), Some("2025-06-03 10:15:00"));
    }

    #[test]
    fn the_one_where_every_iso_flavor_is_welcome() {
        let cases = [
            ("2025-06-03T10:15:00Z", "2025-06-03 10:15:00"),
            ("2025-06-03T10:15:00.123456", "2025-06-03 10:15:00"),
            ("2025-06-03 10:15:07", "2025-06-03 10:15:07"),
            ("2025-06-03T10:15", "2025-06-03 10:15:00"),
            ("2025-06-03T10:15:00+0200", "2025-06-03 10:15:00"),
            ("2025-06-03", "2025-06-03 00:00:00"),
        ];
        for (raw, expected) in cases {
            let parsed = parse_timestamp(raw)
                .unwrap_or_else(|err| panic!("💀 {raw} should parse, got {err}"));
            assert_eq!(parsed.format(OUTPUT_FORMAT).to_string(), expected, "input: {raw}");
        }
    }

    #[test]
    fn the_one_where_missing_empty_and_malformed_all_mean_none() {
        let e = entity(json!({
            "empty": [],
            "blank": [{"value": ""}],
            "garbage": [{"value": "last tuesday-ish"}],
            "numeric": [{"value": 1717400000}],
            "no_value_key": [{"target_id": 3}]
        }));
        for key in ["absent", "empty", "blank", "garbage", "numeric", "no_value_key"] {
            assert_eq!(extract(&e, key), None, "key: {key}");
        }
    }

    #[test]
    fn the_one_where_parse_errors_say_what_they_choked_on() {
        assert_eq!(
            parse_timestamp("2025-13-45"),
            Err(ParseError::Timestamp("2025-13-45".to_string()))
        );
    }
}
