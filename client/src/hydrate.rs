// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Recursively normalizes every ISO-8601 timestamp string in a JSON tree to
/// canonical RFC 3339 UTC form ("2025-01-02T03:04:05.000Z"), in place.
///
/// Every API response and every parsed session snapshot passes through this
/// before reaching a store, so typed deserialization downstream never has to
/// special-case date formats or offsets.
///
/// Idempotent: a canonical value parses and reformats to itself, and
/// non-timestamp strings are left untouched.
pub fn hydrate_dates(value: &mut Value) {
    match value {
        Value::String(s) => {
            if let Some(canonical) = canonicalize_timestamp(s) {
                *s = canonical;
            }
        }
        Value::Array(items) => {
            for item in items {
                hydrate_dates(item);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                hydrate_dates(item);
            }
        }
        _ => {}
    }
}

/// Cheap shape check before the real parse: "YYYY-MM-DDT..." with enough
/// length for a time part. Day-granularity dates ("2025-06-01") are left
/// alone on purpose; they deserialize as plain dates.
fn looks_like_timestamp(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 19
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes[10] == b'T'
        && bytes[..4].iter().all(u8::is_ascii_digit)
}

fn canonicalize_timestamp(s: &str) -> Option<String> {
    if !looks_like_timestamp(s) {
        return None;
    }
    let parsed = DateTime::parse_from_rfc3339(s).ok()?;
    Some(
        parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hydrates_nested_objects_and_arrays() {
        let mut value = json!({
            "createdAt": "2025-01-02T03:04:05+02:00",
            "tasks": [
                { "completedAt": "2025-01-02T03:04:05Z" },
                { "completedAt": null },
            ],
        });
        hydrate_dates(&mut value);
        assert_eq!(value["createdAt"], "2025-01-02T01:04:05.000Z");
        assert_eq!(value["tasks"][0]["completedAt"], "2025-01-02T03:04:05.000Z");
        assert_eq!(value["tasks"][1]["completedAt"], Value::Null);
    }

    #[test]
    fn hydration_is_idempotent() {
        let mut once = json!({
            "a": "2025-01-02T03:04:05.123456789Z",
            "b": { "c": ["2024-12-31T23:59:59-05:00", "plain text"] },
        });
        hydrate_dates(&mut once);
        let mut twice = once.clone();
        hydrate_dates(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn non_date_strings_are_untouched() {
        let mut value = json!({
            "title": "Meet on 2025-01-02T at noon... not really a date",
            "day": "2025-06-01",
            "id": "0123456789abcdef",
            "count": 7,
        });
        let before = value.clone();
        hydrate_dates(&mut value);
        assert_eq!(value, before);
    }
}
