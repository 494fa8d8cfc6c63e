//! Timestamp formatting shared by the wire protocol and both stores.
//!
//! Every timestamp is serialized as ISO-8601 UTC with millisecond precision
//! (`2026-02-13T15:30:00.000Z`). Keeping the precision fixed means the
//! lexicographic order of stored strings agrees with chronological order,
//! which the cursor queries rely on.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp in the canonical wire/storage form.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 timestamp. Accepts any RFC 3339 precision/offset and
/// normalizes to UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// Serde adapter serializing a `DateTime<Utc>` in the canonical form.
pub mod iso_millis {
    use super::{DateTime, Utc, format_timestamp, parse_timestamp};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Serialize as an ISO-8601 millisecond-precision string.
    pub fn serialize<S: Serializer>(
        timestamp: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(timestamp))
    }

    /// Deserialize from any RFC 3339 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_timestamp(&s).map_err(D::Error::custom)
    }
}

/// Serde adapter for `Option<DateTime<Utc>>` in the canonical form.
pub mod iso_millis_opt {
    use super::{DateTime, Utc, format_timestamp, parse_timestamp};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Serialize `Some` as an ISO-8601 string, `None` as null.
    pub fn serialize<S: Serializer>(
        timestamp: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match timestamp {
            Some(ts) => serializer.serialize_some(&format_timestamp(ts)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize from an optional RFC 3339 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| parse_timestamp(&s).map_err(D::Error::custom))
            .transpose()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_has_millisecond_precision() {
        let ts = Utc.with_ymd_and_hms(2026, 2, 13, 15, 30, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2026-02-13T15:30:00.000Z");
    }

    #[test]
    fn parse_roundtrip() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 42).unwrap();
        let parsed = parse_timestamp(&format_timestamp(&ts)).unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn parse_accepts_offset_timestamps() {
        let parsed = parse_timestamp("2026-02-13T16:30:00+01:00").unwrap();
        assert_eq!(format_timestamp(&parsed), "2026-02-13T15:30:00.000Z");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_timestamp("not a timestamp").is_err());
    }

    #[test]
    fn lexicographic_order_matches_chronological() {
        let earlier = Utc.with_ymd_and_hms(2026, 2, 13, 15, 30, 0).unwrap();
        let later = earlier + chrono::Duration::milliseconds(1);
        assert!(format_timestamp(&earlier) < format_timestamp(&later));
    }
}
