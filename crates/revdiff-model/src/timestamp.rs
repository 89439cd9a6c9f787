//! Review-server timestamp codec.
//!
//! The server encodes instants as `YYYY-MM-DD hh:mm:ss.fffffffff` in UTC.
//! RFC 3339 is accepted on read so values written by other tools still load.
//! Use with `#[serde(with = "crate::timestamp")]`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

use crate::error::ModelError;

const PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

pub fn parse(raw: &str) -> Result<DateTime<Utc>, ModelError> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, PARSE_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ModelError::InvalidTimestamp(raw.to_string()))
}

pub fn format(ts: &DateTime<Utc>) -> String {
    ts.format(WRITE_FORMAT).to_string()
}

pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(ts))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_server_format() {
        let ts = parse("2013-02-26 15:40:43.986000000").unwrap();
        assert_eq!(ts.year(), 2013);
        assert_eq!(ts.hour(), 15);
        assert_eq!(ts.timestamp_subsec_millis(), 986);
    }

    #[test]
    fn test_parse_rfc3339_fallback() {
        let ts = parse("2024-05-01T10:00:00Z").unwrap();
        assert_eq!(ts.month(), 5);
    }

    #[test]
    fn test_format_is_parseable() {
        let ts = parse("2020-01-02 03:04:05.000000007").unwrap();
        assert_eq!(parse(&format(&ts)).unwrap(), ts);
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(
            parse("yesterday"),
            Err(ModelError::InvalidTimestamp("yesterday".into()))
        );
    }
}
