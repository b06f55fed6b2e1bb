//! Common utilities shared across modules.

use chrono::{DateTime, TimeZone, Utc};
use std::time::SystemTime;

/// Converts a file's `SystemTime` mtime into the canonical on-write
/// timestamp format (RFC 3339 / ISO-8601 UTC).
pub fn mtime_to_utc(mtime: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(mtime)
}

/// Parses a timestamp previously written by this crate. Accepts RFC 3339
/// (the canonical format) and, as the one tolerated legacy format, a bare
/// Unix-epoch integer (seconds).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    raw.trim().parse::<i64>().ok().and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

pub fn get_utc_timestamp() -> u64 {
    Utc::now().timestamp() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_utc_timestamp_is_recent() {
        let ts = get_utc_timestamp();
        assert!(ts > 1577836800, "timestamp should be after 2020-01-01");
    }

    #[test]
    fn parses_rfc3339_timestamps() {
        let parsed = parse_timestamp("2024-03-01T12:30:00Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-01T12:30:00+00:00");
    }

    #[test]
    fn falls_back_to_legacy_unix_epoch_integers() {
        let parsed = parse_timestamp("1700000000").unwrap();
        assert_eq!(parsed.timestamp(), 1700000000);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("not-a-timestamp").is_none());
    }
}
