//! HTTP date parsing and formatting
//!
//! Cache timestamps are kept as epoch milliseconds, so both directions convert
//! straight to and from `i64` rather than `SystemTime`.

use chrono::{DateTime, NaiveDateTime, Utc};

/// HTTP date parsing error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpDateParseError {
    /// Date format was not recognized by any of the supported parsers
    #[error("unrecognized HTTP date format: {0}")]
    UnrecognizedFormat(String),
    /// Date was parsed but falls before the Unix epoch
    #[error("HTTP date before the Unix epoch: {0}")]
    BeforeEpoch(String),
}

/// Parse an HTTP date into epoch milliseconds.
///
/// Accepts the three RFC 7231 forms (IMF-fixdate, RFC 850, asctime) and falls
/// back to RFC 2822 for servers that send numeric zones.
pub fn parse_http_date(date_str: &str) -> Result<i64, HttpDateParseError> {
    let date_str = date_str.trim();

    let timestamp = if let Ok(dt) =
        NaiveDateTime::parse_from_str(date_str, "%a, %d %b %Y %H:%M:%S GMT")
    {
        Some(dt.and_utc().timestamp())
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, "%A, %d-%b-%y %H:%M:%S GMT") {
        Some(dt.and_utc().timestamp())
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, "%a %b %e %H:%M:%S %Y") {
        Some(dt.and_utc().timestamp())
    } else if let Ok(dt) = DateTime::parse_from_rfc2822(date_str) {
        Some(dt.timestamp())
    } else {
        None
    };

    match timestamp {
        Some(secs) if secs >= 0 => Ok(secs * 1000),
        Some(_) => Err(HttpDateParseError::BeforeEpoch(date_str.to_string())),
        None => Err(HttpDateParseError::UnrecognizedFormat(date_str.to_string())),
    }
}

/// Format epoch milliseconds as an IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn format_http_date(epoch_ms: i64) -> String {
    let dt = DateTime::<Utc>::from_timestamp_millis(epoch_ms).unwrap_or_default();
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOV_6_1994: i64 = 784_111_777_000;

    #[test]
    fn test_parses_all_rfc7231_forms() {
        assert_eq!(parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT"), Ok(NOV_6_1994));
        assert_eq!(parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"), Ok(NOV_6_1994));
        assert_eq!(parse_http_date("Sun Nov  6 08:49:37 1994"), Ok(NOV_6_1994));
        assert_eq!(parse_http_date("Sun, 06 Nov 1994 08:49:37 +0000"), Ok(NOV_6_1994));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            parse_http_date("yesterday"),
            Err(HttpDateParseError::UnrecognizedFormat(_))
        ));
    }

    #[test]
    fn test_format_is_imf_fixdate() {
        assert_eq!(format_http_date(NOV_6_1994), "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(format_http_date(NOV_6_1994 + 999), "Sun, 06 Nov 1994 08:49:37 GMT");
    }
}
