//! HTTP cache header interpretation
//!
//! Turns a network response into a [`CacheEntry`] whose freshness reflects the
//! server's `Cache-Control`, `Expires`, `Date`, `ETag` and `Last-Modified`
//! headers.

use http::header::{CACHE_CONTROL, CONTENT_TYPE, DATE, ETAG, EXPIRES, LAST_MODIFIED};

use super::CacheEntry;
use super::http_date::{now_millis, parse_http_date};
use crate::http::{Headers, NetworkResponse, header_value};

/// Build a cache entry from response headers, `None` when the server
/// forbids caching.
pub fn parse_cache_headers(response: &NetworkResponse) -> Option<CacheEntry> {
    parse_cache_headers_at(response, now_millis())
}

pub fn parse_cache_headers_at(response: &NetworkResponse, now_ms: i64) -> Option<CacheEntry> {
    let headers = &response.headers;

    let server_date = date_header(headers, DATE.as_str());
    let server_expires = date_header(headers, EXPIRES.as_str());
    let last_modified = date_header(headers, LAST_MODIFIED.as_str());
    let etag = header_value(headers, ETAG.as_str()).map(str::to_string);

    let (soft_ttl, ttl) = match header_value(headers, CACHE_CONTROL.as_str()) {
        Some(cache_control) => {
            let mut max_age: i64 = 0;
            let mut stale_while_revalidate: i64 = 0;
            let mut must_revalidate = false;

            for token in cache_control.split(',').map(str::trim) {
                if token == "no-cache" || token == "no-store" {
                    return None;
                } else if let Some(value) = token.strip_prefix("max-age=") {
                    max_age = value.parse().unwrap_or(max_age);
                } else if let Some(value) = token.strip_prefix("stale-while-revalidate=") {
                    stale_while_revalidate = value.parse().unwrap_or(stale_while_revalidate);
                } else if token == "must-revalidate" || token == "proxy-revalidate" {
                    must_revalidate = true;
                }
            }

            let soft = now_ms.saturating_add(max_age.saturating_mul(1000));
            let hard = if must_revalidate {
                soft
            } else {
                soft.saturating_add(stale_while_revalidate.saturating_mul(1000))
            };
            (soft, hard)
        }
        // Without Cache-Control, honour Expires relative to the server clock.
        None if server_date > 0 && server_expires >= server_date => {
            let soft = now_ms + (server_expires - server_date);
            (soft, soft)
        }
        None => (0, 0),
    };

    Some(CacheEntry {
        data: response.data.clone(),
        etag,
        server_date,
        last_modified,
        ttl,
        soft_ttl,
        response_headers: headers.clone(),
    })
}

/// Extract the `charset` parameter of `Content-Type`, or `default`.
pub fn parse_charset(headers: &Headers, default: &str) -> String {
    header_value(headers, CONTENT_TYPE.as_str())
        .and_then(|content_type| {
            content_type.split(';').skip(1).find_map(|param| {
                let (name, value) = param.trim().split_once('=')?;
                name.trim()
                    .eq_ignore_ascii_case("charset")
                    .then(|| value.trim().trim_matches('"').to_string())
            })
        })
        .unwrap_or_else(|| default.to_string())
}

fn date_header(headers: &Headers, name: &str) -> i64 {
    let Some(value) = header_value(headers, name) else {
        return 0;
    };
    match parse_http_date(value) {
        Ok(ms) => ms,
        Err(e) => {
            tracing::debug!(
                target: "quarry::cache",
                header = name,
                error = %e,
                "Ignoring unparseable date header"
            );
            0
        }
    }
}
