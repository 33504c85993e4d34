//! Publish query string decoding
//!
//! Publishers pass multicast settings on the stream name's query string, e.g.
//! `fms.multicast.type=2&fms.multicast.groupspec=G&fms.multicast.address=224.0.0.1%3A30000`.
//! The whole string is percent-decoded first and then split, so a malformed escape
//! anywhere discards every parameter.

use std::collections::HashMap;

/// Decoded query parameters, name to value
pub type QueryParams = HashMap<String, String>;

/// Decode a raw query string (no leading `?`) into a parameter map
///
/// - Malformed percent-encoding or non UTF-8 output yields an empty map.
/// - Each `&`-separated segment splits on its first `=`.
/// - A segment without `=` maps to an empty value.
/// - Later duplicates overwrite earlier ones.
pub fn parse_query(raw: &str) -> QueryParams {
    let mut params = QueryParams::new();

    let decoded = match decode(raw) {
        Some(decoded) => decoded,
        None => {
            tracing::debug!(query = raw, "Malformed query string ignored");
            return params;
        }
    };

    for segment in decoded.split('&') {
        if segment.is_empty() {
            continue;
        }

        let (name, value) = segment.split_once('=').unwrap_or((segment, ""));
        params.insert(name.to_string(), value.to_string());
    }

    params
}

/// Strict percent-decoding: every `%` must start a two digit hex escape
fn decode(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3)?;
            if !escape.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    urlencoding::decode(raw).ok().map(|s| s.into_owned())
}
