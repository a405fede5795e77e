//! Cookie header rendering and `Set-Cookie` parsing.
//!
//! The portal chain mixes servers that expect a manually rendered `Cookie`
//! header with ones that only speak through `Set-Cookie`, so both directions
//! are handled here as plain string work on name-value pairs.

use reqwest::header::{HeaderMap, SET_COOKIE};
use std::collections::HashMap;

/// Format cookies as a `Cookie` header value.
///
/// Returns a string like `name1=val1; name2=val2`, sorted by name for
/// deterministic output.
pub fn render_cookie_header(cookies: &HashMap<String, String>) -> String {
    let mut pairs: Vec<_> = cookies.iter().collect();
    pairs.sort_by_key(|(k, _)| (*k).clone());
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Extract name-value pairs from every `Set-Cookie` header in a response.
///
/// Each header has the form `name=value; attr1; attr2=val2`; only the
/// `name=value` portion before the first `;` is kept. Pairs are returned in
/// header order so a later cookie overwrites an earlier one when folded into
/// a map.
pub fn parse_set_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for value in headers.get_all(SET_COOKIE) {
        let Ok(raw) = value.to_str() else {
            continue;
        };
        let cookie_part = raw.split(';').next().unwrap_or("");
        if let Some(eq_pos) = cookie_part.find('=') {
            let name = cookie_part[..eq_pos].trim().to_string();
            let val = cookie_part[eq_pos + 1..].trim().to_string();
            if !name.is_empty() {
                pairs.push((name, val));
            }
        }
    }
    pairs
}

/// Pull a single cookie's value out of a rendered `Cookie` header string.
pub fn cookie_from_header(header: &str, name: &str) -> Option<String> {
    for part in header.split(';') {
        let part = part.trim();
        if let Some(eq_pos) = part.find('=') {
            if part[..eq_pos].trim() == name {
                return Some(part[eq_pos + 1..].trim().to_string());
            }
        }
    }
    None
}

/// Resolve a potentially relative redirect `Location` against the current URL.
pub fn resolve_location(current: &str, location: &str) -> String {
    if location.is_empty() {
        return current.to_string();
    }
    if location.starts_with("http://") || location.starts_with("https://") {
        return location.to_string();
    }
    if let Ok(base) = url::Url::parse(current) {
        if let Ok(resolved) = base.join(location) {
            return resolved.to_string();
        }
    }
    location.to_string()
}
