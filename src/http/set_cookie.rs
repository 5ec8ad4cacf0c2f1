//! Lenient `Set-Cookie` scanning.
//!
//! Some console builds emit `Set-Cookie` values that strict parsers reject
//! (odd attribute casing or ordering, bare flags, several cookies folded into
//! one header). Only the leading `name=value` pair of each cookie matters here,
//! so this scanner reads just that and ignores the attributes.
//!
//! Grammar accepted per header value:
//!
//! ```text
//! header   = cookie *( "," cookie )
//! cookie   = name "=" value *( ";" attribute )
//! name     = 1*<any char except "=", ";", ",", whitespace>
//! value    = <any chars up to ";">, optionally wrapped in double quotes
//! ```
//!
//! A `,` only starts a new cookie when the text after it looks like
//! `name=...`; commas inside `Expires` dates are therefore kept.

use reqwest::header::{HeaderMap, SET_COOKIE};

/// One `name=value` pair read from a `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookiePair {
    pub name: String,
    pub value: String,
}

/// Parses every cookie pair out of a single `Set-Cookie` header value.
///
/// Malformed segments are skipped rather than failing the whole header.
#[must_use]
pub fn parse_set_cookie(header_value: &str) -> Vec<SetCookiePair> {
    split_folded_cookies(header_value)
        .into_iter()
        .filter_map(parse_cookie_pair)
        .collect()
}

/// Collects all cookie pairs from every `Set-Cookie` header, in header order.
#[must_use]
pub fn cookies_from_headers(headers: &HeaderMap) -> Vec<SetCookiePair> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .flat_map(|value| parse_set_cookie(&value))
        .collect()
}

/// Returns the first non-empty value of cookie `cookie_name` set by `headers`.
#[must_use]
pub fn find_session_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    cookies_from_headers(headers)
        .into_iter()
        .find(|pair| pair.name == cookie_name && !pair.value.is_empty())
        .map(|pair| pair.value)
}

fn split_folded_cookies(header_value: &str) -> Vec<&str> {
    let mut cookies = Vec::new();
    let mut start = 0;
    for (index, _) in header_value.match_indices(',') {
        let rest = &header_value[index + 1..];
        if starts_new_cookie(rest) {
            cookies.push(&header_value[start..index]);
            start = index + 1;
        }
    }
    cookies.push(&header_value[start..]);
    cookies
}

fn starts_new_cookie(rest: &str) -> bool {
    let head = rest.split(';').next().unwrap_or_default();
    let Some((name, _)) = head.split_once('=') else {
        return false;
    };
    let name = name.trim();
    !name.is_empty() && !name.contains(char::is_whitespace)
}

fn parse_cookie_pair(cookie: &str) -> Option<SetCookiePair> {
    let head = cookie.split(';').next()?;
    let (name, value) = head.split_once('=')?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) || name.contains(',') {
        return None;
    }
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value);
    Some(SetCookiePair {
        name: name.to_string(),
        value: value.to_string(),
    })
}
