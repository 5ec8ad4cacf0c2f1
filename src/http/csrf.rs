//! CSRF token scraping.
//!
//! The console renders its anti-forgery token into every page as
//! `<meta name="_csrf" content="...">`.

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use super::cookie_store::CookieSet;
use super::page::fetch_page;

const CSRF_META_SELECTOR: &str = r#"meta[name="_csrf"]"#;

/// Extracts the `_csrf` meta tag content from an HTML document.
///
/// Returns `None` when the tag is missing or its content is empty.
#[must_use]
pub fn extract_csrf_token(html: &str) -> Option<String> {
    let selector = match Selector::parse(CSRF_META_SELECTOR) {
        Ok(selector) => selector,
        Err(error) => {
            warn!(error = ?error, "invalid CSRF selector");
            return None;
        }
    };
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .find_map(|element| element.value().attr("content"))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
}

/// GETs `url` with the session's cookies and scrapes its CSRF token.
///
/// Any failure (network, TLS, missing tag) yields `None`; callers treat a
/// missing token as a stale session rather than a hard fault.
pub async fn fetch_csrf_token(client: &Client, url: &str, cookies: &CookieSet) -> Option<String> {
    let page = match fetch_page(client, url, cookies).await {
        Ok(page) => page,
        Err(error) => {
            warn!(url, error = %error, "CSRF page request failed");
            return None;
        }
    };
    let token = extract_csrf_token(page.response.body());
    if token.is_none() {
        debug!(
            url = %page.url,
            status = page.response.status().as_u16(),
            "no CSRF meta tag in page"
        );
    }
    token
}
