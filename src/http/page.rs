//! GET requests against console pages, following redirects by hand.
//!
//! The transport never follows redirects on its own, so cookies set on an
//! intermediate 302 (the usual way the console hands out a fresh session)
//! would otherwise be lost.

use reqwest::Client;
use reqwest::header::COOKIE;
use tracing::{debug, instrument};
use url::Url;

use super::cookie_store::CookieSet;
use super::error::HacError;
use super::response::HacResponse;
use super::set_cookie::cookies_from_headers;

/// Maximum number of redirects followed for one page fetch.
pub const MAX_REDIRECTS: usize = 10;

/// Final page of a GET plus every cookie set along the way.
#[derive(Debug)]
pub struct FetchedPage {
    /// URL of the last hop.
    pub url: String,
    /// Response of the last hop.
    pub response: HacResponse,
    /// Cookies set by any hop; later hops override earlier ones.
    pub cookies: CookieSet,
}

/// GETs `url`, sending `cookies` and any cookie set along the redirect chain.
///
/// Cookies are only sent to, and collected from, hops on the origin of `url`;
/// a redirect to another host gets a cookie-less request.
///
/// # Errors
///
/// Returns [`HacError::InvalidUrl`] for malformed URLs and
/// [`HacError::Transport`] when any hop fails at the network layer.
#[instrument(level = "debug", skip(client, cookies), fields(url = %url))]
pub async fn fetch_page(
    client: &Client,
    url: &str,
    cookies: &CookieSet,
) -> Result<FetchedPage, HacError> {
    let mut current = Url::parse(url).map_err(|_| HacError::invalid_url(url))?;
    let origin = current.origin();
    let mut sent = cookies.clone();
    let mut received = CookieSet::new();

    let mut hops = 0;
    loop {
        let same_origin = current.origin() == origin;
        let mut request = client.get(current.clone());
        if same_origin && !sent.is_empty() {
            request = request.header(COOKIE, sent.header_value());
        }
        let response = request
            .send()
            .await
            .map_err(|error| HacError::transport(current.as_str(), error))?;
        let response = HacResponse::read(current.as_str(), response).await?;

        if same_origin {
            for pair in cookies_from_headers(response.headers()) {
                sent.insert(pair.name.clone(), pair.value.clone());
                received.insert(pair.name, pair.value);
            }
        } else {
            debug!(url = %current, "skipping cookies for cross-origin hop");
        }

        let next = response
            .status()
            .is_redirection()
            .then(|| response.location())
            .flatten()
            .and_then(|location| current.join(location).ok());

        match next {
            Some(next) if hops < MAX_REDIRECTS => {
                debug!(from = %current, to = %next, "following redirect");
                hops += 1;
                current = next;
            }
            _ => {
                return Ok(FetchedPage {
                    url: current.into(),
                    response,
                    cookies: received,
                });
            }
        }
    }
}
