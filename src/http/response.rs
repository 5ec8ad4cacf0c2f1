//! Fully-read console response.

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LOCATION};

use super::error::HacError;

/// A console response with its body already read.
///
/// Failures inside the client are represented as synthetic 503 responses
/// whose reason phrase carries the error message, so callers always get a
/// value to inspect.
#[derive(Debug, Clone)]
pub struct HacResponse {
    status: StatusCode,
    reason: String,
    headers: HeaderMap,
    body: String,
    synthetic: bool,
}

impl HacResponse {
    /// Reads status, headers and body from a network response.
    ///
    /// # Errors
    ///
    /// Returns [`HacError::Transport`] when the body cannot be read.
    pub(crate) async fn read(url: &str, response: reqwest::Response) -> Result<Self, HacError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|error| HacError::transport(url, error))?;
        Ok(Self {
            status,
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
            synthetic: false,
        })
    }

    /// Synthetic "service unavailable" response carrying `error` as reason phrase.
    #[must_use]
    pub fn error(error: &HacError) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            reason: error.detailed_message(),
            headers: HeaderMap::new(),
            body: String::new(),
            synthetic: true,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Reason phrase: the canonical one for real responses, the error message
    /// for synthetic ones.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Whether this response was produced locally instead of by the console.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// Value of the first `Location` header, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    /// Whether the console answered with a 302 whose target contains `needle`.
    #[must_use]
    pub fn redirects_to(&self, needle: &str) -> bool {
        self.status == StatusCode::FOUND
            && self.location().is_some_and(|location| location.contains(needle))
    }
}
