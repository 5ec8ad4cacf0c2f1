//! Session-authenticated client for the administration console.
//!
//! The console uses form login (`j_spring_security_check`), a session cookie
//! and a CSRF token scraped from every page. [`HacHttpClient`] keeps one
//! cookie set per (connection, replica) pair, logs in lazily, and transparently
//! re-authenticates once when the console reports an expired session.
//!
//! # Example
//!
//! ```no_run
//! use hac_core::connection::{ConnectionSettings, DEFAULT_TIMEOUT};
//! use hac_core::http::HacHttpClient;
//!
//! # async fn example() {
//! let client = HacHttpClient::new();
//! let settings = ConnectionSettings::new("https://localhost:9002/hac", "admin", "nimda");
//! let params = vec![("script".to_string(), "println 'hi'".to_string())];
//! let response = client
//!     .post(&settings.endpoint("/console/scripting/execute"), &params, true, DEFAULT_TIMEOUT, &settings, None)
//!     .await;
//! println!("{} {}", response.status(), response.body());
//! # }
//! ```

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};

use super::cookie_store::{CookieSet, CookieStore};
use super::csrf::fetch_csrf_token;
use super::error::HacError;
use super::page::fetch_page;
use super::response::HacResponse;
use super::set_cookie::find_session_cookie;
use super::transport::InsecureTransport;
use crate::connection::{ConnectionSettings, DEFAULT_TIMEOUT, ReplicaContext, SessionKey};

/// Number of automatic re-login attempts per [`HacHttpClient::post`] call.
pub const MAX_SESSION_RETRIES: u8 = 1;

/// Path of the console login form handler, relative to the base URL.
pub const LOGIN_PATH: &str = "/j_spring_security_check";

/// Content type of every authenticated POST.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

const CSRF_HEADER: &str = "X-CSRF-TOKEN";

/// Session-authenticated console client.
///
/// Create once and share (e.g. behind `Arc`) across every task talking to the
/// same consoles: the cookie store inside is the only shared state.
#[derive(Debug, Default)]
pub struct HacHttpClient {
    cookies: CookieStore,
}

/// Result of one authenticated POST attempt.
#[derive(Debug)]
enum Attempt {
    /// Final response; no retry applies.
    Completed(HacResponse),
    /// The session was judged stale and its cookies dropped.
    Stale {
        response: HacResponse,
        retry_timeout: Duration,
    },
}

impl Attempt {
    fn into_response(self) -> HacResponse {
        match self {
            Self::Completed(response) | Self::Stale { response, .. } => response,
        }
    }
}

/// Re-login budget of one `post` call.
#[derive(Debug, Clone, Copy)]
struct RetryBudget {
    remaining: u8,
}

impl RetryBudget {
    fn new(allow_retry: bool) -> Self {
        Self {
            remaining: if allow_retry { MAX_SESSION_RETRIES } else { 0 },
        }
    }

    fn try_consume(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// One authenticated POST as issued by a caller.
struct PostRequest<'a> {
    url: &'a str,
    params: &'a [(String, String)],
    settings: &'a ConnectionSettings,
    replica: Option<&'a ReplicaContext>,
    key: &'a SessionKey,
}

impl HacHttpClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cookie store shared by every request of this client.
    #[must_use]
    pub fn cookie_store(&self) -> &CookieStore {
        &self.cookies
    }

    /// Runs the login flow only, for connectivity checks.
    ///
    /// # Errors
    ///
    /// Returns the login failure: [`HacError::AuthRejected`] for bad
    /// credentials, [`HacError::SessionUnavailable`] when the host is
    /// unreachable or hands out no session cookie, [`HacError::TlsSetup`] for an
    /// unsupported protocol, or a status-derived [`HacError::LoginFailed`].
    #[instrument(skip(self, settings), fields(url = %settings.url()))]
    pub async fn test_connection(&self, settings: &ConnectionSettings) -> Result<(), HacError> {
        let key = SessionKey::new(settings, None);
        self.login(settings, None, &key).await
    }

    /// Issues an authenticated form POST, logging in first when needed.
    ///
    /// When the console rejects the session (403, 405, or a 302 to a login
    /// page) or no CSRF token can be obtained, the session's cookies are
    /// dropped and, if `allow_retry` is set, the whole login-then-post cycle
    /// runs once more. Transport failures are never retried.
    ///
    /// Never fails: errors become synthetic 503 responses (see
    /// [`HacResponse::error`]); after an exhausted retry the last console
    /// response is returned as-is.
    #[instrument(
        skip(self, params, settings, replica),
        fields(url = %url, replica = replica.map(ReplicaContext::replica_id))
    )]
    pub async fn post(
        &self,
        url: &str,
        params: &[(String, String)],
        allow_retry: bool,
        timeout: Duration,
        settings: &ConnectionSettings,
        replica: Option<&ReplicaContext>,
    ) -> HacResponse {
        let key = SessionKey::new(settings, replica);
        let request = PostRequest {
            url,
            params,
            settings,
            replica,
            key: &key,
        };

        let mut budget = RetryBudget::new(allow_retry);
        let mut timeout = timeout;
        loop {
            match self.attempt(&request, timeout).await {
                Attempt::Completed(response) => return response,
                Attempt::Stale {
                    response,
                    retry_timeout,
                } => {
                    if !budget.try_consume() {
                        return response;
                    }
                    info!(
                        session_key = %key,
                        status = response.status().as_u16(),
                        "session is stale; re-authenticating"
                    );
                    timeout = retry_timeout;
                }
            }
        }
    }

    /// Logs in when the session cookie is missing, then posts.
    async fn attempt(&self, request: &PostRequest<'_>, timeout: Duration) -> Attempt {
        let has_session = self
            .cookies
            .get(request.key)
            .is_some_and(|cookies| cookies.contains(request.settings.session_cookie_name()));

        if !has_session
            && let Err(error) = self
                .login(request.settings, request.replica, request.key)
                .await
        {
            warn!(session_key = %request.key, error = %error, "login failed");
            return Attempt::Completed(HacResponse::error(&error));
        }

        self.authenticated_attempt(request, timeout).await
    }

    /// Posts with the cookies currently stored for the session; never logs in.
    async fn authenticated_attempt(&self, request: &PostRequest<'_>, timeout: Duration) -> Attempt {
        let cookie_name = request.settings.session_cookie_name();
        let Some(cookies) = self.cookies.get(request.key) else {
            return Attempt::Completed(HacResponse::error(&HacError::NotAuthenticated));
        };

        let client = match build_client(request.settings, timeout) {
            Ok(client) => client,
            Err(error) => return Attempt::Completed(HacResponse::error(&error)),
        };

        let Some(csrf_token) = fetch_csrf_token(&client, request.url, &cookies).await else {
            self.cookies.remove(request.key);
            let error = HacError::CsrfUnavailable {
                session_id: cookies.get(cookie_name).unwrap_or_default().to_string(),
            };
            return Attempt::Stale {
                response: HacResponse::error(&error),
                retry_timeout: timeout,
            };
        };

        let response =
            match send_post(&client, request.url, request.params, &csrf_token, &cookies).await {
                Ok(response) => response,
                Err(error) => {
                    warn!(url = request.url, error = %error, "console request failed");
                    return Attempt::Completed(HacResponse::error(&error));
                }
            };

        if requires_login(&response) {
            debug!(
                session_key = %request.key,
                status = response.status().as_u16(),
                location = response.location(),
                "console rejected session"
            );
            self.cookies.remove(request.key);
            return Attempt::Stale {
                response,
                retry_timeout: DEFAULT_TIMEOUT,
            };
        }

        Attempt::Completed(response)
    }

    async fn login(
        &self,
        settings: &ConnectionSettings,
        replica: Option<&ReplicaContext>,
        key: &SessionKey,
    ) -> Result<(), HacError> {
        let base_url = settings.url();
        let cookie_name = settings.session_cookie_name();

        self.cookies.reset(key);
        let client = build_client(settings, DEFAULT_TIMEOUT)?;
        self.bootstrap_cookies(&client, base_url, replica, key).await;

        let cookies = self.cookies.get(key).unwrap_or_default();
        let Some(session_id) = cookies.get(cookie_name).filter(|id| !id.is_empty()) else {
            return Err(HacError::SessionUnavailable {
                url: base_url.to_string(),
            });
        };

        let Some(csrf_token) = fetch_csrf_token(&client, base_url, &cookies).await else {
            self.cookies.remove(key);
            return Err(HacError::CsrfUnavailable {
                session_id: session_id.to_string(),
            });
        };

        let login_url = settings.endpoint(LOGIN_PATH);
        let params = vec![
            ("j_username".to_string(), settings.username().to_string()),
            ("j_password".to_string(), settings.password().to_string()),
            ("_csrf".to_string(), csrf_token),
        ];
        let request = PostRequest {
            url: &login_url,
            params: &params,
            settings,
            replica,
            key,
        };
        let response = self
            .authenticated_attempt(&request, DEFAULT_TIMEOUT)
            .await
            .into_response();

        if response.redirects_to("login_error") {
            return Err(HacError::AuthRejected);
        }

        if let Some(new_session_id) = find_session_cookie(response.headers(), cookie_name) {
            if !self.cookies.update_existing(key, cookie_name, &new_session_id) {
                debug!(session_key = %key, "session dropped while logging in");
            }
            info!(session_key = %key, "logged in");
            return Ok(());
        }

        let status = response.status();
        let detail = match status {
            StatusCode::OK => "Unable to obtain sessionId from response".to_string(),
            StatusCode::FOUND => format!("Location: {}", response.location().unwrap_or_default()),
            _ => response.reason().to_string(),
        };
        Err(HacError::LoginFailed {
            status: status.as_u16(),
            detail,
        })
    }

    /// GETs the base URL for a fresh cookie set, pinned to `replica` if given.
    ///
    /// Network failures leave the (already cleared) set empty.
    async fn bootstrap_cookies(
        &self,
        client: &Client,
        base_url: &str,
        replica: Option<&ReplicaContext>,
        key: &SessionKey,
    ) {
        let mut pinned = CookieSet::new();
        if let Some(replica) = replica {
            pinned.insert(replica.cookie_name(), replica.cookie_value());
        }

        match fetch_page(client, base_url, &pinned).await {
            Ok(page) => {
                let mut cookies = page.cookies;
                cookies.extend(pinned.iter());
                debug!(session_key = %key, cookies = ?cookies, "bootstrapped session cookies");
                self.cookies.put_all(key, &cookies);
            }
            Err(error) => {
                warn!(url = base_url, error = %error, "cookie bootstrap failed");
            }
        }
    }
}

fn build_client(settings: &ConnectionSettings, timeout: Duration) -> Result<Client, HacError> {
    InsecureTransport::new(settings.ssl_protocol(), timeout)?.build()
}

/// Whether the console answered as if the session were gone.
fn requires_login(response: &HacResponse) -> bool {
    match response.status() {
        StatusCode::FORBIDDEN | StatusCode::METHOD_NOT_ALLOWED => true,
        StatusCode::FOUND => response.redirects_to("login"),
        _ => false,
    }
}

async fn send_post(
    client: &Client,
    url: &str,
    params: &[(String, String)],
    csrf_token: &str,
    cookies: &CookieSet,
) -> Result<HacResponse, HacError> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();

    let response = client
        .post(url)
        .header(CSRF_HEADER, csrf_token)
        .header(COOKIE, cookies.header_value())
        .header(ACCEPT, "application/json")
        .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
        .header("Sec-Fetch-Dest", "empty")
        .header("Sec-Fetch-Mode", "cors")
        .header("Sec-Fetch-Site", "same-origin")
        .body(body)
        .send()
        .await
        .map_err(|error| HacError::transport(url, error))?;

    HacResponse::read(url, response).await
}
