//! Connection identity for one administration console.

use std::fmt;
use std::time::Duration;

/// Session cookie name used when a connection does not configure its own.
pub const DEFAULT_SESSION_COOKIE_NAME: &str = "JSESSIONID";

/// TLS protocol name used when a connection does not configure one.
pub const DEFAULT_SSL_PROTOCOL: &str = "TLS";

/// Default per-request timeout (connect and read).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(6000);

/// Connection settings for one console backend.
///
/// Immutable for the duration of a request. The password is redacted in
/// Debug output to prevent accidental logging of credentials.
#[derive(Clone)]
pub struct ConnectionSettings {
    id: String,
    url: String,
    username: String,
    password: String,
    session_cookie_name: Option<String>,
    ssl_protocol: String,
}

impl ConnectionSettings {
    /// Creates settings for `url` with the given credentials.
    ///
    /// A trailing `/` on the URL is dropped so endpoint paths can be appended
    /// directly. The identity id defaults to `<username>@<url>`.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let url = url.into().trim_end_matches('/').to_string();
        let username = username.into();
        Self {
            id: format!("{username}@{url}"),
            url,
            username,
            password: password.into(),
            session_cookie_name: None,
            ssl_protocol: DEFAULT_SSL_PROTOCOL.to_string(),
        }
    }

    /// Overrides the stable identifier used to partition the cookie store.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets a custom session cookie name. Blank names fall back to the default.
    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.session_cookie_name = (!name.trim().is_empty()).then_some(name);
        self
    }

    /// Sets the TLS protocol name (e.g. `TLSv1.2`).
    #[must_use]
    pub fn with_ssl_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.ssl_protocol = protocol.into();
        self
    }

    /// Stable unique identifier of this connection.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Base URL of the console, without trailing slash.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    ///
    /// Credentials are sensitive; avoid logging the return value.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Effective session cookie name.
    #[must_use]
    pub fn session_cookie_name(&self) -> &str {
        self.session_cookie_name
            .as_deref()
            .unwrap_or(DEFAULT_SESSION_COOKIE_NAME)
    }

    #[must_use]
    pub fn ssl_protocol(&self) -> &str {
        &self.ssl_protocol
    }

    /// Builds an absolute URL for a console endpoint path.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.url)
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("session_cookie_name", &self.session_cookie_name())
            .field("ssl_protocol", &self.ssl_protocol)
            .finish()
    }
}
