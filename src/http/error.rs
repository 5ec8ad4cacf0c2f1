//! Error types for the console session client.
//!
//! None of these cross the public boundary of [`HacHttpClient::post`]: they are
//! folded into a synthetic 503 [`HacResponse`] carrying the error message.
//!
//! [`HacHttpClient::post`]: super::HacHttpClient::post
//! [`HacResponse`]: super::HacResponse

use thiserror::Error;

/// Message surfaced when the console rejects the configured credentials.
pub const WRONG_CREDENTIALS_MESSAGE: &str =
    "Wrong username/password. Check the credentials configured for this connection.";

/// Errors that can occur while authenticating against or calling the console.
#[derive(Debug, Error)]
pub enum HacError {
    /// Connect, TLS handshake or I/O failure. Never retried automatically.
    #[error("{source}")]
    Transport {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The configured TLS protocol name is not supported by the runtime.
    #[error("unsupported TLS protocol '{protocol}'")]
    TlsSetup {
        /// The requested protocol name.
        protocol: String,
    },

    /// The TLS backend rejected a supported protocol configuration.
    #[error("TLS client setup failed for protocol '{protocol}'")]
    ClientSetup {
        /// The configured protocol name.
        protocol: String,
        /// The builder error.
        #[source]
        source: reqwest::Error,
    },

    /// The login form was rejected (redirect to `login_error`).
    #[error("{}", WRONG_CREDENTIALS_MESSAGE)]
    AuthRejected,

    /// The bootstrap GET did not yield a session cookie.
    #[error("Unable to obtain sessionId for {url}")]
    SessionUnavailable {
        /// The console base URL.
        url: String,
    },

    /// The login POST did not renew the session cookie.
    #[error("HTTP {status} {detail}")]
    LoginFailed {
        /// Status code of the login response.
        status: u16,
        /// Status-derived diagnostic.
        detail: String,
    },

    /// No CSRF token could be scraped for the current session.
    #[error("Unable to obtain csrfToken for sessionId={session_id}")]
    CsrfUnavailable {
        /// The session id the token was requested for.
        session_id: String,
    },

    /// The cookie set disappeared between login and request.
    #[error("Unable to authenticate request.")]
    NotAuthenticated,

    /// The provided URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl HacError {
    /// Creates a transport error from a reqwest error.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    /// Creates a TLS setup error.
    pub fn tls_setup(protocol: impl Into<String>) -> Self {
        Self::TlsSetup {
            protocol: protocol.into(),
        }
    }

    /// Creates a client setup error for a protocol the backend refused.
    pub fn client_setup(protocol: impl Into<String>, source: reqwest::Error) -> Self {
        Self::ClientSetup {
            protocol: protocol.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Whether this failure comes from the network layer rather than the console.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::TlsSetup { .. } | Self::ClientSetup { .. }
        )
    }

    /// The error message followed by every underlying cause, `: `-separated.
    ///
    /// Causes already contained in the message are skipped.
    #[must_use]
    pub fn detailed_message(&self) -> String {
        let mut message = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(error) = cause {
            let text = error.to_string();
            if !message.contains(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            cause = error.source();
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_rejected_message_is_actionable() {
        assert!(
            HacError::AuthRejected
                .to_string()
                .starts_with("Wrong username/password.")
        );
    }

    #[test]
    fn test_login_failed_message_includes_status() {
        let error = HacError::LoginFailed {
            status: 200,
            detail: "Unable to obtain sessionId from response".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "HTTP 200 Unable to obtain sessionId from response"
        );
    }

    #[test]
    fn test_csrf_unavailable_names_session() {
        let error = HacError::CsrfUnavailable {
            session_id: "abc123".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Unable to obtain csrfToken for sessionId=abc123"
        );
    }

    fn builder_error() -> reqwest::Error {
        reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err()
    }

    #[test]
    fn test_detailed_message_includes_underlying_cause() {
        let error = HacError::transport("not a url", builder_error());
        let detailed = error.detailed_message();
        assert!(detailed.starts_with(&error.to_string()));
        assert!(
            detailed.contains("relative URL without a base"),
            "cause missing from {detailed:?}"
        );
    }

    #[test]
    fn test_detailed_message_without_cause_is_plain_message() {
        assert_eq!(
            HacError::NotAuthenticated.detailed_message(),
            "Unable to authenticate request."
        );
    }

    #[test]
    fn test_client_setup_keeps_configured_protocol_name() {
        let error = HacError::client_setup("TLSv1.2", builder_error());
        assert!(error.is_transport());
        let message = error.to_string();
        assert!(message.contains("'TLSv1.2'"));
        assert!(!message.contains("unsupported"));
        assert!(!message.contains("Tls12"));
    }

    #[test]
    fn test_tls_setup_is_transport_class() {
        assert!(HacError::tls_setup("SSLv3").is_transport());
        assert!(!HacError::AuthRejected.is_transport());
        assert!(!HacError::NotAuthenticated.is_transport());
    }
}
