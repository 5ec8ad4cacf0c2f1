//! Insecure transport mode: the trust-all TLS client used for every console request.
//!
//! Console instances in development and test environments almost always serve
//! self-signed certificates for internal host names, so certificate chain and
//! host name validation are both switched off here. This is scoped to the
//! console client; nothing else in the crate builds a client this way.
//!
//! One builder serves the cookie bootstrap GET, the CSRF GET and the
//! authenticated POST so all three share identical trust behavior.

use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::tls::Version;
use reqwest::{Client, ClientBuilder};
use tracing::debug;

use super::error::HacError;
use crate::user_agent;

/// TLS protocol versions a connection may pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsProtocol {
    /// Negotiate any version the runtime supports.
    Any,
    /// Pin TLS 1.2.
    Tls12,
    /// Pin TLS 1.3.
    Tls13,
}

impl TlsProtocol {
    /// Maps a protocol name such as `TLSv1.2` to a supported version.
    ///
    /// # Errors
    ///
    /// Returns [`HacError::TlsSetup`] for names the runtime cannot negotiate
    /// (SSL, TLS 1.0/1.1, or unknown names).
    pub fn from_name(name: &str) -> Result<Self, HacError> {
        match name.trim().to_ascii_uppercase().as_str() {
            "" | "TLS" => Ok(Self::Any),
            "TLSV1.2" => Ok(Self::Tls12),
            "TLSV1.3" => Ok(Self::Tls13),
            _ => Err(HacError::tls_setup(name)),
        }
    }

    fn version(self) -> Option<Version> {
        match self {
            Self::Any => None,
            Self::Tls12 => Some(Version::TLS_1_2),
            Self::Tls13 => Some(Version::TLS_1_3),
        }
    }
}

/// Builder for trust-all console clients.
#[derive(Debug, Clone)]
pub struct InsecureTransport {
    protocol_name: String,
    protocol: TlsProtocol,
    timeout: Duration,
}

impl InsecureTransport {
    /// Resolves the protocol name and captures the per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`HacError::TlsSetup`] when the protocol name is unsupported.
    pub fn new(ssl_protocol: &str, timeout: Duration) -> Result<Self, HacError> {
        Ok(Self {
            protocol_name: ssl_protocol.to_string(),
            protocol: TlsProtocol::from_name(ssl_protocol)?,
            timeout,
        })
    }

    #[must_use]
    pub fn protocol(&self) -> TlsProtocol {
        self.protocol
    }

    /// Protocol name as configured, e.g. `TLSv1.2`.
    #[must_use]
    pub fn protocol_name(&self) -> &str {
        &self.protocol_name
    }

    /// Builds a client that accepts every certificate and host name.
    ///
    /// With certificate verification off, the rustls backend skips the host
    /// name check as well.
    ///
    /// Redirects are never followed automatically: callers need to observe
    /// 302 responses and carry cookies across hops themselves. The timeout
    /// bounds both connect and the whole request.
    ///
    /// # Errors
    ///
    /// Returns [`HacError::ClientSetup`] when the TLS backend rejects the
    /// configuration.
    // Builder method names differ across reqwest minor versions; the older
    // spellings remain available as deprecated aliases.
    #[allow(deprecated)]
    pub fn build(&self) -> Result<Client, HacError> {
        let mut builder: ClientBuilder = Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(Policy::none())
            .connect_timeout(self.timeout)
            .timeout(self.timeout)
            .user_agent(user_agent::default_console_user_agent())
            .gzip(true);

        if let Some(version) = self.protocol.version() {
            builder = builder.min_tls_version(version).max_tls_version(version);
        }

        builder.build().map_err(|error| {
            debug!(
                error = %error,
                protocol = %self.protocol_name,
                "failed to build console client"
            );
            HacError::client_setup(&self.protocol_name, error)
        })
    }
}
