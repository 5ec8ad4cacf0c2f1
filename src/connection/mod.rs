//! Connection identity, replica pinning and session-key derivation.

mod replica;
mod settings;

pub use replica::{
    CCV2_ROUTE_COOKIE_NAME, ConnectionContext, ReplicaContext, ReplicaSelection, SessionKey,
};
pub use settings::{
    ConnectionSettings, DEFAULT_SESSION_COOKIE_NAME, DEFAULT_SSL_PROTOCOL, DEFAULT_TIMEOUT,
};
