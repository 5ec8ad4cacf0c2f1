//! Console Client Core Library
//!
//! Session-authenticated access to the SAP Commerce administration console
//! (hAC). The console protects every action behind form login, a session
//! cookie and a CSRF token; this library hides that dance behind a single
//! `post` call and builds typed console actions on top of it.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`connection`] - Connection identity, replica pinning, session keys
//! - [`http`] - TLS transport, cookie store, login flow, authenticated POSTs
//! - [`execution`] - Groovy, FlexibleSearch, ImpEx and logger console actions
//! - [`config`] - Connection profile file and command-line overrides

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod connection;
pub mod execution;
pub mod http;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use connection::{
    ConnectionContext, ConnectionSettings, DEFAULT_TIMEOUT, ReplicaContext, SessionKey,
};
pub use execution::{ExecutionClient, ExecutionOutcome};
pub use http::{HacError, HacHttpClient, HacResponse};
