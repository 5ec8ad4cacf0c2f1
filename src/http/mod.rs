//! Session-authenticated HTTP access to the administration console.
//!
//! # Features
//!
//! - Trust-all TLS transport for self-signed development consoles
//! - Per-(connection, replica) cookie store safe for concurrent requests
//! - Lenient `Set-Cookie` scanning for the session cookie
//! - CSRF token scraping from the console's meta tag
//! - Lazy form login with a single automatic re-login on session expiry

mod client;
mod cookie_store;
mod csrf;
mod error;
mod page;
mod response;
mod set_cookie;
mod transport;

pub use client::{FORM_CONTENT_TYPE, HacHttpClient, LOGIN_PATH, MAX_SESSION_RETRIES};
pub use cookie_store::{CookieSet, CookieStore};
pub use csrf::{extract_csrf_token, fetch_csrf_token};
pub use error::{HacError, WRONG_CREDENTIALS_MESSAGE};
pub use page::{FetchedPage, MAX_REDIRECTS, fetch_page};
pub use response::HacResponse;
pub use set_cookie::{SetCookiePair, cookies_from_headers, find_session_cookie, parse_set_cookie};
pub use transport::{InsecureTransport, TlsProtocol};
