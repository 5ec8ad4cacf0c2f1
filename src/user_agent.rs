//! Shared User-Agent string for every console request.
//!
//! Single source so the bootstrap GET, the CSRF GET and the authenticated POST
//! all identify the same way.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/hac-client";

/// Default User-Agent for console requests (identifies the tool).
#[must_use]
pub(crate) fn default_console_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("hac-client/{version} (+{PROJECT_UA_URL})")
}
