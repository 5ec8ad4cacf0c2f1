//! Shared wiremock fixtures emulating the administration console.
//!
//! The fake console lives under `/hac`: `GET /hac` hands out the initial
//! session cookie, every page carries a `_csrf` meta tag, and the login form
//! handler swaps the session id on success.

#![allow(dead_code)]

use hac_core::ConnectionSettings;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CSRF_TOKEN: &str = "tok-1";
pub const INITIAL_SESSION: &str = "abc123";
pub const LOGGED_IN_SESSION: &str = "xyz789";
pub const LOGIN_PATH: &str = "/hac/j_spring_security_check";

pub fn page_with_csrf(token: &str) -> String {
    format!(
        r#"<html><head><meta name="_csrf" content="{token}"/><meta name="_csrf_header" content="X-CSRF-TOKEN"/></head><body>hac</body></html>"#
    )
}

pub fn page_without_csrf() -> String {
    "<html><head><title>hac</title></head><body>maintenance</body></html>".to_string()
}

pub fn settings_for(server: &MockServer) -> ConnectionSettings {
    ConnectionSettings::new(format!("{}/hac", server.uri()), "admin", "nimda")
}

/// `GET /hac`: sets the initial session cookie and renders the CSRF token.
pub async fn mount_entry_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/hac"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "Set-Cookie",
                    format!("JSESSIONID={INITIAL_SESSION}; Path=/hac; Secure; HttpOnly").as_str(),
                )
                .set_body_string(page_with_csrf(CSRF_TOKEN)),
        )
        .mount(server)
        .await;
}

/// Every other `GET /hac/...` page renders the CSRF token.
pub async fn mount_csrf_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/hac/.+"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page_with_csrf(CSRF_TOKEN)))
        .mount(server)
        .await;
}

/// Successful login: 302 back to the console with a fresh session id.
pub fn login_success() -> ResponseTemplate {
    ResponseTemplate::new(302)
        .insert_header("Location", "/hac/")
        .insert_header(
            "Set-Cookie",
            format!("JSESSIONID={LOGGED_IN_SESSION}; Path=/hac; Secure; HttpOnly").as_str(),
        )
}

/// Rejected login: 302 to the login page with the error marker.
pub fn login_rejected() -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header("Location", "/hac/login?error=login_error")
}

/// Mounts the login handler expecting exactly `times` logins.
pub async fn mount_login(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(login_success())
        .expect(times)
        .mount(server)
        .await;
}

/// Entry page, CSRF pages and a login handler expecting `logins` logins.
pub async fn mount_console(server: &MockServer, logins: u64) {
    mount_entry_page(server).await;
    mount_csrf_pages(server).await;
    mount_login(server, logins).await;
}
