//! Connection profile loading.
//!
//! A profile is a flat `key = value` file:
//!
//! ```text
//! url = "https://localhost:9002/hac"
//! username = "admin"
//! password = "nimda"
//! timeout_ms = 30000      # per-request timeout
//! replica_id = "backoffice-0"
//! ```
//!
//! Command-line values override file values, which override built-in
//! defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::connection::{
    ConnectionContext, ConnectionSettings, DEFAULT_SESSION_COOKIE_NAME, DEFAULT_SSL_PROTOCOL,
    DEFAULT_TIMEOUT, ReplicaContext,
};

const APP_DIR: &str = "hac-client";
const CONFIG_FILE: &str = "config.toml";
const MAX_TIMEOUT_MS: u64 = 3_600_000;

pub const DEFAULT_URL: &str = "https://localhost:9002/hac";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "nimda";

/// Values read from a profile file; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub id: Option<String>,
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub session_cookie_name: Option<String>,
    pub ssl_protocol: Option<String>,
    pub timeout_ms: Option<u64>,
    pub replica_id: Option<String>,
    pub replica_cookie_name: Option<String>,
    pub replica_cookie_value: Option<String>,
}

impl FileConfig {
    /// Validates values that the parser alone cannot reject.
    pub fn validate(&self) -> Result<()> {
        validate_timeout_ms(self.timeout_ms)?;
        if let Some(url) = &self.url {
            validate_url(url)?;
        }
        if self.replica_id.is_none()
            && (self.replica_cookie_name.is_some() || self.replica_cookie_value.is_some())
        {
            bail!("`replica_cookie_name` and `replica_cookie_value` require `replica_id`");
        }
        Ok(())
    }
}

fn validate_timeout_ms(value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=MAX_TIMEOUT_MS).contains(&value) {
        bail!("Invalid config value for `timeout_ms`: {value}. Expected range: 1..={MAX_TIMEOUT_MS}");
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url).with_context(|| format!("Invalid console URL '{url}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("Invalid console URL '{url}': expected an http or https URL");
    }
    Ok(())
}

/// Where the configuration came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: Option<PathBuf>,
    pub config: Option<FileConfig>,
    pub loaded_from_file: bool,
}

/// Resolves the default profile path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/hac-client/config.toml`
/// 2. `$HOME/.config/hac-client/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join(CONFIG_FILE));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILE),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the profile at `explicit`, or the default profile if it exists.
///
/// An explicit path must exist; a missing default profile is not an error.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
            loaded_from_file: true,
        });
    }

    let path = resolve_default_config_path();
    match path.as_deref() {
        Some(path_ref) if path_ref.exists() => {
            let config = load_file_config(path_ref)?;
            Ok(LoadedConfig {
                path,
                config: Some(config),
                loaded_from_file: true,
            })
        }
        _ => Ok(LoadedConfig {
            path,
            config: None,
            loaded_from_file: false,
        }),
    }
}

pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

pub fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_number = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };
        let key = raw_key.trim();
        let value = raw_value.trim();

        let slot = match key {
            "id" => &mut cfg.id,
            "url" => &mut cfg.url,
            "username" => &mut cfg.username,
            "password" => &mut cfg.password,
            "session_cookie_name" => &mut cfg.session_cookie_name,
            "ssl_protocol" => &mut cfg.ssl_protocol,
            "replica_id" => &mut cfg.replica_id,
            "replica_cookie_name" => &mut cfg.replica_cookie_name,
            "replica_cookie_value" => &mut cfg.replica_cookie_value,
            "timeout_ms" => {
                let parsed = parse_integer_u64(value)
                    .with_context(|| format!("Invalid `timeout_ms` value on line {line_number}"))?;
                cfg.timeout_ms = Some(parsed);
                continue;
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        };
        let parsed = parse_string_literal(value)
            .with_context(|| format!("Invalid `{key}` value on line {line_number}"))?;
        *slot = Some(parsed);
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

/// Values supplied on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub session_cookie_name: Option<String>,
    pub ssl_protocol: Option<String>,
    pub timeout_ms: Option<u64>,
    /// Replica ids to pin requests to; each becomes one fan-out target.
    pub replicas: Vec<String>,
    /// Routing cookie for `replicas`; CCv2's `ROUTE` convention when unset.
    pub replica_cookie: Option<String>,
}

/// Fully resolved connection: identity, timeout and replica targets.
#[derive(Debug, Clone)]
pub struct ResolvedConnection {
    pub settings: ConnectionSettings,
    pub timeout: Duration,
    pub context: ConnectionContext,
}

/// Merges command-line overrides over file values over defaults.
pub fn resolve_connection(
    file: Option<&FileConfig>,
    overrides: &ConnectionOverrides,
) -> Result<ResolvedConnection> {
    let file = file.cloned().unwrap_or_default();

    let url = overrides
        .url
        .clone()
        .or(file.url)
        .unwrap_or_else(|| DEFAULT_URL.to_string());
    validate_url(&url)?;
    validate_timeout_ms(overrides.timeout_ms)?;

    let username = overrides
        .username
        .clone()
        .or(file.username)
        .unwrap_or_else(|| DEFAULT_USERNAME.to_string());
    let password = overrides
        .password
        .clone()
        .or(file.password)
        .unwrap_or_else(|| DEFAULT_PASSWORD.to_string());

    let mut settings = ConnectionSettings::new(url, username, password)
        .with_session_cookie_name(
            overrides
                .session_cookie_name
                .clone()
                .or(file.session_cookie_name)
                .unwrap_or_else(|| DEFAULT_SESSION_COOKIE_NAME.to_string()),
        )
        .with_ssl_protocol(
            overrides
                .ssl_protocol
                .clone()
                .or(file.ssl_protocol)
                .unwrap_or_else(|| DEFAULT_SSL_PROTOCOL.to_string()),
        );
    if let Some(id) = file.id {
        settings = settings.with_id(id);
    }

    let timeout = overrides
        .timeout_ms
        .or(file.timeout_ms)
        .map_or(DEFAULT_TIMEOUT, Duration::from_millis);

    let replicas = if overrides.replicas.is_empty() {
        file.replica_id
            .map(|replica_id| {
                let replica = match file.replica_cookie_name {
                    Some(cookie_name) => ReplicaContext::new(replica_id, cookie_name),
                    None => ReplicaContext::ccv2(replica_id),
                };
                match file.replica_cookie_value {
                    Some(value) => replica.with_cookie_value(value),
                    None => replica,
                }
            })
            .into_iter()
            .collect()
    } else {
        overrides
            .replicas
            .iter()
            .map(|replica_id| match &overrides.replica_cookie {
                Some(cookie_name) => ReplicaContext::new(replica_id.as_str(), cookie_name.as_str()),
                None => ReplicaContext::ccv2(replica_id.as_str()),
            })
            .collect()
    };

    Ok(ResolvedConnection {
        settings,
        timeout,
        context: ConnectionContext::manual(replicas),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ReplicaSelection;

    #[test]
    fn test_parse_config_full_profile() {
        let cfg = parse_config_str(
            r#"
# local dev
id = "local"
url = "https://localhost:9002/hac"
username = "admin"
password = "p#ss" # inline comment
session_cookie_name = "SESSION"
ssl_protocol = "TLSv1.2"
timeout_ms = 30000
"#,
        )
        .expect("full profile should parse");
        assert_eq!(cfg.id.as_deref(), Some("local"));
        assert_eq!(cfg.password.as_deref(), Some("p#ss"));
        assert_eq!(cfg.session_cookie_name.as_deref(), Some("SESSION"));
        assert_eq!(cfg.ssl_protocol.as_deref(), Some("TLSv1.2"));
        assert_eq!(cfg.timeout_ms, Some(30_000));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("proxy = \"x\"").expect_err("unknown key error expected");
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(err.to_string().contains("proxy"));
    }

    #[test]
    fn test_parse_config_rejects_unquoted_string() {
        let err = parse_config_str("username = admin").expect_err("quotes are required");
        assert!(err.to_string().contains("username"));
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("username").expect_err("syntax error expected");
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_parse_config_rejects_timeout_out_of_range() {
        let err = parse_config_str("timeout_ms = 0").expect_err("zero timeout rejected");
        assert!(err.to_string().contains("timeout_ms"));
        let err = parse_config_str("timeout_ms = 3600001").expect_err("huge timeout rejected");
        assert!(err.to_string().contains("timeout_ms"));
        let err = parse_config_str("timeout_ms = -5").expect_err("negative timeout rejected");
        assert!(format!("{err:#}").contains("non-negative"));
    }

    #[test]
    fn test_parse_config_rejects_non_http_url() {
        let err = parse_config_str("url = \"ftp://host/hac\"").expect_err("ftp rejected");
        assert!(err.to_string().contains("ftp://host/hac"));
    }

    #[test]
    fn test_parse_config_requires_replica_id_for_cookie() {
        let err = parse_config_str("replica_cookie_name = \"ROUTE\"").expect_err("needs id");
        assert!(err.to_string().contains("replica_id"));
    }

    #[test]
    fn test_resolve_defaults() {
        let resolved = resolve_connection(None, &ConnectionOverrides::default())
            .expect("defaults should resolve");
        assert_eq!(resolved.settings.url(), DEFAULT_URL);
        assert_eq!(resolved.settings.username(), "admin");
        assert_eq!(resolved.settings.password(), "nimda");
        assert_eq!(resolved.settings.session_cookie_name(), "JSESSIONID");
        assert_eq!(resolved.settings.ssl_protocol(), "TLS");
        assert_eq!(resolved.settings.id(), "admin@https://localhost:9002/hac");
        assert_eq!(resolved.timeout, DEFAULT_TIMEOUT);
        assert_eq!(resolved.context.selection(), &ReplicaSelection::Auto);
    }

    #[test]
    fn test_resolve_overrides_win_over_file() {
        let file = FileConfig {
            id: Some("stage".to_string()),
            url: Some("https://stage.example.com/hac".to_string()),
            username: Some("deployer".to_string()),
            timeout_ms: Some(1000),
            ..FileConfig::default()
        };
        let overrides = ConnectionOverrides {
            username: Some("admin".to_string()),
            timeout_ms: Some(2500),
            ..ConnectionOverrides::default()
        };
        let resolved = resolve_connection(Some(&file), &overrides).expect("should resolve");
        assert_eq!(resolved.settings.id(), "stage");
        assert_eq!(resolved.settings.url(), "https://stage.example.com/hac");
        assert_eq!(resolved.settings.username(), "admin");
        assert_eq!(resolved.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_resolve_file_replica() {
        let file = FileConfig {
            replica_id: Some("node-1".to_string()),
            replica_cookie_name: Some("ROUTE_ID".to_string()),
            replica_cookie_value: Some("n1".to_string()),
            ..FileConfig::default()
        };
        let resolved = resolve_connection(Some(&file), &ConnectionOverrides::default())
            .expect("should resolve");
        let targets = resolved.context.targets();
        let replica = targets[0].as_ref().expect("pinned replica");
        assert_eq!(replica.replica_id(), "node-1");
        assert_eq!(replica.cookie_name(), "ROUTE_ID");
        assert_eq!(replica.cookie_value(), "n1");
    }

    #[test]
    fn test_resolve_cli_replicas_default_to_ccv2_routing() {
        let overrides = ConnectionOverrides {
            replicas: vec!["a".to_string(), "b".to_string()],
            ..ConnectionOverrides::default()
        };
        let resolved = resolve_connection(None, &overrides).expect("should resolve");
        let targets = resolved.context.targets();
        assert_eq!(targets.len(), 2);
        let first = targets[0].as_ref().expect("pinned replica");
        assert_eq!(first.cookie_name(), "ROUTE");
        assert_eq!(first.cookie_value(), ".a");
    }

    #[test]
    fn test_resolve_rejects_bad_override_url() {
        let overrides = ConnectionOverrides {
            url: Some("not a url".to_string()),
            ..ConnectionOverrides::default()
        };
        assert!(resolve_connection(None, &overrides).is_err());
    }

    #[test]
    fn test_load_config_explicit_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("profile.toml");
        fs::write(&path, "url = \"http://127.0.0.1:9001/hac\"\n").expect("write profile");

        let loaded = load_config(Some(&path)).expect("explicit profile should load");
        assert!(loaded.loaded_from_file);
        assert_eq!(
            loaded.config.and_then(|cfg| cfg.url).as_deref(),
            Some("http://127.0.0.1:9001/hac")
        );
    }

    #[test]
    fn test_load_config_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_config(Some(&dir.path().join("absent.toml"))).expect_err("must fail");
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
