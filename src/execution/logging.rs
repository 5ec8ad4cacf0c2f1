//! Runtime logger level changes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use super::{ExecutionClient, ExecutionOutcome, json_payload};
use crate::connection::{ConnectionSettings, DEFAULT_TIMEOUT, ReplicaContext};
use crate::http::HacHttpClient;

const CHANGE_LEVEL_PATH: &str = "/platform/log4j/changeLevel/";

/// Log4j level names understood by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    All,
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Off,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::Off => "OFF",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown log level '{0}' (expected ALL, TRACE, DEBUG, INFO, WARN, ERROR, FATAL or OFF)")]
pub struct ParseLogLevelError(String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(Self::All),
            "TRACE" => Ok(Self::Trace),
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            "FATAL" => Ok(Self::Fatal),
            "OFF" => Ok(Self::Off),
            _ => Err(ParseLogLevelError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingContext {
    pub logger_name: String,
    pub level: LogLevel,
    pub timeout: Duration,
}

impl LoggingContext {
    #[must_use]
    pub fn new(logger_name: impl Into<String>, level: LogLevel) -> Self {
        Self {
            logger_name: logger_name.into(),
            level,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    fn params(&self) -> Vec<(String, String)> {
        vec![
            ("loggerName".to_string(), self.logger_name.clone()),
            ("levelName".to_string(), self.level.as_str().to_string()),
        ]
    }
}

/// Effective level of one logger as reported after a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerLevel {
    pub name: String,
    pub effective_level: String,
    pub parent_name: Option<String>,
}

/// Changes logger levels through the platform's log4j page.
#[derive(Debug, Clone)]
pub struct LoggingClient {
    http: Arc<HacHttpClient>,
    settings: ConnectionSettings,
}

impl LoggingClient {
    #[must_use]
    pub fn new(http: Arc<HacHttpClient>, settings: ConnectionSettings) -> Self {
        Self { http, settings }
    }
}

#[async_trait]
impl ExecutionClient for LoggingClient {
    type Context = LoggingContext;
    type Output = Vec<LoggerLevel>;

    #[instrument(skip(self, context), fields(logger = %context.logger_name, level = %context.level))]
    async fn execute(
        &self,
        context: &LoggingContext,
        replica: Option<&ReplicaContext>,
    ) -> ExecutionOutcome<Vec<LoggerLevel>> {
        let url = self.settings.endpoint(CHANGE_LEVEL_PATH);
        let response = self
            .http
            .post(
                &url,
                &context.params(),
                false,
                context.timeout,
                &self.settings,
                replica,
            )
            .await;

        if response.status() != StatusCode::OK {
            return ExecutionOutcome::from_unexpected_status(&response, replica);
        }
        parse_outcome(response.body(), replica)
    }
}

fn parse_outcome(
    body: &str,
    replica: Option<&ReplicaContext>,
) -> ExecutionOutcome<Vec<LoggerLevel>> {
    let json: Value = match serde_json::from_str(&json_payload(body)) {
        Ok(json) => json,
        Err(error) => {
            debug!(error = %error, "unparseable logger response");
            return ExecutionOutcome::failure(
                StatusCode::BAD_REQUEST.as_u16(),
                format!("Cannot parse response from the server: {error}"),
                replica,
            );
        }
    };

    let loggers = json
        .get("loggers")
        .and_then(Value::as_array)
        .map(|loggers| loggers.iter().filter_map(logger_level).collect())
        .unwrap_or_default();
    ExecutionOutcome::ok(replica).with_result(loggers)
}

/// Entries without a name or an effective level are skipped.
fn logger_level(entry: &Value) -> Option<LoggerLevel> {
    let name = entry.get("name")?.as_str()?;
    let effective_level = entry
        .get("effectiveLevel")?
        .get("standardLevel")?
        .as_str()?;
    Some(LoggerLevel {
        name: name.to_string(),
        effective_level: effective_level.to_string(),
        parent_name: entry
            .get("parentName")
            .and_then(Value::as_str)
            .map(ToString::to_string),
    })
}
