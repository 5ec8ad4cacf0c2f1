//! Groovy scripting console.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{ExecutionClient, ExecutionOutcome, TransactionMode, json_payload};
use crate::connection::{ConnectionSettings, DEFAULT_TIMEOUT, ReplicaContext};
use crate::http::HacHttpClient;

const EXECUTE_PATH: &str = "/console/scripting/execute";

/// One Groovy script run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroovyContext {
    pub script: String,
    pub transaction_mode: TransactionMode,
    pub timeout: Duration,
}

impl GroovyContext {
    #[must_use]
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            transaction_mode: TransactionMode::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_transaction_mode(mut self, mode: TransactionMode) -> Self {
        self.transaction_mode = mode;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn params(&self) -> Vec<(String, String)> {
        vec![
            ("script".to_string(), self.script.clone()),
            ("scriptType".to_string(), "groovy".to_string()),
            (
                "commit".to_string(),
                self.transaction_mode.commit_param().to_string(),
            ),
        ]
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptingResponse {
    #[serde(default)]
    stacktrace_text: Option<String>,
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    execution_result: Option<String>,
}

/// Runs Groovy scripts through the scripting console.
///
/// The outcome's `output` is the script's printed output and `result` its
/// return value; a non-empty stack trace marks the run as failed.
#[derive(Debug, Clone)]
pub struct GroovyClient {
    http: Arc<HacHttpClient>,
    settings: ConnectionSettings,
}

impl GroovyClient {
    #[must_use]
    pub fn new(http: Arc<HacHttpClient>, settings: ConnectionSettings) -> Self {
        Self { http, settings }
    }
}

#[async_trait]
impl ExecutionClient for GroovyClient {
    type Context = GroovyContext;
    type Output = String;

    #[instrument(skip(self, context), fields(replica = replica.map(ReplicaContext::replica_id)))]
    async fn execute(
        &self,
        context: &GroovyContext,
        replica: Option<&ReplicaContext>,
    ) -> ExecutionOutcome {
        let url = self.settings.endpoint(EXECUTE_PATH);
        let response = self
            .http
            .post(
                &url,
                &context.params(),
                true,
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

fn parse_outcome(body: &str, replica: Option<&ReplicaContext>) -> ExecutionOutcome {
    let parsed: ScriptingResponse = match serde_json::from_str(&json_payload(body)) {
        Ok(parsed) => parsed,
        Err(error) => {
            debug!(error = %error, "unparseable scripting response");
            return ExecutionOutcome::failure(
                StatusCode::BAD_REQUEST.as_u16(),
                format!("Cannot parse response from the server: {error}"),
                replica,
            );
        }
    };

    if let Some(stacktrace) = non_blank(parsed.stacktrace_text) {
        return ExecutionOutcome::failure(StatusCode::BAD_REQUEST.as_u16(), stacktrace, replica);
    }

    let mut outcome = ExecutionOutcome::ok(replica);
    outcome.output = non_blank(parsed.output_text);
    outcome.result = non_blank(parsed.execution_result);
    outcome
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|text| !text.trim().is_empty())
}
