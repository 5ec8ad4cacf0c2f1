//! FlexibleSearch and SQL query console.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{ExecutionClient, ExecutionOutcome, TransactionMode, json_payload};
use crate::connection::{ConnectionSettings, DEFAULT_TIMEOUT, ReplicaContext};
use crate::http::HacHttpClient;

const EXECUTE_PATH: &str = "/console/flexsearch/execute";

/// Default row limit of the query console.
pub const DEFAULT_MAX_COUNT: u32 = 200;

/// Query language of a [`FlexibleSearchContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    #[default]
    FlexibleSearch,
    Sql,
}

/// One query run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlexibleSearchContext {
    pub query: String,
    pub query_mode: QueryMode,
    pub max_count: u32,
    pub locale: String,
    pub data_source: String,
    pub transaction_mode: TransactionMode,
    /// Session user the query runs as; the connection's username when unset.
    pub user: Option<String>,
    pub timeout: Duration,
}

impl FlexibleSearchContext {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            query_mode: QueryMode::default(),
            max_count: DEFAULT_MAX_COUNT,
            locale: "en".to_string(),
            data_source: "master".to_string(),
            transaction_mode: TransactionMode::default(),
            user: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_query_mode(mut self, mode: QueryMode) -> Self {
        self.query_mode = mode;
        self
    }

    #[must_use]
    pub fn with_max_count(mut self, max_count: u32) -> Self {
        self.max_count = max_count;
        self
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

    fn params(&self, settings: &ConnectionSettings) -> Vec<(String, String)> {
        let (flexible_search_query, sql_query) = match self.query_mode {
            QueryMode::FlexibleSearch => (self.query.clone(), String::new()),
            QueryMode::Sql => (String::new(), self.query.clone()),
        };
        let user = self
            .user
            .clone()
            .unwrap_or_else(|| settings.username().to_string());

        vec![
            ("scriptType".to_string(), "flexibleSearch".to_string()),
            (
                "commit".to_string(),
                self.transaction_mode.commit_param().to_string(),
            ),
            ("maxCount".to_string(), self.max_count.to_string()),
            ("user".to_string(), user),
            ("dataSource".to_string(), self.data_source.clone()),
            ("locale".to_string(), self.locale.clone()),
            ("flexibleSearchQuery".to_string(), flexible_search_query),
            ("sqlQuery".to_string(), sql_query),
        ]
    }
}

/// Rows returned by a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryTable {
    /// Renders the table as tab-separated lines, headers first.
    #[must_use]
    pub fn to_tsv(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for QueryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.headers.is_empty() {
            writeln!(f, "{}", self.headers.join("\t"))?;
        }
        for row in &self.rows {
            writeln!(f, "{}", row.join("\t"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    exception: Option<Value>,
    #[serde(default)]
    headers: Option<Vec<String>>,
    #[serde(default)]
    result_list: Option<Vec<Vec<Value>>>,
}

/// Runs FlexibleSearch or SQL queries through the query console.
#[derive(Debug, Clone)]
pub struct FlexibleSearchClient {
    http: Arc<HacHttpClient>,
    settings: ConnectionSettings,
}

impl FlexibleSearchClient {
    #[must_use]
    pub fn new(http: Arc<HacHttpClient>, settings: ConnectionSettings) -> Self {
        Self { http, settings }
    }
}

#[async_trait]
impl ExecutionClient for FlexibleSearchClient {
    type Context = FlexibleSearchContext;
    type Output = QueryTable;

    #[instrument(skip(self, context), fields(replica = replica.map(ReplicaContext::replica_id)))]
    async fn execute(
        &self,
        context: &FlexibleSearchContext,
        replica: Option<&ReplicaContext>,
    ) -> ExecutionOutcome<QueryTable> {
        let url = self.settings.endpoint(EXECUTE_PATH);
        let response = self
            .http
            .post(
                &url,
                &context.params(&self.settings),
                true,
                context.timeout,
                &self.settings,
                replica,
            )
            .await;

        if response.status() != StatusCode::OK {
            let mut outcome = ExecutionOutcome::from_unexpected_status(&response, replica);
            outcome.status_code = StatusCode::BAD_REQUEST.as_u16();
            return outcome;
        }
        parse_outcome(response.body(), &url, replica)
    }
}

fn parse_outcome(
    body: &str,
    url: &str,
    replica: Option<&ReplicaContext>,
) -> ExecutionOutcome<QueryTable> {
    let parsed: QueryResponse = match serde_json::from_str(&json_payload(body)) {
        Ok(parsed) => parsed,
        Err(error) => {
            debug!(error = %error, "unparseable query response");
            return ExecutionOutcome::failure(
                StatusCode::BAD_REQUEST.as_u16(),
                format!("Cannot parse response from the server: {error} {url}"),
                replica,
            );
        }
    };

    if let Some(message) = parsed
        .exception
        .as_ref()
        .and_then(|exception| exception.get("message"))
        .filter(|message| !message.is_null())
    {
        return ExecutionOutcome::failure(
            StatusCode::BAD_REQUEST.as_u16(),
            cell_text(message),
            replica,
        );
    }

    let table = QueryTable {
        headers: parsed.headers.unwrap_or_default(),
        rows: parsed
            .result_list
            .unwrap_or_default()
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect(),
    };
    ExecutionOutcome::ok(replica)
        .with_output(table.to_tsv())
        .with_result(table)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
