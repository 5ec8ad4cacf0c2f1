//! Console actions built on the session client.
//!
//! Each client turns a typed execution context into form parameters, posts
//! them through [`HacHttpClient`](crate::http::HacHttpClient) and interprets
//! the console's answer as an [`ExecutionOutcome`].
//!
//! - [`GroovyClient`] - Groovy scripting console
//! - [`FlexibleSearchClient`] - FlexibleSearch and SQL queries
//! - [`ImpExClient`] - ImpEx import and validation
//! - [`LoggingClient`] - runtime logger level changes

mod flexible_search;
mod groovy;
mod impex;
mod logging;
mod outcome;

use async_trait::async_trait;
use futures_util::future::join_all;
use scraper::{Html, Selector};

use crate::connection::{ConnectionContext, ReplicaContext};

pub use flexible_search::{
    DEFAULT_MAX_COUNT, FlexibleSearchClient, FlexibleSearchContext, QueryMode, QueryTable,
};
pub use groovy::{GroovyClient, GroovyContext};
pub use impex::{ImpExClient, ImpExContext, ImpExMode, Toggle, ValidationMode};
pub use logging::{LogLevel, LoggerLevel, LoggingClient, LoggingContext, ParseLogLevelError};
pub use outcome::ExecutionOutcome;

/// Whether a console action commits its changes or rolls them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionMode {
    #[default]
    Rollback,
    Commit,
}

impl TransactionMode {
    #[must_use]
    pub fn from_commit_flag(commit: bool) -> Self {
        if commit { Self::Commit } else { Self::Rollback }
    }

    /// Value of the console's `commit` form field.
    #[must_use]
    pub fn commit_param(self) -> &'static str {
        match self {
            Self::Rollback => "false",
            Self::Commit => "true",
        }
    }
}

/// A console action that can run against one replica or fan out over several.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    /// Typed description of one action.
    type Context: Send + Sync;
    /// Structured result of a successful action.
    type Output: Send;

    /// Runs `context` once, pinned to `replica` when given.
    async fn execute(
        &self,
        context: &Self::Context,
        replica: Option<&ReplicaContext>,
    ) -> ExecutionOutcome<Self::Output>;

    /// Runs `context` against every target of `connection` concurrently.
    ///
    /// Outcomes are returned in target order.
    async fn execute_all(
        &self,
        context: &Self::Context,
        connection: &ConnectionContext,
    ) -> Vec<ExecutionOutcome<Self::Output>> {
        let targets = connection.targets();
        join_all(
            targets
                .iter()
                .map(|replica| self.execute(context, replica.as_ref())),
        )
        .await
    }
}

/// Extracts the JSON document from a console response body.
///
/// Some endpoints answer with bare JSON, others wrap it in an HTML page; in
/// the latter case the text of `<body>` is the payload.
pub(crate) fn json_payload(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed.to_string();
    }
    let Ok(selector) = Selector::parse("body") else {
        return trimmed.to_string();
    };
    Html::parse_document(body)
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Collapses runs of whitespace the way rendered HTML text reads.
pub(crate) fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
