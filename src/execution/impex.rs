//! ImpEx import console.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use scraper::{ElementRef, Html, Selector};
use tracing::{instrument, warn};

use super::{ExecutionClient, ExecutionOutcome, normalize_text};
use crate::connection::{ConnectionSettings, DEFAULT_TIMEOUT, ReplicaContext};
use crate::http::HacHttpClient;

const IMPORT_PATH: &str = "/console/impex/import";
const VALIDATE_PATH: &str = "/console/impex/import/validate";
const NO_DATA_MESSAGE: &str = "No data in response";

/// Whether the console imports the content or only validates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImpExMode {
    #[default]
    Import,
    Validate,
}

impl ImpExMode {
    fn path(self) -> &'static str {
        match self {
            Self::Import => IMPORT_PATH,
            Self::Validate => VALIDATE_PATH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    #[default]
    ImportStrict,
    ImportRelaxed,
}

impl ValidationMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::ImportStrict => "IMPORT_STRICT",
            Self::ImportRelaxed => "IMPORT_RELAXED",
        }
    }
}

/// On/off switch of the import form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    fn flag(self) -> &'static str {
        match self {
            Self::On => "true",
            Self::Off => "false",
        }
    }

    fn checkbox(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

/// One ImpEx import or validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpExContext {
    pub content: String,
    pub mode: ImpExMode,
    pub validation_mode: ValidationMode,
    pub encoding: String,
    pub max_threads: u32,
    pub legacy_mode: Toggle,
    pub enable_code_execution: Toggle,
    pub sld_enabled: Toggle,
    pub distributed_mode: Toggle,
}

impl ImpExContext {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            mode: ImpExMode::default(),
            validation_mode: ValidationMode::default(),
            encoding: "UTF-8".to_string(),
            max_threads: 20,
            legacy_mode: Toggle::Off,
            enable_code_execution: Toggle::On,
            sld_enabled: Toggle::On,
            distributed_mode: Toggle::On,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ImpExMode) -> Self {
        self.mode = mode;
        self
    }

    fn params(&self) -> Vec<(String, String)> {
        vec![
            ("scriptContent".to_string(), self.content.clone()),
            (
                "validationEnum".to_string(),
                self.validation_mode.as_str().to_string(),
            ),
            ("encoding".to_string(), self.encoding.clone()),
            ("maxThreads".to_string(), self.max_threads.to_string()),
            ("legacyMode".to_string(), self.legacy_mode.flag().to_string()),
            (
                "enableCodeExecution".to_string(),
                self.enable_code_execution.flag().to_string(),
            ),
            ("sldEnabled".to_string(), self.sld_enabled.flag().to_string()),
            (
                "_sldEnabled".to_string(),
                self.sld_enabled.checkbox().to_string(),
            ),
            (
                "_enableCodeExecution".to_string(),
                self.enable_code_execution.checkbox().to_string(),
            ),
            (
                "_legacyMode".to_string(),
                self.legacy_mode.checkbox().to_string(),
            ),
            (
                "_distributedMode".to_string(),
                self.distributed_mode.checkbox().to_string(),
            ),
        ]
    }
}

/// Imports or validates ImpEx content.
///
/// Imports are not idempotent, so a stale session is never retried here.
#[derive(Debug, Clone)]
pub struct ImpExClient {
    http: Arc<HacHttpClient>,
    settings: ConnectionSettings,
}

impl ImpExClient {
    #[must_use]
    pub fn new(http: Arc<HacHttpClient>, settings: ConnectionSettings) -> Self {
        Self { http, settings }
    }
}

#[async_trait]
impl ExecutionClient for ImpExClient {
    type Context = ImpExContext;
    type Output = String;

    #[instrument(skip(self, context), fields(mode = ?context.mode))]
    async fn execute(
        &self,
        context: &ImpExContext,
        replica: Option<&ReplicaContext>,
    ) -> ExecutionOutcome {
        let url = self.settings.endpoint(context.mode.path());
        let response = self
            .http
            .post(
                &url,
                &context.params(),
                false,
                DEFAULT_TIMEOUT,
                &self.settings,
                replica,
            )
            .await;

        let status = response.status();
        if status != StatusCode::OK {
            return ExecutionOutcome::failure(status.as_u16(), response.reason(), replica);
        }

        let outcome = match context.mode {
            ImpExMode::Import => parse_import(response.body(), replica),
            ImpExMode::Validate => parse_validation(response.body(), replica),
        };
        if let Some(message) = &outcome.error_message {
            warn!(url = %url, error = %message, "ImpEx reported an error");
        }
        outcome
    }
}

/// Result element carrying both `data-level` and `data-result`.
fn result_element<'a>(document: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(&format!("#{id}")).ok()?;
    document.select(&selector).next().filter(|element| {
        let value = element.value();
        value.attr("data-level").is_some() && value.attr("data-result").is_some()
    })
}

fn parse_import(body: &str, replica: Option<&ReplicaContext>) -> ExecutionOutcome {
    let document = Html::parse_document(body);
    let Some(element) = result_element(&document, "impexResult") else {
        return ExecutionOutcome::ok(replica).with_error(NO_DATA_MESSAGE);
    };
    let level = element.value().attr("data-level").unwrap_or_default();
    let data_result = element.value().attr("data-result").unwrap_or_default();

    if level != "error" {
        return ExecutionOutcome::ok(replica).with_output(data_result);
    }
    match first_failure_line(&document) {
        Some(detail) => ExecutionOutcome::ok(replica)
            .with_error(data_result)
            .with_detail(detail),
        None => ExecutionOutcome::ok(replica).with_error(NO_DATA_MESSAGE),
    }
}

/// Text of the first child of the first `.impexResult` block.
fn first_failure_line(document: &Html) -> Option<String> {
    let selector = Selector::parse(".impexResult").ok()?;
    document
        .select(&selector)
        .next()?
        .children()
        .find_map(ElementRef::wrap)
        .map(|child| normalize_text(&child.text().collect::<String>()))
}

fn parse_validation(body: &str, replica: Option<&ReplicaContext>) -> ExecutionOutcome {
    let document = Html::parse_document(body);
    let Some(element) = result_element(&document, "validationResultMsg") else {
        return ExecutionOutcome::ok(replica).with_error(NO_DATA_MESSAGE);
    };
    let data_result = element.value().attr("data-result").unwrap_or_default();
    if element.value().attr("data-level") == Some("error") {
        ExecutionOutcome::ok(replica).with_error(data_result)
    } else {
        ExecutionOutcome::ok(replica).with_output(data_result)
    }
}
