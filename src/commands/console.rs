//! Console action handlers: Groovy, FlexibleSearch, ImpEx and logger levels.

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use hac_core::execution::{
    ExecutionClient, ExecutionOutcome, FlexibleSearchClient, FlexibleSearchContext, GroovyClient,
    GroovyContext, ImpExClient, ImpExContext, ImpExMode, LogLevel, LoggerLevel, LoggingClient,
    LoggingContext, QueryMode, TransactionMode,
};
use hac_core::http::HacHttpClient;
use tracing::info;

use super::ProcessExit;
use super::connection::resolve;
use crate::cli::Args;

const STDIN_PATH: &str = "-";

pub async fn run_groovy_command(args: &Args, script: &Path, commit: bool) -> Result<ProcessExit> {
    let resolved = resolve(args)?;
    let script = read_source(script)?;
    let context = GroovyContext::new(script)
        .with_transaction_mode(TransactionMode::from_commit_flag(commit))
        .with_timeout(resolved.timeout);

    if let Some(description) = resolved.context.description() {
        info!("{description}");
    }
    let client = GroovyClient::new(Arc::new(HacHttpClient::new()), resolved.settings);
    let outcomes = client.execute_all(&context, &resolved.context).await;
    let multiple = outcomes.len() > 1;

    let mut success = true;
    for outcome in &outcomes {
        if multiple {
            println!("{}", replica_banner(outcome));
        }
        success &= report(outcome, |result| println!("{result}"));
    }
    Ok(ProcessExit::from_success(success))
}

pub async fn run_flexsearch_command(
    args: &Args,
    query: &str,
    sql: bool,
    max_count: u32,
    commit: bool,
) -> Result<ProcessExit> {
    let resolved = resolve(args)?;
    let mode = if sql {
        QueryMode::Sql
    } else {
        QueryMode::FlexibleSearch
    };
    let context = FlexibleSearchContext::new(query)
        .with_query_mode(mode)
        .with_max_count(max_count)
        .with_transaction_mode(TransactionMode::from_commit_flag(commit))
        .with_timeout(resolved.timeout);

    let client = FlexibleSearchClient::new(Arc::new(HacHttpClient::new()), resolved.settings);
    let outcome = client.execute(&context, None).await;
    Ok(ProcessExit::from_success(report(&outcome, |_| {})))
}

pub async fn run_impex_command(args: &Args, file: &Path, validate: bool) -> Result<ProcessExit> {
    let resolved = resolve(args)?;
    let content = read_source(file)?;
    let mode = if validate {
        ImpExMode::Validate
    } else {
        ImpExMode::Import
    };
    let context = ImpExContext::new(content).with_mode(mode);

    let client = ImpExClient::new(Arc::new(HacHttpClient::new()), resolved.settings);
    let outcome = client.execute(&context, None).await;
    Ok(ProcessExit::from_success(report(&outcome, |_| {})))
}

pub async fn run_logger_command(args: &Args, name: &str, level: LogLevel) -> Result<ProcessExit> {
    let resolved = resolve(args)?;
    let mut context = LoggingContext::new(name, level);
    context.timeout = resolved.timeout;

    let client = LoggingClient::new(Arc::new(HacHttpClient::new()), resolved.settings);
    let outcome = client.execute(&context, None).await;
    Ok(ProcessExit::from_success(report(&outcome, |loggers| {
        for logger in loggers {
            println!("{}", render_logger(logger));
        }
    })))
}

/// Prints an outcome's output and result to stdout and its error to stderr.
///
/// Returns whether the outcome succeeded.
fn report<T>(outcome: &ExecutionOutcome<T>, print_result: impl FnOnce(&T)) -> bool {
    if let Some(output) = outcome.output.as_deref().filter(|output| !output.is_empty()) {
        print!("{output}");
        if !output.ends_with('\n') {
            println!();
        }
    }
    if let Some(result) = &outcome.result {
        print_result(result);
    }
    if let Some(error) = &outcome.error_message {
        eprintln!("Error [{}]: {error}", outcome.status_code);
        if let Some(detail) = &outcome.detail_message {
            eprintln!("{detail}");
        }
        return false;
    }
    true
}

fn replica_banner<T>(outcome: &ExecutionOutcome<T>) -> String {
    match &outcome.replica {
        Some(replica) => format!("=== replica {} ===", replica.replica_id()),
        None => "=== auto ===".to_string(),
    }
}

fn render_logger(logger: &LoggerLevel) -> String {
    format!(
        "{}\t{}\t{}",
        logger.name,
        logger.effective_level,
        logger.parent_name.as_deref().unwrap_or("-")
    )
}

/// Reads a script or ImpEx file, or stdin for `-`.
fn read_source(path: &Path) -> Result<String> {
    if path.as_os_str() == STDIN_PATH {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        return Ok(buffer);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hac_core::connection::ReplicaContext;

    #[test]
    fn test_report_success_and_failure() {
        let ok: ExecutionOutcome = ExecutionOutcome::ok(None).with_output("done");
        assert!(report(&ok, |_| {}));

        let failed: ExecutionOutcome = ExecutionOutcome::failure(400, "boom", None);
        assert!(!report(&failed, |_| {}));
    }

    #[test]
    fn test_replica_banner() {
        let replica = ReplicaContext::ccv2("api-0");
        let pinned: ExecutionOutcome = ExecutionOutcome::ok(Some(&replica));
        assert_eq!(replica_banner(&pinned), "=== replica api-0 ===");
        let auto: ExecutionOutcome = ExecutionOutcome::ok(None);
        assert_eq!(replica_banner(&auto), "=== auto ===");
    }

    #[test]
    fn test_render_logger_without_parent() {
        let logger = LoggerLevel {
            name: "root".to_string(),
            effective_level: "INFO".to_string(),
            parent_name: None,
        };
        assert_eq!(render_logger(&logger), "root\tINFO\t-");
    }

    #[test]
    fn test_read_source_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.groovy");
        fs::write(&path, "println 'hi'").unwrap();
        assert_eq!(read_source(&path).unwrap(), "println 'hi'");
        assert!(read_source(&dir.path().join("missing.groovy")).is_err());
    }
}
