//! Connection resolution and the connectivity check.

use anyhow::Result;
use hac_core::config::{ResolvedConnection, load_config, resolve_connection};
use hac_core::http::HacHttpClient;
use tracing::debug;

use super::ProcessExit;
use crate::cli::Args;

/// Loads the profile and applies command-line overrides.
pub fn resolve(args: &Args) -> Result<ResolvedConnection> {
    let loaded = load_config(args.config.as_deref())?;
    if let Some(path) = loaded.path.as_deref().filter(|_| loaded.loaded_from_file) {
        debug!(path = %path.display(), "loaded connection profile");
    }
    resolve_connection(loaded.config.as_ref(), &args.connection.overrides())
}

pub async fn run_test_connection_command(args: &Args) -> Result<ProcessExit> {
    let resolved = resolve(args)?;
    let client = HacHttpClient::new();

    match client.test_connection(&resolved.settings).await {
        Ok(()) => {
            if !args.quiet {
                println!("Connected to {}", resolved.settings.url());
            }
            Ok(ProcessExit::Success)
        }
        Err(error) => {
            eprintln!(
                "Connection to {} failed: {}",
                resolved.settings.url(),
                error.detailed_message()
            );
            Ok(ProcessExit::Failure)
        }
    }
}
