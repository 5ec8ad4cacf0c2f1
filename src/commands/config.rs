//! Config command handlers: show effective connection configuration.

use anyhow::Result;
use hac_core::config::{load_config, resolve_connection};
use hac_core::connection::ReplicaSelection;

use super::ProcessExit;
use crate::cli::Args;

pub fn run_config_show_command(args: &Args) -> Result<ProcessExit> {
    let loaded = load_config(args.config.as_deref())?;
    let resolved = resolve_connection(loaded.config.as_ref(), &args.connection.overrides())?;
    let settings = &resolved.settings;

    let resolved_path = loaded.path.as_ref().map_or_else(
        || "<unresolved>".to_string(),
        |path| path.display().to_string(),
    );
    println!("config_path = {resolved_path}");
    println!(
        "config_file = {}",
        if loaded.loaded_from_file {
            "loaded"
        } else {
            "not found (using defaults)"
        }
    );
    println!("id = {}", settings.id());
    println!("url = {}", settings.url());
    println!("username = {}", settings.username());
    println!("password = <redacted>");
    println!("session_cookie_name = {}", settings.session_cookie_name());
    println!("ssl_protocol = {}", settings.ssl_protocol());
    println!("timeout_ms = {}", resolved.timeout.as_millis());
    println!("replicas = {}", resolved.context);
    if let ReplicaSelection::Manual(replicas) = resolved.context.selection() {
        for replica in replicas {
            println!(
                "replica = {} ({}={})",
                replica.replica_id(),
                replica.cookie_name(),
                replica.cookie_value()
            );
        }
    }

    Ok(ProcessExit::Success)
}
