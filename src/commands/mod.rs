//! CLI command handlers.

mod config;
mod connection;
mod console;

use std::process::ExitCode;

use anyhow::Result;

use crate::cli::{Args, Command, ConfigCommand};

pub use config::run_config_show_command;
pub use connection::run_test_connection_command;
pub use console::{
    run_flexsearch_command, run_groovy_command, run_impex_command, run_logger_command,
};

/// Process exit outcome of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    Success,
    Failure,
}

impl ProcessExit {
    pub(crate) fn from_success(success: bool) -> Self {
        if success { Self::Success } else { Self::Failure }
    }
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::FAILURE,
        }
    }
}

/// Runs the subcommand selected in `args`.
pub async fn dispatch(args: &Args) -> Result<ProcessExit> {
    match &args.command {
        Command::Config { command } => match command {
            ConfigCommand::Show => run_config_show_command(args),
        },
        Command::TestConnection => run_test_connection_command(args).await,
        Command::Groovy { script, commit } => run_groovy_command(args, script, *commit).await,
        Command::Flexsearch {
            query,
            sql,
            max_count,
            commit,
        } => run_flexsearch_command(args, query, *sql, *max_count, *commit).await,
        Command::Impex { file, validate } => run_impex_command(args, file, *validate).await,
        Command::Logger { name, level } => run_logger_command(args, name, *level).await,
    }
}
