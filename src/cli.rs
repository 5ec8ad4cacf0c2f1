//! CLI argument definitions using clap derive macros.

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use hac_core::config::ConnectionOverrides;
use hac_core::execution::{DEFAULT_MAX_COUNT, LogLevel};

/// Talk to an SAP Commerce administration console from the terminal.
///
/// Logs in with form authentication, keeps the session per replica and runs
/// Groovy scripts, FlexibleSearch queries, ImpEx imports and logger changes.
#[derive(Parser, Debug)]
#[command(name = "hac")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Connection profile to use instead of the default config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection flags; each overrides the matching profile key.
#[derive(clap::Args, Clone, Default)]
pub struct ConnectionArgs {
    /// Console base URL, e.g. https://localhost:9002/hac
    #[arg(long)]
    pub url: Option<String>,

    /// Console username
    #[arg(short, long)]
    pub username: Option<String>,

    /// Console password
    #[arg(long, env = "HAC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// TLS protocol: TLS, TLSv1.2 or TLSv1.3
    #[arg(long, value_name = "PROTOCOL")]
    pub ssl_protocol: Option<String>,

    /// Name of the session cookie (default JSESSIONID)
    #[arg(long, value_name = "NAME")]
    pub session_cookie_name: Option<String>,

    /// Request timeout in milliseconds (1-3600000)
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..=3_600_000))]
    pub timeout_ms: Option<u64>,

    /// Pin requests to a replica (repeatable)
    #[arg(long = "replica", value_name = "ID")]
    pub replicas: Vec<String>,

    /// Routing cookie for --replica (default: CCv2 ROUTE cookie)
    #[arg(long, value_name = "NAME")]
    pub replica_cookie: Option<String>,
}

impl ConnectionArgs {
    pub fn overrides(&self) -> ConnectionOverrides {
        ConnectionOverrides {
            url: self.url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            session_cookie_name: self.session_cookie_name.clone(),
            ssl_protocol: self.ssl_protocol.clone(),
            timeout_ms: self.timeout_ms,
            replicas: self.replicas.clone(),
            replica_cookie: self.replica_cookie.clone(),
        }
    }
}

impl fmt::Debug for ConnectionArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionArgs")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("ssl_protocol", &self.ssl_protocol)
            .field("session_cookie_name", &self.session_cookie_name)
            .field("timeout_ms", &self.timeout_ms)
            .field("replicas", &self.replicas)
            .field("replica_cookie", &self.replica_cookie)
            .finish()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and report whether the console accepted the credentials
    TestConnection,

    /// Run a Groovy script (use - to read it from stdin)
    Groovy {
        #[arg(value_name = "FILE")]
        script: PathBuf,

        /// Commit the script's changes instead of rolling them back
        #[arg(long)]
        commit: bool,
    },

    /// Run a FlexibleSearch (or SQL) query and print the rows as TSV
    Flexsearch {
        query: String,

        /// Treat the query as raw SQL
        #[arg(long)]
        sql: bool,

        /// Maximum number of rows to return
        #[arg(long, default_value_t = DEFAULT_MAX_COUNT, value_parser = clap::value_parser!(u32).range(1..=1_000_000))]
        max_count: u32,

        /// Commit instead of rolling back
        #[arg(long)]
        commit: bool,
    },

    /// Import an ImpEx file (use - to read it from stdin)
    Impex {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Only validate the content
        #[arg(long)]
        validate: bool,
    },

    /// Change the level of a logger
    Logger {
        name: String,

        /// ALL, TRACE, DEBUG, INFO, WARN, ERROR, FATAL or OFF
        level: LogLevel,
    },

    /// Inspect the effective connection configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the resolved connection settings
    Show,
}
