//! Configuration for the `clc` command-line client.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cli::Command;
use crate::queue::DEFAULT_POLL_INTERVAL;
use crate::sdk::{ClientOptions, Credentials};
use crate::DEFAULT_ENDPOINT;

/// Command-line arguments for the `clc` client.
#[derive(Parser, Debug, Clone)]
#[command(name = "clc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Command-line client for the CenturyLink Cloud v2 API")]
pub struct Args {
    /// API endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT, env = "CLC_V2_API_URL")]
    pub endpoint: String,

    /// API username
    #[arg(short, long, env = "CLC_V2_API_USERNAME")]
    pub username: Option<String>,

    /// API password
    #[arg(short, long, env = "CLC_V2_API_PASSWD", hide_env_values = true)]
    pub password: Option<String>,

    /// Account alias (defaults to the logged-in account's)
    #[arg(short, long, global = true, env = "CLC_ALIAS")]
    pub alias: Option<String>,

    /// Datacenter location (defaults to the logged-in account's)
    #[arg(short, long, global = true, env = "CLC_LOCATION")]
    pub location: Option<String>,

    /// Seconds between operation status polls
    #[arg(long, default_value = "2", env = "CLC_POLL_INTERVAL")]
    pub poll_interval: u64,

    /// Skip TLS certificate verification
    #[arg(long, env = "CLC_NO_SSL_VERIFY")]
    pub no_ssl_verify: bool,

    /// Enable debug logging, including request/response dumps
    #[arg(short, long, env = "CLC_DEBUG")]
    pub debug: bool,

    /// Log API metrics when the command finishes
    #[arg(long, env = "CLC_METRICS")]
    pub metrics: bool,

    /// Output format
    #[arg(short, long, default_value = "json", env = "CLC_OUTPUT")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API endpoint
    pub endpoint: String,
    /// API username
    pub username: Option<String>,
    /// API password
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Account alias override
    pub alias: Option<String>,
    /// Location override
    pub location: Option<String>,
    /// Poll interval in seconds
    pub poll_interval: u64,
    /// Verify TLS certificates
    pub ssl_verify: bool,
    /// Debug mode
    pub debug: bool,
    /// Metrics enabled
    pub metrics: bool,
    /// Output format
    pub output: OutputFormat,
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    /// Options for building an [`ApiClient`](crate::sdk::ApiClient).
    pub fn client_options(&self, credentials: Option<Credentials>) -> ClientOptions {
        ClientOptions {
            endpoint: self.endpoint.clone(),
            credentials,
            alias: self.alias.clone(),
            location: self.location.clone(),
            ssl_verify: self.ssl_verify,
            debug: self.debug,
        }
    }
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Self {
            endpoint: args.endpoint.clone(),
            username: args.username.clone(),
            password: args.password.clone(),
            alias: args.alias.clone(),
            location: args.location.clone(),
            poll_interval: args.poll_interval,
            ssl_verify: !args.no_ssl_verify,
            debug: args.debug,
            metrics: args.metrics,
            output: args.output,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            username: None,
            password: None,
            alias: None,
            location: None,
            poll_interval: DEFAULT_POLL_INTERVAL.as_secs(),
            ssl_verify: true,
            debug: false,
            metrics: false,
            output: OutputFormat::Json,
        }
    }
}
