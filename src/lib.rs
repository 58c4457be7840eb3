//! CenturyLink Cloud v2 API client.
//!
//! Bindings for the v2 REST API and the `clc` command-line client built on
//! them.
//!
//! # Architecture
//!
//! 1. **SDK Layer** (`sdk`) - HTTP client, login, credential resolution
//! 2. **Resource Layer** (`resources`) - datacenters, networks, servers,
//!    groups, templates and autoscale policies
//! 3. **Queue Layer** (`queue`) - polling of asynchronous operations
//! 4. **CLI Layer** (`cli`, `config`) - the `clc` binary
//!
//! Mutating calls return [`queue::Requests`]; waiting on them reports how
//! many operations failed rather than failing outright.

pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod resources;
pub mod sdk;

pub use error::{Error, Result};

/// Crate version, also sent in the user agent
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.ctl.io";
