//! Transport layer for the v2 API.
//!
//! - `api_client` - authenticated HTTP client and session handling
//! - `credentials` - username/password resolution
//! - `types` - wire types shared by the resource bindings

pub mod api_client;
pub mod credentials;
pub mod types;

pub use api_client::{segment, ApiClient, Payload};
pub use credentials::{resolve_credentials, Credentials};
pub use types::*;
