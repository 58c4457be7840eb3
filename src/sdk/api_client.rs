//! HTTP client for the v2 API.
//!
//! Handles bearer-token login, alias/location discovery and the generic
//! authenticated call used by every resource binding.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::sdk::credentials::Credentials;
use crate::sdk::types::{ClientOptions, LoginResponse, Session};
use crate::VERSION;

/// Characters escaped when an identifier is placed in a URL path.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?');

/// Escape an identifier for use as a single path segment.
pub fn segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// User agent string for API requests.
fn user_agent() -> String {
    format!("clc-sdk/{} (rust)", VERSION)
}

/// Request payload.
///
/// `Params` are sent as the query string for GET and as a form body for
/// other methods. `Json` is always sent as a JSON body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    Params(Vec<(String, String)>),
    Json(Value),
}

impl Payload {
    /// Build a `Params` payload from key/value pairs.
    pub fn params<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Params(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Default)]
struct ClientState {
    credentials: Option<Credentials>,
    session: Option<Session>,
}

/// API client for the v2 API.
///
/// Cloning is cheap; clones share credentials, session and metrics.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    endpoint: String,
    alias: Option<String>,
    location: Option<String>,
    debug: bool,
    state: Arc<RwLock<ClientState>>,
    metrics: Arc<Metrics>,
}

impl ApiClient {
    /// Create a new API client. No request is made until the first call.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(Duration::from_secs(300))
            .danger_accept_invalid_certs(!options.ssl_verify)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: options.endpoint.trim_end_matches('/').to_string(),
            alias: options.alias,
            location: options.location,
            debug: options.debug,
            state: Arc::new(RwLock::new(ClientState {
                credentials: options.credentials,
                session: None,
            })),
            metrics: Metrics::new(),
        })
    }

    /// Get the API endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the shared metrics collector.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Replace the credentials and drop any existing session.
    pub async fn set_credentials(&self, credentials: Credentials) {
        let mut state = self.state.write().await;
        state.credentials = Some(credentials);
        state.session = None;
    }

    /// Log in and store the bearer token, account alias and location alias.
    pub async fn login(&self) -> Result<Session> {
        let mut state = self.state.write().await;
        self.login_locked(&mut state).await
    }

    async fn login_locked(&self, state: &mut ClientState) -> Result<Session> {
        let credentials = state.credentials.clone().ok_or(Error::ApiNotEnabled)?;

        let url = format!("{}/v2/authentication/login", self.endpoint);
        self.metrics.inc_api_calls();
        let response = self
            .client
            .post(&url)
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::OK {
            let body: LoginResponse = serde_json::from_str(&text)?;
            let session = Session::from(body);
            info!(
                "Logged in to {} as alias {} ({})",
                self.endpoint, session.account_alias, session.location_alias
            );
            self.metrics.inc_logins();
            state.session = Some(session.clone());
            return Ok(session);
        }

        self.metrics.inc_api_errors();
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or(text);

        if status == StatusCode::BAD_REQUEST {
            Err(Error::Login(format!("Invalid V2 API login.  {}", message)))
        } else {
            Err(Error::Login(format!(
                "Error logging into V2 API.  Response code {}. message {}",
                status.as_u16(),
                message
            )))
        }
    }

    /// Current session, logging in first if needed.
    pub async fn session(&self) -> Result<Session> {
        if let Some(session) = self.state.read().await.session.clone() {
            return Ok(session);
        }

        // Another clone may have logged in while we waited for the lock.
        let mut state = self.state.write().await;
        if let Some(session) = state.session.clone() {
            return Ok(session);
        }
        self.login_locked(&mut state).await
    }

    /// Account alias: the configured override, else the logged-in account's.
    pub async fn alias(&self) -> Result<String> {
        match &self.alias {
            Some(alias) => Ok(alias.clone()),
            None => Ok(self.session().await?.account_alias),
        }
    }

    /// Location: the configured override, else the logged-in account's.
    pub async fn location(&self) -> Result<String> {
        match &self.location {
            Some(location) => Ok(location.clone()),
            None => Ok(self.session().await?.location_alias),
        }
    }

    /// Use `alias` if given, else [`ApiClient::alias`].
    pub async fn resolve_alias(&self, alias: Option<&str>) -> Result<String> {
        match alias {
            Some(alias) => Ok(alias.to_string()),
            None => self.alias().await,
        }
    }

    /// Use `location` if given, else [`ApiClient::location`].
    pub async fn resolve_location(&self, location: Option<&str>) -> Result<String> {
        match location {
            Some(location) => Ok(location.to_string()),
            None => self.location().await,
        }
    }

    /// Fully qualified URL for a path.
    ///
    /// Absolute paths (as found in API links) are joined to the endpoint,
    /// relative ones to `{endpoint}/v2/`.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.endpoint, path)
        } else {
            format!("{}/v2/{}", self.endpoint, path)
        }
    }

    /// Execute an authenticated API call and decode the JSON result.
    ///
    /// A 2xx response with an empty or non-JSON body decodes as `{}`.
    pub async fn call(&self, method: Method, path: &str, payload: Payload) -> Result<Value> {
        let session = self.session().await?;
        let url = self.url(path);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(&session.bearer_token);

        request = match &payload {
            Payload::Empty => request,
            Payload::Params(params) if method == Method::GET => request.query(params),
            Payload::Params(params) => request.form(params),
            Payload::Json(body) => request.json(body),
        };

        if self.debug {
            debug!(
                "-----------REQUEST-----------\n{} {}\n{:?}",
                method, url, payload
            );
        }

        self.metrics.inc_api_calls();
        let response = request.send().await?;
        self.handle_response(&method, &url, response).await
    }

    /// Handle API response, extracting errors.
    async fn handle_response(&self, method: &Method, url: &str, response: Response) -> Result<Value> {
        let status = response.status();
        let text = response.text().await?;

        if self.debug {
            debug!(
                "-----------RESPONSE-----------\nstatus: {}\n\n{}",
                status.as_u16(),
                text
            );
        }

        if !status.is_success() {
            self.metrics.inc_api_errors();
            return Err(Error::api(status.as_u16(), method.as_str(), url, text));
        }

        Ok(serde_json::from_str(&text).unwrap_or_else(|_| Value::Object(Default::default())))
    }

    /// `GET` without parameters.
    pub async fn get(&self, path: &str) -> Result<Value> {
        self.call(Method::GET, path, Payload::Empty).await
    }

    /// `POST` with the given payload.
    pub async fn post(&self, path: &str, payload: Payload) -> Result<Value> {
        self.call(Method::POST, path, payload).await
    }

    /// `PUT` with the given payload.
    pub async fn put(&self, path: &str, payload: Payload) -> Result<Value> {
        self.call(Method::PUT, path, payload).await
    }

    /// `DELETE` without a payload.
    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.call(Method::DELETE, path, Payload::Empty).await
    }
}
