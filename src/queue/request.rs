use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{Error, Result};
use crate::queue::{Outcome, RequestStatus};
use crate::resources::Server;
use crate::sdk::{segment, ApiClient, StatusResponse};

/// Resource an operation acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestContext {
    Server(String),
    /// Bare operation id with no resource attached (network claim, add NIC)
    Operation(String),
}

impl RequestContext {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Server(_) => "server",
            Self::Operation(_) => "operation",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Server(v) | Self::Operation(v) => v,
        }
    }
}

impl std::fmt::Display for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind(), self.value())
    }
}

/// A single queued operation.
#[derive(Debug, Clone)]
pub struct Request {
    client: ApiClient,
    id: String,
    alias: String,
    context: RequestContext,
    /// Status URI returned by the server, if it named one
    status_path: Option<String>,
    status: Option<RequestStatus>,
    time_created: DateTime<Utc>,
    time_executed: Option<DateTime<Utc>>,
    time_completed: Option<DateTime<Utc>>,
}

impl Request {
    pub fn new(
        client: ApiClient,
        id: impl Into<String>,
        alias: impl Into<String>,
        context: RequestContext,
    ) -> Self {
        Self {
            client,
            id: id.into(),
            alias: alias.into(),
            context,
            status_path: None,
            status: None,
            time_created: Utc::now(),
            time_executed: None,
            time_completed: None,
        }
    }

    /// Poll `path` instead of `operations/{alias}/status/{id}`.
    pub fn with_status_path(mut self, path: impl Into<String>) -> Self {
        self.status_path = Some(path.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Last status observed, without polling.
    pub fn last_status(&self) -> Option<RequestStatus> {
        self.status
    }

    pub fn time_created(&self) -> DateTime<Utc> {
        self.time_created
    }

    /// First time the operation was seen executing.
    pub fn time_executed(&self) -> Option<DateTime<Utc>> {
        self.time_executed
    }

    /// Time a terminal status was observed.
    pub fn time_completed(&self) -> Option<DateTime<Utc>> {
        self.time_completed
    }

    /// Current status of the operation.
    ///
    /// With `cached` the last observed status is returned when there is one.
    pub async fn status(&mut self, cached: bool) -> Result<RequestStatus> {
        if cached {
            if let Some(status) = self.status {
                return Ok(status);
            }
        }

        let path = match &self.status_path {
            Some(path) => path.clone(),
            None => format!(
                "operations/{}/status/{}",
                segment(&self.alias),
                segment(&self.id)
            ),
        };
        self.client.metrics().inc_status_polls();
        let value = self.client.get(&path).await?;
        let response: StatusResponse = serde_json::from_value(value)?;

        self.observe(response.status);
        Ok(response.status)
    }

    /// Record a status and the timestamps it implies.
    pub(crate) fn observe(&mut self, status: RequestStatus) -> Outcome {
        self.status = Some(status);
        if status == RequestStatus::Executing && self.time_executed.is_none() {
            self.time_executed = Some(Utc::now());
        }
        let outcome = status.outcome();
        if outcome != Outcome::Pending && self.time_completed.is_none() {
            self.time_completed = Some(Utc::now());
        }
        outcome
    }

    /// Poll until the operation completes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] when the operation ends `failed`,
    /// `resumed` or `unknown`.
    pub async fn wait_until_complete(&mut self, poll_interval: Duration) -> Result<()> {
        loop {
            let status = self.status(false).await?;
            match status.outcome() {
                Outcome::Success => {
                    debug!("Request {} ({}) succeeded", self.id, self.context);
                    return Ok(());
                }
                Outcome::Error => {
                    return Err(Error::OperationFailed {
                        context: self.context.to_string(),
                        status: status.to_string(),
                    });
                }
                Outcome::Pending => sleep(poll_interval).await,
            }
        }
    }

    /// Server this request acts on.
    pub async fn server(&self) -> Result<Server> {
        match &self.context {
            RequestContext::Server(id) => {
                Server::get(self.client.clone(), id, Some(&self.alias)).await
            }
            other => Err(Error::clc(format!("{} object not server", other.kind()))),
        }
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}
