use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::queue::{Outcome, Request, RequestContext};
use crate::sdk::{ApiClient, OperationItem};

/// Error message the API returns when an operation would not change anything.
pub const NO_OP_MESSAGE: &str = "The server already in desired state.";

/// A batch of queued operations.
///
/// Operations in a batch are not atomic: some may fail while others succeed.
#[derive(Debug, Clone)]
pub struct Requests {
    alias: String,
    requests: Vec<Request>,
    success_requests: Vec<Request>,
    error_requests: Vec<Request>,
}

impl Requests {
    /// Build a batch from a mutating call's response.
    ///
    /// The response may be a single item or an array of items. Items the
    /// server did not queue because they were already in the desired state
    /// are skipped.
    ///
    /// # Errors
    ///
    /// Fails on items with no recognised context and on items that were not
    /// queued for any other reason.
    pub async fn from_response(
        client: ApiClient,
        response: &Value,
        alias: Option<&str>,
    ) -> Result<Self> {
        let alias = client.resolve_alias(alias).await?;
        let items: Vec<OperationItem> = match response {
            Value::Array(_) => serde_json::from_value(response.clone())?,
            _ => vec![serde_json::from_value(response.clone())?],
        };

        let mut requests = Vec::with_capacity(items.len());
        for item in items {
            if let Some(request) = Self::request_for(&client, &alias, item)? {
                requests.push(request);
            }
        }

        Ok(Self::new(alias, requests))
    }

    fn request_for(
        client: &ApiClient,
        alias: &str,
        item: OperationItem,
    ) -> Result<Option<Request>> {
        if let Some(server) = item.server.clone() {
            let context = RequestContext::Server(server);

            if item.is_queued {
                let id = item.status_id().ok_or_else(|| {
                    Error::clc(format!("{} '{}' has no status link", context.kind(), context.value()))
                })?;
                return Ok(Some(Request::new(client.clone(), id, alias, context)));
            }

            let message = item.error_message.unwrap_or_default();
            if message == NO_OP_MESSAGE {
                debug!("Skipping no-op {}: {}", context, message);
                return Ok(None);
            }
            return Err(Error::clc(format!(
                "{} '{}' not added to queue: {}",
                context.kind(),
                context.value(),
                message
            )));
        }

        let status_path = item.status_path();
        if let Some(id) = item.operation_id {
            let context = RequestContext::Operation(id.clone());
            let request = Request::new(client.clone(), id, alias, context);
            return Ok(Some(match status_path {
                Some(path) => request.with_status_path(path),
                None => request,
            }));
        }

        Err(Error::clc("Unknown context"))
    }

    /// Wrap already constructed requests.
    pub fn new(alias: impl Into<String>, requests: Vec<Request>) -> Self {
        Self {
            alias: alias.into(),
            requests,
            success_requests: Vec::new(),
            error_requests: Vec::new(),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Requests still pending.
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// Requests that completed successfully during the last wait.
    pub fn success_requests(&self) -> &[Request] {
        &self.success_requests
    }

    /// Requests that ended `failed`, `resumed` or `unknown` during the last wait.
    pub fn error_requests(&self) -> &[Request] {
        &self.error_requests
    }

    pub fn len(&self) -> usize {
        self.requests.len() + self.success_requests.len() + self.error_requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Poll until every request has completed.
    ///
    /// Returns the number of unsuccessful requests; zero means the whole
    /// batch succeeded. Failed operations are not reported as errors, only
    /// transport or decoding failures are. On such a failure every request
    /// not yet classified stays pending, so the wait can be retried.
    pub async fn wait_until_complete(&mut self, poll_interval: Duration) -> Result<usize> {
        while !self.requests.is_empty() {
            let mut outcomes = Vec::with_capacity(self.requests.len());
            for request in self.requests.iter_mut() {
                outcomes.push(request.status(false).await?);
            }

            let mut pending = Vec::with_capacity(self.requests.len());
            for (request, status) in std::mem::take(&mut self.requests).into_iter().zip(outcomes) {
                match status.outcome() {
                    Outcome::Pending => pending.push(request),
                    Outcome::Success => self.success_requests.push(request),
                    Outcome::Error => {
                        warn!("Request {} ({}) ended {}", request.id(), request.context(), status);
                        self.error_requests.push(request);
                    }
                }
            }

            self.requests = pending;
            if !self.requests.is_empty() {
                sleep(poll_interval).await;
            }
        }

        info!(
            "Batch complete: {} succeeded, {} failed",
            self.success_requests.len(),
            self.error_requests.len()
        );
        Ok(self.error_requests.len())
    }
}
