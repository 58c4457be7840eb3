//! Asynchronous operation queue.
//!
//! Mutating API calls return operation ids rather than results. A
//! [`Request`] tracks one of them; [`Requests`] tracks a batch and reports
//! partial failure as a count instead of an error.

mod request;
mod requests;

pub use request::{Request, RequestContext};
pub use requests::{Requests, NO_OP_MESSAGE};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Status of a queued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestStatus {
    NotStarted,
    Executing,
    Resumed,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Outcome of a status observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Success,
    Error,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "notStarted",
            Self::Executing => "executing",
            Self::Resumed => "resumed",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }

    /// Classify the status. `resumed` and `unknown` count as errors.
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::NotStarted | Self::Executing => Outcome::Pending,
            Self::Succeeded => Outcome::Success,
            Self::Failed | Self::Resumed | Self::Unknown => Outcome::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome() != Outcome::Pending
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_deserialization() {
        let statuses = [
            ("\"notStarted\"", RequestStatus::NotStarted),
            ("\"executing\"", RequestStatus::Executing),
            ("\"resumed\"", RequestStatus::Resumed),
            ("\"succeeded\"", RequestStatus::Succeeded),
            ("\"failed\"", RequestStatus::Failed),
            ("\"unknown\"", RequestStatus::Unknown),
        ];

        for (json, expected) in &statuses {
            let status: RequestStatus = serde_json::from_str(json).unwrap();
            assert_eq!(status, *expected);
            assert_eq!(serde_json::to_string(&status).unwrap(), *json);
        }
    }

    #[test]
    fn test_unrecognised_status_is_unknown() {
        let status: RequestStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(status, RequestStatus::Unknown);
    }

    #[test]
    fn test_outcome_classification() {
        assert_eq!(RequestStatus::NotStarted.outcome(), Outcome::Pending);
        assert_eq!(RequestStatus::Executing.outcome(), Outcome::Pending);
        assert_eq!(RequestStatus::Succeeded.outcome(), Outcome::Success);
        assert_eq!(RequestStatus::Failed.outcome(), Outcome::Error);
        assert_eq!(RequestStatus::Resumed.outcome(), Outcome::Error);
        assert_eq!(RequestStatus::Unknown.outcome(), Outcome::Error);
        assert!(!RequestStatus::Executing.is_terminal());
        assert!(RequestStatus::Resumed.is_terminal());
    }
}
