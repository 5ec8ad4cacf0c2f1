//! Result of one console action.

use reqwest::StatusCode;

use crate::connection::ReplicaContext;
use crate::http::HacResponse;

/// Outcome of one console action against one replica.
///
/// Always produced, even when the network call fails: the session client
/// turns transport failures into synthetic 503 responses, which surface here
/// as an error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome<T = String> {
    /// HTTP-like status code.
    pub status_code: u16,
    /// Raw textual output of the action.
    pub output: Option<String>,
    /// Structured result, when the action returns one.
    pub result: Option<T>,
    /// Short error description; present iff the action failed.
    pub error_message: Option<String>,
    /// Longer diagnostic (stack trace, failing ImpEx line, ...).
    pub detail_message: Option<String>,
    /// Replica that served the action, `None` for load-balanced requests.
    pub replica: Option<ReplicaContext>,
}

impl<T> ExecutionOutcome<T> {
    /// Successful outcome with status 200 and no payload yet.
    #[must_use]
    pub fn ok(replica: Option<&ReplicaContext>) -> Self {
        Self {
            status_code: StatusCode::OK.as_u16(),
            output: None,
            result: None,
            error_message: None,
            detail_message: None,
            replica: replica.cloned(),
        }
    }

    /// Failed outcome with the given status and message.
    #[must_use]
    pub fn failure(
        status_code: u16,
        message: impl Into<String>,
        replica: Option<&ReplicaContext>,
    ) -> Self {
        Self {
            error_message: Some(message.into()),
            status_code,
            ..Self::ok(replica)
        }
    }

    /// Failure for a non-200 console response: `[<status>] <reason>`.
    #[must_use]
    pub fn from_unexpected_status(response: &HacResponse, replica: Option<&ReplicaContext>) -> Self {
        let status = response.status().as_u16();
        Self::failure(status, format!("[{status}] {}", response.reason()), replica)
    }

    #[must_use]
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    #[must_use]
    pub fn with_result(mut self, result: T) -> Self {
        self.result = Some(result);
        self
    }

    /// Marks the outcome failed while keeping its status code.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail_message = Some(detail.into());
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error_message.is_none()
    }
}
