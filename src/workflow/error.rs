//! Workflow-service error types.

use thiserror::Error;

/// Errors talking to the workflow service.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Transport-level failure (connection, timeout, TLS).
    #[error("workflow service request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("workflow service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The service answered successfully but the payload did not have the
    /// expected shape.
    #[error("malformed workflow payload: {0}")]
    Payload(String),
}

impl WorkflowError {
    /// Whether the polling loop should back off and retry the cycle rather
    /// than treat this as fatal.
    pub fn is_transient(&self) -> bool {
        match self {
            WorkflowError::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            WorkflowError::Api { status, .. } => *status == 429 || (500..600).contains(status),
            WorkflowError::Payload(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_rate_limits_are_transient() {
        for status in [429, 500, 502, 503] {
            let err = WorkflowError::Api {
                status,
                message: String::new(),
            };
            assert!(err.is_transient(), "status: {status}");
        }
    }

    #[test]
    fn client_errors_and_bad_payloads_are_not_transient() {
        let api = WorkflowError::Api {
            status: 404,
            message: String::new(),
        };
        assert!(!api.is_transient());

        let payload = WorkflowError::Payload("missing field".to_string());
        assert!(!payload.is_transient());
    }
}
