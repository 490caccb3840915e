//! Error taxonomy for reconciliation passes.
//!
//! Most functions return `anyhow::Result` with context attached at each call
//! site; the variants here exist for the cases callers must branch on
//! (absent resources, unsupported diffs, failed operations) and are wrapped
//! into the `anyhow` chain so they stay downcastable.

use thiserror::Error;

/// Errors a reconciliation pass can surface to the scheduler.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A GCP API call returned a non-success status.
    #[error("API request failed: {status}: {message}")]
    Api { status: u16, message: String },

    /// A diff field has no in-place update path on an existing resource.
    /// Deliberately fatal: unimplemented updates must never be dropped.
    #[error("cannot apply changes to instance: unsupported update of {0}")]
    UnsupportedChange(String),

    /// An asynchronous backend operation finished with errors.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// Backend-returned data contained an identifier we cannot parse.
    #[error("cannot parse Google Cloud URL: {0:?}")]
    MalformedUrl(String),
}

impl TaskError {
    /// True if this is an API error with HTTP status 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TaskError::Api { status: 404, .. })
    }
}

/// Check an `anyhow` chain for a GCP 404, used to map absent resources
/// to `Ok(None)` rather than an error.
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<TaskError>()
            .is_some_and(TaskError::is_not_found)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_not_found_detected_through_context_chain() {
        let err: anyhow::Error = TaskError::Api {
            status: 404,
            message: "instance not found".to_string(),
        }
        .into();
        let wrapped = Err::<(), _>(err)
            .context("failed to get instance")
            .unwrap_err();
        assert!(is_not_found(&wrapped));
    }

    #[test]
    fn test_other_statuses_are_not_not_found() {
        let err: anyhow::Error = TaskError::Api {
            status: 403,
            message: "permission denied".to_string(),
        }
        .into();
        assert!(!is_not_found(&err));
    }
}
