//! Blocking completion poller for zone operations
//!
//! Mutating Compute Engine calls return immediately with an operation
//! handle; this poller re-queries the operation's status at a fixed
//! interval until it is terminal. There is deliberately no backoff,
//! timeout, or cancellation here: parallelism lives across resources, not
//! within one pass, and callers must not assume a bounded wait.

use super::client::GcpClient;
use super::compute::Operation;
use super::urls::last_component;
use crate::error::TaskError;
use anyhow::{Context, Result};
use std::time::Duration;

/// Fixed delay between status polls.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Block until `op` reaches a terminal state.
///
/// Returns an error carrying the first listed failure message if the
/// operation finished with errors; logs any warnings and succeeds
/// otherwise.
pub async fn wait_completion(cloud: &GcpClient, op: &Operation) -> Result<()> {
    let zone = last_component(op.zone.as_deref().unwrap_or_default()).to_string();

    let status = loop {
        let status = cloud
            .zone_operation_get(&zone, &op.name)
            .await
            .context("Failed to fetch operation status")?;

        if status.status == "DONE" {
            break status;
        }
        tracing::debug!("operation {} status={}", op.name, status.status);

        tokio::time::sleep(POLL_INTERVAL).await;
    };

    if let Some(error) = &status.error {
        for detail in &error.errors {
            tracing::warn!(
                "operation {} failed with error: {} {}",
                op.name,
                detail.code,
                detail.message
            );
        }
        let first = error
            .errors
            .first()
            .map(|d| d.message.clone())
            .unwrap_or_else(|| "unknown operation error".to_string());
        return Err(TaskError::OperationFailed(first).into());
    }

    if let Some(warnings) = &status.warnings {
        for warning in warnings {
            tracing::warn!(
                "operation {} completed with warning: {} {}",
                op.name,
                warning.code,
                warning.message
            );
        }
    }

    Ok(())
}
