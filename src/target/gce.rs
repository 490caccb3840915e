//! Live Compute Engine render target
//!
//! Applies a mapped payload against the real backend. Creation is a
//! single insert; on an existing instance only metadata can be updated in
//! place, guarded by the fingerprint captured on read. Every other field
//! change fails loudly rather than being silently dropped.

use super::LiteralAddressResolver;
use crate::error::TaskError;
use crate::gcp::operation::wait_completion;
use crate::reconcile::ReconcileContext;
use crate::resource::instance::{InstanceChanges, InstanceTask};
use anyhow::{Context, Result};

pub struct GceApiTarget;

impl GceApiTarget {
    /// Apply `(actual, desired, changes)` for one instance.
    pub async fn render_instance(
        &self,
        ctx: &ReconcileContext,
        actual: Option<&InstanceTask>,
        desired: &InstanceTask,
        changes: &mut InstanceChanges,
    ) -> Result<()> {
        let cloud = &ctx.cloud;
        let zone = desired.zone.as_deref().context("instance zone is required")?;

        let payload = desired.map_to_gce(&cloud.project_id, &ctx.registry, &LiteralAddressResolver)?;

        let Some(actual) = actual else {
            tracing::info!("Creating instance {:?}", payload.name);
            // Fire-and-forget: completion tracking on create is the caller's concern.
            cloud
                .instance_insert(zone, &payload)
                .await
                .context("Failed to create instance")?;
            return Ok(());
        };

        // Only metadata has an in-place update path. Reject everything else
        // up front so a bad diff never half-applies.
        let mut unsupported = changes.clone();
        unsupported.metadata = None;
        if !unsupported.is_zero() {
            tracing::error!("Cannot apply changes to instance: {:?}", changes);
            return Err(
                TaskError::UnsupportedChange(unsupported.changed_fields().join(", ")).into(),
            );
        }

        if changes.metadata.is_some() {
            tracing::info!("Updating instance metadata on {:?}", payload.name);

            let mut metadata = payload.metadata.clone().unwrap_or_default();
            metadata.fingerprint = actual.metadata_fingerprint().map(str::to_string);

            let op = cloud
                .instance_set_metadata(zone, &payload.name, &metadata)
                .await
                .context("Failed to set metadata on instance")?;

            wait_completion(cloud, &op)
                .await
                .context("Failed to set metadata on instance")?;

            changes.metadata = None;
        }

        // Safety net: a target must null out every field it applied.
        if !changes.is_zero() {
            tracing::error!("Cannot apply changes to instance: {:?}", changes);
            return Err(TaskError::UnsupportedChange(changes.changed_fields().join(", ")).into());
        }

        Ok(())
    }
}
