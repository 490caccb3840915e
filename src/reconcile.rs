//! Reconciliation driver
//!
//! One pass per invocation for one resource identity:
//! Find -> diff -> check_changes -> dispatch to the active render target.
//! The outer scheduler runs independent identities concurrently in
//! dependency order; within a pass everything is sequential, and a
//! non-not-found failure at any step aborts the pass and propagates.

use crate::gcp::client::GcpClient;
use crate::resource::instance::{InstanceChanges, InstanceTask};
use crate::resource::registry::ResourceRegistry;
use crate::resource::CompareWithId;
use crate::target::gce::GceApiTarget;
use crate::target::terraform::TerraformTarget;
use anyhow::Result;

/// Inbound context for a pass: the authenticated backend handle plus the
/// registry of sibling resources the task may reference.
pub struct ReconcileContext {
    pub cloud: GcpClient,
    pub registry: ResourceRegistry,
}

impl ReconcileContext {
    pub fn new(cloud: GcpClient, registry: ResourceRegistry) -> Self {
        Self { cloud, registry }
    }
}

/// The destination a pass applies mapped state to.
pub enum RenderTarget {
    Gce(GceApiTarget),
    Terraform(TerraformTarget),
}

/// Run one reconciliation pass for one instance identity.
pub async fn reconcile_instance(
    desired: &InstanceTask,
    ctx: &ReconcileContext,
    target: &mut RenderTarget,
) -> Result<()> {
    let id = desired.compare_with_id().unwrap_or("<unnamed>");
    tracing::debug!("Reconciling instance {:?}", id);

    let actual = desired.find(ctx).await?;
    if actual.is_none() {
        tracing::debug!("Instance {:?} not found, will create", id);
    }

    let mut changes = InstanceChanges::between(desired, actual.as_ref());
    desired.check_changes(actual.as_ref(), &changes)?;

    match target {
        RenderTarget::Gce(t) => {
            t.render_instance(ctx, actual.as_ref(), desired, &mut changes)
                .await?
        }
        RenderTarget::Terraform(t) => {
            t.render_instance(ctx, actual.as_ref(), desired, &mut changes)?
        }
    }

    tracing::debug!("Reconciled instance {:?}", id);
    Ok(())
}
