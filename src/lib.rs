//! gcpup - declarative provisioning for Google Cloud Platform resources.
//!
//! This crate converges a single cloud resource toward a desired state:
//! it reads the live state from the Compute Engine API, computes a sparse
//! diff against the configured state, and either applies the diff to the
//! live backend or renders the desired state into a Terraform template for
//! a downstream run of `terraform apply`.
//!
//! # Module Structure
//!
//! - [`gcp`] - Authenticated Compute Engine API client and identifier utilities
//! - [`resource`] - Resource task models, the sibling-resource registry, and diffing
//! - [`target`] - Render targets: live GCE API and Terraform template emission
//! - [`reconcile`] - The per-resource reconciliation driver
//!
//! # Example
//!
//! ```ignore
//! use gcpup::gcp::client::GcpClient;
//! use gcpup::reconcile::{reconcile_instance, ReconcileContext, RenderTarget};
//! use gcpup::resource::instance::InstanceTask;
//! use gcpup::resource::registry::ResourceRegistry;
//! use gcpup::target::gce::GceApiTarget;
//!
//! async fn converge(desired: &InstanceTask) -> anyhow::Result<()> {
//!     let cloud = GcpClient::new("my-project", "us-central1-a").await?;
//!     let ctx = ReconcileContext::new(cloud, ResourceRegistry::default());
//!     let mut target = RenderTarget::Gce(GceApiTarget);
//!     reconcile_instance(desired, &ctx, &mut target).await
//! }
//! ```

pub mod error;
pub mod gcp;
pub mod reconcile;
pub mod resource;
pub mod target;

pub use error::TaskError;
