//! Render targets
//!
//! A render target is where a mapped payload ends up: the live Compute
//! Engine API ([`gce`]) or a Terraform template ([`terraform`]). Both
//! share one mapping function on the task; they differ only in how an IP
//! address reference is resolved, captured by [`AddressResolver`].

pub mod gce;
pub mod terraform;

use crate::resource::registry::AddressRef;
use anyhow::Result;

/// Strategy for turning an address reference into a value the payload can
/// carry: a literal IP for the live target, a symbolic Terraform
/// expression for template emission.
pub trait AddressResolver {
    /// `Ok(None)` means the address exists but has no value yet.
    fn resolve(&self, address: &AddressRef) -> Result<Option<String>>;
}

/// Resolves to the literal IP recorded on the reference.
pub struct LiteralAddressResolver;

impl AddressResolver for LiteralAddressResolver {
    fn resolve(&self, address: &AddressRef) -> Result<Option<String>> {
        Ok(address.address.clone())
    }
}
