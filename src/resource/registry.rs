//! Sibling resource registry
//!
//! Tasks reference networks, subnets, addresses, and disks by name only;
//! this registry is the shared lookup the references resolve through when
//! a task is mapped into a backend payload. The outer scheduler registers
//! each sibling as it becomes known; reconciliation of the siblings
//! themselves happens elsewhere.

use std::collections::HashMap;

/// A referenced VPC network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRef {
    pub name: String,
}

impl NetworkRef {
    /// Canonical URL of the network.
    pub fn url(&self, project: &str) -> String {
        format!(
            "https://www.googleapis.com/compute/v1/projects/{}/global/networks/{}",
            project, self.name
        )
    }
}

/// A referenced subnetwork.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetRef {
    pub name: String,
}

/// A referenced reserved IP address.
///
/// `address` holds the literal IP once the sibling address resource has
/// been reconciled; until then it is `None` and only the Terraform target
/// can reference it (symbolically).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRef {
    pub name: String,
    pub address: Option<String>,
}

/// A referenced persistent disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskRef {
    pub name: String,
}

impl DiskRef {
    /// Canonical URL of the disk.
    pub fn url(&self, project: &str, zone: &str) -> String {
        format!(
            "https://www.googleapis.com/compute/v1/projects/{}/zones/{}/disks/{}",
            project, zone, self.name
        )
    }
}

/// Name-keyed lookup table for sibling resources.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    networks: HashMap<String, NetworkRef>,
    subnets: HashMap<String, SubnetRef>,
    addresses: HashMap<String, AddressRef>,
    disks: HashMap<String, DiskRef>,
}

impl ResourceRegistry {
    pub fn register_network(&mut self, name: &str) -> &mut Self {
        self.networks
            .insert(name.to_string(), NetworkRef { name: name.to_string() });
        self
    }

    pub fn register_subnet(&mut self, name: &str) -> &mut Self {
        self.subnets
            .insert(name.to_string(), SubnetRef { name: name.to_string() });
        self
    }

    pub fn register_address(&mut self, name: &str, address: Option<&str>) -> &mut Self {
        self.addresses.insert(
            name.to_string(),
            AddressRef {
                name: name.to_string(),
                address: address.map(|a| a.to_string()),
            },
        );
        self
    }

    pub fn register_disk(&mut self, name: &str) -> &mut Self {
        self.disks
            .insert(name.to_string(), DiskRef { name: name.to_string() });
        self
    }

    pub fn network(&self, name: &str) -> Option<&NetworkRef> {
        self.networks.get(name)
    }

    pub fn subnet(&self, name: &str) -> Option<&SubnetRef> {
        self.subnets.get(name)
    }

    pub fn address(&self, name: &str) -> Option<&AddressRef> {
        self.addresses.get(name)
    }

    pub fn disk(&self, name: &str) -> Option<&DiskRef> {
        self.disks.get(name)
    }
}
