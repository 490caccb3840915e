//! Compute instance task
//!
//! Desired/actual model of one VM instance, its identity contract, the
//! live-state read ([`InstanceTask::find`]), the sparse diff
//! ([`InstanceChanges`]), and the mapping into a Compute Engine payload
//! shared by both render targets ([`InstanceTask::map_to_gce`]).

use super::registry::ResourceRegistry;
use super::{CompareWithId, ContentSource};
use crate::error;
use crate::gcp::compute::{
    AccessConfig, AttachedDisk, AttachedDiskInitializeParams, Instance, Metadata, MetadataItem,
    NetworkInterface, Scheduling, ServiceAccount, Tags,
};
use crate::gcp::scopes;
use crate::gcp::urls::{
    build_image_url, build_machine_type_url, last_component, parse_google_cloud_url,
    shorten_image_url,
};
use crate::reconcile::ReconcileContext;
use crate::target::AddressResolver;
use anyhow::{Context, Result};
use std::collections::BTreeMap;

/// Device name the implicit boot disk always occupies (slot 0, index 0).
pub const BOOT_DEVICE_NAME: &str = "persistent-disks-0";

/// Desired or actual shape of one compute instance.
///
/// A field left `None` means the caller does not manage that attribute,
/// which is distinct from an empty collection. `name` and `zone` together
/// form the stable identity used to pair desired against actual and to
/// issue backend calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceTask {
    pub name: Option<String>,
    pub zone: Option<String>,

    pub machine_type: Option<String>,
    /// Image spec: bare name or `project/name`.
    pub image: Option<String>,
    pub preemptible: Option<bool>,
    pub can_ip_forward: Option<bool>,

    pub tags: Option<Vec<String>>,
    /// Access scope mnemonics or long-form URIs, in order.
    pub scopes: Option<Vec<String>>,
    pub metadata: Option<BTreeMap<String, ContentSource>>,

    /// Names of sibling resources, resolved through the registry.
    pub network: Option<String>,
    pub subnet: Option<String>,
    pub ip_address: Option<String>,
    /// Device name -> disk name. The implicit boot disk is derived from
    /// `image` and never appears here.
    pub disks: Option<BTreeMap<String, String>>,

    /// Concurrency token from the most recent live read; must accompany
    /// any metadata write. Never part of desired configuration.
    pub metadata_fingerprint: Option<String>,
}

impl CompareWithId for InstanceTask {
    fn compare_with_id(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl InstanceTask {
    /// The fingerprint captured from the most recent `find`.
    pub fn metadata_fingerprint(&self) -> Option<&str> {
        self.metadata_fingerprint.as_deref()
    }

    /// Query the backend for the instance with this task's identity.
    ///
    /// Returns `Ok(None)` when the instance does not exist. On success,
    /// only backend-observable fields are populated.
    pub async fn find(&self, ctx: &ReconcileContext) -> Result<Option<InstanceTask>> {
        let cloud = &ctx.cloud;
        let name = self.name.as_deref().context("instance name is required")?;
        let zone = self.zone.as_deref().context("instance zone is required")?;

        let r = match cloud.instance_get(zone, name).await {
            Ok(r) => r,
            Err(err) if error::is_not_found(&err) => return Ok(None),
            Err(err) => return Err(err.context("Failed to get instance")),
        };

        let mut actual = InstanceTask {
            name: Some(r.name.clone()),
            ..Default::default()
        };

        if let Some(tags) = &r.tags {
            actual.tags = Some(tags.items.clone());
        }
        actual.zone = Some(last_component(r.zone.as_deref().unwrap_or(zone)).to_string());
        if let Some(machine_type) = &r.machine_type {
            actual.machine_type = Some(last_component(machine_type).to_string());
        }
        actual.can_ip_forward = Some(r.can_ip_forward);

        if let Some(scheduling) = &r.scheduling {
            actual.preemptible = Some(scheduling.preemptible);
        }

        if let Some(interface) = r.network_interfaces.first() {
            actual.network = Some(last_component(&interface.network).to_string());
            if let Some(config) = interface.access_configs.first() {
                if let Some(nat_ip) = config.nat_ip.as_deref().filter(|ip| !ip.is_empty()) {
                    let addresses = cloud
                        .address_list_by_ip(nat_ip)
                        .await
                        .with_context(|| format!("Failed to query for address {:?}", nat_ip))?;
                    let address = addresses
                        .first()
                        .with_context(|| format!("address not found: {:?}", nat_ip))?;
                    actual.ip_address = Some(address.name.clone());
                }
            }
        }

        let mut short_scopes = Vec::new();
        for account in &r.service_accounts {
            for scope in &account.scopes {
                short_scopes.push(scopes::to_short_form(scope).to_string());
            }
        }
        if !short_scopes.is_empty() {
            actual.scopes = Some(short_scopes);
        }

        let mut disks = BTreeMap::new();
        for (index, disk) in r.disks.iter().enumerate() {
            let source = disk.source.as_deref().unwrap_or_default();
            if index == 0 {
                // Assumes the boot disk shares the instance's project and zone.
                let disk_name = last_component(source);
                let d = cloud
                    .disk_get(zone, disk_name)
                    .await
                    .with_context(|| format!("Failed to query for disk {:?}", source))?;
                let image =
                    shorten_image_url(&cloud.project_id, d.source_image.as_deref().unwrap_or_default())
                        .context("Failed to parse source image URL")?;
                actual.image = Some(image);
            } else {
                let url = parse_google_cloud_url(source)
                    .with_context(|| format!("unable to parse disk source URL {:?}", source))?;
                disks.insert(disk.device_name.clone(), url.name);
            }
        }
        actual.disks = Some(disks);

        if let Some(metadata) = &r.metadata {
            let mut entries = BTreeMap::new();
            for item in &metadata.items {
                let Some(value) = &item.value else {
                    tracing::warn!(
                        "ignoring instance metadata entry with null value: {:?}",
                        item.key
                    );
                    continue;
                };
                entries.insert(item.key.clone(), ContentSource::literal(value));
            }
            actual.metadata = Some(entries);
            actual.metadata_fingerprint = metadata.fingerprint.clone();
        }

        Ok(Some(actual))
    }

    /// Domain validation hook, run before dispatch. Instances accept any
    /// diff here; kinds that cannot apply certain changes reject them at
    /// this point instead of at apply time.
    pub fn check_changes(
        &self,
        _actual: Option<&InstanceTask>,
        _changes: &InstanceChanges,
    ) -> Result<()> {
        Ok(())
    }

    /// Map desired state into a Compute Engine payload.
    ///
    /// Pure apart from content-source rendering; the address resolution
    /// strategy is injected so the live target can use literal IPs while
    /// the Terraform target emits symbolic references.
    pub fn map_to_gce(
        &self,
        project: &str,
        registry: &ResourceRegistry,
        resolver: &dyn AddressResolver,
    ) -> Result<Instance> {
        let name = self.name.as_deref().context("instance name is required")?;
        let zone = self.zone.as_deref().context("instance zone is required")?;
        let machine_type = self
            .machine_type
            .as_deref()
            .context("instance machine type is required")?;
        let image = self.image.as_deref().context("instance image is required")?;

        let scheduling = if self.preemptible.unwrap_or(false) {
            Scheduling {
                automatic_restart: false,
                on_host_maintenance: "TERMINATE".to_string(),
                preemptible: true,
            }
        } else {
            Scheduling {
                automatic_restart: true,
                on_host_maintenance: "MIGRATE".to_string(),
                preemptible: false,
            }
        };

        let mut disks = vec![AttachedDisk {
            initialize_params: Some(AttachedDiskInitializeParams {
                source_image: build_image_url(project, image)?,
                ..Default::default()
            }),
            boot: true,
            device_name: BOOT_DEVICE_NAME.to_string(),
            index: 0,
            auto_delete: true,
            mode: "READ_WRITE".to_string(),
            disk_type: "PERSISTENT".to_string(),
            source: None,
        }];
        if let Some(attached) = &self.disks {
            for (device_name, disk_name) in attached {
                let disk = registry
                    .disk(disk_name)
                    .with_context(|| format!("unknown disk reference {:?}", disk_name))?;
                disks.push(AttachedDisk {
                    source: Some(disk.url(project, zone)),
                    auto_delete: false,
                    mode: "READ_WRITE".to_string(),
                    device_name: device_name.clone(),
                    ..Default::default()
                });
            }
        }

        let tags = self.tags.as_ref().map(|items| Tags {
            items: items.clone(),
        });

        let mut network_interfaces = Vec::new();
        if let Some(address_name) = &self.ip_address {
            let address = registry
                .address(address_name)
                .with_context(|| format!("unknown address reference {:?}", address_name))?;
            let nat_ip = resolver
                .resolve(address)
                .context("unable to resolve IP for instance")?
                .context("instance IP address has not yet been created")?;
            let network_name = self
                .network
                .as_deref()
                .context("instance network is required when an IP address is attached")?;
            let network = registry
                .network(network_name)
                .with_context(|| format!("unknown network reference {:?}", network_name))?;
            network_interfaces.push(NetworkInterface {
                network: network.url(project),
                subnetwork: self.subnet.clone(),
                access_configs: vec![AccessConfig {
                    nat_ip: Some(nat_ip),
                    config_type: "ONE_TO_ONE_NAT".to_string(),
                }],
            });
        }

        let mut service_accounts = Vec::new();
        if let Some(scope_list) = &self.scopes {
            service_accounts.push(ServiceAccount {
                email: "default".to_string(),
                scopes: scope_list
                    .iter()
                    .map(|s| scopes::to_long_form(s).to_string())
                    .collect(),
            });
        }

        let mut items = Vec::new();
        if let Some(metadata) = &self.metadata {
            for (key, source) in metadata {
                let value = source
                    .render()
                    .with_context(|| format!("Failed to render instance metadata {:?}", key))?;
                items.push(MetadataItem {
                    key: key.clone(),
                    value: Some(value),
                });
            }
        }

        Ok(Instance {
            name: name.to_string(),
            can_ip_forward: self.can_ip_forward.unwrap_or(false),
            zone: None,
            machine_type: Some(build_machine_type_url(project, zone, machine_type)),
            tags,
            disks,
            network_interfaces,
            scheduling: Some(scheduling),
            service_accounts,
            metadata: Some(Metadata {
                fingerprint: None,
                items,
            }),
        })
    }
}

/// Sparse diff between a desired and an actual instance task.
///
/// Every field that is equal (or unmanaged in the desired state) stays
/// `None`; every differing field carries the desired value. Render targets
/// null out each field they fully apply; anything still set afterwards is
/// an update path the target does not implement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceChanges {
    pub name: Option<String>,
    pub zone: Option<String>,
    pub machine_type: Option<String>,
    pub image: Option<String>,
    pub preemptible: Option<bool>,
    pub can_ip_forward: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub scopes: Option<Vec<String>>,
    pub metadata: Option<BTreeMap<String, ContentSource>>,
    pub network: Option<String>,
    pub subnet: Option<String>,
    pub ip_address: Option<String>,
    pub disks: Option<BTreeMap<String, String>>,
}

/// Desired value when managed and differing from actual, else `None`.
fn changed<T: PartialEq + Clone>(desired: &Option<T>, actual: Option<&Option<T>>) -> Option<T> {
    let d = desired.as_ref()?;
    match actual.and_then(|a| a.as_ref()) {
        Some(a) if a == d => None,
        _ => Some(d.clone()),
    }
}

/// Tag order carries no meaning; compare as sets, keep desired order.
fn changed_tags(
    desired: &Option<Vec<String>>,
    actual: Option<&Option<Vec<String>>>,
) -> Option<Vec<String>> {
    let d = desired.as_ref()?;
    let mut d_sorted = d.clone();
    d_sorted.sort();
    match actual.and_then(|a| a.as_ref()) {
        Some(a) => {
            let mut a_sorted = a.clone();
            a_sorted.sort();
            if a_sorted == d_sorted {
                None
            } else {
                Some(d.clone())
            }
        }
        None => Some(d.clone()),
    }
}

impl InstanceChanges {
    /// Field-wise diff of desired against actual. With no actual state
    /// (create path) every managed desired field is a change.
    pub fn between(desired: &InstanceTask, actual: Option<&InstanceTask>) -> InstanceChanges {
        InstanceChanges {
            name: changed(&desired.name, actual.map(|a| &a.name)),
            zone: changed(&desired.zone, actual.map(|a| &a.zone)),
            machine_type: changed(&desired.machine_type, actual.map(|a| &a.machine_type)),
            image: changed(&desired.image, actual.map(|a| &a.image)),
            preemptible: changed(&desired.preemptible, actual.map(|a| &a.preemptible)),
            can_ip_forward: changed(&desired.can_ip_forward, actual.map(|a| &a.can_ip_forward)),
            tags: changed_tags(&desired.tags, actual.map(|a| &a.tags)),
            scopes: changed(&desired.scopes, actual.map(|a| &a.scopes)),
            metadata: changed(&desired.metadata, actual.map(|a| &a.metadata)),
            network: changed(&desired.network, actual.map(|a| &a.network)),
            subnet: changed(&desired.subnet, actual.map(|a| &a.subnet)),
            ip_address: changed(&desired.ip_address, actual.map(|a| &a.ip_address)),
            disks: changed(&desired.disks, actual.map(|a| &a.disks)),
        }
    }

    /// True iff no field is set. The destructuring is exhaustive so a new
    /// task field cannot be forgotten here.
    pub fn is_zero(&self) -> bool {
        let InstanceChanges {
            name,
            zone,
            machine_type,
            image,
            preemptible,
            can_ip_forward,
            tags,
            scopes,
            metadata,
            network,
            subnet,
            ip_address,
            disks,
        } = self;
        name.is_none()
            && zone.is_none()
            && machine_type.is_none()
            && image.is_none()
            && preemptible.is_none()
            && can_ip_forward.is_none()
            && tags.is_none()
            && scopes.is_none()
            && metadata.is_none()
            && network.is_none()
            && subnet.is_none()
            && ip_address.is_none()
            && disks.is_none()
    }

    /// Names of the fields still set, for unsupported-change errors.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let InstanceChanges {
            name,
            zone,
            machine_type,
            image,
            preemptible,
            can_ip_forward,
            tags,
            scopes,
            metadata,
            network,
            subnet,
            ip_address,
            disks,
        } = self;
        let mut fields = Vec::new();
        if name.is_some() {
            fields.push("name");
        }
        if zone.is_some() {
            fields.push("zone");
        }
        if machine_type.is_some() {
            fields.push("machine_type");
        }
        if image.is_some() {
            fields.push("image");
        }
        if preemptible.is_some() {
            fields.push("preemptible");
        }
        if can_ip_forward.is_some() {
            fields.push("can_ip_forward");
        }
        if tags.is_some() {
            fields.push("tags");
        }
        if scopes.is_some() {
            fields.push("scopes");
        }
        if metadata.is_some() {
            fields.push("metadata");
        }
        if network.is_some() {
            fields.push("network");
        }
        if subnet.is_some() {
            fields.push("subnet");
        }
        if ip_address.is_some() {
            fields.push("ip_address");
        }
        if disks.is_some() {
            fields.push("disks");
        }
        fields
    }
}
