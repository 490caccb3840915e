//! Terraform render target
//!
//! Maps the same desired state as the live target but emits a structured
//! `google_compute_instance` block instead of calling the backend. Address
//! references resolve to interpolation expressions, since the referenced
//! address resource is declared in the same template and materialized by
//! `terraform apply` later. Never touches the live backend.

use super::AddressResolver;
use crate::gcp::urls::last_component;
use crate::reconcile::ReconcileContext;
use crate::resource::instance::{InstanceChanges, InstanceTask};
use crate::resource::registry::AddressRef;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Resolves an address reference to a Terraform interpolation expression.
pub struct SymbolicAddressResolver;

impl AddressResolver for SymbolicAddressResolver {
    fn resolve(&self, address: &AddressRef) -> Result<Option<String>> {
        Ok(Some(format!(
            "${{google_compute_address.{}.address}}",
            address.name
        )))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
struct TerraformInstanceTemplate {
    name: String,
    can_ip_forward: bool,
    machine_type: String,
    zone: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    disk: Vec<TerraformAttachedDisk>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    network_interface: Vec<TerraformNetworkInterface>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata_startup_script: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    service_account: Vec<TerraformServiceAccount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scheduling: Option<TerraformScheduling>,
}

#[derive(Debug, Clone, Default, Serialize)]
struct TerraformAttachedDisk {
    auto_delete: bool,
    scratch: bool,
    device_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    disk: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    image: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    disk_type: String,
    #[serde(skip_serializing_if = "size_is_unset")]
    size: i64,
}

fn size_is_unset(size: &i64) -> bool {
    *size == 0
}

#[derive(Debug, Clone, Default, Serialize)]
struct TerraformNetworkInterface {
    network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    subnetwork: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    access_config: Vec<TerraformAccessConfig>,
}

#[derive(Debug, Clone, Default, Serialize)]
struct TerraformAccessConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    nat_ip: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
struct TerraformServiceAccount {
    scopes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
struct TerraformScheduling {
    automatic_restart: bool,
    on_host_maintenance: String,
    preemptible: bool,
}

/// Accumulates rendered resource blocks and serializes them as a
/// `.tf.json` document.
#[derive(Debug, Clone, Default)]
pub struct TerraformTarget {
    // kind -> resource name -> block body
    resources: BTreeMap<String, BTreeMap<String, Value>>,
}

impl TerraformTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one resource block.
    pub fn render_resource(&mut self, kind: &str, name: &str, body: Value) {
        self.resources
            .entry(kind.to_string())
            .or_default()
            .insert(name.to_string(), body);
    }

    /// The accumulated template in Terraform JSON configuration syntax.
    pub fn to_json(&self) -> Value {
        json!({ "resource": self.resources })
    }

    /// Emit the template block for one instance. `actual` and `changes`
    /// are unused: the template always declares the full desired state.
    pub fn render_instance(
        &mut self,
        ctx: &ReconcileContext,
        _actual: Option<&InstanceTask>,
        desired: &InstanceTask,
        _changes: &mut InstanceChanges,
    ) -> Result<()> {
        let project = &ctx.cloud.project_id;
        let payload = desired.map_to_gce(project, &ctx.registry, &SymbolicAddressResolver)?;

        let mut tf = TerraformInstanceTemplate {
            name: payload.name.clone(),
            can_ip_forward: payload.can_ip_forward,
            machine_type: last_component(payload.machine_type.as_deref().unwrap_or_default())
                .to_string(),
            // Terraform requires a zone; the mapped payload omits it.
            zone: payload
                .zone
                .clone()
                .or_else(|| desired.zone.clone())
                .unwrap_or_default(),
            tags: payload.tags.as_ref().map(|t| t.items.clone()).unwrap_or_default(),
            ..Default::default()
        };

        for account in &payload.service_accounts {
            tf.service_account.push(TerraformServiceAccount {
                scopes: account.scopes.clone(),
            });
        }

        for attached in &payload.disks {
            let mut disk = TerraformAttachedDisk {
                auto_delete: attached.auto_delete,
                scratch: attached.disk_type == "SCRATCH",
                device_name: attached.device_name.clone(),
                disk: last_component(attached.source.as_deref().unwrap_or_default()).to_string(),
                ..Default::default()
            };
            if let Some(params) = &attached.initialize_params {
                disk.disk = params.disk_name.clone();
                disk.image = params.source_image.clone();
                disk.disk_type = params.disk_type.clone();
                disk.size = params.disk_size_gb;
            }
            tf.disk.push(disk);
        }

        for interface in &payload.network_interfaces {
            tf.network_interface.push(TerraformNetworkInterface {
                network: desired
                    .network
                    .as_deref()
                    .map(|n| format!("${{google_compute_network.{}.name}}", n))
                    .unwrap_or_else(|| interface.network.clone()),
                subnetwork: desired
                    .subnet
                    .as_deref()
                    .map(|s| format!("${{google_compute_subnetwork.{}.name}}", s)),
                access_config: interface
                    .access_configs
                    .iter()
                    .map(|config| TerraformAccessConfig {
                        nat_ip: config.nat_ip.clone(),
                    })
                    .collect(),
            });
        }

        if let Some(metadata) = &payload.metadata {
            for item in &metadata.items {
                tf.metadata
                    .insert(item.key.clone(), item.value.clone().unwrap_or_default());
            }
        }
        // The google provider takes the startup script as its own argument.
        tf.metadata_startup_script = tf.metadata.remove("startup-script");

        if let Some(scheduling) = &payload.scheduling {
            tf.scheduling = Some(TerraformScheduling {
                automatic_restart: scheduling.automatic_restart,
                on_host_maintenance: scheduling.on_host_maintenance.clone(),
                preemptible: scheduling.preemptible,
            });
        }

        let body = serde_json::to_value(&tf).context("Failed to serialize Terraform template")?;
        self.render_resource("google_compute_instance", &payload.name, body);
        Ok(())
    }
}
