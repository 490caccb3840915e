//! Typed Compute Engine payloads and call helpers
//!
//! Serde models for the subset of the `compute/v1` surface the resource
//! tasks use, plus thin call helpers on [`GcpClient`]. Unknown response
//! fields are ignored on deserialization; optional fields are skipped on
//! serialization so insert payloads stay sparse.

use super::client::GcpClient;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A compute instance, as sent to insert or read back from get.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Instance {
    pub name: String,
    pub can_ip_forward: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disks: Vec<AttachedDisk>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub network_interfaces: Vec<NetworkInterface>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduling: Option<Scheduling>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub service_accounts: Vec<ServiceAccount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Network tags attached to an instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tags {
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttachedDisk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialize_params: Option<AttachedDiskInitializeParams>,
    pub boot: bool,
    pub device_name: String,
    pub index: i64,
    pub auto_delete: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mode: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub disk_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttachedDiskInitializeParams {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source_image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub disk_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub disk_type: String,
    #[serde(skip_serializing_if = "is_zero_size")]
    pub disk_size_gb: i64,
}

fn is_zero_size(size: &i64) -> bool {
    *size == 0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkInterface {
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnetwork: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub access_configs: Vec<AccessConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessConfig {
    // The API spells this "natIP", not "natIp"
    #[serde(rename = "natIP", skip_serializing_if = "Option::is_none")]
    pub nat_ip: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub config_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scheduling {
    pub automatic_restart: bool,
    pub on_host_maintenance: String,
    pub preemptible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceAccount {
    pub email: String,
    pub scopes: Vec<String>,
}

/// Instance metadata plus the optimistic-concurrency fingerprint.
///
/// The fingerprint is only meaningful relative to the read that produced
/// it; a set-metadata call must carry the fingerprint from the most recent
/// get or the backend rejects the write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub items: Vec<MetadataItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataItem {
    pub key: String,
    pub value: Option<String>,
}

/// An asynchronous zone operation, as returned by mutating calls and by
/// the zone-operations status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Operation {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<OperationWarning>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationError {
    pub errors: Vec<OperationErrorDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationWarning {
    pub code: String,
    pub message: String,
}

/// A persistent disk, read back to resolve the boot image of an instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Disk {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_image: Option<String>,
}

/// A reserved address, found by reverse lookup on its literal IP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AddressList {
    items: Vec<Address>,
}

impl GcpClient {
    /// Get one instance by zone and name.
    pub async fn instance_get(&self, zone: &str, name: &str) -> Result<Instance> {
        let url = self.compute_zonal_url(zone, &format!("instances/{}", name));
        let body = self.get(&url).await?;
        serde_json::from_value(body).context("Failed to parse instance response")
    }

    /// Insert a new instance. Returns the pending operation.
    pub async fn instance_insert(&self, zone: &str, instance: &Instance) -> Result<Operation> {
        let url = self.compute_zonal_url(zone, "instances");
        let payload = serde_json::to_value(instance).context("Failed to serialize instance")?;
        let body = self.post(&url, Some(&payload)).await?;
        serde_json::from_value(body).context("Failed to parse operation response")
    }

    /// Replace instance metadata. The metadata must carry the fingerprint
    /// from the most recent read. Returns the pending operation.
    pub async fn instance_set_metadata(
        &self,
        zone: &str,
        name: &str,
        metadata: &Metadata,
    ) -> Result<Operation> {
        let url = self.compute_zonal_url(zone, &format!("instances/{}/setMetadata", name));
        let payload = serde_json::to_value(metadata).context("Failed to serialize metadata")?;
        let body = self.post(&url, Some(&payload)).await?;
        serde_json::from_value(body).context("Failed to parse operation response")
    }

    /// Get one persistent disk by zone and name.
    pub async fn disk_get(&self, zone: &str, name: &str) -> Result<Disk> {
        let url = self.compute_zonal_url(zone, &format!("disks/{}", name));
        let body = self.get(&url).await?;
        serde_json::from_value(body).context("Failed to parse disk response")
    }

    /// List the regional addresses whose literal IP equals `ip`.
    pub async fn address_list_by_ip(&self, ip: &str) -> Result<Vec<Address>> {
        let filter = urlencoding::encode(&format!("address eq {}", ip)).into_owned();
        let url = format!("{}?filter={}", self.compute_regional_url("addresses"), filter);
        let body = self.get(&url).await?;
        let list: AddressList =
            serde_json::from_value(body).context("Failed to parse address list response")?;
        Ok(list.items)
    }

    /// Get the current status of a zone operation.
    pub async fn zone_operation_get(&self, zone: &str, name: &str) -> Result<Operation> {
        let url = self.compute_zonal_url(zone, &format!("operations/{}", name));
        let body = self.get(&url).await?;
        serde_json::from_value(body).context("Failed to parse operation response")
    }
}

/// Convert a payload to its JSON value, for tests and template rendering.
pub fn to_json<T: Serialize>(payload: &T) -> Result<Value> {
    serde_json::to_value(payload).context("Failed to serialize payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_instance_roundtrip_ignores_unknown_fields() {
        let body = json!({
            "name": "vm-1",
            "canIpForward": true,
            "machineType": "projects/p/zones/us-central1-a/machineTypes/n1-standard-1",
            "status": "RUNNING",
            "selfLink": "https://example/self"
        });
        let instance: Instance = serde_json::from_value(body).unwrap();
        assert_eq!(instance.name, "vm-1");
        assert!(instance.can_ip_forward);
        assert!(instance.metadata.is_none());
    }

    #[test]
    fn test_sparse_serialization_omits_unset_fields() {
        let instance = Instance {
            name: "vm-1".to_string(),
            ..Default::default()
        };
        let value = to_json(&instance).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("zone"));
        assert!(!obj.contains_key("disks"));
        assert!(!obj.contains_key("metadata"));
    }

    #[test]
    fn test_metadata_item_with_null_value_deserializes() {
        let item: MetadataItem = serde_json::from_value(json!({"key": "k"})).unwrap();
        assert_eq!(item.key, "k");
        assert!(item.value.is_none());
    }
}
