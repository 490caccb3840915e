//! Integration tests for reconciliation passes using wiremock
//!
//! These tests run full passes against a mocked Compute Engine API,
//! verifying the Find/diff/dispatch flow, the create and metadata-update
//! paths, the unsupported-change safety net, and Terraform emission.

use gcpup::gcp::client::GcpClient;
use gcpup::reconcile::{reconcile_instance, ReconcileContext, RenderTarget};
use gcpup::resource::instance::{InstanceTask, BOOT_DEVICE_NAME};
use gcpup::resource::registry::ResourceRegistry;
use gcpup::resource::ContentSource;
use gcpup::target::gce::GceApiTarget;
use gcpup::target::terraform::TerraformTarget;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use wiremock::matchers::{bearer_token, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: &str = "test-project";
const ZONE: &str = "us-central1-a";

fn test_ctx(server: &MockServer) -> ReconcileContext {
    let cloud = GcpClient::with_static_token(PROJECT, ZONE, "test-token", &server.uri())
        .expect("client should build");
    ReconcileContext::new(cloud, ResourceRegistry::default())
}

fn desired() -> InstanceTask {
    InstanceTask {
        name: Some("vm-1".to_string()),
        zone: Some(ZONE.to_string()),
        machine_type: Some("n1-standard-1".to_string()),
        image: Some("debian-12".to_string()),
        can_ip_forward: Some(false),
        ..Default::default()
    }
}

fn instance_path() -> String {
    format!(
        "/compute/v1/projects/{}/zones/{}/instances/vm-1",
        PROJECT, ZONE
    )
}

fn zone_url() -> String {
    format!(
        "https://www.googleapis.com/compute/v1/projects/{}/zones/{}",
        PROJECT, ZONE
    )
}

/// The live instance as the API would return it, matching `desired()`
/// except for the metadata contents.
fn live_instance_body() -> Value {
    json!({
        "name": "vm-1",
        "zone": zone_url(),
        "machineType": format!("{}/machineTypes/n1-standard-1", zone_url()),
        "canIpForward": false,
        "disks": [{
            "source": format!("{}/disks/vm-1-boot", zone_url()),
            "deviceName": BOOT_DEVICE_NAME,
            "boot": true,
            "index": 0
        }],
        "metadata": {
            "fingerprint": "fp-abc123",
            "items": [{"key": "role", "value": "worker"}]
        }
    })
}

async fn mount_not_found(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(instance_path()))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "The resource 'vm-1' was not found"}
        })))
        .mount(server)
        .await;
}

async fn mount_live_instance(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(instance_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(live_instance_body()))
        .mount(server)
        .await;

    // Boot-disk read-back used to resolve the image spec
    Mock::given(method("GET"))
        .and(path(format!(
            "/compute/v1/projects/{}/zones/{}/disks/vm-1-boot",
            PROJECT, ZONE
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "vm-1-boot",
            "sourceImage": format!(
                "https://www.googleapis.com/compute/v1/projects/{}/global/images/debian-12",
                PROJECT
            )
        })))
        .mount(server)
        .await;
}

fn requests_with_method(requests: &[wiremock::Request], m: &str) -> Vec<Value> {
    requests
        .iter()
        .filter(|r| r.method.as_str() == m)
        .map(|r| serde_json::from_slice(&r.body).unwrap_or(Value::Null))
        .collect()
}

#[tokio::test]
async fn test_find_on_missing_instance_returns_none() {
    let server = MockServer::start().await;
    mount_not_found(&server).await;

    let ctx = test_ctx(&server);
    let actual = desired().find(&ctx).await.expect("find should not error");
    assert!(actual.is_none());
}

#[tokio::test]
async fn test_find_populates_observable_fields() {
    let server = MockServer::start().await;
    mount_live_instance(&server).await;

    let ctx = test_ctx(&server);
    let actual = desired()
        .find(&ctx)
        .await
        .expect("find should succeed")
        .expect("instance should exist");

    assert_eq!(actual.name.as_deref(), Some("vm-1"));
    assert_eq!(actual.zone.as_deref(), Some(ZONE));
    assert_eq!(actual.machine_type.as_deref(), Some("n1-standard-1"));
    assert_eq!(actual.image.as_deref(), Some("debian-12"));
    assert_eq!(actual.can_ip_forward, Some(false));
    assert_eq!(actual.metadata_fingerprint(), Some("fp-abc123"));
    let metadata = actual.metadata.as_ref().unwrap();
    assert_eq!(
        metadata.get("role"),
        Some(&ContentSource::literal("worker"))
    );
    // Boot disk never appears in the attached-disk map
    assert_eq!(actual.disks.as_ref().unwrap().len(), 0);
}

#[tokio::test]
async fn test_find_reverse_looks_up_nat_address() {
    let server = MockServer::start().await;

    let mut body = live_instance_body();
    body["networkInterfaces"] = json!([{
        "network": format!(
            "https://www.googleapis.com/compute/v1/projects/{}/global/networks/default",
            PROJECT
        ),
        "accessConfigs": [{"natIP": "203.0.113.7", "type": "ONE_TO_ONE_NAT"}]
    }]);
    Mock::given(method("GET"))
        .and(path(instance_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/compute/v1/projects/{}/regions/us-central1/addresses",
            PROJECT
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"name": "api-ip", "address": "203.0.113.7"}]
        })))
        .mount(&server)
        .await;

    // Boot-disk read-back
    Mock::given(method("GET"))
        .and(path(format!(
            "/compute/v1/projects/{}/zones/{}/disks/vm-1-boot",
            PROJECT, ZONE
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "vm-1-boot",
            "sourceImage": format!(
                "https://www.googleapis.com/compute/v1/projects/{}/global/images/debian-12",
                PROJECT
            )
        })))
        .mount(&server)
        .await;

    let ctx = test_ctx(&server);
    let actual = desired()
        .find(&ctx)
        .await
        .expect("find should succeed")
        .expect("instance should exist");

    assert_eq!(actual.network.as_deref(), Some("default"));
    assert_eq!(actual.ip_address.as_deref(), Some("api-ip"));
}

#[tokio::test]
async fn test_find_fails_when_nat_address_is_unknown() {
    let server = MockServer::start().await;

    let mut body = live_instance_body();
    body["networkInterfaces"] = json!([{
        "network": format!(
            "https://www.googleapis.com/compute/v1/projects/{}/global/networks/default",
            PROJECT
        ),
        "accessConfigs": [{"natIP": "203.0.113.9", "type": "ONE_TO_ONE_NAT"}]
    }]);
    Mock::given(method("GET"))
        .and(path(instance_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    // No reserved address matches the NAT IP
    Mock::given(method("GET"))
        .and(path(format!(
            "/compute/v1/projects/{}/regions/us-central1/addresses",
            PROJECT
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let ctx = test_ctx(&server);
    let err = desired().find(&ctx).await.expect_err("find should fail");
    assert!(err.to_string().contains("address not found"), "{err}");
}

#[tokio::test]
async fn test_create_issues_single_insert_with_boot_disk() {
    let server = MockServer::start().await;
    mount_not_found(&server).await;

    Mock::given(method("POST"))
        .and(path(format!(
            "/compute/v1/projects/{}/zones/{}/instances",
            PROJECT, ZONE
        )))
        .and(bearer_token("test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "op-create-1",
            "status": "PENDING",
            "zone": zone_url()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut ctx = test_ctx(&server);
    ctx.registry.register_disk("data-disk-1");

    let mut task = desired();
    let mut disks = BTreeMap::new();
    disks.insert("data".to_string(), "data-disk-1".to_string());
    task.disks = Some(disks);

    let mut target = RenderTarget::Gce(GceApiTarget);
    reconcile_instance(&task, &ctx, &mut target)
        .await
        .expect("create pass should succeed");

    let requests = server.received_requests().await.unwrap();
    let inserts = requests_with_method(&requests, "POST");
    assert_eq!(inserts.len(), 1, "exactly one insert call");

    let payload = &inserts[0];
    assert_eq!(payload["name"], "vm-1");
    let disks = payload["disks"].as_array().unwrap();
    assert_eq!(disks.len(), 2);
    assert_eq!(disks[0]["boot"], true);
    assert_eq!(disks[0]["index"], 0);
    assert_eq!(disks[0]["deviceName"], BOOT_DEVICE_NAME);
    assert_eq!(disks[0]["autoDelete"], true);
    assert_eq!(
        disks[0]["initializeParams"]["sourceImage"],
        format!(
            "https://www.googleapis.com/compute/v1/projects/{}/global/images/debian-12",
            PROJECT
        )
    );
    assert_eq!(disks[1]["deviceName"], "data");
    assert_eq!(disks[1]["autoDelete"], false);
}

#[tokio::test]
async fn test_metadata_only_diff_updates_with_fingerprint() {
    let server = MockServer::start().await;
    mount_live_instance(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("{}/setMetadata", instance_path())))
        .and(bearer_token("test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "op-meta-1",
            "status": "RUNNING",
            "zone": zone_url()
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/compute/v1/projects/{}/zones/{}/operations/op-meta-1",
            PROJECT, ZONE
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "op-meta-1",
            "status": "DONE",
            "zone": zone_url()
        })))
        .mount(&server)
        .await;

    let ctx = test_ctx(&server);

    let mut task = desired();
    let mut metadata = BTreeMap::new();
    metadata.insert("role".to_string(), ContentSource::literal("leader"));
    task.metadata = Some(metadata);

    let mut target = RenderTarget::Gce(GceApiTarget);
    reconcile_instance(&task, &ctx, &mut target)
        .await
        .expect("metadata-only pass should succeed");

    let requests = server.received_requests().await.unwrap();
    let updates = requests_with_method(&requests, "POST");
    assert_eq!(updates.len(), 1, "exactly one set-metadata call");

    let body = &updates[0];
    assert_eq!(body["fingerprint"], "fp-abc123");
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["key"], "role");
    assert_eq!(items[0]["value"], "leader");
}

#[tokio::test]
async fn test_unsupported_change_fails_without_partial_update() {
    let server = MockServer::start().await;
    mount_live_instance(&server).await;

    let ctx = test_ctx(&server);

    // Metadata change plus a machine-type change: must fail up front
    let mut task = desired();
    task.machine_type = Some("n1-standard-2".to_string());
    let mut metadata = BTreeMap::new();
    metadata.insert("role".to_string(), ContentSource::literal("leader"));
    task.metadata = Some(metadata);

    let mut target = RenderTarget::Gce(GceApiTarget);
    let err = reconcile_instance(&task, &ctx, &mut target)
        .await
        .expect_err("pass should fail");
    assert!(err.to_string().contains("machine_type"), "names the field: {err}");

    let requests = server.received_requests().await.unwrap();
    let posts = requests_with_method(&requests, "POST");
    assert!(posts.is_empty(), "no mutation may be issued");
}

#[tokio::test]
async fn test_in_sync_instance_applies_nothing() {
    let server = MockServer::start().await;
    mount_live_instance(&server).await;

    let ctx = test_ctx(&server);

    // Desired metadata matches what the API reports
    let mut task = desired();
    let mut metadata = BTreeMap::new();
    metadata.insert("role".to_string(), ContentSource::literal("worker"));
    task.metadata = Some(metadata);

    let mut target = RenderTarget::Gce(GceApiTarget);
    reconcile_instance(&task, &ctx, &mut target)
        .await
        .expect("no-op pass should succeed");

    let requests = server.received_requests().await.unwrap();
    assert!(requests_with_method(&requests, "POST").is_empty());
}

#[tokio::test]
async fn test_terraform_target_emits_template_without_backend_calls() {
    let server = MockServer::start().await;
    mount_not_found(&server).await;

    let mut ctx = test_ctx(&server);
    ctx.registry
        .register_network("default")
        .register_subnet("subnet-a")
        .register_address("api-ip", None)
        .register_disk("data-disk-1");

    let mut task = desired();
    task.network = Some("default".to_string());
    task.subnet = Some("subnet-a".to_string());
    task.ip_address = Some("api-ip".to_string());
    task.tags = Some(vec!["web".to_string()]);
    let mut disks = BTreeMap::new();
    disks.insert("data".to_string(), "data-disk-1".to_string());
    task.disks = Some(disks);
    let mut metadata = BTreeMap::new();
    metadata.insert(
        "startup-script".to_string(),
        ContentSource::literal("#!/bin/sh\ntrue"),
    );
    metadata.insert("role".to_string(), ContentSource::literal("worker"));
    task.metadata = Some(metadata);

    let mut target = RenderTarget::Terraform(TerraformTarget::new());
    reconcile_instance(&task, &ctx, &mut target)
        .await
        .expect("terraform pass should succeed");

    let RenderTarget::Terraform(terraform) = target else {
        panic!("target variant changed");
    };
    let doc = terraform.to_json();
    let block = &doc["resource"]["google_compute_instance"]["vm-1"];

    assert_eq!(block["name"], "vm-1");
    assert_eq!(block["machine_type"], "n1-standard-1");
    assert_eq!(block["zone"], ZONE, "falls back to the task's zone");
    assert_eq!(block["tags"], json!(["web"]));
    assert_eq!(block["metadata_startup_script"], "#!/bin/sh\ntrue");
    assert_eq!(block["metadata"], json!({"role": "worker"}));

    let disks = block["disk"].as_array().unwrap();
    assert_eq!(disks.len(), 2);
    assert_eq!(disks[0]["auto_delete"], true);
    assert_eq!(disks[0]["scratch"], false);
    assert_eq!(disks[0]["device_name"], BOOT_DEVICE_NAME);
    assert_eq!(disks[1]["disk"], "data-disk-1");

    let interface = &block["network_interface"][0];
    assert_eq!(interface["network"], "${google_compute_network.default.name}");
    assert_eq!(
        interface["subnetwork"],
        "${google_compute_subnetwork.subnet-a.name}"
    );
    assert_eq!(
        interface["access_config"][0]["nat_ip"],
        "${google_compute_address.api-ip.address}"
    );

    assert_eq!(block["scheduling"]["preemptible"], false);
    assert_eq!(block["scheduling"]["on_host_maintenance"], "MIGRATE");
    assert_eq!(block["scheduling"]["automatic_restart"], true);

    // The only backend traffic is the Find read
    let requests = server.received_requests().await.unwrap();
    assert!(requests_with_method(&requests, "POST").is_empty());
}
