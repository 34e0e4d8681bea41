//! Shared test utilities for osok-agent integration tests.

#![allow(dead_code)]

use std::time::Duration;

use osok_agent::clients::{CloudClient, CloudConfig, SecretStore};
use osok_agent::{
    AdapterConfig, ApplyReport, Controller, ControllerConfig, Manifest, ObjectSpec, StatusFile,
    all_reconcilers,
};
use osok_core::{Backoff, RetryPolicy};
use serde_json::{Value, json};

pub const COMPARTMENT: &str = "ocid1.compartment.oc1..test";

/// Controller wired to a fresh simulated provider.
pub struct TestAgent {
    pub cloud: CloudClient,
    pub secrets: SecretStore,
    pub controller: Controller,
    pub statuses: StatusFile,
}

impl TestAgent {
    pub fn new(cloud_config: CloudConfig, max_rounds: u32) -> Self {
        let cloud = CloudClient::new(cloud_config);
        let secrets = SecretStore::new();
        let adapter_config = AdapterConfig {
            requeue_delay: Duration::from_secs(30),
            poll: RetryPolicy::provisioning()
                .with_max_attempts(5)
                .with_backoff(Backoff::Fixed(Duration::from_secs(60))),
        };
        let controller = Controller::with_reconcilers(
            ControllerConfig {
                default_backoff: Duration::from_secs(10),
                max_rounds,
                prune: true,
            },
            all_reconcilers(&cloud, &secrets, &adapter_config),
        );
        Self {
            cloud,
            secrets,
            controller,
            statuses: StatusFile::default(),
        }
    }

    /// Provider that settles after two reads, with enough rounds to see it.
    pub fn converging() -> Self {
        Self::new(CloudConfig::default(), 5)
    }

    pub async fn apply(&mut self, manifest: &Manifest) -> ApplyReport {
        self.controller.apply(manifest, &mut self.statuses).await
    }

    pub fn ocid(&self, key: &str) -> String {
        self.statuses
            .get(key)
            .map(|s| s.ocid.clone())
            .unwrap_or_default()
    }
}

pub fn object(kind: &str, name: &str, spec: Value) -> ObjectSpec {
    ObjectSpec {
        kind: kind.to_string(),
        name: name.to_string(),
        spec,
        deleted: false,
    }
}

pub fn manifest(objects: Vec<ObjectSpec>) -> Manifest {
    Manifest { objects }
}

pub fn vcn(name: &str) -> ObjectSpec {
    object(
        "Vcn",
        name,
        json!({
            "compartmentId": COMPARTMENT,
            "displayName": name,
            "cidrBlocks": ["10.0.0.0/16"]
        }),
    )
}

pub fn subnet(name: &str) -> ObjectSpec {
    object(
        "Subnet",
        name,
        json!({
            "compartmentId": COMPARTMENT,
            "displayName": name,
            "vcnId": "ocid1.vcn.oc1..declared",
            "cidrBlock": "10.0.1.0/24"
        }),
    )
}

pub fn instance(name: &str) -> ObjectSpec {
    object(
        "Instance",
        name,
        json!({
            "compartmentId": COMPARTMENT,
            "displayName": name,
            "availabilityDomain": "AD-1",
            "shape": "VM.Standard.E4.Flex",
            "imageId": "ocid1.image.oc1..img",
            "subnetId": "ocid1.subnet.oc1..sub"
        }),
    )
}

pub fn autonomous_database(name: &str) -> ObjectSpec {
    object(
        "AutonomousDatabase",
        name,
        json!({
            "compartmentId": COMPARTMENT,
            "displayName": name,
            "dbName": "ORDERS"
        }),
    )
}

pub fn table(name: &str) -> ObjectSpec {
    object(
        "Table",
        name,
        json!({
            "compartmentId": COMPARTMENT,
            "name": name,
            "ddlStatement": "CREATE TABLE t (id INTEGER, PRIMARY KEY (id))"
        }),
    )
}

pub fn mysql(name: &str) -> ObjectSpec {
    object(
        "MySqlDbSystem",
        name,
        json!({
            "compartmentId": COMPARTMENT,
            "displayName": name,
            "shapeName": "MySQL.VM.Standard.E3.1.8GB",
            "subnetId": "ocid1.subnet.oc1..sub"
        }),
    )
}
