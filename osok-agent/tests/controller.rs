//! Controller integration tests against the simulated provider.

mod common;

use common::*;
use osok_agent::adapters::secret_name;
use osok_agent::clients::{CloudConfig, Operation};
use osok_agent::{Manifest, StatusFile};
use osok_core::{AdapterError, ConditionStatus, ConditionType};
use serde_json::json;

#[tokio::test(start_paused = true)]
async fn test_multi_kind_manifest_converges() {
    let mut agent = TestAgent::converging();
    let manifest = manifest(vec![
        vcn("prod"),
        subnet("app"),
        instance("web-1"),
        autonomous_database("orders"),
        table("events"),
        mysql("legacy"),
    ]);

    let report = agent.apply(&manifest).await;

    assert!(report.is_settled(), "{:?}", report);
    assert_eq!(report.converged.len(), 6);
    for key in &report.converged {
        let status = agent.statuses.get(key).unwrap();
        assert!(status.is_bound(), "{} not bound", key);
        assert!(status.created_at.is_some());
        assert_eq!(
            status.latest().unwrap().condition_type,
            ConditionType::Active
        );
    }

    let adb = agent.ocid("AutonomousDatabase/orders");
    let secret = agent
        .secrets
        .get(&secret_name("AutonomousDatabase", &adb))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(secret["dbName"], "ORDERS");

    let mysql = agent.ocid("MySqlDbSystem/legacy");
    assert!(
        agent
            .secrets
            .get(&secret_name("MySqlDbSystem", &mysql))
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test(start_paused = true)]
async fn test_second_pass_creates_nothing() {
    let mut agent = TestAgent::converging();
    let manifest = manifest(vec![vcn("prod"), table("events")]);

    agent.apply(&manifest).await;
    let first = agent.ocid("Vcn/prod");
    let report = agent.apply(&manifest).await;

    assert_eq!(report.converged.len(), 2);
    assert_eq!(agent.ocid("Vcn/prod"), first);
    assert_eq!(agent.cloud.records("Vcn").await.len(), 1);
    assert_eq!(agent.cloud.records("Table").await.len(), 1);
}

#[tokio::test]
async fn test_invisible_table_is_requeued_then_bound_once() {
    let mut agent = TestAgent::new(
        CloudConfig {
            settle_reads: 1,
            visibility_lag: 1,
        },
        1,
    );
    let manifest = manifest(vec![table("events")]);

    let report = agent.apply(&manifest).await;
    assert_eq!(report.pending, vec!["Table/events".to_string()]);
    let status = agent.statuses.get("Table/events").unwrap();
    assert!(!status.is_bound());
    assert_eq!(status.latest().unwrap().reason, "CreateAccepted");

    let report = agent.apply(&manifest).await;
    assert_eq!(report.converged, vec!["Table/events".to_string()]);
    assert_eq!(agent.cloud.records("Table").await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deleted_object_is_released() {
    let mut agent = TestAgent::converging();
    let mut declared = manifest(vec![autonomous_database("orders")]);
    agent.apply(&declared).await;
    let id = agent.ocid("AutonomousDatabase/orders");

    declared.objects[0].deleted = true;
    let report = agent.apply(&declared).await;

    assert_eq!(report.released, vec!["AutonomousDatabase/orders".to_string()]);
    assert!(agent.statuses.get("AutonomousDatabase/orders").is_none());
    let records = agent.cloud.records("AutonomousDatabase").await;
    assert_eq!(records[0].lifecycle_state, "TERMINATED");
    assert!(
        agent
            .secrets
            .get(&secret_name("AutonomousDatabase", &id))
            .await
            .unwrap()
            .is_none()
    );

    // Releasing again is a no-op.
    let report = agent.apply(&declared).await;
    assert_eq!(report.released.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_delete_keeps_status() {
    let mut agent = TestAgent::new(CloudConfig::default(), 1);
    let mut declared = manifest(vec![vcn("prod")]);
    agent.apply(&declared).await;
    agent
        .cloud
        .inject_fault(
            Operation::Delete,
            AdapterError::Unauthorized("token expired".into()),
        )
        .await;

    declared.objects[0].deleted = true;
    let report = agent.apply(&declared).await;

    assert_eq!(report.failed.len(), 1);
    assert!(agent.statuses.get("Vcn/prod").unwrap().is_bound());
}

#[tokio::test(start_paused = true)]
async fn test_secret_outage_does_not_block_deletion() {
    let mut agent = TestAgent::converging();
    let mut declared = manifest(vec![autonomous_database("orders")]);
    agent.apply(&declared).await;

    agent.secrets.set_unavailable(true);
    declared.objects[0].deleted = true;
    let report = agent.apply(&declared).await;

    assert_eq!(report.released.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_secret_outage_fails_publish() {
    let mut agent = TestAgent::converging();
    agent.secrets.set_unavailable(true);

    let report = agent.apply(&manifest(vec![autonomous_database("orders")])).await;

    assert_eq!(report.failed.len(), 1);
    let status = agent.statuses.get("AutonomousDatabase/orders").unwrap();
    let latest = status.latest().unwrap();
    assert_eq!(latest.condition_type, ConditionType::Failed);
    assert_eq!(latest.reason, "SecretMaterializationFailed");
}

#[tokio::test(start_paused = true)]
async fn test_unknown_kind_fails_without_provider_calls() {
    let mut agent = TestAgent::converging();
    let manifest = manifest(vec![object("Bucket", "logs", json!({}))]);

    let report = agent.apply(&manifest).await;

    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].1.contains("spec mismatch"));
}

#[tokio::test(start_paused = true)]
async fn test_provisioning_failure_is_reported_not_retried() {
    let mut agent = TestAgent::converging();
    agent.cloud.fail_provisioning("Vcn", "bad", "TERMINATED").await;

    let report = agent.apply(&manifest(vec![vcn("bad")])).await;

    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].1.contains("TERMINATED"));
    let status = agent.statuses.get("Vcn/bad").unwrap();
    assert_eq!(
        status.latest_of(ConditionType::Failed).unwrap().status,
        ConditionStatus::False
    );
    assert_eq!(agent.cloud.records("Vcn").await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bad_request_code_is_recorded() {
    let mut agent = TestAgent::converging();
    let invalid = object(
        "Vcn",
        "nameless",
        json!({ "compartmentId": "", "displayName": "x", "cidrBlocks": [] }),
    );

    let report = agent.apply(&manifest(vec![invalid])).await;

    assert_eq!(report.failed.len(), 1);
    let status = agent.statuses.get("Vcn/nameless").unwrap();
    assert_eq!(status.message.as_deref(), Some("MissingParameter"));
}

#[tokio::test(start_paused = true)]
async fn test_bound_object_is_updated_in_place() {
    let mut agent = TestAgent::converging();
    agent.apply(&manifest(vec![vcn("prod")])).await;
    let id = agent.ocid("Vcn/prod");

    let bound = object(
        "Vcn",
        "prod",
        json!({
            "id": id,
            "compartmentId": COMPARTMENT,
            "displayName": "prod-renamed",
            "cidrBlocks": ["10.0.0.0/16", "10.1.0.0/16"]
        }),
    );
    let report = agent.apply(&manifest(vec![bound])).await;

    assert_eq!(report.converged.len(), 1);
    let records = agent.cloud.records("Vcn").await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].display_name, "prod-renamed");
    assert_eq!(records[0].properties["cidrBlocks"].as_array().unwrap().len(), 2);
    let status = agent.statuses.get("Vcn/prod").unwrap();
    assert_eq!(
        status.latest_of(ConditionType::Updating).unwrap().reason,
        "UpdateApplied"
    );
    assert_eq!(
        status.latest().unwrap().condition_type,
        ConditionType::Active
    );
}

#[tokio::test(start_paused = true)]
async fn test_undeclared_object_is_pruned() {
    let mut agent = TestAgent::converging();
    agent.apply(&manifest(vec![vcn("prod"), vcn("old")])).await;

    let report = agent.apply(&manifest(vec![vcn("prod")])).await;

    assert_eq!(report.released, vec!["Vcn/old".to_string()]);
    assert!(agent.statuses.get("Vcn/old").is_none());
    let old = agent
        .cloud
        .records("Vcn")
        .await
        .into_iter()
        .find(|r| r.display_name == "old")
        .unwrap();
    assert_eq!(old.lifecycle_state, "TERMINATED");
}

#[tokio::test(start_paused = true)]
async fn test_statuses_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("status.json");
    let declared = manifest(vec![vcn("prod")]);

    let mut agent = TestAgent::converging();
    agent.apply(&declared).await;
    agent.statuses.save(&path).await.unwrap();

    let loaded = StatusFile::load(&path).await.unwrap();
    assert_eq!(loaded, agent.statuses);

    agent.statuses = loaded;
    let report = agent.apply(&declared).await;
    assert_eq!(report.converged.len(), 1);
    assert_eq!(agent.cloud.records("Vcn").await.len(), 1);
}

#[tokio::test]
async fn test_manifest_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manifest.json");
    let declared = manifest(vec![vcn("prod"), table("events")]);
    tokio::fs::write(&path, serde_json::to_string(&declared).unwrap())
        .await
        .unwrap();

    let loaded = Manifest::load(&path).await.unwrap();
    assert_eq!(loaded, declared);
}
