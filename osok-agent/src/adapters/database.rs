//! Autonomous databases and MySQL DB systems.
//!
//! Both publish their connection endpoints as a secret once active.

use std::collections::BTreeMap;

use osok_core::{LifecycleClass, RemoteResource};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{CreateStyle, LifecycleState, ResourceKind, ResourceMeta, put_field};

/// Read a string property, if present.
fn property(resource: &RemoteResource, key: &str) -> Option<String> {
    resource
        .properties
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

// =============================================================================
// Autonomous Database
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutonomousDatabaseSpec {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub db_name: String,
    #[serde(default = "default_ocpus")]
    pub cpu_core_count: u32,
    #[serde(default = "default_storage")]
    pub data_storage_size_in_tbs: u32,
    #[serde(default)]
    pub db_workload: Option<String>,
    #[serde(default)]
    pub is_auto_scaling_enabled: bool,
    #[serde(default)]
    pub freeform_tags: BTreeMap<String, String>,
}

fn default_ocpus() -> u32 {
    1
}

fn default_storage() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutonomousDatabaseState {
    Provisioning,
    Available,
    Stopping,
    Stopped,
    Starting,
    Terminating,
    Terminated,
    Unavailable,
    RestoreInProgress,
    RestoreFailed,
    BackupInProgress,
    ScaleInProgress,
    AvailableNeedsAttention,
    Updating,
}

impl LifecycleState for AutonomousDatabaseState {
    const ALL: &'static [Self] = &[
        AutonomousDatabaseState::Provisioning,
        AutonomousDatabaseState::Available,
        AutonomousDatabaseState::Stopping,
        AutonomousDatabaseState::Stopped,
        AutonomousDatabaseState::Starting,
        AutonomousDatabaseState::Terminating,
        AutonomousDatabaseState::Terminated,
        AutonomousDatabaseState::Unavailable,
        AutonomousDatabaseState::RestoreInProgress,
        AutonomousDatabaseState::RestoreFailed,
        AutonomousDatabaseState::BackupInProgress,
        AutonomousDatabaseState::ScaleInProgress,
        AutonomousDatabaseState::AvailableNeedsAttention,
        AutonomousDatabaseState::Updating,
    ];
    const CREATING: Self = AutonomousDatabaseState::Provisioning;
    const READY: Self = AutonomousDatabaseState::Available;
    const DELETED: Self = AutonomousDatabaseState::Terminated;

    fn label(self) -> &'static str {
        match self {
            AutonomousDatabaseState::Provisioning => "PROVISIONING",
            AutonomousDatabaseState::Available => "AVAILABLE",
            AutonomousDatabaseState::Stopping => "STOPPING",
            AutonomousDatabaseState::Stopped => "STOPPED",
            AutonomousDatabaseState::Starting => "STARTING",
            AutonomousDatabaseState::Terminating => "TERMINATING",
            AutonomousDatabaseState::Terminated => "TERMINATED",
            AutonomousDatabaseState::Unavailable => "UNAVAILABLE",
            AutonomousDatabaseState::RestoreInProgress => "RESTORE_IN_PROGRESS",
            AutonomousDatabaseState::RestoreFailed => "RESTORE_FAILED",
            AutonomousDatabaseState::BackupInProgress => "BACKUP_IN_PROGRESS",
            AutonomousDatabaseState::ScaleInProgress => "SCALE_IN_PROGRESS",
            AutonomousDatabaseState::AvailableNeedsAttention => "AVAILABLE_NEEDS_ATTENTION",
            AutonomousDatabaseState::Updating => "UPDATING",
        }
    }

    fn class(self) -> LifecycleClass {
        use AutonomousDatabaseState::*;
        match self {
            Available | AvailableNeedsAttention | Stopped => LifecycleClass::TerminalOk,
            Terminating | Terminated | Unavailable | RestoreFailed => {
                LifecycleClass::TerminalFailed
            }
            Provisioning | Stopping | Starting | RestoreInProgress | BackupInProgress
            | ScaleInProgress | Updating => LifecycleClass::Transient,
        }
    }
}

pub struct AutonomousDatabase;

impl ResourceKind for AutonomousDatabase {
    const KIND: &'static str = "AutonomousDatabase";
    const PUBLISHES_SECRET: bool = true;

    type Spec = AutonomousDatabaseSpec;
    type State = AutonomousDatabaseState;

    fn meta(spec: &AutonomousDatabaseSpec) -> &ResourceMeta {
        &spec.meta
    }

    fn mutable_fields(spec: &AutonomousDatabaseSpec) -> Map<String, Value> {
        let mut fields = Map::new();
        put_field(&mut fields, "cpuCoreCount", json!(spec.cpu_core_count));
        put_field(
            &mut fields,
            "dataStorageSizeInTBs",
            json!(spec.data_storage_size_in_tbs),
        );
        put_field(
            &mut fields,
            "isAutoScalingEnabled",
            json!(spec.is_auto_scaling_enabled),
        );
        put_field(&mut fields, "freeformTags", json!(spec.freeform_tags));
        fields
    }

    fn connection_details(
        spec: &AutonomousDatabaseSpec,
        resource: &RemoteResource,
    ) -> Option<BTreeMap<String, String>> {
        let host = property(resource, "host")
            .unwrap_or_else(|| format!("{}.adb.oraclecloud.example", spec.db_name.to_lowercase()));
        Some(BTreeMap::from([
            ("dbName".to_string(), spec.db_name.clone()),
            ("host".to_string(), host.clone()),
            (
                "connectionString".to_string(),
                format!("{}:1522/{}_high", host, spec.db_name.to_lowercase()),
            ),
            ("id".to_string(), resource.id.clone()),
        ]))
    }
}

// =============================================================================
// MySQL DB System
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MySqlDbSystemSpec {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub shape_name: String,
    pub subnet_id: String,
    #[serde(default)]
    pub availability_domain: Option<String>,
    #[serde(default)]
    pub mysql_version: Option<String>,
    #[serde(default)]
    pub data_storage_size_in_gbs: Option<u32>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_port() -> u16 {
    3306
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MySqlDbSystemState {
    Creating,
    Active,
    Inactive,
    Updating,
    Deleting,
    Deleted,
    Failed,
}

impl LifecycleState for MySqlDbSystemState {
    const ALL: &'static [Self] = &[
        MySqlDbSystemState::Creating,
        MySqlDbSystemState::Active,
        MySqlDbSystemState::Inactive,
        MySqlDbSystemState::Updating,
        MySqlDbSystemState::Deleting,
        MySqlDbSystemState::Deleted,
        MySqlDbSystemState::Failed,
    ];
    const CREATING: Self = MySqlDbSystemState::Creating;
    const READY: Self = MySqlDbSystemState::Active;
    const DELETED: Self = MySqlDbSystemState::Deleted;

    fn label(self) -> &'static str {
        match self {
            MySqlDbSystemState::Creating => "CREATING",
            MySqlDbSystemState::Active => "ACTIVE",
            MySqlDbSystemState::Inactive => "INACTIVE",
            MySqlDbSystemState::Updating => "UPDATING",
            MySqlDbSystemState::Deleting => "DELETING",
            MySqlDbSystemState::Deleted => "DELETED",
            MySqlDbSystemState::Failed => "FAILED",
        }
    }

    fn class(self) -> LifecycleClass {
        match self {
            MySqlDbSystemState::Creating | MySqlDbSystemState::Updating => {
                LifecycleClass::Transient
            }
            // Inactive means stopped by the owner, not broken.
            MySqlDbSystemState::Active | MySqlDbSystemState::Inactive => {
                LifecycleClass::TerminalOk
            }
            MySqlDbSystemState::Deleting
            | MySqlDbSystemState::Deleted
            | MySqlDbSystemState::Failed => LifecycleClass::TerminalFailed,
        }
    }
}

pub struct MySqlDbSystem;

impl ResourceKind for MySqlDbSystem {
    const KIND: &'static str = "MySqlDbSystem";
    const CREATE_STYLE: CreateStyle = CreateStyle::AsyncWithId;
    const PUBLISHES_SECRET: bool = true;

    type Spec = MySqlDbSystemSpec;
    type State = MySqlDbSystemState;

    fn meta(spec: &MySqlDbSystemSpec) -> &ResourceMeta {
        &spec.meta
    }

    fn mutable_fields(spec: &MySqlDbSystemSpec) -> Map<String, Value> {
        let mut fields = Map::new();
        put_field(&mut fields, "shapeName", json!(spec.shape_name));
        put_field(
            &mut fields,
            "dataStorageSizeInGBs",
            json!(spec.data_storage_size_in_gbs),
        );
        put_field(&mut fields, "description", json!(spec.description));
        fields
    }

    fn connection_details(
        spec: &MySqlDbSystemSpec,
        resource: &RemoteResource,
    ) -> Option<BTreeMap<String, String>> {
        let host = property(resource, "ipAddress").unwrap_or_else(|| {
            format!("{}.mysql.oraclecloud.example", spec.meta.display_name)
        });
        Some(BTreeMap::from([
            ("host".to_string(), host),
            ("port".to_string(), spec.port.to_string()),
            ("id".to_string(), resource.id.clone()),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::classify_label;

    fn adb_spec() -> AutonomousDatabaseSpec {
        serde_json::from_value(json!({
            "compartmentId": "ocid1.compartment.oc1..c",
            "displayName": "orders-db",
            "dbName": "ORDERS"
        }))
        .unwrap()
    }

    #[test]
    fn test_adb_states() {
        assert_eq!(
            classify_label::<AutonomousDatabaseState>("AVAILABLE_NEEDS_ATTENTION"),
            LifecycleClass::TerminalOk
        );
        assert_eq!(
            classify_label::<AutonomousDatabaseState>("SCALE_IN_PROGRESS"),
            LifecycleClass::Transient
        );
        assert_eq!(
            classify_label::<AutonomousDatabaseState>("RESTORE_FAILED"),
            LifecycleClass::TerminalFailed
        );
    }

    #[test]
    fn test_adb_defaults() {
        let spec = adb_spec();
        assert_eq!(spec.cpu_core_count, 1);
        assert_eq!(spec.data_storage_size_in_tbs, 1);
    }

    #[test]
    fn test_adb_connection_details() {
        let spec = adb_spec();
        let resource = RemoteResource::new("ocid1.adb.oc1..a", Some("orders-db"), "AVAILABLE");

        let details = AutonomousDatabase::connection_details(&spec, &resource).unwrap();
        assert_eq!(details["dbName"], "ORDERS");
        assert_eq!(details["id"], "ocid1.adb.oc1..a");
        assert!(details["connectionString"].ends_with("/orders_high"));
    }

    #[test]
    fn test_mysql_inactive_is_ok() {
        assert_eq!(
            classify_label::<MySqlDbSystemState>("INACTIVE"),
            LifecycleClass::TerminalOk
        );
        assert_eq!(
            classify_label::<MySqlDbSystemState>("DELETING"),
            LifecycleClass::TerminalFailed
        );
    }

    #[test]
    fn test_mysql_connection_details_prefer_reported_address() {
        let spec: MySqlDbSystemSpec = serde_json::from_value(json!({
            "compartmentId": "ocid1.compartment.oc1..c",
            "displayName": "mysql",
            "shapeName": "MySQL.VM.Standard.E3.1.8GB",
            "subnetId": "ocid1.subnet.oc1..s"
        }))
        .unwrap();
        let mut resource = RemoteResource::new("ocid1.mysql.oc1..m", Some("mysql"), "ACTIVE");
        resource
            .properties
            .insert("ipAddress".into(), json!("10.0.1.7"));

        let details = MySqlDbSystem::connection_details(&spec, &resource).unwrap();
        assert_eq!(details["host"], "10.0.1.7");
        assert_eq!(details["port"], "3306");
    }
}
