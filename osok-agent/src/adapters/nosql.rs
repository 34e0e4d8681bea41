//! NoSQL tables.
//!
//! Table creation is asynchronous and the work request does not name the new
//! table, so the engine finds it by name on a later pass.

use osok_core::LifecycleClass;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{CreateStyle, LifecycleState, ResourceKind, ResourceMeta, put_field};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub ddl_statement: String,
    #[serde(default)]
    pub table_limits: Option<TableLimits>,
    #[serde(default)]
    pub is_auto_reclaimable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableLimits {
    pub max_read_units: u32,
    pub max_write_units: u32,
    pub max_storage_in_gbs: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    Creating,
    Updating,
    Active,
    Deleting,
    Deleted,
    Failed,
    Inactive,
}

impl LifecycleState for TableState {
    const ALL: &'static [Self] = &[
        TableState::Creating,
        TableState::Updating,
        TableState::Active,
        TableState::Deleting,
        TableState::Deleted,
        TableState::Failed,
        TableState::Inactive,
    ];
    const CREATING: Self = TableState::Creating;
    const READY: Self = TableState::Active;
    const DELETED: Self = TableState::Deleted;

    fn label(self) -> &'static str {
        match self {
            TableState::Creating => "CREATING",
            TableState::Updating => "UPDATING",
            TableState::Active => "ACTIVE",
            TableState::Deleting => "DELETING",
            TableState::Deleted => "DELETED",
            TableState::Failed => "FAILED",
            TableState::Inactive => "INACTIVE",
        }
    }

    fn class(self) -> LifecycleClass {
        match self {
            TableState::Creating | TableState::Updating => LifecycleClass::Transient,
            TableState::Active => LifecycleClass::TerminalOk,
            // An inactive table has been reclaimed and takes no traffic.
            TableState::Deleting
            | TableState::Deleted
            | TableState::Failed
            | TableState::Inactive => LifecycleClass::TerminalFailed,
        }
    }
}

pub struct Table;

impl ResourceKind for Table {
    const KIND: &'static str = "Table";
    const CREATE_STYLE: CreateStyle = CreateStyle::AsyncWithoutId;

    type Spec = TableSpec;
    type State = TableState;

    fn meta(spec: &TableSpec) -> &ResourceMeta {
        &spec.meta
    }

    fn mutable_fields(spec: &TableSpec) -> Map<String, Value> {
        let mut fields = Map::new();
        put_field(&mut fields, "ddlStatement", json!(spec.ddl_statement));
        put_field(&mut fields, "tableLimits", json!(spec.table_limits));
        fields
    }
}
