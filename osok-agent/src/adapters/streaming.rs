//! Streams. Active streams publish their messages endpoint as a secret.

use std::collections::BTreeMap;

use osok_core::{LifecycleClass, RemoteResource};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{LifecycleState, ResourceKind, ResourceMeta, put_field};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSpec {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub partitions: u32,
    #[serde(default = "default_retention")]
    pub retention_in_hours: u32,
    #[serde(default)]
    pub stream_pool_id: Option<String>,
    #[serde(default)]
    pub freeform_tags: BTreeMap<String, String>,
}

fn default_retention() -> u32 {
    24
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Creating,
    Active,
    Updating,
    Deleting,
    Deleted,
    Failed,
}

impl LifecycleState for StreamState {
    const ALL: &'static [Self] = &[
        StreamState::Creating,
        StreamState::Active,
        StreamState::Updating,
        StreamState::Deleting,
        StreamState::Deleted,
        StreamState::Failed,
    ];
    const CREATING: Self = StreamState::Creating;
    const READY: Self = StreamState::Active;
    const DELETED: Self = StreamState::Deleted;

    fn label(self) -> &'static str {
        match self {
            StreamState::Creating => "CREATING",
            StreamState::Active => "ACTIVE",
            StreamState::Updating => "UPDATING",
            StreamState::Deleting => "DELETING",
            StreamState::Deleted => "DELETED",
            StreamState::Failed => "FAILED",
        }
    }

    fn class(self) -> LifecycleClass {
        match self {
            StreamState::Creating | StreamState::Updating => LifecycleClass::Transient,
            StreamState::Active => LifecycleClass::TerminalOk,
            StreamState::Deleting | StreamState::Deleted | StreamState::Failed => {
                LifecycleClass::TerminalFailed
            }
        }
    }
}

pub struct Stream;

impl ResourceKind for Stream {
    const KIND: &'static str = "Stream";
    const PUBLISHES_SECRET: bool = true;

    type Spec = StreamSpec;
    type State = StreamState;

    fn meta(spec: &StreamSpec) -> &ResourceMeta {
        &spec.meta
    }

    // Partitions and retention are fixed at creation.
    fn mutable_fields(spec: &StreamSpec) -> Map<String, Value> {
        let mut fields = Map::new();
        put_field(&mut fields, "streamPoolId", json!(spec.stream_pool_id));
        put_field(&mut fields, "freeformTags", json!(spec.freeform_tags));
        fields
    }

    fn connection_details(
        _spec: &StreamSpec,
        resource: &RemoteResource,
    ) -> Option<BTreeMap<String, String>> {
        let endpoint = resource
            .properties
            .get("messagesEndpoint")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| "https://cell-1.streaming.oraclecloud.example".to_string());
        Some(BTreeMap::from([
            ("endpoint".to_string(), endpoint),
            ("streamId".to_string(), resource.id.clone()),
        ]))
    }
}
