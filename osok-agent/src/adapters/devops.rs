//! DevOps projects.

use std::collections::BTreeMap;

use osok_core::LifecycleClass;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{LifecycleState, ResourceKind, ResourceMeta, put_field};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    #[serde(default)]
    pub description: Option<String>,
    pub notification_topic_id: String,
    #[serde(default)]
    pub freeform_tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectState {
    Creating,
    Updating,
    Active,
    Deleting,
    Deleted,
    Failed,
}

impl LifecycleState for ProjectState {
    const ALL: &'static [Self] = &[
        ProjectState::Creating,
        ProjectState::Updating,
        ProjectState::Active,
        ProjectState::Deleting,
        ProjectState::Deleted,
        ProjectState::Failed,
    ];
    const CREATING: Self = ProjectState::Creating;
    const READY: Self = ProjectState::Active;
    const DELETED: Self = ProjectState::Deleted;

    fn label(self) -> &'static str {
        match self {
            ProjectState::Creating => "CREATING",
            ProjectState::Updating => "UPDATING",
            ProjectState::Active => "ACTIVE",
            ProjectState::Deleting => "DELETING",
            ProjectState::Deleted => "DELETED",
            ProjectState::Failed => "FAILED",
        }
    }

    fn class(self) -> LifecycleClass {
        match self {
            ProjectState::Creating | ProjectState::Updating => LifecycleClass::Transient,
            ProjectState::Active => LifecycleClass::TerminalOk,
            ProjectState::Deleting | ProjectState::Deleted | ProjectState::Failed => {
                LifecycleClass::TerminalFailed
            }
        }
    }
}

pub struct Project;

impl ResourceKind for Project {
    const KIND: &'static str = "Project";

    type Spec = ProjectSpec;
    type State = ProjectState;

    fn meta(spec: &ProjectSpec) -> &ResourceMeta {
        &spec.meta
    }

    fn mutable_fields(spec: &ProjectSpec) -> Map<String, Value> {
        let mut fields = Map::new();
        put_field(&mut fields, "description", json!(spec.description));
        put_field(
            &mut fields,
            "notificationTopicId",
            json!(spec.notification_topic_id),
        );
        put_field(&mut fields, "freeformTags", json!(spec.freeform_tags));
        fields
    }
}
