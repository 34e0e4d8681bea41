//! Compute instances.
//!
//! Instances provision quickly, so the adapter waits for them in-line with
//! a bounded poll instead of handing back to the scheduler.

use std::collections::BTreeMap;

use osok_core::{LifecycleClass, Provisioning, RetryPolicy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{LifecycleState, ResourceKind, ResourceMeta, put_field};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSpec {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub availability_domain: String,
    pub shape: String,
    #[serde(default)]
    pub shape_config: Option<ShapeConfig>,
    pub image_id: String,
    pub subnet_id: String,
    #[serde(default)]
    pub ssh_authorized_keys: Vec<String>,
    #[serde(default)]
    pub freeform_tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeConfig {
    pub ocpus: u32,
    pub memory_in_gbs: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Moving,
    Provisioning,
    Running,
    Starting,
    Stopping,
    Stopped,
    CreatingImage,
    Terminating,
    Terminated,
}

impl LifecycleState for InstanceState {
    const ALL: &'static [Self] = &[
        InstanceState::Moving,
        InstanceState::Provisioning,
        InstanceState::Running,
        InstanceState::Starting,
        InstanceState::Stopping,
        InstanceState::Stopped,
        InstanceState::CreatingImage,
        InstanceState::Terminating,
        InstanceState::Terminated,
    ];
    const CREATING: Self = InstanceState::Provisioning;
    const READY: Self = InstanceState::Running;
    const DELETED: Self = InstanceState::Terminated;

    fn label(self) -> &'static str {
        match self {
            InstanceState::Moving => "MOVING",
            InstanceState::Provisioning => "PROVISIONING",
            InstanceState::Running => "RUNNING",
            InstanceState::Starting => "STARTING",
            InstanceState::Stopping => "STOPPING",
            InstanceState::Stopped => "STOPPED",
            InstanceState::CreatingImage => "CREATING_IMAGE",
            InstanceState::Terminating => "TERMINATING",
            InstanceState::Terminated => "TERMINATED",
        }
    }

    fn class(self) -> LifecycleClass {
        match self {
            InstanceState::Running | InstanceState::Stopped => LifecycleClass::TerminalOk,
            InstanceState::Terminating | InstanceState::Terminated => {
                LifecycleClass::TerminalFailed
            }
            InstanceState::Moving
            | InstanceState::Provisioning
            | InstanceState::Starting
            | InstanceState::Stopping
            | InstanceState::CreatingImage => LifecycleClass::Transient,
        }
    }
}

pub struct Instance;

impl ResourceKind for Instance {
    const KIND: &'static str = "Instance";

    type Spec = InstanceSpec;
    type State = InstanceState;

    fn meta(spec: &InstanceSpec) -> &ResourceMeta {
        &spec.meta
    }

    fn mutable_fields(spec: &InstanceSpec) -> Map<String, Value> {
        let mut fields = Map::new();
        put_field(&mut fields, "shape", json!(spec.shape));
        put_field(&mut fields, "shapeConfig", json!(spec.shape_config));
        put_field(&mut fields, "freeformTags", json!(spec.freeform_tags));
        fields
    }

    fn provisioning() -> Provisioning {
        Provisioning::Poll(RetryPolicy::provisioning())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::classify_label;

    #[test]
    fn test_instance_states() {
        assert_eq!(
            classify_label::<InstanceState>("RUNNING"),
            LifecycleClass::TerminalOk
        );
        assert_eq!(
            classify_label::<InstanceState>("creating_image"),
            LifecycleClass::Transient
        );
        assert_eq!(
            classify_label::<InstanceState>("TERMINATED"),
            LifecycleClass::TerminalFailed
        );
        assert_eq!(
            classify_label::<InstanceState>("SOMETHING_NEW"),
            LifecycleClass::Transient
        );
    }

    #[test]
    fn test_instance_polls_after_create() {
        assert!(matches!(Instance::provisioning(), Provisioning::Poll(_)));
    }

    #[test]
    fn test_instance_spec_from_json() {
        let spec: InstanceSpec = serde_json::from_value(json!({
            "compartmentId": "ocid1.compartment.oc1..c",
            "displayName": "web-1",
            "availabilityDomain": "AD-1",
            "shape": "VM.Standard.E4.Flex",
            "shapeConfig": { "ocpus": 2, "memoryInGbs": 16 },
            "imageId": "ocid1.image.oc1..img",
            "subnetId": "ocid1.subnet.oc1..sub"
        }))
        .unwrap();

        assert_eq!(spec.meta.display_name, "web-1");
        assert!(spec.meta.id.is_none());
        assert_eq!(spec.shape_config.as_ref().unwrap().ocpus, 2);

        let fields = Instance::create_fields(&spec).unwrap();
        assert_eq!(fields["shape"], "VM.Standard.E4.Flex");
        assert!(!fields.contains_key("displayName"));
        assert!(!fields.contains_key("compartmentId"));
    }
}
