//! Core networking: VCNs, subnets, gateways, DRGs, route tables and
//! security lists. All of them share one lifecycle.

use std::collections::BTreeMap;

use osok_core::LifecycleClass;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{LifecycleState, ResourceKind, ResourceMeta, put_field};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkingState {
    Provisioning,
    Available,
    Updating,
    Terminating,
    Terminated,
}

impl LifecycleState for NetworkingState {
    const ALL: &'static [Self] = &[
        NetworkingState::Provisioning,
        NetworkingState::Available,
        NetworkingState::Updating,
        NetworkingState::Terminating,
        NetworkingState::Terminated,
    ];
    const CREATING: Self = NetworkingState::Provisioning;
    const READY: Self = NetworkingState::Available;
    const DELETED: Self = NetworkingState::Terminated;

    fn label(self) -> &'static str {
        match self {
            NetworkingState::Provisioning => "PROVISIONING",
            NetworkingState::Available => "AVAILABLE",
            NetworkingState::Updating => "UPDATING",
            NetworkingState::Terminating => "TERMINATING",
            NetworkingState::Terminated => "TERMINATED",
        }
    }

    fn class(self) -> LifecycleClass {
        match self {
            NetworkingState::Provisioning | NetworkingState::Updating => LifecycleClass::Transient,
            NetworkingState::Available => LifecycleClass::TerminalOk,
            NetworkingState::Terminating | NetworkingState::Terminated => {
                LifecycleClass::TerminalFailed
            }
        }
    }
}

// =============================================================================
// VCN
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcnSpec {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub cidr_blocks: Vec<String>,
    #[serde(default)]
    pub dns_label: Option<String>,
    #[serde(default)]
    pub freeform_tags: BTreeMap<String, String>,
}

pub struct Vcn;

impl ResourceKind for Vcn {
    const KIND: &'static str = "Vcn";

    type Spec = VcnSpec;
    type State = NetworkingState;

    fn meta(spec: &VcnSpec) -> &ResourceMeta {
        &spec.meta
    }

    fn mutable_fields(spec: &VcnSpec) -> Map<String, Value> {
        let mut fields = Map::new();
        put_field(&mut fields, "cidrBlocks", json!(spec.cidr_blocks));
        put_field(&mut fields, "freeformTags", json!(spec.freeform_tags));
        fields
    }
}

// =============================================================================
// Subnet
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetSpec {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub vcn_id: String,
    pub cidr_block: String,
    #[serde(default)]
    pub dns_label: Option<String>,
    #[serde(default)]
    pub prohibit_public_ip_on_vnic: bool,
    #[serde(default)]
    pub route_table_id: Option<String>,
    #[serde(default)]
    pub security_list_ids: Vec<String>,
}

pub struct Subnet;

impl ResourceKind for Subnet {
    const KIND: &'static str = "Subnet";

    type Spec = SubnetSpec;
    type State = NetworkingState;

    fn meta(spec: &SubnetSpec) -> &ResourceMeta {
        &spec.meta
    }

    fn mutable_fields(spec: &SubnetSpec) -> Map<String, Value> {
        let mut fields = Map::new();
        put_field(&mut fields, "cidrBlock", json!(spec.cidr_block));
        put_field(&mut fields, "routeTableId", json!(spec.route_table_id));
        put_field(&mut fields, "securityListIds", json!(spec.security_list_ids));
        fields
    }
}

// =============================================================================
// Gateways
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternetGatewaySpec {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub vcn_id: String,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
}

fn default_true() -> bool {
    true
}

pub struct InternetGateway;

impl ResourceKind for InternetGateway {
    const KIND: &'static str = "InternetGateway";

    type Spec = InternetGatewaySpec;
    type State = NetworkingState;

    fn meta(spec: &InternetGatewaySpec) -> &ResourceMeta {
        &spec.meta
    }

    fn mutable_fields(spec: &InternetGatewaySpec) -> Map<String, Value> {
        let mut fields = Map::new();
        put_field(&mut fields, "isEnabled", json!(spec.is_enabled));
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NatGatewaySpec {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub vcn_id: String,
    #[serde(default)]
    pub block_traffic: bool,
    #[serde(default)]
    pub public_ip_id: Option<String>,
}

pub struct NatGateway;

impl ResourceKind for NatGateway {
    const KIND: &'static str = "NatGateway";

    type Spec = NatGatewaySpec;
    type State = NetworkingState;

    fn meta(spec: &NatGatewaySpec) -> &ResourceMeta {
        &spec.meta
    }

    fn mutable_fields(spec: &NatGatewaySpec) -> Map<String, Value> {
        let mut fields = Map::new();
        put_field(&mut fields, "blockTraffic", json!(spec.block_traffic));
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceGatewaySpec {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub vcn_id: String,
    /// Service identifiers the gateway routes to.
    pub services: Vec<String>,
    #[serde(default)]
    pub route_table_id: Option<String>,
}

pub struct ServiceGateway;

impl ResourceKind for ServiceGateway {
    const KIND: &'static str = "ServiceGateway";

    type Spec = ServiceGatewaySpec;
    type State = NetworkingState;

    fn meta(spec: &ServiceGatewaySpec) -> &ResourceMeta {
        &spec.meta
    }

    fn mutable_fields(spec: &ServiceGatewaySpec) -> Map<String, Value> {
        let mut fields = Map::new();
        put_field(&mut fields, "services", json!(spec.services));
        put_field(&mut fields, "routeTableId", json!(spec.route_table_id));
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrgSpec {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    #[serde(default)]
    pub freeform_tags: BTreeMap<String, String>,
}

pub struct Drg;

impl ResourceKind for Drg {
    const KIND: &'static str = "Drg";

    type Spec = DrgSpec;
    type State = NetworkingState;

    fn meta(spec: &DrgSpec) -> &ResourceMeta {
        &spec.meta
    }

    fn mutable_fields(spec: &DrgSpec) -> Map<String, Value> {
        let mut fields = Map::new();
        put_field(&mut fields, "freeformTags", json!(spec.freeform_tags));
        fields
    }
}

// =============================================================================
// Route tables and security lists
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRule {
    pub destination: String,
    #[serde(default = "default_destination_type")]
    pub destination_type: String,
    pub network_entity_id: String,
}

fn default_destination_type() -> String {
    "CIDR_BLOCK".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTableSpec {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub vcn_id: String,
    #[serde(default)]
    pub route_rules: Vec<RouteRule>,
}

pub struct RouteTable;

impl ResourceKind for RouteTable {
    const KIND: &'static str = "RouteTable";

    type Spec = RouteTableSpec;
    type State = NetworkingState;

    fn meta(spec: &RouteTableSpec) -> &ResourceMeta {
        &spec.meta
    }

    fn mutable_fields(spec: &RouteTableSpec) -> Map<String, Value> {
        let mut fields = Map::new();
        put_field(&mut fields, "routeRules", json!(spec.route_rules));
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRule {
    /// Protocol number, or "all".
    pub protocol: String,
    /// Source CIDR for ingress rules, destination CIDR for egress rules.
    pub cidr: String,
    #[serde(default)]
    pub is_stateless: bool,
    #[serde(default)]
    pub port_min: Option<u16>,
    #[serde(default)]
    pub port_max: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityListSpec {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub vcn_id: String,
    #[serde(default)]
    pub ingress_security_rules: Vec<SecurityRule>,
    #[serde(default)]
    pub egress_security_rules: Vec<SecurityRule>,
}

pub struct SecurityList;

impl ResourceKind for SecurityList {
    const KIND: &'static str = "SecurityList";

    type Spec = SecurityListSpec;
    type State = NetworkingState;

    fn meta(spec: &SecurityListSpec) -> &ResourceMeta {
        &spec.meta
    }

    fn mutable_fields(spec: &SecurityListSpec) -> Map<String, Value> {
        let mut fields = Map::new();
        put_field(
            &mut fields,
            "ingressSecurityRules",
            json!(spec.ingress_security_rules),
        );
        put_field(
            &mut fields,
            "egressSecurityRules",
            json!(spec.egress_security_rules),
        );
        fields
    }
}
