//! Resource adapters for the supported kinds.
//!
//! Every kind is a [`ResourceKind`] binding (spec type, lifecycle states,
//! create and update payloads) plugged into the one generic
//! [`CloudAdapter`], which implements the engine's adapter contract on top
//! of the cloud client.

pub mod compute;
pub mod database;
pub mod devops;
pub mod networking;
pub mod nosql;
pub mod streaming;

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use osok_core::error::Result;
use osok_core::{
    AdapterError, Created, LifecycleClass, Provisioning, RemoteResource, ResourceAdapter,
    RetryPolicy,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::clients::{CloudClient, CreateRequest, LifecycleLabels, SecretStore};
use crate::reconciler::{KindReconciler, Reconciler};

/// Identity fields shared by every spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMeta {
    /// Bind to this existing resource instead of discovering by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub compartment_id: String,
    #[serde(alias = "name")]
    pub display_name: String,
}

/// A kind's provider lifecycle states.
pub trait LifecycleState: Copy + 'static {
    const ALL: &'static [Self];
    /// State a new resource starts in.
    const CREATING: Self;
    /// State a healthy resource settles in.
    const READY: Self;
    /// State a deleted resource is left in.
    const DELETED: Self;

    fn label(self) -> &'static str;

    fn class(self) -> LifecycleClass;

    fn parse(label: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.label().eq_ignore_ascii_case(label))
    }

    fn labels() -> LifecycleLabels {
        LifecycleLabels {
            creating: Self::CREATING.label(),
            ready: Self::READY.label(),
            deleted: Self::DELETED.label(),
        }
    }
}

/// Classify a provider label. Unknown labels keep the resource waiting.
pub fn classify_label<S: LifecycleState>(label: &str) -> LifecycleClass {
    S::parse(label)
        .map(S::class)
        .unwrap_or(LifecycleClass::Transient)
}

/// What a kind's create call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStyle {
    /// The new resource is returned.
    Synchronous,
    /// A work request is returned that names the new resource.
    AsyncWithId,
    /// A work request is returned; the resource must be found by name.
    AsyncWithoutId,
}

/// Binding of one provider resource kind.
pub trait ResourceKind: Send + Sync + 'static {
    const KIND: &'static str;
    const CREATE_STYLE: CreateStyle = CreateStyle::Synchronous;
    /// Whether the kind publishes connection details as a secret.
    const PUBLISHES_SECRET: bool = false;

    type Spec: Serialize + DeserializeOwned + Send + Sync + 'static;
    type State: LifecycleState;

    fn meta(spec: &Self::Spec) -> &ResourceMeta;

    /// Fields the provider may change in place. Compared against the
    /// current resource to decide whether an update is needed.
    fn mutable_fields(spec: &Self::Spec) -> Map<String, Value>;

    /// Provider payload for create: the spec without its identity fields.
    fn create_fields(spec: &Self::Spec) -> Result<Map<String, Value>> {
        match serde_json::to_value(spec) {
            Ok(Value::Object(mut fields)) => {
                for key in ["id", "compartmentId", "displayName", "name"] {
                    fields.remove(key);
                }
                Ok(fields)
            }
            Ok(other) => Err(AdapterError::Internal(format!(
                "{} spec serialized to {}",
                Self::KIND,
                other
            ))),
            Err(e) => Err(AdapterError::Internal(format!(
                "failed to serialize {} spec: {}",
                Self::KIND,
                e
            ))),
        }
    }

    fn provisioning() -> Provisioning {
        Provisioning::Requeue
    }

    fn connection_details(
        _spec: &Self::Spec,
        _resource: &RemoteResource,
    ) -> Option<BTreeMap<String, String>> {
        None
    }
}

/// Name of the secret holding a resource's connection details.
pub fn secret_name(kind: &str, id: &str) -> String {
    format!("{}-{}", kind.to_lowercase(), id)
}

/// Insert `value` under `key` unless it is null.
pub(crate) fn put_field(fields: &mut Map<String, Value>, key: &str, value: Value) {
    if !value.is_null() {
        fields.insert(key.to_string(), value);
    }
}

/// Generic adapter over the cloud client for one kind.
pub struct CloudAdapter<K> {
    cloud: CloudClient,
    secrets: SecretStore,
    provisioning: Provisioning,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind> CloudAdapter<K> {
    pub fn new(cloud: CloudClient, secrets: SecretStore) -> Self {
        Self {
            cloud,
            secrets,
            provisioning: K::provisioning(),
            _kind: PhantomData,
        }
    }

    /// Override the kind's default provisioning policy.
    pub fn with_provisioning(mut self, provisioning: Provisioning) -> Self {
        self.provisioning = provisioning;
        self
    }

    /// Fields of `spec` that differ from `current`.
    pub fn changed_fields(current: &RemoteResource, spec: &K::Spec) -> Map<String, Value> {
        let meta = K::meta(spec);
        let mut changes = Map::new();
        if current.display_name.as_deref() != Some(meta.display_name.as_str()) {
            changes.insert(
                "displayName".to_string(),
                Value::String(meta.display_name.clone()),
            );
        }
        for (key, value) in K::mutable_fields(spec) {
            if current.properties.get(&key) != Some(&value) {
                changes.insert(key, value);
            }
        }
        changes
    }
}

#[async_trait]
impl<K: ResourceKind> ResourceAdapter for CloudAdapter<K> {
    type Spec = K::Spec;

    fn kind(&self) -> &'static str {
        K::KIND
    }

    fn bound_id<'a>(&self, spec: &'a K::Spec) -> Option<&'a str> {
        K::meta(spec).id.as_deref().filter(|id| !id.is_empty())
    }

    fn display_name<'a>(&self, spec: &'a K::Spec) -> &'a str {
        &K::meta(spec).display_name
    }

    async fn lookup_by_name(&self, spec: &K::Spec) -> Result<Option<String>> {
        let meta = K::meta(spec);
        let records = self
            .cloud
            .list(K::KIND, &meta.compartment_id, Some(&meta.display_name))
            .await?;
        Ok(records
            .into_iter()
            .find(|r| classify_label::<K::State>(&r.lifecycle_state).is_bindable())
            .map(|r| r.id))
    }

    async fn get(&self, id: &str) -> Result<RemoteResource> {
        Ok(self.cloud.get(K::KIND, id).await?.to_remote())
    }

    async fn create(&self, spec: &K::Spec) -> Result<Created> {
        let meta = K::meta(spec);
        let record = self
            .cloud
            .create(CreateRequest {
                kind: K::KIND,
                compartment_id: meta.compartment_id.clone(),
                display_name: meta.display_name.clone(),
                properties: K::create_fields(spec)?,
                lifecycle: K::State::labels(),
            })
            .await?;

        Ok(match K::CREATE_STYLE {
            CreateStyle::Synchronous => Created::Resource(record.to_remote()),
            CreateStyle::AsyncWithId => Created::Accepted {
                id: Some(record.id),
            },
            CreateStyle::AsyncWithoutId => Created::Accepted { id: None },
        })
    }

    async fn update(&self, current: &RemoteResource, spec: &K::Spec) -> Result<bool> {
        let changes = Self::changed_fields(current, spec);
        if changes.is_empty() {
            debug!(kind = K::KIND, id = %current.id, "Resource is up to date");
            return Ok(false);
        }
        info!(
            kind = K::KIND,
            id = %current.id,
            fields = ?changes.keys().collect::<Vec<_>>(),
            "Updating resource"
        );
        self.cloud.update(K::KIND, &current.id, changes).await?;
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.cloud.delete(K::KIND, id).await
    }

    fn classify(&self, resource: &RemoteResource) -> LifecycleClass {
        classify_label::<K::State>(&resource.lifecycle_state)
    }

    fn provisioning(&self) -> Provisioning {
        self.provisioning
    }

    async fn publish(&self, spec: &K::Spec, resource: &RemoteResource) -> Result<()> {
        match K::connection_details(spec, resource) {
            Some(data) => self.secrets.put(&secret_name(K::KIND, &resource.id), data).await,
            None => Ok(()),
        }
    }

    async fn cleanup_secondary(&self, id: &str) -> Result<()> {
        if K::PUBLISHES_SECRET {
            self.secrets.delete(&secret_name(K::KIND, id)).await?;
        }
        Ok(())
    }
}

/// Agent-wide adapter settings.
#[derive(Debug, Clone, Copy)]
pub struct AdapterConfig {
    /// Delay requested when a created resource is not visible yet.
    pub requeue_delay: Duration,
    /// Poll policy for kinds that wait for provisioning in-line.
    pub poll: RetryPolicy,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            requeue_delay: osok_core::DEFAULT_REQUEUE_DELAY,
            poll: RetryPolicy::provisioning(),
        }
    }
}

fn build_reconciler<K: ResourceKind>(
    cloud: &CloudClient,
    secrets: &SecretStore,
    config: &AdapterConfig,
) -> Arc<dyn Reconciler> {
    let mut adapter = CloudAdapter::<K>::new(cloud.clone(), secrets.clone());
    if let Provisioning::Poll(_) = K::provisioning() {
        adapter = adapter.with_provisioning(Provisioning::Poll(config.poll));
    }
    Arc::new(KindReconciler::new(Arc::new(adapter), config.requeue_delay))
}

/// Reconcilers for every supported kind.
pub fn all_reconcilers(
    cloud: &CloudClient,
    secrets: &SecretStore,
    config: &AdapterConfig,
) -> Vec<Arc<dyn Reconciler>> {
    vec![
        build_reconciler::<compute::Instance>(cloud, secrets, config),
        build_reconciler::<networking::Vcn>(cloud, secrets, config),
        build_reconciler::<networking::Subnet>(cloud, secrets, config),
        build_reconciler::<networking::InternetGateway>(cloud, secrets, config),
        build_reconciler::<networking::NatGateway>(cloud, secrets, config),
        build_reconciler::<networking::ServiceGateway>(cloud, secrets, config),
        build_reconciler::<networking::Drg>(cloud, secrets, config),
        build_reconciler::<networking::RouteTable>(cloud, secrets, config),
        build_reconciler::<networking::SecurityList>(cloud, secrets, config),
        build_reconciler::<nosql::Table>(cloud, secrets, config),
        build_reconciler::<database::AutonomousDatabase>(cloud, secrets, config),
        build_reconciler::<database::MySqlDbSystem>(cloud, secrets, config),
        build_reconciler::<devops::Project>(cloud, secrets, config),
        build_reconciler::<streaming::Stream>(cloud, secrets, config),
    ]
}
