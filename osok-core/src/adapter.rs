//! The per-kind resource adapter contract.
//!
//! The engines only talk to the remote provider through this trait. Each
//! resource kind supplies one implementation; whether a kind polls after
//! create or hands control back to the scheduler is part of that
//! implementation (see [`Provisioning`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::lifecycle::LifecycleClass;
use crate::retry::RetryPolicy;

/// Snapshot of a provider-side resource, fetched fresh on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteResource {
    pub id: String,
    pub display_name: Option<String>,
    /// Provider lifecycle label, e.g. `PROVISIONING` or `AVAILABLE`.
    pub lifecycle_state: String,
    /// Kind-specific provider fields, opaque to the engines.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl RemoteResource {
    pub fn new(id: &str, display_name: Option<&str>, lifecycle_state: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.map(str::to_string),
            lifecycle_state: lifecycle_state.to_string(),
            properties: Map::new(),
        }
    }
}

/// Result of a successful create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Created {
    /// The provider returned the new resource.
    Resource(RemoteResource),
    /// The provider accepted the request asynchronously. The identifier may
    /// not be known yet.
    Accepted { id: Option<String> },
}

/// How a kind waits for a freshly created resource to converge.
#[derive(Debug, Clone, Copy)]
pub enum Provisioning {
    /// Poll get-by-id inside the reconcile call.
    Poll(RetryPolicy),
    /// Return a not-yet-converged outcome and let the scheduler call again.
    Requeue,
}

/// Capability interface for one remote resource kind.
#[async_trait]
pub trait ResourceAdapter: Send + Sync {
    /// Desired-state type for this kind.
    type Spec: Send + Sync + 'static;

    /// Kind name, e.g. `"Vcn"`.
    fn kind(&self) -> &'static str;

    /// Explicit provider identifier carried by the spec, if any.
    fn bound_id<'a>(&self, spec: &'a Self::Spec) -> Option<&'a str>;

    /// Display name used for discovery when no identifier is bound.
    fn display_name<'a>(&self, spec: &'a Self::Spec) -> &'a str;

    /// Find an existing resource by display name.
    ///
    /// Only resources whose lifecycle class is transient or terminal-ok may
    /// be returned; a failed resource with the same name must not block
    /// recreation. When several match, the first one the provider returned
    /// wins.
    async fn lookup_by_name(&self, spec: &Self::Spec) -> Result<Option<String>>;

    async fn get(&self, id: &str) -> Result<RemoteResource>;

    async fn create(&self, spec: &Self::Spec) -> Result<Created>;

    /// Bring `current` in line with `spec`. Returns whether changes were
    /// sent; must return `false` without a provider call when nothing
    /// differs.
    async fn update(&self, current: &RemoteResource, spec: &Self::Spec) -> Result<bool>;

    /// Delete by identifier. A missing resource is reported as
    /// [`AdapterError::NotFound`](crate::AdapterError::NotFound).
    async fn delete(&self, id: &str) -> Result<()>;

    fn classify(&self, resource: &RemoteResource) -> LifecycleClass;

    fn provisioning(&self) -> Provisioning {
        Provisioning::Requeue
    }

    /// Called once the resource is converged, before it is reported active.
    /// Kinds exposing connection endpoints materialize credentials here.
    async fn publish(&self, _spec: &Self::Spec, _resource: &RemoteResource) -> Result<()> {
        Ok(())
    }

    /// Remove side-channel artifacts after the primary resource is gone.
    async fn cleanup_secondary(&self, _id: &str) -> Result<()> {
        Ok(())
    }
}
