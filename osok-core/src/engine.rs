//! Reconciliation state machine.
//!
//! The starting state is derived from the spec on every call, never stored:
//!
//! ```text
//! spec has id ──> Bound:   get ─> update ─> Active
//! spec no id  ──> Unbound: lookup by name
//!                   ├─ found     ─> get ───────────────┐
//!                   └─ not found ─> create ─> resolve ─┤
//!                                     └─ not visible ─> requeue after delay
//!                                                      v
//!                         Transient ─> Provisioning (not converged)
//!                         Failed    ─> Failed       (converged, unusable)
//!                         Ok        ─> Active       (converged)
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::adapter::{Created, Provisioning, RemoteResource, ResourceAdapter};
use crate::error::{AdapterError, EngineError};
use crate::lifecycle::LifecycleClass;
use crate::retry::poll_until_settled;
use crate::status::{ConditionStatus, ConditionType, OsokStatus};

/// Delay requested when a created resource is not yet visible.
pub const DEFAULT_REQUEUE_DELAY: Duration = Duration::from_secs(30);

/// Result of one reconcile call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileOutcome {
    pub succeeded: bool,
    /// Minimum delay before the scheduler should call again.
    pub requeue_after: Option<Duration>,
}

impl ReconcileOutcome {
    pub fn success() -> Self {
        Self {
            succeeded: true,
            requeue_after: None,
        }
    }

    /// Not converged yet; the scheduler applies its own backoff.
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn requeue_after(delay: Duration) -> Self {
        Self {
            succeeded: false,
            requeue_after: Some(delay),
        }
    }
}

/// Drives one resource kind toward its declared spec.
pub struct ReconciliationEngine<A> {
    adapter: Arc<A>,
    requeue_delay: Duration,
}

impl<A: ResourceAdapter> ReconciliationEngine<A> {
    pub fn new(adapter: Arc<A>) -> Self {
        Self {
            adapter,
            requeue_delay: DEFAULT_REQUEUE_DELAY,
        }
    }

    pub fn with_requeue_delay(mut self, delay: Duration) -> Self {
        self.requeue_delay = delay;
        self
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Reconcile `spec` one step, recording progress in `status`.
    ///
    /// Status changes made before an error is returned stay in `status`;
    /// the caller persists it either way.
    pub async fn reconcile(
        &self,
        spec: &A::Spec,
        status: &mut OsokStatus,
    ) -> Result<ReconcileOutcome, EngineError> {
        match self.adapter.bound_id(spec) {
            Some(id) => self.reconcile_bound(id, spec, status).await,
            None => self.reconcile_unbound(spec, status).await,
        }
    }

    async fn reconcile_bound(
        &self,
        id: &str,
        spec: &A::Spec,
        status: &mut OsokStatus,
    ) -> Result<ReconcileOutcome, EngineError> {
        let kind = self.adapter.kind();
        debug!(kind, id, "Reconciling bound resource");

        let current = self.adapter.get(id).await.inspect_err(|e| {
            error!(kind, id, "Failed to get bound resource: {}", e);
        })?;

        let updated = self.adapter.update(&current, spec).await.inspect_err(|e| {
            error!(kind, id, "Failed to update resource: {}", e);
        })?;

        self.publish(spec, &current, status).await?;

        status.bind(&current.id);
        if updated {
            let name = self.adapter.display_name(spec);
            status.record(
                ConditionType::Updating,
                ConditionStatus::True,
                "UpdateApplied",
                &format!("{} {} updated to match spec", kind, name),
            );
        }
        status.mark_created();
        status.message = None;
        status.record(
            ConditionType::Active,
            ConditionStatus::True,
            "Active",
            &self.describe(&current, spec),
        );
        Ok(ReconcileOutcome::success())
    }

    async fn reconcile_unbound(
        &self,
        spec: &A::Spec,
        status: &mut OsokStatus,
    ) -> Result<ReconcileOutcome, EngineError> {
        let kind = self.adapter.kind();
        let name = self.adapter.display_name(spec);

        let snapshot = match self.lookup(spec, status).await? {
            Some(id) => {
                debug!(kind, name, id = %id, "Found existing resource by name");
                let action = format!("get {} {}", kind, id);
                self.adapter
                    .get(&id)
                    .await
                    .map_err(|e| self.record_failure(status, "GetFailed", &action, &e))?
            }
            None => match self.create(spec, status).await? {
                Some(resource) => resource,
                None => {
                    info!(kind, name, "Created resource is not visible yet, requeueing");
                    status.record(
                        ConditionType::Provisioning,
                        ConditionStatus::True,
                        "CreateAccepted",
                        &format!("{} {} create accepted, waiting for it to appear", kind, name),
                    );
                    return Ok(ReconcileOutcome::requeue_after(self.requeue_delay));
                }
            },
        };

        self.apply_snapshot(spec, snapshot, status).await
    }

    /// Create the resource and resolve a snapshot of it. `None` means the
    /// provider accepted the request but the resource cannot be read yet.
    async fn create(
        &self,
        spec: &A::Spec,
        status: &mut OsokStatus,
    ) -> Result<Option<RemoteResource>, EngineError> {
        let kind = self.adapter.kind();
        let name = self.adapter.display_name(spec);
        info!(kind, name, "Creating resource");

        let created = match self.adapter.create(spec).await {
            Ok(created) => created,
            Err(e) => {
                error!(kind, name, "Failed to create resource: {}", e);
                if e.is_bad_request() {
                    status.message = e.code().map(str::to_string);
                }
                status.record(
                    ConditionType::Failed,
                    ConditionStatus::False,
                    "CreateFailed",
                    &format!("Failed to create {} {}: {}", kind, name, e),
                );
                return Err(e.into());
            }
        };

        let id = match created {
            Created::Resource(resource) => match self.adapter.provisioning() {
                Provisioning::Requeue => return Ok(Some(resource)),
                Provisioning::Poll(_) => resource.id,
            },
            Created::Accepted { id: Some(id) } => id,
            Created::Accepted { id: None } => match self.lookup(spec, status).await? {
                Some(id) => id,
                None => return Ok(None),
            },
        };

        status.bind(&id);
        let action = format!("get {} {}", kind, id);
        self.fetch_created(&id).await.map_err(|e| match e {
            EngineError::Adapter(e) => self.record_failure(status, "GetFailed", &action, &e),
            other => other,
        })
    }

    async fn lookup(
        &self,
        spec: &A::Spec,
        status: &mut OsokStatus,
    ) -> Result<Option<String>, EngineError> {
        let action = format!(
            "look up {} {}",
            self.adapter.kind(),
            self.adapter.display_name(spec)
        );
        self.adapter
            .lookup_by_name(spec)
            .await
            .map_err(|e| self.record_failure(status, "LookupFailed", &action, &e))
    }

    /// Log and record a failed provider call on the unbound path.
    fn record_failure(
        &self,
        status: &mut OsokStatus,
        reason: &str,
        action: &str,
        e: &AdapterError,
    ) -> EngineError {
        error!(kind = self.adapter.kind(), "Failed to {}: {}", action, e);
        status.record(
            ConditionType::Failed,
            ConditionStatus::False,
            reason,
            &format!("Failed to {}: {}", action, e),
        );
        e.clone().into()
    }

    async fn fetch_created(&self, id: &str) -> Result<Option<RemoteResource>, EngineError> {
        let fetched = match self.adapter.provisioning() {
            Provisioning::Poll(policy) => {
                poll_until_settled(self.adapter.as_ref(), id, &policy).await
            }
            Provisioning::Requeue => self.adapter.get(id).await,
        };

        match fetched {
            Ok(resource) => Ok(Some(resource)),
            Err(AdapterError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_snapshot(
        &self,
        spec: &A::Spec,
        resource: RemoteResource,
        status: &mut OsokStatus,
    ) -> Result<ReconcileOutcome, EngineError> {
        let kind = self.adapter.kind();
        status.bind(&resource.id);

        match self.adapter.classify(&resource) {
            LifecycleClass::Transient => {
                info!(
                    kind,
                    id = %resource.id,
                    state = %resource.lifecycle_state,
                    "Resource is still provisioning"
                );
                status.record(
                    ConditionType::Provisioning,
                    ConditionStatus::True,
                    "Provisioning",
                    &self.describe(&resource, spec),
                );
                Ok(ReconcileOutcome::pending())
            }
            LifecycleClass::TerminalFailed => {
                warn!(
                    kind,
                    id = %resource.id,
                    state = %resource.lifecycle_state,
                    "Resource is in a failed state"
                );
                status.record(
                    ConditionType::Failed,
                    ConditionStatus::False,
                    "Failed",
                    &self.describe(&resource, spec),
                );
                Ok(ReconcileOutcome::pending())
            }
            LifecycleClass::TerminalOk => {
                self.publish(spec, &resource, status).await?;
                status.mark_created();
                status.message = None;
                status.record(
                    ConditionType::Active,
                    ConditionStatus::True,
                    "Active",
                    &self.describe(&resource, spec),
                );
                Ok(ReconcileOutcome::success())
            }
        }
    }

    async fn publish(
        &self,
        spec: &A::Spec,
        resource: &RemoteResource,
        status: &mut OsokStatus,
    ) -> Result<(), EngineError> {
        if let Err(e) = self.adapter.publish(spec, resource).await {
            error!(
                kind = self.adapter.kind(),
                id = %resource.id,
                "Failed to materialize connection secret: {}",
                e
            );
            status.record(
                ConditionType::Failed,
                ConditionStatus::False,
                "SecretMaterializationFailed",
                &format!("Failed to publish connection details: {}", e),
            );
            return Err(e.into());
        }
        Ok(())
    }

    fn describe(&self, resource: &RemoteResource, spec: &A::Spec) -> String {
        let name = resource
            .display_name
            .as_deref()
            .unwrap_or_else(|| self.adapter.display_name(spec));
        format!(
            "{} {} is {}",
            self.adapter.kind(),
            name,
            resource.lifecycle_state
        )
    }
}
