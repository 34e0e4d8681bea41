//! Controller: drives manifest objects through their kind's reconciler.
//!
//! Objects are processed one at a time. Live objects are reconciled in
//! manifest order, deleted ones are finalized in reverse order, and objects
//! that have a recorded status but are gone from the manifest are pruned.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use osok_core::{AdapterError, ConditionType, EngineError, OsokStatus, ReconcileOutcome};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::manifest::{Manifest, ObjectSpec, StatusFile, object_key};
use crate::reconciler::Reconciler;

/// An object under management: what is declared plus what was observed.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedObject {
    pub kind: String,
    pub name: String,
    pub spec: Value,
    pub deleted: bool,
    pub status: OsokStatus,
}

impl ManagedObject {
    pub fn new(kind: &str, name: &str, spec: Value) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            spec,
            deleted: false,
            status: OsokStatus::default(),
        }
    }

    pub fn from_spec(object: &ObjectSpec, status: OsokStatus) -> Self {
        Self {
            kind: object.kind.clone(),
            name: object.name.clone(),
            spec: object.spec.clone(),
            deleted: object.deleted,
            status,
        }
    }

    pub fn key(&self) -> String {
        object_key(&self.kind, &self.name)
    }

    /// Whether the last recorded condition is a terminal failure.
    fn has_failed(&self) -> bool {
        self.status
            .latest()
            .is_some_and(|c| c.condition_type == ConditionType::Failed)
    }
}

/// Result of one sync call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Reconciled(ReconcileOutcome),
    /// Delete ran; `true` once the resource is confirmed gone.
    Finalized(bool),
}

impl SyncOutcome {
    pub fn is_done(&self) -> bool {
        match self {
            SyncOutcome::Reconciled(outcome) => outcome.succeeded,
            SyncOutcome::Finalized(done) => *done,
        }
    }

    pub fn requeue_after(&self) -> Option<Duration> {
        match self {
            SyncOutcome::Reconciled(outcome) => outcome.requeue_after,
            SyncOutcome::Finalized(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    /// Delay between rounds when the engine gives no requeue hint.
    pub default_backoff: Duration,
    /// Sync attempts per object per pass.
    pub max_rounds: u32,
    /// Finalize objects that have a status but left the manifest.
    pub prune: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            default_backoff: Duration::from_secs(10),
            max_rounds: 1,
            prune: true,
        }
    }
}

/// Summary of one pass over a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub converged: Vec<String>,
    pub pending: Vec<String>,
    /// Objects whose resource is in a failed state, or whose sync errored.
    pub failed: Vec<(String, String)>,
    /// Deleted or pruned objects whose resource is gone.
    pub released: Vec<String>,
}

impl ApplyReport {
    pub fn is_settled(&self) -> bool {
        self.pending.is_empty() && self.failed.is_empty()
    }
}

/// Errors that another attempt cannot fix.
fn is_permanent(e: &EngineError) -> bool {
    match e {
        EngineError::SpecMismatch { .. } | EngineError::Decode { .. } => true,
        EngineError::Adapter(
            AdapterError::BadRequest { .. } | AdapterError::Unauthorized(_),
        ) => true,
        EngineError::Adapter(_) => false,
    }
}

pub struct Controller {
    reconcilers: HashMap<&'static str, Arc<dyn Reconciler>>,
    config: ControllerConfig,
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            reconcilers: HashMap::new(),
            config,
        }
    }

    pub fn with_reconcilers(
        config: ControllerConfig,
        reconcilers: impl IntoIterator<Item = Arc<dyn Reconciler>>,
    ) -> Self {
        let mut controller = Self::new(config);
        for reconciler in reconcilers {
            controller.register(reconciler);
        }
        controller
    }

    pub fn register(&mut self, reconciler: Arc<dyn Reconciler>) {
        debug!(kind = reconciler.kind(), "Registered reconciler");
        self.reconcilers.insert(reconciler.kind(), reconciler);
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.reconcilers.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    fn reconciler(&self, kind: &str) -> Result<&Arc<dyn Reconciler>, EngineError> {
        self.reconcilers
            .get(kind)
            .ok_or_else(|| EngineError::SpecMismatch {
                expected: format!("one of {}", self.kinds().join(", ")),
                found: kind.to_string(),
            })
    }

    pub async fn reconcile_object(
        &self,
        object: &mut ManagedObject,
    ) -> Result<ReconcileOutcome, EngineError> {
        let reconciler = self.reconciler(&object.kind)?;
        debug!(object = %object.key(), "Reconciling");
        reconciler.reconcile(&object.spec, &mut object.status).await
    }

    pub async fn delete_object(&self, object: &mut ManagedObject) -> Result<bool, EngineError> {
        let reconciler = self.reconciler(&object.kind)?;
        debug!(object = %object.key(), "Deleting");
        reconciler.finalize(&mut object.status).await
    }

    /// Delete the object if it is marked deleted, reconcile it otherwise.
    pub async fn sync_object(&self, object: &mut ManagedObject) -> Result<SyncOutcome, EngineError> {
        if object.deleted {
            self.delete_object(object).await.map(SyncOutcome::Finalized)
        } else {
            self.reconcile_object(object).await.map(SyncOutcome::Reconciled)
        }
    }

    /// Sync the object until it is done, fails terminally, or runs out of
    /// rounds. Between rounds it sleeps for the engine's requeue hint or
    /// the default backoff.
    pub async fn converge(&self, object: &mut ManagedObject) -> Result<SyncOutcome, EngineError> {
        let rounds = self.config.max_rounds.max(1);
        let mut round = 0;
        loop {
            round += 1;
            let result = self.sync_object(object).await;

            let delay = match &result {
                Ok(outcome) if outcome.is_done() => None,
                Ok(_) if !object.deleted && object.has_failed() => None,
                Ok(outcome) => Some(outcome.requeue_after().unwrap_or(self.config.default_backoff)),
                Err(e) if is_permanent(e) => None,
                Err(e) => {
                    warn!(object = %object.key(), round, "Sync failed: {}", e);
                    Some(self.config.default_backoff)
                }
            };

            let Some(delay) = delay.filter(|_| round < rounds) else {
                return result;
            };
            debug!(object = %object.key(), round, ?delay, "Not converged, retrying");
            tokio::time::sleep(delay).await;
        }
    }

    /// Run one pass over `manifest`, updating `statuses` in place.
    pub async fn apply(&self, manifest: &Manifest, statuses: &mut StatusFile) -> ApplyReport {
        info!(objects = manifest.objects.len(), "Applying manifest");
        let mut report = ApplyReport::default();

        // 1. Live objects, in declared order
        for spec in manifest.objects.iter().filter(|o| !o.deleted) {
            let key = spec.key();
            let status = statuses.get(&key).cloned().unwrap_or_default();
            let mut object = ManagedObject::from_spec(spec, status);

            let result = self.converge(&mut object).await;
            statuses.set(key.clone(), object.status.clone());
            match result {
                Ok(outcome) if outcome.is_done() => report.converged.push(key),
                Ok(_) if object.has_failed() => {
                    let message = object
                        .status
                        .latest()
                        .map(|c| c.message.clone())
                        .unwrap_or_default();
                    report.failed.push((key, message));
                }
                Ok(_) => report.pending.push(key),
                Err(e) => {
                    error!(object = %key, "Reconciliation failed: {}", e);
                    report.failed.push((key, e.to_string()));
                }
            }
        }

        // 2. Deleted objects, dependents first
        for spec in manifest.objects.iter().rev().filter(|o| o.deleted) {
            let status = statuses.get(&spec.key()).cloned().unwrap_or_default();
            let object = ManagedObject::from_spec(spec, status);
            self.finalize_into(object, statuses, &mut report).await;
        }

        // 3. Objects no longer declared
        if self.config.prune {
            let declared: HashSet<String> = manifest.objects.iter().map(ObjectSpec::key).collect();
            let orphans: Vec<String> = statuses
                .statuses
                .keys()
                .filter(|key| !declared.contains(*key))
                .cloned()
                .collect();
            for key in orphans {
                let Some((kind, name)) = key.split_once('/') else {
                    warn!(object = %key, "Dropping status with malformed key");
                    statuses.remove(&key);
                    continue;
                };
                info!(object = %key, "Pruning object no longer in manifest");
                let mut object = ManagedObject::new(kind, name, Value::Null);
                object.deleted = true;
                object.status = statuses.get(&key).cloned().unwrap_or_default();
                self.finalize_into(object, statuses, &mut report).await;
            }
        }

        info!(
            converged = report.converged.len(),
            pending = report.pending.len(),
            failed = report.failed.len(),
            released = report.released.len(),
            "Manifest applied"
        );
        report
    }

    /// Finalize a deleted object. Its status is dropped once the resource
    /// is gone and kept otherwise.
    async fn finalize_into(
        &self,
        mut object: ManagedObject,
        statuses: &mut StatusFile,
        report: &mut ApplyReport,
    ) {
        let key = object.key();
        match self.converge(&mut object).await {
            Ok(outcome) if outcome.is_done() => {
                info!(object = %key, "Released");
                statuses.remove(&key);
                report.released.push(key);
            }
            Ok(_) => {
                statuses.set(key.clone(), object.status);
                report.pending.push(key);
            }
            Err(e) => {
                error!(object = %key, "Deletion failed: {}", e);
                statuses.set(key.clone(), object.status);
                report.failed.push((key, e.to_string()));
            }
        }
    }
}
