//! Reconciler over a typed resource adapter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use osok_core::{
    DeletionEngine, EngineError, OsokStatus, ReconcileOutcome, ReconciliationEngine,
    ResourceAdapter,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use super::Reconciler;

/// Drives the reconcile and delete engines for one adapter.
pub struct KindReconciler<A> {
    engine: ReconciliationEngine<A>,
    deletion: DeletionEngine<A>,
}

impl<A: ResourceAdapter> KindReconciler<A> {
    pub fn new(adapter: Arc<A>, requeue_delay: Duration) -> Self {
        Self {
            engine: ReconciliationEngine::new(Arc::clone(&adapter)).with_requeue_delay(requeue_delay),
            deletion: DeletionEngine::new(adapter),
        }
    }
}

impl<A> KindReconciler<A>
where
    A: ResourceAdapter,
    A::Spec: DeserializeOwned,
{
    fn decode(&self, spec: &Value) -> Result<A::Spec, EngineError> {
        let kind = self.engine.adapter().kind();
        serde_json::from_value(spec.clone()).map_err(|source| {
            error!(kind, "Spec does not decode: {}", source);
            EngineError::Decode {
                kind: kind.to_string(),
                source,
            }
        })
    }
}

#[async_trait]
impl<A> Reconciler for KindReconciler<A>
where
    A: ResourceAdapter,
    A::Spec: DeserializeOwned,
{
    fn kind(&self) -> &'static str {
        self.engine.adapter().kind()
    }

    async fn reconcile(
        &self,
        spec: &Value,
        status: &mut OsokStatus,
    ) -> Result<ReconcileOutcome, EngineError> {
        let spec = self.decode(spec)?;
        self.engine.reconcile(&spec, status).await
    }

    async fn finalize(&self, status: &mut OsokStatus) -> Result<bool, EngineError> {
        debug!(kind = self.kind(), ocid = %status.ocid, "Finalizing");
        self.deletion.delete(status).await
    }
}
