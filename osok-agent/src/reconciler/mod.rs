//! Type-erased reconcilers.
//!
//! The controller only sees manifest objects with a kind and a JSON spec.
//! A [`Reconciler`] accepts that JSON, decodes it into its kind's spec type
//! and drives the typed engines from `osok-core`.

pub mod kind;

pub use kind::KindReconciler;

use async_trait::async_trait;
use osok_core::{EngineError, OsokStatus, ReconcileOutcome};
use serde_json::Value;

/// Reconciler for one resource kind.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Kind this reconciler manages, as named in manifests.
    fn kind(&self) -> &'static str;

    /// Reconcile one step toward `spec`, recording progress in `status`.
    async fn reconcile(
        &self,
        spec: &Value,
        status: &mut OsokStatus,
    ) -> Result<ReconcileOutcome, EngineError>;

    /// Handle resource deletion (finalization). Returns whether the
    /// resource is confirmed gone.
    async fn finalize(&self, status: &mut OsokStatus) -> Result<bool, EngineError>;
}
