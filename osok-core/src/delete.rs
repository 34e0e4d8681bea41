//! Idempotent, finalizer-style deletion.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::adapter::ResourceAdapter;
use crate::error::EngineError;
use crate::status::{ConditionStatus, ConditionType, OsokStatus};

/// Tears down the resource recorded in a status.
pub struct DeletionEngine<A> {
    adapter: Arc<A>,
}

impl<A: ResourceAdapter> DeletionEngine<A> {
    pub fn new(adapter: Arc<A>) -> Self {
        Self { adapter }
    }

    /// Delete the bound resource. Returns `Ok(true)` once it is confirmed
    /// gone; the owning object must not be released before that.
    ///
    /// An unbound status is a no-op and never touches the provider. A
    /// resource the provider no longer knows counts as deleted.
    pub async fn delete(&self, status: &mut OsokStatus) -> Result<bool, EngineError> {
        let kind = self.adapter.kind();
        if !status.is_bound() {
            debug!(kind, "Nothing bound, delete is a no-op");
            return Ok(true);
        }

        let id = status.ocid.clone();
        match self.adapter.delete(&id).await {
            Ok(()) => info!(kind, id = %id, "Deleted resource"),
            Err(e) if e.is_not_found() => {
                info!(kind, id = %id, "Resource already gone");
            }
            Err(e) => {
                warn!(kind, id = %id, "Failed to delete resource: {}", e);
                return Err(e.into());
            }
        }

        // Side-channel cleanup is best-effort.
        if let Err(e) = self.adapter.cleanup_secondary(&id).await {
            warn!(kind, id = %id, "Failed to clean up secondary artifacts: {}", e);
        }

        status.unbind();
        status.record(
            ConditionType::Terminating,
            ConditionStatus::True,
            "Deleted",
            &format!("{} {} deleted", kind, id),
        );
        Ok(true)
    }
}
