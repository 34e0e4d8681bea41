//! osok-core: reconciliation core for cloud resources.
//!
//! A resource kind plugs in by implementing [`ResourceAdapter`]. The
//! [`ReconciliationEngine`] drives the remote resource toward the declared
//! spec one step per call, the [`DeletionEngine`] tears it down
//! idempotently, and both record progress in an [`OsokStatus`].

pub mod adapter;
pub mod delete;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod retry;
pub mod status;

pub use adapter::{Created, Provisioning, RemoteResource, ResourceAdapter};
pub use delete::DeletionEngine;
pub use engine::{DEFAULT_REQUEUE_DELAY, ReconcileOutcome, ReconciliationEngine};
pub use error::{AdapterError, EngineError};
pub use lifecycle::LifecycleClass;
pub use retry::{Backoff, RetryPolicy, poll_until_settled};
pub use status::{ConditionStatus, ConditionType, OsokStatus, StatusCondition, merge_condition};
