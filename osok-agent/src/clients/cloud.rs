//! In-memory cloud provider client.
//!
//! Behaves like an eventually-consistent provider: new resources start in
//! their kind's creating state and settle after a number of reads, may stay
//! invisible to list calls for a while, and deleted resources linger in
//! their deleted state. Faults can be injected per operation.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use osok_core::error::Result;
use osok_core::{AdapterError, RemoteResource};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

/// Provider behaviour knobs.
#[derive(Debug, Clone, Copy)]
pub struct CloudConfig {
    /// Reads of a new resource before it leaves its creating state.
    pub settle_reads: u32,
    /// List calls that miss a new resource before it becomes visible.
    pub visibility_lag: u32,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            settle_reads: 2,
            visibility_lag: 0,
        }
    }
}

/// Lifecycle labels a kind uses on the provider side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleLabels {
    pub creating: &'static str,
    pub ready: &'static str,
    pub deleted: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Get,
    List,
    Update,
    Delete,
}

/// Create call payload.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub kind: &'static str,
    pub compartment_id: String,
    pub display_name: String,
    pub properties: Map<String, Value>,
    pub lifecycle: LifecycleLabels,
}

/// A resource as the provider stores it.
#[derive(Debug, Clone)]
pub struct CloudRecord {
    pub id: String,
    pub kind: String,
    pub compartment_id: String,
    pub display_name: String,
    pub lifecycle_state: String,
    pub properties: Map<String, Value>,
    pub time_created: DateTime<Utc>,
    reads_until_settled: u32,
    hidden_for_lists: u32,
    settle_to: String,
    deleted_state: String,
}

impl CloudRecord {
    pub fn to_remote(&self) -> RemoteResource {
        RemoteResource {
            id: self.id.clone(),
            display_name: Some(self.display_name.clone()),
            lifecycle_state: self.lifecycle_state.clone(),
            properties: self.properties.clone(),
        }
    }

    fn is_deleted(&self) -> bool {
        self.lifecycle_state == self.deleted_state
    }
}

#[derive(Debug, Default)]
struct CloudState {
    records: Vec<CloudRecord>,
    faults: HashMap<Operation, VecDeque<AdapterError>>,
    /// (kind, display name) -> label new resources settle to instead of ready.
    failing: HashMap<(String, String), String>,
}

impl CloudState {
    fn take_fault(&mut self, op: Operation) -> Result<()> {
        match self.faults.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(e) => {
                debug!(?op, "Injected fault: {}", e);
                Err(e)
            }
            None => Ok(()),
        }
    }

    fn find_mut(&mut self, kind: &str, id: &str) -> Result<&mut CloudRecord> {
        self.records
            .iter_mut()
            .find(|r| r.kind == kind && r.id == id)
            .ok_or_else(|| AdapterError::NotFound(format!("{} {}", kind, id)))
    }
}

/// Client for the simulated cloud provider. Cheap to clone; clones share
/// the same provider state.
#[derive(Debug, Clone, Default)]
pub struct CloudClient {
    inner: Arc<Mutex<CloudState>>,
    config: CloudConfig,
}

impl CloudClient {
    pub fn new(config: CloudConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CloudState::default())),
            config,
        }
    }

    pub fn config(&self) -> CloudConfig {
        self.config
    }

    /// Make the next call of `op` fail with `error`.
    pub async fn inject_fault(&self, op: Operation, error: AdapterError) {
        let mut state = self.inner.lock().await;
        state.faults.entry(op).or_default().push_back(error);
    }

    /// New resources of `kind` named `display_name` settle to `label`
    /// instead of their ready state.
    pub async fn fail_provisioning(&self, kind: &str, display_name: &str, label: &str) {
        let mut state = self.inner.lock().await;
        state.failing.insert(
            (kind.to_string(), display_name.to_string()),
            label.to_string(),
        );
    }

    /// Force the lifecycle state of an existing resource.
    pub async fn set_state(&self, kind: &str, id: &str, label: &str) -> Result<()> {
        let mut state = self.inner.lock().await;
        let record = state.find_mut(kind, id)?;
        record.lifecycle_state = label.to_string();
        record.reads_until_settled = 0;
        Ok(())
    }

    /// All records of `kind`, including deleted ones, in creation order.
    pub async fn records(&self, kind: &str) -> Vec<CloudRecord> {
        let state = self.inner.lock().await;
        state
            .records
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }

    pub async fn create(&self, req: CreateRequest) -> Result<CloudRecord> {
        debug!(kind = req.kind, name = %req.display_name, "Creating resource");
        let mut state = self.inner.lock().await;
        state.take_fault(Operation::Create)?;

        if req.compartment_id.is_empty() {
            return Err(AdapterError::BadRequest {
                code: "MissingParameter".to_string(),
                message: "compartmentId is required".to_string(),
            });
        }
        if req.display_name.is_empty() {
            return Err(AdapterError::BadRequest {
                code: "InvalidParameter".to_string(),
                message: "displayName must not be empty".to_string(),
            });
        }

        let settle_to = state
            .failing
            .get(&(req.kind.to_string(), req.display_name.clone()))
            .cloned()
            .unwrap_or_else(|| req.lifecycle.ready.to_string());
        let settled = self.config.settle_reads == 0;

        let record = CloudRecord {
            id: format!(
                "ocid1.{}.oc1..{}",
                req.kind.to_lowercase(),
                uuid::Uuid::new_v4().simple()
            ),
            kind: req.kind.to_string(),
            compartment_id: req.compartment_id,
            display_name: req.display_name,
            lifecycle_state: if settled {
                settle_to.clone()
            } else {
                req.lifecycle.creating.to_string()
            },
            properties: req.properties,
            time_created: Utc::now(),
            reads_until_settled: self.config.settle_reads,
            hidden_for_lists: self.config.visibility_lag,
            settle_to,
            deleted_state: req.lifecycle.deleted.to_string(),
        };
        state.records.push(record.clone());
        Ok(record)
    }

    /// Read a resource. Every read moves a provisioning resource one step
    /// closer to its settled state.
    pub async fn get(&self, kind: &str, id: &str) -> Result<CloudRecord> {
        debug!(kind, id, "Getting resource");
        let mut state = self.inner.lock().await;
        state.take_fault(Operation::Get)?;

        let record = state.find_mut(kind, id)?;
        if record.reads_until_settled > 0 {
            record.reads_until_settled -= 1;
            if record.reads_until_settled == 0 {
                record.lifecycle_state = record.settle_to.clone();
            }
        }
        Ok(record.clone())
    }

    /// List resources of `kind` in a compartment, optionally by display
    /// name, in creation order. Deleted resources are included.
    pub async fn list(
        &self,
        kind: &str,
        compartment_id: &str,
        display_name: Option<&str>,
    ) -> Result<Vec<CloudRecord>> {
        debug!(kind, compartment_id, ?display_name, "Listing resources");
        let mut state = self.inner.lock().await;
        state.take_fault(Operation::List)?;

        let mut found = Vec::new();
        for record in state.records.iter_mut() {
            if record.kind != kind || record.compartment_id != compartment_id {
                continue;
            }
            if display_name.is_some_and(|n| n != record.display_name) {
                continue;
            }
            if record.hidden_for_lists > 0 {
                record.hidden_for_lists -= 1;
                continue;
            }
            found.push(record.clone());
        }
        Ok(found)
    }

    /// Apply field changes. `displayName` renames the resource; other keys
    /// are merged into its properties.
    pub async fn update(
        &self,
        kind: &str,
        id: &str,
        changes: Map<String, Value>,
    ) -> Result<CloudRecord> {
        debug!(kind, id, fields = changes.len(), "Updating resource");
        let mut state = self.inner.lock().await;
        state.take_fault(Operation::Update)?;

        let record = state.find_mut(kind, id)?;
        if record.is_deleted() {
            return Err(AdapterError::Conflict(format!(
                "{} {} is {}",
                kind, id, record.lifecycle_state
            )));
        }
        for (key, value) in changes {
            if key == "displayName"
                && let Value::String(name) = &value
            {
                record.display_name = name.clone();
                continue;
            }
            record.properties.insert(key, value);
        }
        Ok(record.clone())
    }

    /// Delete a resource. It stays listable in its deleted state; deleting
    /// it again reports not found.
    pub async fn delete(&self, kind: &str, id: &str) -> Result<()> {
        debug!(kind, id, "Deleting resource");
        let mut state = self.inner.lock().await;
        state.take_fault(Operation::Delete)?;

        let record = state.find_mut(kind, id)?;
        if record.is_deleted() {
            return Err(AdapterError::NotFound(format!("{} {}", kind, id)));
        }
        record.lifecycle_state = record.deleted_state.clone();
        record.reads_until_settled = 0;
        Ok(())
    }
}
