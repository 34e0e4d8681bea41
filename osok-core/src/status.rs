//! Persisted status record and condition history.
//!
//! The condition list is an append-only history: a new entry is added only
//! when it differs from the last one, so repeated reconciles of a converged
//! resource leave the status untouched and the last entry is always current.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Condition type recorded in the status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    Provisioning,
    Active,
    Failed,
    Updating,
    Terminating,
}

impl std::fmt::Display for ConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConditionType::Provisioning => "Provisioning",
            ConditionType::Active => "Active",
            ConditionType::Failed => "Failed",
            ConditionType::Updating => "Updating",
            ConditionType::Terminating => "Terminating",
        };
        f.write_str(s)
    }
}

/// Tri-state condition status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// One observed condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCondition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    pub last_transition_time: DateTime<Utc>,
}

/// Status of a reconciled object. This is the only state that survives
/// restarts; it records what was last observed, never remote truth.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsokStatus {
    /// Provider identifier of the bound resource, empty until bound.
    #[serde(default)]
    pub ocid: String,
    /// Set the first time the resource is seen converged, never overwritten.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last provider error code, if a request was rejected.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub conditions: Vec<StatusCondition>,
}

impl OsokStatus {
    pub fn is_bound(&self) -> bool {
        !self.ocid.is_empty()
    }

    pub fn bind(&mut self, id: &str) {
        if self.ocid != id {
            self.ocid = id.to_string();
        }
    }

    pub fn unbind(&mut self) {
        self.ocid.clear();
    }

    /// Set the creation timestamp if it has not been set yet.
    pub fn mark_created(&mut self) {
        if self.created_at.is_none() {
            self.created_at = Some(Utc::now());
        }
    }

    /// Merge a condition into the history.
    pub fn record(
        &mut self,
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: &str,
        message: &str,
    ) {
        let existing = std::mem::take(&mut self.conditions);
        self.conditions = merge_condition(existing, condition_type, status, reason, message);
    }

    /// The most recently appended condition.
    pub fn latest(&self) -> Option<&StatusCondition> {
        self.conditions.last()
    }

    /// The most recent condition of the given type.
    pub fn latest_of(&self, condition_type: ConditionType) -> Option<&StatusCondition> {
        self.conditions
            .iter()
            .rev()
            .find(|c| c.condition_type == condition_type)
    }
}

/// Merge an observed condition into `existing`, stamped with the current time.
pub fn merge_condition(
    existing: Vec<StatusCondition>,
    condition_type: ConditionType,
    status: ConditionStatus,
    reason: &str,
    message: &str,
) -> Vec<StatusCondition> {
    merge_condition_at(existing, condition_type, status, reason, message, Utc::now())
}

/// Merge an observed condition into `existing` with an explicit timestamp.
///
/// Appends unless the last entry already has this type, status and
/// message, so the tail of the history always reflects the latest
/// observation. Otherwise returns `existing` unchanged.
pub fn merge_condition_at(
    mut existing: Vec<StatusCondition>,
    condition_type: ConditionType,
    status: ConditionStatus,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) -> Vec<StatusCondition> {
    let unchanged = existing.last().is_some_and(|c| {
        c.condition_type == condition_type && c.status == status && c.message == message
    });

    if !unchanged {
        existing.push(StatusCondition {
            condition_type,
            status,
            reason: reason.to_string(),
            message: message.to_string(),
            last_transition_time: now,
        });
    }
    existing
}
