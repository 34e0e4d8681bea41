//! Lifecycle classification shared by all resource kinds.

use serde::{Deserialize, Serialize};

/// Coarse class of a provider lifecycle state.
///
/// Every kind maps its own state labels onto these three classes; the
/// engine only ever looks at the class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleClass {
    /// Convergence in progress (provisioning, creating, updating, ...).
    Transient,
    /// Converged and usable (available, active, running, ...).
    TerminalOk,
    /// Converged but unusable (failed, terminated, ...).
    TerminalFailed,
}

impl LifecycleClass {
    pub fn is_transient(self) -> bool {
        self == LifecycleClass::Transient
    }

    /// Whether a resource in this class may be adopted by name lookup.
    pub fn is_bindable(self) -> bool {
        matches!(self, LifecycleClass::Transient | LifecycleClass::TerminalOk)
    }
}

impl std::fmt::Display for LifecycleClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleClass::Transient => write!(f, "transient"),
            LifecycleClass::TerminalOk => write!(f, "terminal-ok"),
            LifecycleClass::TerminalFailed => write!(f, "terminal-failed"),
        }
    }
}
