//! osok-agent: reconciles declared cloud resources against the provider.
//!
//! The agent reads a manifest of declared objects, hands each one to the
//! reconciler registered for its kind, and persists the observed statuses.

pub mod adapters;
pub mod clients;
pub mod controller;
pub mod manifest;
pub mod reconciler;

pub use adapters::{AdapterConfig, all_reconcilers};
pub use controller::{ApplyReport, Controller, ControllerConfig, ManagedObject, SyncOutcome};
pub use manifest::{Manifest, ManifestError, ObjectSpec, StatusFile};
