//! Clients for the remote provider and the credential side channel.
//!
//! - cloud: resource CRUD against the (simulated) cloud provider
//! - secrets: connection details for endpoint-bearing resources

pub mod cloud;
pub mod secrets;

pub use cloud::{CloudClient, CloudConfig, CloudRecord, CreateRequest, LifecycleLabels, Operation};
pub use secrets::SecretStore;
