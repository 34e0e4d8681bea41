//! Secret store for connection details of endpoint-bearing resources.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use osok_core::AdapterError;
use osok_core::error::Result;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory secret store. Clones share the same secrets.
#[derive(Debug, Clone, Default)]
pub struct SecretStore {
    secrets: Arc<Mutex<HashMap<String, BTreeMap<String, String>>>>,
    unavailable: Arc<AtomicBool>,
}

impl SecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AdapterError::Service {
                status: 503,
                code: "SecretStoreUnavailable".to_string(),
                message: "secret store is unavailable".to_string(),
            });
        }
        Ok(())
    }

    /// Create or replace a secret.
    pub async fn put(&self, name: &str, data: BTreeMap<String, String>) -> Result<()> {
        self.check_available()?;
        debug!(secret = name, keys = data.len(), "Writing secret");
        self.secrets.lock().await.insert(name.to_string(), data);
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Result<Option<BTreeMap<String, String>>> {
        self.check_available()?;
        Ok(self.secrets.lock().await.get(name).cloned())
    }

    /// Delete a secret. Returns whether it existed.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        self.check_available()?;
        debug!(secret = name, "Deleting secret");
        Ok(self.secrets.lock().await.remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = SecretStore::new();
        let data = BTreeMap::from([("host".to_string(), "db.example".to_string())]);

        store.put("adb-1", data.clone()).await.unwrap();
        assert_eq!(store.get("adb-1").await.unwrap(), Some(data));

        assert!(store.delete("adb-1").await.unwrap());
        assert!(!store.delete("adb-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = SecretStore::new();
        store.set_unavailable(true);

        let err = store.delete("adb-1").await.unwrap_err();
        assert_eq!(err.code(), Some("SecretStoreUnavailable"));

        store.set_unavailable(false);
        assert!(store.delete("adb-1").await.is_ok());
    }
}
