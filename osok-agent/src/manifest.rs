//! Manifest and status files.
//!
//! The manifest declares the desired objects:
//!
//! ```json
//! { "objects": [ { "kind": "Vcn", "name": "prod", "spec": { ... }, "deleted": false } ] }
//! ```
//!
//! The status file maps `"<kind>/<name>"` to the object's last recorded
//! status and is rewritten after every pass.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use osok_core::OsokStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate object {0}")]
    Duplicate(String),
}

/// One declared object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub kind: String,
    pub name: String,
    pub spec: Value,
    /// Marked for deletion; the object is released once its resource is gone.
    #[serde(default)]
    pub deleted: bool,
}

impl ObjectSpec {
    pub fn key(&self) -> String {
        object_key(&self.kind, &self.name)
    }
}

pub fn object_key(kind: &str, name: &str) -> String {
    format!("{}/{}", kind, name)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
}

impl Manifest {
    pub fn from_json(path: &Path, json: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest =
            serde_json::from_str(json).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut seen = std::collections::HashSet::new();
        for object in &manifest.objects {
            if !seen.insert(object.key()) {
                return Err(ManifestError::Duplicate(object.key()));
            }
        }
        Ok(manifest)
    }

    pub async fn load(path: &Path) -> Result<Self, ManifestError> {
        let json = fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let manifest = Self::from_json(path, &json)?;
        debug!(path = %path.display(), objects = manifest.objects.len(), "Loaded manifest");
        Ok(manifest)
    }
}

/// Persisted statuses keyed by `"<kind>/<name>"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusFile {
    pub statuses: BTreeMap<String, OsokStatus>,
}

impl StatusFile {
    /// Load statuses. A missing file yields no statuses.
    pub async fn load(path: &Path) -> Result<Self, ManifestError> {
        let json = match fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No status file yet");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ManifestError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&json).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write statuses through a temporary file so readers never see a
    /// partial file.
    pub async fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let write_err = |source| ManifestError::Write {
            path: path.to_path_buf(),
            source,
        };
        let json =
            serde_json::to_string_pretty(self).map_err(|e| write_err(std::io::Error::other(e)))?;

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json).await.map_err(write_err)?;
        fs::rename(&tmp, path).await.map_err(write_err)?;
        debug!(path = %path.display(), statuses = self.statuses.len(), "Saved statuses");
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&OsokStatus> {
        self.statuses.get(key)
    }

    pub fn set(&mut self, key: String, status: OsokStatus) {
        self.statuses.insert(key, status);
    }

    pub fn remove(&mut self, key: &str) -> Option<OsokStatus> {
        self.statuses.remove(key)
    }
}
