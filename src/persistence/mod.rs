//! # Persistence Module
//!
//! ## Why This Module Exists
//! The viewer remembers the last selected profile id, handedness and
//! background between runs. Values are plain strings stored as a TOML table.
//!
//! ## Key Abstractions
//! - **Read-once values**: selectors call [`SelectionStore::take`] on a stored value
//!   while populating, so a stale value is never applied twice
//! - **Write-behind**: every mutation hands the whole table to the
//!   [`persistence_worker`] task; the render loop never waits for the disk
//!
//! A store opened without a file is memory only.

pub mod persistence_worker;

use persistence_worker::{PersistAction, PersistenceWorker};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

pub const PROFILE_ID_KEY: &str = "profileId";
pub const HANDEDNESS_KEY: &str = "handedness";
pub const BACKGROUND_KEY: &str = "background";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error for {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse state file: {0}")]
    Parse(String),

    #[error("Failed to serialize state: {0}")]
    Serialize(String),

    #[error("Failed to write state: {0}")]
    Write(String),

    #[error("Persistence worker is not running")]
    WorkerGone,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    values: Arc<Mutex<BTreeMap<String, String>>>,
    worker: Option<UnboundedSender<PersistAction>>,
}

impl SelectionStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads `path` if it exists and starts the worker that keeps it current.
    pub async fn open(path: &Path) -> Result<Self, PersistenceError> {
        let values = match tokio::fs::read_to_string(path).await {
            Ok(content) => toml::from_str::<BTreeMap<String, String>>(&content)
                .map_err(|e| PersistenceError::Parse(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No stored selection at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                return Err(PersistenceError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })
            }
        };
        debug!("Loaded {} stored selection values", values.len());

        let (tx, _handle) = PersistenceWorker::spawn(path.to_path_buf());
        Ok(Self {
            values: Arc::new(Mutex::new(values)),
            worker: Some(tx),
        })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Returns the stored value and clears it.
    pub fn take(&self, key: &str) -> Option<String> {
        let mut values = self.lock();
        let taken = values.remove(key);
        if taken.is_some() {
            self.persist(&values);
        }
        taken
    }

    pub fn set(&self, key: &str, value: &str) {
        let mut values = self.lock();
        if values.get(key).map(String::as_str) == Some(value) {
            return;
        }
        values.insert(key.to_string(), value.to_string());
        self.persist(&values);
    }

    /// Waits until every earlier mutation reached the disk.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        let Some(worker) = &self.worker else {
            return Ok(());
        };
        let (response_tx, response_rx) = oneshot::channel();
        worker
            .send(PersistAction::Flush { response_tx })
            .map_err(|_| PersistenceError::WorkerGone)?;
        response_rx
            .await
            .map_err(|_| PersistenceError::WorkerGone)?
    }

    fn persist(&self, values: &BTreeMap<String, String>) {
        if let Some(worker) = &self.worker {
            let action = PersistAction::Save {
                values: values.clone(),
            };
            if worker.send(action).is_err() {
                warn!("Persistence worker is gone, selection kept in memory only");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
