use super::PersistenceError;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

macro_rules! handle_action {
    ($action:expr, $response_tx:expr) => {
        if let Err(_) = $response_tx.send($action.await) {
            error!("Failed to send response");
        }
    };
}

// Actions for the persistence worker
#[derive(Debug)]
pub enum PersistAction {
    Save {
        values: BTreeMap<String, String>,
    },
    /// Answers once every earlier action has been handled.
    Flush {
        response_tx: oneshot::Sender<Result<(), PersistenceError>>,
    },
}

pub struct PersistenceWorker {
    path: PathBuf,
    last_error: Option<String>,
}

impl PersistenceWorker {
    /// Spawns the worker task writing to `path`.
    pub fn spawn(path: PathBuf) -> (UnboundedSender<PersistAction>, tokio::task::JoinHandle<()>) {
        let (tx, rx) = unbounded_channel::<PersistAction>();
        let worker = Self {
            path,
            last_error: None,
        };
        let handle = tokio::spawn(worker.run(rx));
        (tx, handle)
    }

    async fn run(mut self, mut rx: UnboundedReceiver<PersistAction>) {
        info!("Persistence worker writing to {}", self.path.display());
        while let Some(action) = rx.recv().await {
            match action {
                PersistAction::Save { values } => {
                    if let Err(e) = self.save(&values).await {
                        error!("Failed to persist selection state: {}", e);
                        self.last_error = Some(e.to_string());
                    } else {
                        self.last_error = None;
                    }
                }
                PersistAction::Flush { response_tx } => {
                    handle_action!(self.flushed(), response_tx);
                }
            }
        }
        debug!("Persistence worker stopped");
    }

    async fn flushed(&self) -> Result<(), PersistenceError> {
        match &self.last_error {
            Some(message) => Err(PersistenceError::Write(message.clone())),
            None => Ok(()),
        }
    }

    async fn save(&self, values: &BTreeMap<String, String>) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| PersistenceError::Io {
                        path: parent.display().to_string(),
                        message: e.to_string(),
                    })?;
            }
        }

        let content = toml::to_string_pretty(values)
            .map_err(|e| PersistenceError::Serialize(e.to_string()))?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| PersistenceError::Io {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        debug!("Persisted {} selection values", values.len());
        Ok(())
    }
}
