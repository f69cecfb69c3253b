//! User visible error list.
//!
//! Failures that must not stop the viewer (rejected profiles, missing nodes,
//! broken assets, network errors) end up here and in the log.

use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub message: String,
    pub at: DateTime<Local>,
}

/// Shared list; clones append to the same entries.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.lock().push(Diagnostic {
            message,
            at: Local::now(),
        });
    }

    pub fn clear_all(&self) {
        self.lock().clear();
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|d| d.message.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A poisoned list is still a valid list of messages
    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
