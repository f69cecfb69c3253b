//! # Selection Module
//!
//! Owns the process-wide selection: profile, handedness and background.
//!
//! Changes are published on `watch` channels. Profile fetches are handed out
//! as [`ProfileFetch`] tickets carrying a generation number; a completion
//! whose generation is no longer current is dropped, so a slow fetch can
//! never override a newer selection.

pub mod background_selector;
pub mod profile_selector;

pub use background_selector::{Background, BackgroundSelector};
pub use profile_selector::{ProfileFetch, ProfileFetchResult, ProfileSelector, SelectionEvent};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("I/O error for {path}: {message}")]
    Io { path: String, message: String },

    #[error("Invalid background list: {0}")]
    BackgroundList(String),
}
