//! Error definitions for profile loading and resolution

use thiserror::Error;

/// Errors produced while building, fetching, or resolving profiles
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The document could not be parsed into the expected shape
    #[error("Schema validation failed: {0}")]
    Schema(String),

    /// The document parsed but violates a structural rule
    #[error("Profile validation failed: {0}")]
    Validation(String),

    /// Reading a local file or directory failed
    #[error("I/O error for {path}: {message}")]
    Io { path: String, message: String },

    /// Fetching from the remote registry failed
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// None of the requested profile ids are registered
    #[error("{0}")]
    NoMatch(String),

    /// The profile has no layout for the requested handedness
    #[error("No matching handedness, {handedness}, in profile {profile_id}")]
    MissingHandedness {
        handedness: String,
        profile_id: String,
    },

    /// No registry document among the selected local files
    #[error("No registry profile selected")]
    NoRegistryProfile,
}
