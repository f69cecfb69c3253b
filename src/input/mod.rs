//! Input snapshot sources
//!
//! An [`InputSource`] pairs a handedness and an ordered list of profile ids
//! with a stream of [`InputSnapshot`]s. The snapshots come either from a
//! [`mock::MockGamepad`] driven by the manual controls, or from the gilrs
//! backed [`hardware`] collector.
//!
//! ```text
//! MockGamepad ────────┐
//!  (slider edits)     ├──► watch::Sender<InputSnapshot> ──► InputSource::sample()
//! HardwareCollector ──┘
//!  (gilrs events)
//! ```

pub mod hardware;
pub mod mock;

use crate::profile::Handedness;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

pub use mock::{MockGamepad, MockInputSource};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("No profileDescription supplied")]
    MissingProfile,

    #[error("No handedness supplied")]
    MissingHandedness,

    #[error("No layout for {handedness} handedness in profile {profile_id}")]
    LayoutNotFound {
        handedness: Handedness,
        profile_id: String,
    },

    #[error("Failed to initialize gamepad input: {0}")]
    HardwareInit(String),
}

/// State of one gamepad button.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GamepadButton {
    pub value: f32,
    pub touched: bool,
    pub pressed: bool,
}

/// Fixed-shape raw input, as a gamepad reports it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub id: String,
    pub mapping: String,
    pub buttons: Vec<GamepadButton>,
    pub axes: Vec<f32>,
}

impl InputSnapshot {
    /// Zero-filled snapshot with `button_count` buttons and `axis_count` axes.
    pub fn zeroed(id: String, mapping: String, button_count: usize, axis_count: usize) -> Self {
        Self {
            id,
            mapping,
            buttons: vec![GamepadButton::default(); button_count],
            axes: vec![0.0; axis_count],
        }
    }
}

/// A tracked controller: who holds it, which profiles describe it, and its input.
#[derive(Debug, Clone)]
pub struct InputSource {
    pub handedness: Handedness,
    pub profiles: Vec<String>,
    snapshots: watch::Receiver<InputSnapshot>,
}

impl InputSource {
    pub fn new(
        handedness: Handedness,
        profiles: Vec<String>,
        snapshots: watch::Receiver<InputSnapshot>,
    ) -> Self {
        Self {
            handedness,
            profiles,
            snapshots,
        }
    }

    /// Current snapshot. Never blocks on the producer.
    pub fn sample(&self) -> InputSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Same input, with `profile_id` as the only profile preference.
    pub fn with_forced_profile(&self, profile_id: &str) -> Self {
        Self {
            handedness: self.handedness,
            profiles: vec![profile_id.to_string()],
            snapshots: self.snapshots.clone(),
        }
    }
}
