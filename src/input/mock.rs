//! Synthetic gamepad for inspecting a controller without hardware.

use super::{InputError, InputSnapshot, InputSource};
use crate::profile::{Handedness, Profile};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Gamepad whose arrays are sized from a profile layout and written by the
/// manual controls. Clones share the same snapshot.
#[derive(Debug, Clone)]
pub struct MockGamepad {
    sender: Arc<watch::Sender<InputSnapshot>>,
}

impl MockGamepad {
    /// Sizes the arrays to the largest button and axis index of the layout.
    pub fn new(
        profile: Option<&Profile>,
        handedness: Option<Handedness>,
    ) -> Result<Self, InputError> {
        let profile = profile.ok_or(InputError::MissingProfile)?;
        let handedness = handedness.ok_or(InputError::MissingHandedness)?;
        let layout = profile
            .layout(handedness)
            .ok_or_else(|| InputError::LayoutNotFound {
                handedness,
                profile_id: profile.profile_id.clone(),
            })?;

        let (button_count, axis_count) = layout.gamepad_extent();
        debug!(
            "Mock gamepad for {} ({}): {} buttons, {} axes",
            profile.profile_id, handedness, button_count, axis_count
        );

        let snapshot = InputSnapshot::zeroed(
            profile.profile_id.clone(),
            layout.mapping.clone(),
            button_count,
            axis_count,
        );
        let (sender, _) = watch::channel(snapshot);
        Ok(Self {
            sender: Arc::new(sender),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<InputSnapshot> {
        self.sender.subscribe()
    }

    pub fn snapshot(&self) -> InputSnapshot {
        self.sender.borrow().clone()
    }

    /// Writes a button value as is; range checking is left to the consumer.
    pub fn set_button_value(&self, index: usize, value: f32) {
        self.write(|snapshot| match snapshot.buttons.get_mut(index) {
            Some(button) => {
                button.value = value;
                true
            }
            None => {
                warn!("Mock gamepad has no button {}", index);
                false
            }
        });
    }

    /// Writes an axis value as is; range checking is left to the consumer.
    pub fn set_axis_value(&self, index: usize, value: f32) {
        self.write(|snapshot| match snapshot.axes.get_mut(index) {
            Some(axis) => {
                *axis = value;
                true
            }
            None => {
                warn!("Mock gamepad has no axis {}", index);
                false
            }
        });
    }

    fn write(&self, edit: impl FnOnce(&mut InputSnapshot) -> bool) {
        self.sender.send_if_modified(edit);
    }
}

/// Builds [`InputSource`]s on top of a [`MockGamepad`].
pub struct MockInputSource;

impl MockInputSource {
    pub fn new(
        profiles: Vec<String>,
        gamepad: &MockGamepad,
        handedness: Option<Handedness>,
    ) -> Result<InputSource, InputError> {
        let handedness = handedness.ok_or(InputError::MissingHandedness)?;
        Ok(InputSource::new(handedness, profiles, gamepad.subscribe()))
    }
}
