//! Physical gamepad as a one-handed XR input source
//!
//! A gilrs collector runs on its own thread and folds gamepad events into an
//! xr-standard shaped [`InputSnapshot`] for one hand:
//!
//! | slot | left hand | right hand |
//! |---|---|---|
//! | button 0 (trigger) | `LeftTrigger2` | `RightTrigger2` |
//! | button 1 (squeeze) | `LeftTrigger` | `RightTrigger` |
//! | button 2 (touchpad) | unused | unused |
//! | button 3 (thumbstick) | `LeftThumb` | `RightThumb` |
//! | button 4, 5 | `West`, `North` | `South`, `East` |
//! | axes 2, 3 | left stick | right stick |
//!
//! Stick y is inverted because xr-standard reports forward as negative.

use super::{GamepadButton, InputError, InputSnapshot, InputSource};
use crate::profile::Handedness;
use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use serde::{Deserialize, Serialize};
use statum::{machine, state};
use std::sync::mpsc as std_mpsc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

const BUTTON_COUNT: usize = 6;
const AXIS_COUNT: usize = 4;
const STICK_X_AXIS: usize = 2;
const STICK_Y_AXIS: usize = 3;
const POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareSettings {
    pub enabled: bool,
    pub handedness: Handedness,
    pub joystick_deadzone: f32,
    /// Profile preference list reported for the gamepad.
    pub profiles: Vec<String>,
}

impl Default for HardwareSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            handedness: Handedness::Right,
            joystick_deadzone: 0.05,
            profiles: vec![
                "generic-trigger-squeeze-thumbstick".to_string(),
                "generic-trigger".to_string(),
            ],
        }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum CollectorState {
    Initializing,
    Collecting,
}

#[machine]
#[derive(Debug)]
pub struct HardwareCollector<S: CollectorState> {
    gilrs: Gilrs,
    active_gamepad: Option<GamepadId>,
    settings: HardwareSettings,
    snapshot: InputSnapshot,
    publisher: watch::Sender<InputSnapshot>,
}

impl HardwareCollector<Initializing> {
    pub fn create(
        settings: HardwareSettings,
        publisher: watch::Sender<InputSnapshot>,
    ) -> Result<Self, InputError> {
        info!("Initializing gilrs for {} hand input", settings.handedness);
        let gilrs = Gilrs::new().map_err(|e| {
            error!("Failed to initialize gilrs: {}", e);
            InputError::HardwareInit(e.to_string())
        })?;
        let snapshot = publisher.borrow().clone();
        Ok(Self::new(gilrs, None, settings, snapshot, publisher))
    }

    pub fn initialize(mut self) -> HardwareCollector<Collecting> {
        let first = self
            .gilrs
            .gamepads()
            .next()
            .map(|(id, gamepad)| (id, gamepad.name().to_string()));
        match first {
            Some((id, name)) => {
                info!("Using gamepad {} ({})", name, id);
                self.active_gamepad = Some(id);
                self.snapshot.id = name;
            }
            None => warn!("No gamepad connected, waiting for one"),
        }
        self.transition()
    }
}

impl HardwareCollector<Collecting> {
    pub fn run(&mut self) {
        info!("Hardware collector running");
        loop {
            if self.publisher.is_closed() {
                info!("No input consumers left, stopping hardware collector");
                return;
            }

            let mut changed = false;
            while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
                changed |= self.handle_event(id, event);
            }
            if changed {
                self.publisher.send_replace(self.snapshot.clone());
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn handle_event(&mut self, id: GamepadId, event: EventType) -> bool {
        if let EventType::Connected = event {
            if self.active_gamepad.is_none() {
                info!("Gamepad {} connected, using it", id);
                self.active_gamepad = Some(id);
            }
            return false;
        }
        if self.active_gamepad != Some(id) {
            return false;
        }

        let hand = self.settings.handedness;
        match event {
            EventType::ButtonChanged(button, value, _) => {
                let Some(slot) = button_slot(hand, button) else {
                    return false;
                };
                debug!("{:?} -> button {} = {:.3}", button, slot, value);
                let state = &mut self.snapshot.buttons[slot];
                state.value = value;
                state.touched = value > 0.0;
                true
            }
            EventType::ButtonPressed(button, _) => self.set_pressed(button, true),
            EventType::ButtonReleased(button, _) => self.set_pressed(button, false),
            EventType::AxisChanged(axis, value, _) => {
                let deadzone = self.settings.joystick_deadzone;
                match axis_slot(hand, axis) {
                    Some((slot, invert)) => {
                        let value = apply_deadzone(value, deadzone);
                        self.snapshot.axes[slot] = if invert { -value } else { value };
                        true
                    }
                    None => trigger_axis_slot(hand, axis).is_some_and(|slot| {
                        let value = apply_deadzone(value, deadzone).max(0.0);
                        self.snapshot.buttons[slot].value = value;
                        self.snapshot.buttons[slot].touched = value > 0.0;
                        true
                    }),
                }
            }
            EventType::Disconnected => {
                warn!("Active gamepad {} disconnected", id);
                self.active_gamepad = None;
                for button in &mut self.snapshot.buttons {
                    *button = GamepadButton::default();
                }
                self.snapshot.axes.fill(0.0);
                true
            }
            _ => false,
        }
    }

    fn set_pressed(&mut self, button: Button, pressed: bool) -> bool {
        let Some(slot) = button_slot(self.settings.handedness, button) else {
            return false;
        };
        let state = &mut self.snapshot.buttons[slot];
        state.pressed = pressed;
        state.touched = pressed || state.value > 0.0;
        true
    }
}

/// Starts the collector thread and returns the source it feeds.
pub fn spawn(settings: HardwareSettings) -> Result<InputSource, InputError> {
    let snapshot = InputSnapshot::zeroed(
        "gamepad".to_string(),
        "xr-standard".to_string(),
        BUTTON_COUNT,
        AXIS_COUNT,
    );
    let (publisher, receiver) = watch::channel(snapshot);
    let handedness = settings.handedness;
    let profiles = settings.profiles.clone();

    // gilrs is created on the collector thread; only the init result crosses back
    let (init_tx, init_rx) = std_mpsc::channel();
    std::thread::Builder::new()
        .name("gilrs-collector".to_string())
        .spawn(move || match HardwareCollector::create(settings, publisher) {
            Ok(collector) => {
                let _ = init_tx.send(Ok(()));
                collector.initialize().run();
            }
            Err(e) => {
                let _ = init_tx.send(Err(e));
            }
        })
        .map_err(|e| InputError::HardwareInit(e.to_string()))?;

    init_rx
        .recv()
        .map_err(|e| InputError::HardwareInit(e.to_string()))??;

    Ok(InputSource::new(handedness, profiles, receiver))
}

fn button_slot(hand: Handedness, button: Button) -> Option<usize> {
    match (hand, button) {
        (Handedness::Left, Button::LeftTrigger2) => Some(0),
        (Handedness::Left, Button::LeftTrigger) => Some(1),
        (Handedness::Left, Button::LeftThumb) => Some(3),
        (Handedness::Left, Button::West) => Some(4),
        (Handedness::Left, Button::North) => Some(5),
        (Handedness::Right | Handedness::None, Button::RightTrigger2) => Some(0),
        (Handedness::Right | Handedness::None, Button::RightTrigger) => Some(1),
        (Handedness::Right | Handedness::None, Button::RightThumb) => Some(3),
        (Handedness::Right | Handedness::None, Button::South) => Some(4),
        (Handedness::Right | Handedness::None, Button::East) => Some(5),
        _ => None,
    }
}

/// Stick axis slot and whether the value is inverted.
fn axis_slot(hand: Handedness, axis: Axis) -> Option<(usize, bool)> {
    match (hand, axis) {
        (Handedness::Left, Axis::LeftStickX) => Some((STICK_X_AXIS, false)),
        (Handedness::Left, Axis::LeftStickY) => Some((STICK_Y_AXIS, true)),
        (Handedness::Right | Handedness::None, Axis::RightStickX) => Some((STICK_X_AXIS, false)),
        (Handedness::Right | Handedness::None, Axis::RightStickY) => Some((STICK_Y_AXIS, true)),
        _ => None,
    }
}

// Some drivers report analog triggers as Z axes instead of Trigger2 buttons
fn trigger_axis_slot(hand: Handedness, axis: Axis) -> Option<usize> {
    match (hand, axis) {
        (Handedness::Left, Axis::LeftZ) => Some(0),
        (Handedness::Right | Handedness::None, Axis::RightZ) => Some(0),
        _ => None,
    }
}

/// Largest usable deadzone; the rescale divides by `1.0 - deadzone`.
const MAX_DEADZONE: f32 = 0.95;

fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    let deadzone = if deadzone.is_nan() {
        0.0
    } else {
        deadzone.clamp(0.0, MAX_DEADZONE)
    };
    if value.abs() < deadzone {
        0.0
    } else {
        let sign = if value < 0.0 { -1.0 } else { 1.0 };
        (sign * (value.abs() - deadzone) / (1.0 - deadzone)).clamp(-1.0, 1.0)
    }
}
