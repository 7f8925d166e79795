//! Gamepad signals streamed from the handheld controllers.
//!
//! Each handheld sends [`GamepadData`] samples at its own, irregular rate.
//! [`GamepadState`] folds those samples into held/pressed/analog state the
//! console queries when driving an avatar.

use engine_core::PlayerId;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Button or axis reported by a handheld.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyName {
    Up,
    Left,
    Right,
    Down,
    Confirm,
    A,
    XAxis,
    YAxis,
    ZAxis,
}

/// One key inside a sample: on/off for buttons, a number for axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalData {
    Digital { name: KeyName, value: bool },
    Analog { name: KeyName, value: f32 },
}

impl SignalData {
    pub fn name(&self) -> KeyName {
        match self {
            Self::Digital { name, .. } | Self::Analog { name, .. } => *name,
        }
    }
}

/// A control sample from one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamepadData {
    pub player_id: String,
    pub keys: Vec<SignalData>,
}

impl GamepadData {
    pub fn player(&self) -> PlayerId {
        PlayerId::new(self.player_id.clone())
    }
}

/// Attitude sample for a flying avatar, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeSample {
    pub pitch: f32,
    pub roll: f32,
}

/// Signal state for a single handheld.
#[derive(Debug, Default)]
pub struct GamepadState {
    /// Buttons currently held down.
    keys_held: HashSet<KeyName>,
    /// Buttons pressed since the last `clear_edges`.
    keys_pressed: HashSet<KeyName>,
    /// Buttons released since the last `clear_edges`.
    keys_released: HashSet<KeyName>,
    /// Latest value per axis.
    axes: HashMap<KeyName, f32>,
    /// Axes updated since the last `clear_edges`.
    axes_changed: HashSet<KeyName>,
}

impl GamepadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-sample edges. Call after the sample has been acted on.
    pub fn clear_edges(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.axes_changed.clear();
    }

    /// Fold one sample into the state.
    pub fn process(&mut self, data: &GamepadData) {
        for key in &data.keys {
            match *key {
                SignalData::Digital { name, value: true } => {
                    if !self.keys_held.contains(&name) {
                        self.keys_pressed.insert(name);
                    }
                    self.keys_held.insert(name);
                }
                SignalData::Digital { name, value: false } => {
                    if self.keys_held.remove(&name) {
                        self.keys_released.insert(name);
                    }
                }
                SignalData::Analog { name, value } => {
                    if value.is_finite() {
                        self.axes.insert(name, value);
                        self.axes_changed.insert(name);
                    } else {
                        log::debug!("Dropping non-finite {:?} sample", name);
                    }
                }
            }
        }
    }

    // Query methods

    pub fn is_held(&self, key: KeyName) -> bool {
        self.keys_held.contains(&key)
    }

    pub fn is_pressed(&self, key: KeyName) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn is_released(&self, key: KeyName) -> bool {
        self.keys_released.contains(&key)
    }

    /// Latest value of an axis (0 if never reported).
    pub fn axis(&self, key: KeyName) -> f32 {
        self.axes.get(&key).copied().unwrap_or(0.0)
    }

    pub fn axis_changed(&self, key: KeyName) -> bool {
        self.axes_changed.contains(&key)
    }

    /// Whether the attack button was pressed in this sample.
    pub fn is_attack_pressed(&self) -> bool {
        self.is_pressed(KeyName::A)
    }

    /// Orientation sample if this sample carried a tilt reading.
    ///
    /// Handhelds report tilt in degrees: `y-axis` is pitch and `x-axis` is roll.
    pub fn attitude(&self) -> Option<AttitudeSample> {
        if !self.axis_changed(KeyName::XAxis) && !self.axis_changed(KeyName::YAxis) {
            return None;
        }
        Some(AttitudeSample {
            pitch: self.axis(KeyName::YAxis).to_radians(),
            roll: self.axis(KeyName::XAxis).to_radians(),
        })
    }

    /// Movement on the ground plane: stick axes first, d-pad as fallback.
    ///
    /// The stick only counts when the latest sample moved it; a held stick
    /// value is not replayed by button-only samples. `x-axis` maps to world X
    /// and `y-axis` to world Z. The result is clamped to unit length.
    pub fn movement(&self) -> Vec3 {
        if self.axis_changed(KeyName::XAxis) || self.axis_changed(KeyName::YAxis) {
            let stick = Vec3::new(self.axis(KeyName::XAxis), 0.0, self.axis(KeyName::YAxis));
            if stick.length_squared() > 0.0 {
                return stick.clamp_length_max(1.0);
            }
        }

        let mut movement = Vec3::ZERO;
        if self.is_held(KeyName::Up) {
            movement.z += 1.0;
        }
        if self.is_held(KeyName::Down) {
            movement.z -= 1.0;
        }
        if self.is_held(KeyName::Left) {
            movement.x -= 1.0;
        }
        if self.is_held(KeyName::Right) {
            movement.x += 1.0;
        }
        movement.normalize_or_zero()
    }
}

/// Map `value` linearly from `[a_min, a_max]` onto `[b_min, b_max]`.
pub fn map_range(value: f32, a_min: f32, a_max: f32, b_min: f32, b_max: f32) -> f32 {
    b_min + ((value - a_min) * (b_max - b_min)) / (a_max - a_min)
}
