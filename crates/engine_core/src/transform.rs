//! Transform component and utilities for spatial positioning.

use glam::{EulerRot, Quat, Vec3};

/// A 3D transform representing position, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform with position and rotation.
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Rotation around Y (facing), in radians.
    pub fn yaw(&self) -> f32 {
        yaw_pitch_roll(self.rotation).0
    }

    /// `(pitch, roll)` of the rotation: X and Z angles in Y-X-Z order.
    pub fn pitch_roll(&self) -> (f32, f32) {
        let (_, pitch, roll) = yaw_pitch_roll(self.rotation);
        (pitch, roll)
    }
}

/// Build a rotation from yaw (Y), pitch (X) and roll (Z), applied Y-X-Z.
pub fn quat_from_yaw_pitch_roll(yaw: f32, pitch: f32, roll: f32) -> Quat {
    Quat::from_euler(EulerRot::YXZ, yaw, pitch, roll)
}

/// Decompose a rotation into `(yaw, pitch, roll)` in Y-X-Z order.
pub fn yaw_pitch_roll(rotation: Quat) -> (f32, f32, f32) {
    rotation.to_euler(EulerRot::YXZ)
}
