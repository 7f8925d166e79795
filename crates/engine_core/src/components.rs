//! Common components shared by the console and its avatars.

use glam::Vec3;
use std::fmt;

/// Identity of the handheld that owns an avatar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Linear RGB tint applied to an avatar's body material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tint(pub Vec3);

impl Tint {
    pub const WHITE: Tint = Tint(Vec3::ONE);

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self(Vec3::new(r, g, b))
    }

    /// Parse a `#rrggbb` hex string.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| {
            u8::from_str_radix(hex.get(i..i + 2)?, 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl Default for Tint {
    fn default() -> Self {
        Self::WHITE
    }
}
