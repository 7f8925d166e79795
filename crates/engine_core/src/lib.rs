//! Core engine types and utilities for the party console.
//!
//! This crate provides the foundational types used across all engine systems:
//! - Transform and rotation helpers
//! - Time management and rate limiting
//! - Player identity components

pub mod components;
pub mod time;
pub mod timer;
pub mod transform;

pub use components::*;
pub use time::*;
pub use timer::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Quat, Vec2, Vec3};
pub use hecs::{Entity, World};
