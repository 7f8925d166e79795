//! Party console: avatar controllers for the shared-screen party games.
//!
//! Each handheld streams [`input::GamepadData`] to the console; a [`round::Round`]
//! routes it to that player's avatar and steps the physics world.

pub mod animation;
pub mod assets;
pub mod blend;
pub mod config;
pub mod error;
pub mod flight;
pub mod ground;
pub mod round;
pub mod spawner;
pub mod tween;

pub use assets::{AssetLoader, GltfLoader, MemoryLoader};
pub use config::Tuning;
pub use error::{AssetError, ControllerError};
pub use flight::{FlightEntity, FlightState};
pub use ground::{GroundEntity, GroundState};
pub use round::{Avatar, GameKind, Round, SceneMode};
