//! Error types for avatar controllers and asset loading.

use thiserror::Error;

/// Failure loading a model.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("model '{model}' not found")]
    NotFound { model: String },
    #[error("failed to read model '{model}': {source}")]
    Gltf {
        model: String,
        #[source]
        source: gltf::Error,
    },
    #[error("model '{model}' has no '{clip}' clip")]
    MissingClip { model: String, clip: &'static str },
}

/// Failure of an avatar operation.
///
/// Gameplay gating (stunned, attacking, dead, rate-limited) is not an error;
/// only deliberate input that cannot take physical effect is.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("avatar '{name}' is not initialised")]
    NotInitialized { name: String },
    #[error(transparent)]
    Asset(#[from] AssetError),
}
