//! Model loading seam.
//!
//! The console only needs node names (to find the material to tint) and
//! animation clip names (to drive the mixer); geometry stays with the renderer.

use engine_core::{Quat, Tint, Transform, Vec3};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::AssetError;

pub const FLYING_CHICKEN: &str = "chicken-fly/flying-chicken.glb";
pub const PENGUIN: &str = "the-first-penguin/penguin.glb";

/// What a loaded model exposes to the controllers.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAsset {
    pub id: String,
    /// Node names in document order; the first is the root.
    pub nodes: Vec<String>,
    /// Animation clip names.
    pub clips: Vec<String>,
}

impl ModelAsset {
    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.iter().any(|n| n == name)
    }
}

/// Loads models by identifier.
#[allow(async_fn_in_trait)]
pub trait AssetLoader {
    async fn load(&self, model: &str) -> Result<ModelAsset, AssetError>;
}

/// Reads node and animation names from glTF/GLB files under a root directory.
#[derive(Debug, Clone)]
pub struct GltfLoader {
    root: PathBuf,
}

impl GltfLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetLoader for GltfLoader {
    async fn load(&self, model: &str) -> Result<ModelAsset, AssetError> {
        let path = self.root.join(model);
        if !path.exists() {
            return Err(AssetError::NotFound {
                model: model.to_owned(),
            });
        }
        let gltf = gltf::Gltf::open(&path).map_err(|source| AssetError::Gltf {
            model: model.to_owned(),
            source,
        })?;

        let nodes = gltf
            .document
            .nodes()
            .map(|n| n.name().map(str::to_owned).unwrap_or_else(|| format!("node-{}", n.index())))
            .collect();
        let clips = gltf
            .document
            .animations()
            .filter_map(|a| a.name().map(str::to_owned))
            .collect();

        log::debug!("Loaded {} from {:?}", model, path);
        Ok(ModelAsset {
            id: model.to_owned(),
            nodes,
            clips,
        })
    }
}

/// In-memory models, used headless and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    models: HashMap<String, ModelAsset>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// The two avatar models with the node and clip names the controllers expect.
    pub fn builtin() -> Self {
        let mut loader = Self::new();
        loader.insert(ModelAsset {
            id: FLYING_CHICKEN.to_owned(),
            nodes: vec!["__root__".into(), "body".into(), "wing".into(), "beak".into()],
            clips: Vec::new(),
        });
        loader.insert(ModelAsset {
            id: PENGUIN.to_owned(),
            nodes: vec!["__root__".into(), "penguin".into()],
            clips: vec!["attack".into(), "idle".into(), "walk".into()],
        });
        loader
    }

    pub fn insert(&mut self, asset: ModelAsset) {
        self.models.insert(asset.id.clone(), asset);
    }
}

impl AssetLoader for MemoryLoader {
    async fn load(&self, model: &str) -> Result<ModelAsset, AssetError> {
        self.models.get(model).cloned().ok_or_else(|| AssetError::NotFound {
            model: model.to_owned(),
        })
    }
}

/// A node of an avatar's visual hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub name: String,
    pub tint: Option<Tint>,
}

/// Visual mesh hierarchy parented under an avatar's hit box.
#[derive(Debug, Clone, PartialEq)]
pub struct Visual {
    pub model: String,
    pub nodes: Vec<MeshNode>,
    /// Model placement relative to the hit box.
    pub local: Transform,
}

impl Visual {
    pub fn from_asset(asset: &ModelAsset) -> Self {
        Self {
            model: asset.id.clone(),
            nodes: asset
                .nodes
                .iter()
                .map(|name| MeshNode {
                    name: name.clone(),
                    tint: None,
                })
                .collect(),
            local: Transform::default(),
        }
    }

    pub fn placed(mut self, offset: Vec3, rotation: Quat, scale: f32) -> Self {
        self.local = Transform {
            position: offset,
            rotation,
            scale: Vec3::splat(scale),
        };
        self
    }

    /// Tint the named node. Returns `false` if the node does not exist.
    pub fn tint_node(&mut self, name: &str, tint: Tint) -> bool {
        match self.nodes.iter_mut().find(|n| n.name == name) {
            Some(node) => {
                node.tint = Some(tint);
                true
            }
            None => false,
        }
    }

    pub fn node(&self, name: &str) -> Option<&MeshNode> {
        self.nodes.iter().find(|n| n.name == name)
    }
}
