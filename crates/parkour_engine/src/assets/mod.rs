//! Mesh provider interface
//!
//! Collision meshes are loaded by an external asset pipeline. The core only
//! asks for them by name through [`MeshSource`] and shares them as `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::physics::collision::ConvexMesh;

/// Anything that can hand out collision meshes by name
pub trait MeshSource {
    /// Mesh registered under `name`
    fn mesh(&self, name: &str) -> Option<Arc<ConvexMesh>>;

    /// Like [`MeshSource::mesh`], but a missing mesh is an error
    fn require(&self, name: &str) -> Result<Arc<ConvexMesh>, AssetError> {
        self.mesh(name).ok_or_else(|| AssetError::NotFound(name.to_string()))
    }
}

/// Asset lookup errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetError {
    /// No mesh under that name
    #[error("Mesh not found: {0}")]
    NotFound(String),

    /// Mesh data rejected on insertion
    #[error("Invalid mesh data for {name}: {reason}")]
    InvalidData {
        /// Mesh name
        name: String,
        /// What was wrong with it
        reason: String,
    },
}

/// In-memory mesh cache keyed by name
#[derive(Debug, Default, Clone)]
pub struct MeshCache {
    meshes: HashMap<String, Arc<ConvexMesh>>,
}

impl MeshCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mesh, replacing any previous one with the same name
    ///
    /// Index lists must come in whole triangles and only reference existing
    /// vertices.
    pub fn insert(&mut self, name: impl Into<String>, mesh: ConvexMesh) -> Result<Arc<ConvexMesh>, AssetError> {
        let name = name.into();
        if mesh.indices().len() % 3 != 0 {
            return Err(AssetError::InvalidData {
                name,
                reason: format!("{} indices is not a whole number of triangles", mesh.indices().len()),
            });
        }
        if let Some(&bad) = mesh.indices().iter().find(|&&i| i as usize >= mesh.vertices().len()) {
            return Err(AssetError::InvalidData {
                name,
                reason: format!("index {bad} out of range for {} vertices", mesh.vertices().len()),
            });
        }

        let mesh = Arc::new(mesh);
        if self.meshes.insert(name.clone(), Arc::clone(&mesh)).is_some() {
            log::debug!("Replaced cached mesh {}", name);
        }
        Ok(mesh)
    }

    /// Cached mesh by name
    pub fn get(&self, name: &str) -> Option<&Arc<ConvexMesh>> {
        self.meshes.get(name)
    }

    /// Whether `name` is cached
    pub fn contains(&self, name: &str) -> bool {
        self.meshes.contains_key(name)
    }

    /// Number of cached meshes
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

impl MeshSource for MeshCache {
    fn mesh(&self, name: &str) -> Option<Arc<ConvexMesh>> {
        self.meshes.get(name).cloned()
    }
}
