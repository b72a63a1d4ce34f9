//! # Scene Management Module
//!
//! Objects, their meshes and transforms, and the [`Scene`] that owns them
//! together with materials, textures, lights, the starfield and the camera.
//!
//! - [`Scene`] - container looked up by object name
//! - [`Object`] - meshes plus a [`Transform`], material, hover highlight and shadow flags
//! - [`Vertex3D`] - position, normal and texture coordinates

pub mod object;
pub mod scene;
pub mod vertex;

// Re-export main types
pub use object::{DrawObject, Mesh, Object, Transform};
pub use scene::{Scene, SceneStatistics};
pub use vertex::Vertex3D;
