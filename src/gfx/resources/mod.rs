// src/gfx/resources/mod.rs
//! GPU resource management
//!
//! Handles textures, materials, lights and the global uniform block.

pub mod global_bindings;
pub mod material;
pub mod texture_library;
pub mod texture_resource;

// Re-export main types
pub use global_bindings::{update_global_ubo, GlobalBindings, GlobalUBO, LightRig};
pub use material::{Material, MaterialManager};
pub use texture_library::{ColorSpace, TextureLibrary, TextureStatus};
pub use texture_resource::TextureResource;
