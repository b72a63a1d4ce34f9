//! # Graphics Module
//!
//! Everything that ends up on screen: camera, geometry, scene objects,
//! GPU resources, picking and the render engine.
//!
//! - **Camera** ([`camera`]) - Damped orbit camera around a target
//! - **Geometry** ([`geometry`]) - Procedural meshes
//! - **Picking** ([`picking`]) - Screen rays and ray/mesh intersection
//! - **Rendering** ([`rendering`]) - Pipelines, starfield and frame rendering
//! - **Resources** ([`resources`]) - Materials, textures, lights and uniforms
//! - **Scene** ([`scene`]) - Objects, meshes and the scene container
//!
//! ```no_run
//! use earthview::gfx::{scene::Scene, picking::ObjectPicker};
//!
//! let scene = Scene::default();
//! let picker = ObjectPicker::new((1200.0, 800.0));
//! let ray = picker.screen_to_ray((600.0, 400.0), &scene.camera_manager.camera);
//! let hit = picker.pick_object(&ray, &scene);
//! ```

pub mod camera;
pub mod geometry;
pub mod picking;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use camera::orbit_camera::OrbitCamera;
pub use rendering::render_engine::RenderEngine;
