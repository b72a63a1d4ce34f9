// src/lib.rs
//! Earth View
//!
//! An interactive Earth, Moon and Sun scene rendered with wgpu and winit:
//! a textured Earth with night lights, bump mapping and a cloud layer, a
//! glowing Sun carrying the scene's point light, an orbiting Moon that can be
//! paused by clicking it, and an OBJ satellite that highlights on hover.

pub mod app;
pub mod assets;
pub mod config;
pub mod gfx;
pub mod simulation;
pub mod ui;
pub mod wgpu_utils;

pub use app::EarthApp;
pub use config::{Cli, SceneConfig};
