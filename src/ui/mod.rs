//! # User Interface Module
//!
//! Dear ImGui overlay drawn on top of the scene.
//!
//! - [`UiManager`] - ImGui integration with winit and wgpu, input capture
//!   and frame timing
//! - [`panel`] - The Earth system info panel
//!
//! When ImGui wants the mouse, pointer picking and camera drags are skipped
//! so clicking a widget never toggles the moon behind it.

pub mod manager;
pub mod panel;

// Re-export main types
pub use manager::UiManager;
pub use panel::{earth_info_panel, EarthPanel};
