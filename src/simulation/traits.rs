//! Core simulation trait
//!
//! Defines the interface a scene driver implements to integrate with the
//! app loop, the picker and the UI.

use crate::gfx::{picking::Ray, scene::Scene};
use imgui::Ui;

/// A scene driver run by the app loop
///
/// The app calls `initialize` once, then every frame `update` followed by
/// rendering. Pointer rays are world-space rays under the cursor.
pub trait Simulation {
    /// Initialize the simulation
    ///
    /// Called once when the simulation is attached. Use this to create
    /// objects, materials and lights and to queue asset loads.
    fn initialize(&mut self, scene: &mut Scene);

    /// Advance by `delta_time` seconds of wall-clock time
    fn update(&mut self, delta_time: f32, scene: &mut Scene);

    /// The cursor moved; `ray` passes through the new cursor position
    fn on_pointer_move(&mut self, _ray: &Ray, _scene: &mut Scene) {}

    /// The cursor no longer points into the scene, e.g. it is over the UI
    fn on_pointer_leave(&mut self, _scene: &mut Scene) {}

    /// The primary button was clicked at the cursor
    fn on_click(&mut self, _ray: &Ray, _scene: &mut Scene) {}

    /// Render custom UI controls
    fn render_ui(&mut self, ui: &Ui, scene: &mut Scene);

    /// Get simulation name for UI display
    fn name(&self) -> &str;

    /// Whether simulation is currently running
    fn is_running(&self) -> bool;

    /// Start/pause simulation
    fn set_running(&mut self, running: bool);

    /// Reset simulation to initial state
    fn reset(&mut self, scene: &mut Scene);

    /// Optional: Custom cleanup when simulation is removed
    fn cleanup(&mut self, _scene: &mut Scene) {}
}
