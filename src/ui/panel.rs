// src/ui/panel.rs
//! Info overlay for the Earth scene
//!
//! Read-only status plus the moon orbit toggle, which mirrors clicking the
//! moon.

use crate::gfx::scene::SceneStatistics;
use crate::simulation::earth_system::SatelliteStatus;

/// Snapshot of what the info panel shows
#[derive(Debug, Clone, PartialEq)]
pub struct EarthPanel {
    pub moon_orbit_enabled: bool,
    pub satellite: SatelliteStatus,
    pub satellite_hovered: bool,
    pub earth_rotation: f32,
    pub moon_angle: f32,
    pub satellite_angle: f32,
    pub running: bool,
    pub stats: SceneStatistics,
}

impl EarthPanel {
    pub fn satellite_label(&self) -> &'static str {
        match self.satellite {
            SatelliteStatus::Loading => "loading...",
            SatelliteStatus::Loaded if self.satellite_hovered => "loaded (hovered)",
            SatelliteStatus::Loaded => "loaded",
            SatelliteStatus::Failed => "failed to load",
        }
    }

    pub fn moon_label(&self) -> &'static str {
        if self.moon_orbit_enabled {
            "orbiting"
        } else {
            "paused"
        }
    }
}

/// Draws the info panel; returns true when the moon orbit checkbox changed
pub fn earth_info_panel(ui: &imgui::Ui, panel: &EarthPanel) -> bool {
    let display_size = ui.io().display_size;
    if display_size[0] <= 0.0 || display_size[1] <= 0.0 {
        return false;
    }

    let mut toggled = false;
    ui.window("Earth System")
        .size([320.0, 360.0], imgui::Condition::FirstUseEver)
        .position([20.0, 20.0], imgui::Condition::FirstUseEver)
        .collapsible(true)
        .build(|| {
            ui.text(format!("FPS: {:.1}", ui.io().framerate));
            if !panel.running {
                ui.text_colored([1.0, 0.8, 0.2, 1.0], "Animation paused");
            }
            ui.separator();

            let mut orbit = panel.moon_orbit_enabled;
            if ui.checkbox("Moon orbit", &mut orbit) {
                toggled = true;
            }
            ui.same_line();
            ui.text_disabled(format!("({})", panel.moon_label()));
            ui.text_disabled("Click the moon to toggle");

            ui.separator();
            ui.text(format!("Satellite: {}", panel.satellite_label()));

            ui.separator();
            ui.text(format!("Earth rotation: {:.3} rad", panel.earth_rotation));
            ui.text(format!("Moon angle:     {:.3} rad", panel.moon_angle));
            ui.text(format!("Satellite angle: {:.3} rad", panel.satellite_angle));

            if ui.collapsing_header("Scene", imgui::TreeNodeFlags::empty()) {
                let stats = &panel.stats;
                ui.text(format!("Objects:   {}", stats.object_count));
                ui.text(format!("Materials: {}", stats.material_count));
                ui.text(format!("Triangles: {}", stats.total_triangles));
                ui.text(format!("Vertices:  {}", stats.total_vertices));
                ui.text(format!("Stars:     {}", stats.star_count));
                ui.text(format!(
                    "Textures:  {} ready, {} pending, {} failed",
                    stats.ready_textures, stats.pending_textures, stats.failed_textures
                ));
            }

            ui.separator();
            ui.text_disabled("Drag: orbit  Right drag: pan  Wheel: zoom");
            ui.text_disabled("Shift+C: reset camera  Esc: quit");
        });

    toggled
}
