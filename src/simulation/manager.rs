//! Simulation manager
//!
//! Owns the attached simulation, forwards frame time and pointer rays to it
//! and draws the shared play/pause/reset controls.

use super::traits::Simulation;
use crate::gfx::{picking::Ray, scene::Scene};
use imgui::Ui;

/// Runs at most one simulation against the scene
pub struct SimulationManager {
    simulation: Option<Box<dyn Simulation>>,
    is_paused: bool,
}

impl Default for SimulationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationManager {
    pub fn new() -> Self {
        Self {
            simulation: None,
            is_paused: false,
        }
    }

    /// Attach a simulation, cleaning up the previous one
    pub fn attach_simulation(&mut self, mut simulation: Box<dyn Simulation>, scene: &mut Scene) {
        if let Some(mut old_sim) = self.simulation.take() {
            old_sim.cleanup(scene);
        }

        simulation.initialize(scene);
        log::info!("Attached simulation '{}'", simulation.name());
        self.simulation = Some(simulation);
        self.is_paused = false;
    }

    pub fn detach_simulation(&mut self, scene: &mut Scene) {
        if let Some(mut sim) = self.simulation.take() {
            sim.cleanup(scene);
        }
    }

    /// Update simulation (called every frame)
    ///
    /// A paused simulation still receives zero-length updates so it can keep
    /// absorbing loaded assets.
    pub fn update(&mut self, delta_time: f32, scene: &mut Scene) {
        if let Some(simulation) = &mut self.simulation {
            let delta_time = if self.is_paused { 0.0 } else { delta_time };
            simulation.update(delta_time, scene);
        }
    }

    pub fn pointer_moved(&mut self, ray: &Ray, scene: &mut Scene) {
        if let Some(simulation) = &mut self.simulation {
            simulation.on_pointer_move(ray, scene);
        }
    }

    pub fn pointer_left(&mut self, scene: &mut Scene) {
        if let Some(simulation) = &mut self.simulation {
            simulation.on_pointer_leave(scene);
        }
    }

    pub fn clicked(&mut self, ray: &Ray, scene: &mut Scene) {
        if let Some(simulation) = &mut self.simulation {
            simulation.on_click(ray, scene);
        }
    }

    /// Reset the attached simulation
    pub fn reset(&mut self, scene: &mut Scene) {
        if let Some(simulation) = &mut self.simulation {
            simulation.reset(scene);
        }
    }

    /// Render simulation UI controls
    pub fn render_ui(&mut self, ui: &Ui, scene: &mut Scene) {
        let display_size = ui.io().display_size;
        let panel_width = 260.0;
        let panel_x = display_size[0] - panel_width - 20.0;

        let Some(simulation) = &mut self.simulation else {
            return;
        };

        let mut toggle_pause = false;
        let mut reset = false;
        ui.window("Simulation Control")
            .size([panel_width, 100.0], imgui::Condition::FirstUseEver)
            .position([panel_x, 20.0], imgui::Condition::FirstUseEver)
            .build(|| {
                ui.text(format!("Simulation: {}", simulation.name()));
                ui.separator();

                toggle_pause = ui.button(if self.is_paused { "Play" } else { "Pause" });
                ui.same_line();
                reset = ui.button("Reset");
            });

        if toggle_pause {
            self.is_paused = !self.is_paused;
            simulation.set_running(!self.is_paused);
        }
        if reset {
            simulation.reset(scene);
        }

        simulation.render_ui(ui, scene);
    }

    pub fn current_simulation_name(&self) -> Option<&str> {
        self.simulation.as_ref().map(|s| s.name())
    }

    /// `true` if a simulation exists and is not paused
    pub fn is_running(&self) -> bool {
        !self.is_paused && self.simulation.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.is_paused = paused;
        if let Some(simulation) = &mut self.simulation {
            simulation.set_running(!paused);
        }
    }

    pub fn has_simulation(&self) -> bool {
        self.simulation.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Calls {
        initialized: bool,
        elapsed: f32,
        pointer_moves: u32,
        pointer_leaves: u32,
        clicks: u32,
        resets: u32,
        cleaned_up: bool,
    }

    struct Recorder {
        calls: Rc<RefCell<Calls>>,
        running: bool,
    }

    impl Simulation for Recorder {
        fn initialize(&mut self, _scene: &mut Scene) {
            self.calls.borrow_mut().initialized = true;
        }
        fn update(&mut self, delta_time: f32, _scene: &mut Scene) {
            self.calls.borrow_mut().elapsed += delta_time;
        }
        fn on_pointer_move(&mut self, _ray: &Ray, _scene: &mut Scene) {
            self.calls.borrow_mut().pointer_moves += 1;
        }
        fn on_pointer_leave(&mut self, _scene: &mut Scene) {
            self.calls.borrow_mut().pointer_leaves += 1;
        }
        fn on_click(&mut self, _ray: &Ray, _scene: &mut Scene) {
            self.calls.borrow_mut().clicks += 1;
        }
        fn render_ui(&mut self, _ui: &Ui, _scene: &mut Scene) {}
        fn name(&self) -> &str {
            "Recorder"
        }
        fn is_running(&self) -> bool {
            self.running
        }
        fn set_running(&mut self, running: bool) {
            self.running = running;
        }
        fn reset(&mut self, _scene: &mut Scene) {
            self.calls.borrow_mut().resets += 1;
        }
        fn cleanup(&mut self, _scene: &mut Scene) {
            self.calls.borrow_mut().cleaned_up = true;
        }
    }

    fn attached() -> (SimulationManager, Scene, Rc<RefCell<Calls>>) {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let mut scene = Scene::default();
        let mut manager = SimulationManager::new();
        manager.attach_simulation(
            Box::new(Recorder {
                calls: calls.clone(),
                running: true,
            }),
            &mut scene,
        );
        (manager, scene, calls)
    }

    fn ray() -> Ray {
        Ray::new(cgmath::Vector3::new(0.0, 0.0, 5.0), cgmath::Vector3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn attach_initializes_and_forwards_events() {
        let (mut manager, mut scene, calls) = attached();
        assert!(calls.borrow().initialized);
        assert_eq!(manager.current_simulation_name(), Some("Recorder"));

        manager.pointer_moved(&ray(), &mut scene);
        manager.pointer_left(&mut scene);
        manager.clicked(&ray(), &mut scene);
        manager.reset(&mut scene);
        assert_eq!(calls.borrow().pointer_moves, 1);
        assert_eq!(calls.borrow().pointer_leaves, 1);
        assert_eq!(calls.borrow().clicks, 1);
        assert_eq!(calls.borrow().resets, 1);
    }

    #[test]
    fn pause_freezes_delta_time() {
        let (mut manager, mut scene, calls) = attached();
        manager.update(0.5, &mut scene);
        assert_eq!(calls.borrow().elapsed, 0.5);

        manager.set_paused(true);
        manager.update(0.5, &mut scene);
        assert_eq!(calls.borrow().elapsed, 0.5);
        assert!(!manager.is_running());

        manager.set_paused(false);
        manager.update(0.25, &mut scene);
        assert_eq!(calls.borrow().elapsed, 0.75);
    }

    #[test]
    fn detach_cleans_up() {
        let (mut manager, mut scene, calls) = attached();
        manager.detach_simulation(&mut scene);
        assert!(calls.borrow().cleaned_up);
        assert!(!manager.has_simulation());
    }
}
