use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalPosition, PhysicalSize},
    event::{DeviceEvent, DeviceId, ElementState, Event, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::config::SceneConfig;
use crate::gfx::{
    camera::{CameraController, CameraManager, OrbitCamera},
    picking::ObjectPicker,
    rendering::RenderEngine,
    scene::Scene,
};
use crate::simulation::{EarthSystem, SimulationManager};
use crate::ui::UiManager;

/// Cursor travel in pixels above which a press and release is a drag
const CLICK_SLOP: f64 = 4.0;

/// Whether a left press at `pressed` and release at `released` is a click
fn is_click(
    pressed: Option<PhysicalPosition<f64>>,
    released: Option<PhysicalPosition<f64>>,
) -> bool {
    match (pressed, released) {
        (Some(pressed), Some(released)) => {
            (released.x - pressed.x).hypot(released.y - pressed.y) <= CLICK_SLOP
        }
        _ => false,
    }
}

type UiPass = fn(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView);

/// Longest frame fed to the simulation, in seconds
const MAX_FRAME_TIME: f32 = 0.25;

pub struct EarthApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    config: SceneConfig,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    ui_manager: Option<UiManager>,
    scene: Scene,
    simulation: SimulationManager,
    picker: ObjectPicker,
    cursor: Option<PhysicalPosition<f64>>,
    press_position: Option<PhysicalPosition<f64>>,
    last_frame: Instant,
}

impl EarthApp {
    /// Creates the event loop and an empty scene sized from `config`
    pub fn new(config: SceneConfig) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new().context("Failed to create event loop")?;

        let (width, height) = config.window_size;
        let camera = OrbitCamera::from_config(&config.camera, width as f32 / height as f32);
        let controller = CameraController::new(config.camera.damping, height as f32);
        let scene = Scene::new(CameraManager::new(camera, controller));

        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                config,
                window: None,
                render_engine: None,
                ui_manager: None,
                scene,
                simulation: SimulationManager::new(),
                picker: ObjectPicker::new((width as f32, height as f32)),
                cursor: None,
                press_position: None,
                last_frame: Instant::now(),
            },
        })
    }

    /// Runs the event loop until the window closes
    pub fn run(mut self) -> anyhow::Result<()> {
        let event_loop = self
            .event_loop
            .take()
            .context("Event loop already consumed")?;
        event_loop.set_control_flow(ControlFlow::Poll);

        event_loop
            .run_app(&mut self.app_state)
            .context("Event loop terminated with an error")?;

        self.app_state.simulation.detach_simulation(&mut self.app_state.scene);
        Ok(())
    }
}

impl AppState {
    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let (width, height) = self.config.window_size;
        let window = event_loop
            .create_window(
                WindowAttributes::default()
                    .with_title("Earth View")
                    .with_inner_size(LogicalSize::new(width, height)),
            )
            .context("Failed to create window")?;
        let window = Arc::new(window);

        let (width, height): (u32, u32) = window.inner_size().into();
        let (width, height) = (width.max(1), height.max(1));
        let render_engine = pollster::block_on(RenderEngine::new(
            window.clone(),
            width,
            height,
            self.config.vsync,
            self.config.lighting.shadow_map_size,
        ))?;

        if self.config.show_ui {
            let mut ui_manager = UiManager::new(
                render_engine.device(),
                render_engine.queue(),
                render_engine.surface_format(),
                &window,
            );
            ui_manager.update_display_size(width, height);
            self.ui_manager = Some(ui_manager);
        }

        self.scene.camera_manager.resize(width, height);
        self.picker.set_viewport(width as f32, height as f32);

        self.simulation.attach_simulation(
            Box::new(EarthSystem::new(self.config.clone())),
            &mut self.scene,
        );

        self.window = Some(window);
        self.render_engine = Some(render_engine);
        self.last_frame = Instant::now();
        Ok(())
    }

    fn ui_wants_mouse(&self) -> bool {
        self.ui_manager.as_ref().is_some_and(|ui| ui.wants_mouse())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Some(render_engine) = self.render_engine.as_mut() {
            render_engine.resize(width, height);
        }
        if let Some(ui_manager) = self.ui_manager.as_mut() {
            ui_manager.update_display_size(width, height);
        }
        self.scene.camera_manager.resize(width, height);
        self.picker.set_viewport(width as f32, height as f32);
    }

    fn pointer_moved(&mut self, position: PhysicalPosition<f64>) {
        self.cursor = Some(position);
        if self.ui_wants_mouse() {
            self.simulation.pointer_left(&mut self.scene);
            return;
        }
        let ray = self.picker.screen_to_ray(
            (position.x as f32, position.y as f32),
            &self.scene.camera_manager.camera,
        );
        self.simulation.pointer_moved(&ray, &mut self.scene);
    }

    fn mouse_input(&mut self, button: MouseButton, state: ElementState) {
        self.scene.camera_manager.process_mouse_button(button, state);
        if button != MouseButton::Left {
            return;
        }

        match state {
            ElementState::Pressed => self.press_position = self.cursor,
            ElementState::Released => {
                let pressed = self.press_position.take();
                let Some(released) = self.cursor else {
                    return;
                };
                if !is_click(pressed, Some(released)) {
                    return;
                }
                let ray = self.picker.screen_to_ray(
                    (released.x as f32, released.y as f32),
                    &self.scene.camera_manager.camera,
                );
                self.simulation.clicked(&ray, &mut self.scene);
            }
        }
    }

    fn keyboard_input(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state == ElementState::Pressed && !event.repeat {
            match event.physical_key {
                PhysicalKey::Code(KeyCode::Escape) => {
                    event_loop.exit();
                    return;
                }
                PhysicalKey::Code(KeyCode::KeyV) => {
                    if let Some(render_engine) = self.render_engine.as_mut() {
                        let vsync = !render_engine.is_vsync();
                        render_engine.set_vsync(vsync);
                    }
                    return;
                }
                _ => {}
            }
        }
        self.scene.camera_manager.process_keyboard_event(event);
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(render_engine)) =
            (self.window.as_ref(), self.render_engine.as_mut())
        else {
            return;
        };

        let now = Instant::now();
        let delta_time = (now - self.last_frame).as_secs_f32().min(MAX_FRAME_TIME);
        self.last_frame = now;

        self.simulation.update(delta_time, &mut self.scene);
        self.scene.update();

        if let Some(ui_manager) = self.ui_manager.as_mut() {
            let simulation = &mut self.simulation;
            let scene = &mut self.scene;
            ui_manager.update_logic(window, |ui| simulation.render_ui(ui, scene));
        }

        render_engine.prepare(&mut self.scene);

        let result = match self.ui_manager.as_mut() {
            Some(ui_manager) => render_engine.render_frame(
                &self.scene,
                Some(
                    |device: &wgpu::Device,
                     queue: &wgpu::Queue,
                     encoder: &mut wgpu::CommandEncoder,
                     view: &wgpu::TextureView| {
                        ui_manager.render_display_only(device, queue, encoder, view);
                    },
                ),
            ),
            None => render_engine.render_frame(&self.scene, None::<UiPass>),
        };

        match result {
            Ok(()) => {}
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of GPU memory, exiting");
                event_loop.exit();
            }
            Err(e) => log::error!("Failed to render frame: {}", e),
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.create_window(event_loop) {
            log::error!("Failed to start renderer: {:#}", e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };

        // UI input first
        if let Some(ui_manager) = self.ui_manager.as_mut() {
            let ui_event: Event<()> = Event::WindowEvent {
                window_id,
                event: event.clone(),
            };
            if ui_manager.handle_input(&window, &ui_event) {
                match event {
                    // Let the camera see releases so a drag never gets stuck
                    WindowEvent::MouseInput {
                        state: ElementState::Released,
                        button,
                        ..
                    } => {
                        self.scene
                            .camera_manager
                            .process_mouse_button(button, ElementState::Released);
                        self.press_position = None;
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        self.cursor = Some(position);
                        self.simulation.pointer_left(&mut self.scene);
                    }
                    _ => {}
                }
                return;
            }
        }

        match event {
            WindowEvent::CursorMoved { position, .. } => self.pointer_moved(position),
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.simulation.pointer_left(&mut self.scene);
            }
            WindowEvent::MouseInput { state, button, .. } => self.mouse_input(button, state),
            WindowEvent::MouseWheel { delta, .. } => {
                self.scene.camera_manager.process_scroll(&delta);
            }
            WindowEvent::KeyboardInput { event, .. } => self.keyboard_input(event_loop, &event),
            WindowEvent::Resized(PhysicalSize { width, height }) => self.resize(width, height),
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if self.ui_wants_mouse() {
            return;
        }
        self.scene.camera_manager.process_event(&event);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64) -> Option<PhysicalPosition<f64>> {
        Some(PhysicalPosition::new(x, y))
    }

    #[test]
    fn small_cursor_travel_still_clicks() {
        assert!(is_click(at(100.0, 100.0), at(100.0, 100.0)));
        assert!(is_click(at(100.0, 100.0), at(104.0, 100.0)));
        assert!(is_click(at(100.0, 100.0), at(102.0, 102.0)));
    }

    #[test]
    fn drags_do_not_click() {
        assert!(!is_click(at(100.0, 100.0), at(105.0, 100.0)));
        assert!(!is_click(at(100.0, 100.0), at(100.0, 140.0)));
    }

    #[test]
    fn release_without_press_does_not_click() {
        assert!(!is_click(None, at(100.0, 100.0)));
        assert!(!is_click(at(100.0, 100.0), None));
    }
}
