use std::f32::consts::TAU;

use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, KeyEvent, MouseButton, MouseScrollDelta},
    keyboard::{KeyCode, PhysicalKey},
};

use super::orbit_camera::OrbitCamera;

/// Damped orbit controls
///
/// Drag input accumulates into pending rotation and pan; every [`update`]
/// applies `damping` of what is pending and keeps the rest, so the camera
/// glides to a stop after the mouse is released. Zoom is applied at once.
///
/// Left drag rotates, right drag or shift + left drag pans, the wheel zooms.
///
/// [`update`]: CameraController::update
pub struct CameraController {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub damping: f32,
    viewport_height: f32,
    pending_yaw: f32,
    pending_pitch: f32,
    pending_pan: (f32, f32),
    is_left_pressed: bool,
    is_right_pressed: bool,
    is_shift_held: bool,
}

const SETTLED: f32 = 1e-6;

impl CameraController {
    pub fn new(damping: f32, viewport_height: f32) -> Self {
        Self {
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            damping: damping.clamp(0.0, 1.0),
            viewport_height: viewport_height.max(1.0),
            pending_yaw: 0.0,
            pending_pitch: 0.0,
            pending_pan: (0.0, 0.0),
            is_left_pressed: false,
            is_right_pressed: false,
            is_shift_held: false,
        }
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        self.viewport_height = height.max(1.0);
    }

    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        let pressed = state == ElementState::Pressed;
        match button {
            MouseButton::Left => self.is_left_pressed = pressed,
            MouseButton::Right => self.is_right_pressed = pressed,
            _ => (),
        }
    }

    /// Accumulates drag and applies wheel zoom
    pub fn process_events(&mut self, event: &DeviceEvent, camera: &OrbitCamera) {
        match event {
            DeviceEvent::MouseMotion { delta } => {
                let (dx, dy) = (delta.0 as f32, delta.1 as f32);
                if self.is_panning() {
                    let units = camera.world_units_per_pixel(self.viewport_height) * self.pan_speed;
                    self.pending_pan.0 -= dx * units;
                    self.pending_pan.1 += dy * units;
                } else if self.is_rotating() {
                    let per_pixel = TAU / self.viewport_height * self.rotate_speed;
                    self.pending_yaw -= dx * per_pixel;
                    self.pending_pitch += dy * per_pixel;
                }
            }
            _ => (),
        }
    }

    /// Zoom step for one wheel event, applied to `camera` immediately
    pub fn process_scroll(&mut self, delta: &MouseScrollDelta, camera: &mut OrbitCamera) {
        let scroll = match delta {
            MouseScrollDelta::LineDelta(_, y) => *y,
            MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => *y as f32 / 50.0,
        };
        if scroll == 0.0 {
            return;
        }
        let step = 0.95f32.powf(self.zoom_speed * scroll.abs());
        camera.scale_distance(if scroll > 0.0 { step } else { 1.0 / step });
    }

    pub fn process_keyed_events(&mut self, event: &KeyEvent, camera: &mut OrbitCamera) {
        match event {
            KeyEvent {
                physical_key: PhysicalKey::Code(KeyCode::ShiftLeft | KeyCode::ShiftRight),
                state,
                ..
            } => {
                self.is_shift_held = *state == ElementState::Pressed;
            }
            KeyEvent {
                physical_key: PhysicalKey::Code(KeyCode::KeyC),
                state: ElementState::Pressed,
                ..
            } => {
                if self.is_shift_held {
                    log::info!("Resetting camera to its start position");
                    self.stop();
                    camera.reset_to_default();
                }
            }
            _ => (),
        }
    }

    /// Applies one damped step of pending motion
    pub fn update(&mut self, camera: &mut OrbitCamera) {
        if self.is_settled() {
            return;
        }

        let keep = 1.0 - self.damping;
        camera.add_yaw(self.pending_yaw * self.damping);
        camera.add_pitch(self.pending_pitch * self.damping);
        camera.pan(
            self.pending_pan.0 * self.damping,
            self.pending_pan.1 * self.damping,
        );

        self.pending_yaw *= keep;
        self.pending_pitch *= keep;
        self.pending_pan.0 *= keep;
        self.pending_pan.1 *= keep;
        if self.is_settled() {
            self.stop();
        }
    }

    pub fn stop(&mut self) {
        self.pending_yaw = 0.0;
        self.pending_pitch = 0.0;
        self.pending_pan = (0.0, 0.0);
    }

    fn is_settled(&self) -> bool {
        self.pending_yaw.abs() < SETTLED
            && self.pending_pitch.abs() < SETTLED
            && self.pending_pan.0.abs() < SETTLED
            && self.pending_pan.1.abs() < SETTLED
    }

    pub fn is_panning(&self) -> bool {
        self.is_right_pressed || (self.is_left_pressed && self.is_shift_held)
    }

    pub fn is_rotating(&self) -> bool {
        self.is_left_pressed && !self.is_shift_held
    }
}
