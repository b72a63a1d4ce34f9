use super::camera_utils::{Camera, CameraUniform};
use crate::config::CameraConfig;
use cgmath::*;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Camera orbiting `target` on a sphere of radius `distance`, Y up
///
/// `yaw` turns around the Y axis starting from +Z, `pitch` lifts the eye
/// towards +Y.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    pub bounds: OrbitCameraBounds,
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub uniform: CameraUniform,
    home: (f32, f32, f32, Vector3<f32>),
}

impl Camera for OrbitCamera {
    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        let eye = Point3::from_vec(self.eye);
        let target = Point3::from_vec(self.target);
        let view = Matrix4::look_at_rh(eye, target, self.up);
        let proj =
            OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar);
        proj * view
    }
}

impl OrbitCamera {
    pub fn new(distance: f32, pitch: f32, yaw: f32, target: Vector3<f32>, aspect: f32) -> Self {
        let mut camera = Self {
            distance,
            pitch,
            yaw,
            eye: Vector3::zero(), // Will be auto-calculted in `update()` nevertheless.
            target,
            up: Vector3::unit_y(),
            bounds: OrbitCameraBounds::default(),
            aspect,
            fovy: Deg(75.0).into(),
            znear: 0.1,
            zfar: 1000.0,
            uniform: CameraUniform::default(),
            home: (distance, pitch, yaw, target),
        };
        camera.update();
        camera.update_view_proj();
        camera
    }

    /// Camera on the +Z axis looking at the origin
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self::new(config.distance, 0.0, 0.0, Vector3::zero(), aspect);
        camera.fovy = Deg(config.fovy_degrees).into();
        camera.znear = config.znear;
        camera.zfar = config.zfar;
        camera.update_view_proj();
        camera
    }

    /// Returns to the pose the camera was created with
    pub fn reset_to_default(&mut self) {
        let (distance, pitch, yaw, target) = self.home;
        self.distance = distance;
        self.pitch = pitch;
        self.yaw = yaw;
        self.target = target;
        self.update();
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(
            self.bounds.min_distance.unwrap_or(f32::EPSILON),
            self.bounds.max_distance.unwrap_or(f32::MAX),
        );
        self.update();
    }

    /// Multiplies the distance, `< 1` moves closer
    pub fn scale_distance(&mut self, factor: f32) {
        self.set_distance(self.distance * factor);
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(self.bounds.min_pitch, self.bounds.max_pitch);
        self.update();
    }

    pub fn add_pitch(&mut self, delta: f32) {
        self.set_pitch(self.pitch + delta);
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        let mut bounded_yaw = yaw;
        if let Some(min_yaw) = self.bounds.min_yaw {
            bounded_yaw = bounded_yaw.max(min_yaw);
        }
        if let Some(max_yaw) = self.bounds.max_yaw {
            bounded_yaw = bounded_yaw.min(max_yaw);
        }
        self.yaw = bounded_yaw;
        self.update();
    }

    pub fn add_yaw(&mut self, delta: f32) {
        self.set_yaw(self.yaw + delta);
    }

    /// World-space right and up axes of the current view
    pub fn view_axes(&self) -> (Vector3<f32>, Vector3<f32>) {
        let forward = (self.target - self.eye).normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward).normalize();
        (right, up)
    }

    /// Moves target and eye together along the view's right and up axes
    pub fn pan(&mut self, right_amount: f32, up_amount: f32) {
        let (right, up) = self.view_axes();
        self.target += right * right_amount + up * up_amount;
        self.update();
    }

    /// World units spanned by one pixel at the target's depth
    pub fn world_units_per_pixel(&self, viewport_height: f32) -> f32 {
        2.0 * self.distance * (self.fovy / 2.0).tan() / viewport_height.max(1.0)
    }

    /// Updates the camera after changing `distance`, `pitch`, `yaw` or `target`.
    fn update(&mut self) {
        self.eye =
            calculate_cartesian_eye_position(self.pitch, self.yaw, self.distance, self.target);
    }

    pub fn resize_projection(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn update_view_proj(&mut self) {
        let (right, up) = self.view_axes();
        self.uniform.view_position = [self.eye.x, self.eye.y, self.eye.z, 1.0];
        self.uniform.view_proj = self.build_view_projection_matrix().into();
        self.uniform.right = [right.x, right.y, right.z, 0.0];
        self.uniform.up = [up.x, up.y, up.z, 0.0];
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitCameraBounds {
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
    pub min_pitch: f32,
    pub max_pitch: f32,
    pub min_yaw: Option<f32>,
    pub max_yaw: Option<f32>,
}

impl Default for OrbitCameraBounds {
    fn default() -> Self {
        Self {
            min_distance: Some(0.5),
            max_distance: Some(500.0),
            min_pitch: -std::f32::consts::FRAC_PI_2 + 1e-4,
            max_pitch: std::f32::consts::FRAC_PI_2 - 1e-4,
            min_yaw: None,
            max_yaw: None,
        }
    }
}

fn calculate_cartesian_eye_position(
    pitch: f32,
    yaw: f32,
    distance: f32,
    target: Vector3<f32>,
) -> Vector3<f32> {
    Vector3::new(
        distance * yaw.sin() * pitch.cos(),
        distance * pitch.sin(),
        distance * yaw.cos() * pitch.cos(),
    ) + target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_sits_on_positive_z() {
        let camera = OrbitCamera::from_config(&CameraConfig::default(), 1.5);
        assert!((camera.eye - Vector3::new(0.0, 0.0, 5.0)).magnitude() < 1e-5);
        assert_eq!(camera.up, Vector3::unit_y());
        assert!((Deg::from(camera.fovy).0 - 75.0).abs() < 1e-4);
        assert_eq!(camera.uniform.view_position, [0.0, 0.0, 5.0, 1.0]);
    }

    #[test]
    fn view_axes_are_screen_aligned_at_start() {
        let camera = OrbitCamera::from_config(&CameraConfig::default(), 1.0);
        let (right, up) = camera.view_axes();
        assert!((right - Vector3::unit_x()).magnitude() < 1e-5);
        assert!((up - Vector3::unit_y()).magnitude() < 1e-5);
    }

    #[test]
    fn pitch_is_clamped_short_of_the_poles() {
        let mut camera = OrbitCamera::from_config(&CameraConfig::default(), 1.0);
        camera.add_pitch(10.0);
        assert!(camera.pitch < std::f32::consts::FRAC_PI_2);
        assert!(camera.eye.y > 4.99);
    }

    #[test]
    fn pan_moves_target_and_eye_together() {
        let mut camera = OrbitCamera::from_config(&CameraConfig::default(), 1.0);
        camera.pan(1.0, 0.0);
        assert!((camera.target - Vector3::new(1.0, 0.0, 0.0)).magnitude() < 1e-5);
        assert!((camera.eye - Vector3::new(1.0, 0.0, 5.0)).magnitude() < 1e-5);

        camera.reset_to_default();
        assert!(camera.target.magnitude() < 1e-6);
    }
}
