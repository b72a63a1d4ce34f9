//! Global uniform bindings for camera and scene lighting
//!
//! Bound to slot 0 in every render pipeline. Also carries the sun's
//! light-space matrix used to render and sample the shadow map.

use cgmath::{
    perspective, EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3,
};

use crate::{
    config::LightingConfig,
    gfx::camera::{camera_utils::CameraUniform, orbit_camera::OPENGL_TO_WGPU_MATRIX},
    wgpu_utils::{
        binding_types, BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc,
        UniformBuffer,
    },
};

/// Global uniform buffer content
///
/// MUST match the `Globals` struct in the shaders exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUBOContent {
    view_proj: [[f32; 4]; 4],
    view_position: [f32; 4],
    camera_right: [f32; 4],
    camera_up: [f32; 4],
    ambient: [f32; 4],
    /// Unit vector pointing towards the light
    directional_direction: [f32; 4],
    directional_color: [f32; 4],
    /// xyz position, w range (0 = unlimited)
    point_position: [f32; 4],
    /// rgb colour times intensity, w decay exponent
    point_color: [f32; 4],
    /// World to shadow map clip space
    light_view_proj: [[f32; 4]; 4],
}

/// Type alias for the global uniform buffer
pub type GlobalUBO = UniformBuffer<GlobalUBOContent>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Light sits here and shines towards the origin
    pub position: Vector3<f32>,
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vector3<f32>,
    pub color: [f32; 3],
    pub intensity: f32,
    pub range: f32,
    pub decay: f32,
}

impl PointLight {
    /// Intensity scale at `distance`: `(1 - d / range)^decay`, clamped
    pub fn attenuation(&self, distance: f32) -> f32 {
        if self.range <= 0.0 {
            return 1.0;
        }
        (1.0 - distance / self.range).clamp(0.0, 1.0).powf(self.decay)
    }
}

/// Closest shadow map near plane
const SHADOW_MIN_NEAR: f32 = 0.05;

/// Ambient, one directional and one point light
///
/// The point light casts shadows onto everything within `shadow_radius` of
/// `shadow_target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightRig {
    pub ambient: [f32; 3],
    pub directional: DirectionalLight,
    pub point: PointLight,
    pub shadow_target: Vector3<f32>,
    pub shadow_radius: f32,
}

impl LightRig {
    /// Builds the rig with the point light placed at `point_position`
    pub fn from_config(config: &LightingConfig, point_position: Vector3<f32>) -> Self {
        Self {
            ambient: config.ambient_color,
            directional: DirectionalLight {
                position: config.directional_position.into(),
                color: config.directional_color,
                intensity: config.directional_intensity,
            },
            point: PointLight {
                position: point_position,
                color: config.sunlight_color,
                intensity: config.sunlight_intensity,
                range: config.sunlight_range,
                decay: config.sunlight_decay,
            },
            shadow_target: Vector3::new(0.0, 0.0, 0.0),
            shadow_radius: config.shadow_radius,
        }
    }

    /// Perspective view from the point light that just encloses the shadow
    /// sphere, mapped to wgpu clip space
    ///
    /// Identity when the light sits on the target.
    pub fn shadow_view_proj(&self) -> Matrix4<f32> {
        let eye = self.point.position;
        let to_target = self.shadow_target - eye;
        let distance = to_target.magnitude();
        if distance <= f32::EPSILON {
            return Matrix4::identity();
        }

        let up = if to_target.normalize().y.abs() > 0.99 {
            Vector3::unit_z()
        } else {
            Vector3::unit_y()
        };
        let view = Matrix4::look_at_rh(
            Point3::from_vec(eye),
            Point3::from_vec(self.shadow_target),
            up,
        );

        let half_angle = (self.shadow_radius / distance).min(0.99).asin();
        let near = (distance - self.shadow_radius).max(SHADOW_MIN_NEAR);
        let far = distance + self.shadow_radius;
        OPENGL_TO_WGPU_MATRIX * perspective(Rad(2.0 * half_angle), 1.0, near, far) * view
    }
}

impl Default for LightRig {
    fn default() -> Self {
        Self::from_config(&LightingConfig::default(), Vector3::new(8.0, 0.0, 0.0))
    }
}

fn scaled(color: [f32; 3], intensity: f32, w: f32) -> [f32; 4] {
    [color[0] * intensity, color[1] * intensity, color[2] * intensity, w]
}

impl GlobalUBOContent {
    pub fn new(camera: &CameraUniform, lights: &LightRig) -> Self {
        let to_light = if lights.directional.position.magnitude2() > 0.0 {
            lights.directional.position.normalize()
        } else {
            Vector3::unit_y()
        };
        let point = &lights.point;

        Self {
            view_proj: camera.view_proj,
            view_position: camera.view_position,
            camera_right: camera.right,
            camera_up: camera.up,
            ambient: scaled(lights.ambient, 1.0, 0.0),
            directional_direction: [to_light.x, to_light.y, to_light.z, 0.0],
            directional_color: scaled(
                lights.directional.color,
                lights.directional.intensity,
                0.0,
            ),
            point_position: [point.position.x, point.position.y, point.position.z, point.range],
            point_color: scaled(point.color, point.intensity, point.decay),
            light_view_proj: lights.shadow_view_proj().into(),
        }
    }
}

/// Writes this frame's camera and lights
pub fn update_global_ubo(
    ubo: &mut GlobalUBO,
    queue: &wgpu::Queue,
    camera: &CameraUniform,
    lights: &LightRig,
) {
    ubo.update_content(queue, GlobalUBOContent::new(camera, lights));
}

/// Bind group layout and bind group for the global uniforms
pub struct GlobalBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: Option<wgpu::BindGroup>,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Globals Bind Group");

        GlobalBindings {
            bind_group_layout,
            bind_group: None,
        }
    }

    pub fn create_bind_group(&mut self, device: &wgpu::Device, ubo: &GlobalUBO) {
        self.bind_group = Some(
            BindGroupBuilder::new(&self.bind_group_layout)
                .resource(ubo.binding_resource())
                .create(device, "Global Bind Group"),
        );
    }

    pub fn bind_group_layouts(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_groups(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<GlobalUBOContent>(), 256);
    }

    fn shadow_clip(rig: &LightRig, point: Vector3<f32>) -> Vector3<f32> {
        let clip = rig.shadow_view_proj() * point.extend(1.0);
        clip.truncate() / clip.w
    }

    #[test]
    fn shadow_target_lands_in_the_middle_of_the_map() {
        let rig = LightRig::default();
        let center = shadow_clip(&rig, Vector3::new(0.0, 0.0, 0.0));
        assert!(center.x.abs() < 1e-5 && center.y.abs() < 1e-5);
        assert!(center.z > 0.0 && center.z < 1.0);
    }

    #[test]
    fn shadow_frustum_covers_the_moon_orbit() {
        let rig = LightRig::default();
        for point in [
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 3.27),
            Vector3::new(-3.0, 0.0, 0.0),
            Vector3::new(0.0, 3.3, 0.0),
        ] {
            let ndc = shadow_clip(&rig, point);
            assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0, "{point:?} -> {ndc:?}");
            assert!(ndc.z >= 0.0 && ndc.z <= 1.0, "{point:?} -> {ndc:?}");
        }

        let far_off = shadow_clip(&rig, Vector3::new(0.0, 6.0, 0.0));
        assert!(far_off.y > 1.0);
    }

    #[test]
    fn moon_between_sun_and_earth_is_nearer_to_the_light() {
        let rig = LightRig::default();
        let moon = shadow_clip(&rig, Vector3::new(3.0, 0.0, 0.0));
        let earth_day_side = shadow_clip(&rig, Vector3::new(2.0, 0.0, 0.0));
        assert!(moon.z < earth_day_side.z);
        assert!(moon.x.abs() < 1e-5 && earth_day_side.x.abs() < 1e-5);
    }

    #[test]
    fn light_on_the_target_gives_identity() {
        let mut rig = LightRig::default();
        rig.point.position = rig.shadow_target;
        assert_eq!(rig.shadow_view_proj(), Matrix4::identity());
    }

    #[test]
    fn sunlight_barely_fades_across_the_scene() {
        let rig = LightRig::default();
        // Earth's surface is about 6 units from the sun
        let near = rig.point.attenuation(6.0);
        assert!(near > 0.98 && near < 1.0);
        assert_eq!(rig.point.attenuation(2000.0), 0.0);
    }

    #[test]
    fn directional_light_points_towards_its_position() {
        let camera = CameraUniform::new();
        let content = GlobalUBOContent::new(&camera, &LightRig::default());
        let expected = Vector3::new(5.0f32, 3.0, 5.0).normalize();

        assert!((content.directional_direction[0] - expected.x).abs() < 1e-6);
        assert!((content.directional_direction[1] - expected.y).abs() < 1e-6);
        assert_eq!(content.point_position, [8.0, 0.0, 0.0, 1000.0]);
        assert_eq!(content.point_color[3], 2.0);
    }
}
