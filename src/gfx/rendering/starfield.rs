//! Starfield rendering
//!
//! Stars are camera-facing squares drawn with one instanced draw call. Each
//! instance carries its centre and world-space edge length; the quad corners
//! come from the vertex index, so no vertex buffer is needed besides the
//! instance buffer.
//!
//! Sizes follow perspective: a star of `size` covers
//! `size * viewport_height / (2 * depth)` pixels, which is an edge of
//! `size * tan(fovy / 2)` in world units.

use bytemuck::{Pod, Zeroable};
use cgmath::Rad;
use rand::{rngs::StdRng, Rng, SeedableRng};
use wgpu::util::DeviceExt;
use wgpu::{BindGroup, Buffer, Device, RenderPass, RenderPipeline};

use super::pipeline_manager::{PipelineConfig, PipelineManager};

pub const STARFIELD_PIPELINE: &str = "Starfield";
const STARFIELD_SHADER: &str = "starfield";

/// Star positions scattered uniformly in a cube around the origin
#[derive(Debug, Clone, PartialEq)]
pub struct StarfieldData {
    pub positions: Vec<[f32; 3]>,
    pub size: f32,
}

impl StarfieldData {
    /// Scatters `count` stars in a cube of edge `spread`
    ///
    /// The same `seed` always yields the same field; `None` seeds from the OS.
    pub fn generate(count: u32, spread: f32, size: f32, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let half = spread.abs() / 2.0;

        let positions = (0..count)
            .map(|_| {
                if half == 0.0 {
                    return [0.0; 3];
                }
                [
                    rng.random_range(-half..half),
                    rng.random_range(-half..half),
                    rng.random_range(-half..half),
                ]
            })
            .collect();

        Self { positions, size }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Instance data for a camera with vertical field of view `fovy`
    pub fn instances(&self, fovy: Rad<f32>) -> Vec<StarInstance> {
        let edge = self.size * (fovy.0 / 2.0).tan();
        self.positions
            .iter()
            .map(|p| StarInstance {
                position_size: [p[0], p[1], p[2], edge],
            })
            .collect()
    }
}

/// Per-star instance data
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct StarInstance {
    /// xyz centre, w edge length in world units
    pub position_size: [f32; 4],
}

impl StarInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x4];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<StarInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// GPU side of the starfield
pub struct StarfieldRenderer {
    instance_buffer: Option<Buffer>,
    instance_count: u32,
}

impl Default for StarfieldRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl StarfieldRenderer {
    pub fn new() -> Self {
        Self {
            instance_buffer: None,
            instance_count: 0,
        }
    }

    /// Registers the starfield shader and pipeline with `pipelines`
    ///
    /// Stars only need the global bind group. They are depth tested so the
    /// planets hide them, and never write depth.
    pub fn register_pipeline(pipelines: &mut PipelineManager, base: &PipelineConfig) {
        pipelines.load_shader(STARFIELD_SHADER, STARFIELD_WGSL);
        let mut config = base
            .clone()
            .with_label("Starfield Pipeline")
            .with_shader(STARFIELD_SHADER)
            .with_vertex_layouts(vec![StarInstance::desc()])
            .with_cull_mode(None);
        config.bind_group_layouts.truncate(1);
        config.depth_write = false;
        pipelines.register_pipeline(STARFIELD_PIPELINE, config);
    }

    /// Replaces the instance buffer with `data`
    pub fn upload(&mut self, device: &Device, data: &StarfieldData, fovy: Rad<f32>) {
        let instances = data.instances(fovy);
        self.instance_count = instances.len() as u32;
        self.instance_buffer = (!instances.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Starfield Instance Buffer"),
                contents: bytemuck::cast_slice(&instances),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });
        log::debug!("Uploaded {} stars", self.instance_count);
    }

    pub fn render<'a>(
        &'a self,
        render_pass: &mut RenderPass<'a>,
        pipeline: &'a RenderPipeline,
        global_bind_group: &'a BindGroup,
    ) {
        let Some(instances) = &self.instance_buffer else {
            return;
        };

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, global_bind_group, &[]);
        render_pass.set_vertex_buffer(0, instances.slice(..));
        render_pass.draw(0..6, 0..self.instance_count);
    }
}

const STARFIELD_WGSL: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    view_position: vec4<f32>,
    camera_right: vec4<f32>,
    camera_up: vec4<f32>,
    ambient: vec4<f32>,
    directional_direction: vec4<f32>,
    directional_color: vec4<f32>,
    point_position: vec4<f32>,
    point_color: vec4<f32>,
    light_view_proj: mat4x4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: Globals;

struct InstanceInput {
    @location(0) position_size: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32, star: InstanceInput) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-0.5, -0.5),
        vec2<f32>( 0.5, -0.5),
        vec2<f32>( 0.5,  0.5),
        vec2<f32>(-0.5, -0.5),
        vec2<f32>( 0.5,  0.5),
        vec2<f32>(-0.5,  0.5),
    );
    let corner = corners[vertex_index] * star.position_size.w;
    let world = star.position_size.xyz
        + globals.camera_right.xyz * corner.x
        + globals.camera_up.xyz * corner.y;

    var out: VertexOutput;
    out.clip_position = globals.view_proj * vec4<f32>(world, 1.0);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Deg;

    #[test]
    fn stars_stay_inside_the_cube() {
        let field = StarfieldData::generate(1000, 200.0, 0.5, Some(42));
        assert_eq!(field.len(), 1000);
        assert!(field
            .positions
            .iter()
            .flatten()
            .all(|c| (-100.0..100.0).contains(c)));
    }

    #[test]
    fn seeded_fields_are_reproducible() {
        let a = StarfieldData::generate(50, 200.0, 0.5, Some(7));
        let b = StarfieldData::generate(50, 200.0, 0.5, Some(7));
        let c = StarfieldData::generate(50, 200.0, 0.5, Some(8));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn empty_and_degenerate_fields() {
        assert!(StarfieldData::generate(0, 200.0, 0.5, Some(1)).is_empty());

        let point = StarfieldData::generate(4, 0.0, 0.5, Some(1));
        assert!(point.positions.iter().all(|p| *p == [0.0; 3]));
    }

    #[test]
    fn instance_edge_matches_perspective_point_size() {
        let field = StarfieldData::generate(2, 200.0, 0.5, Some(3));
        let instances = field.instances(Deg(90.0).into());
        // tan(45°) = 1
        assert!((instances[0].position_size[3] - 0.5).abs() < 1e-6);
        assert_eq!(instances[1].position_size[0], field.positions[1][0]);
    }
}
