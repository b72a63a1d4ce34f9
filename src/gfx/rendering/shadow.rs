//! Sun shadow map
//!
//! A depth-only pass renders shadow casters from the point light using the
//! light-space matrix in the globals. The lit pipelines then read the map
//! through a comparison sampler at group 3.

use wgpu::{BindGroup, BindGroupLayout, CommandEncoder, Device, RenderPipeline};

use crate::gfx::{
    resources::texture_resource::TextureResource,
    scene::{
        object::{DrawObject, Mesh, Object},
        scene::Scene,
        vertex::Vertex3D,
    },
};
use crate::wgpu_utils::{
    binding_types, BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc,
};

use super::pipeline_manager::{PipelineConfig, PipelineManager};

pub const SHADOW_PIPELINE: &str = "Shadow";
const SHADOW_SHADER: &str = "shadow";

/// Depth map rendered from the sun plus the bind group sampling it
pub struct ShadowMap {
    map: TextureResource,
    layout: BindGroupLayoutWithDesc,
    bind_group: BindGroup,
}

impl ShadowMap {
    pub fn new(device: &Device, size: u32) -> Self {
        let map = TextureResource::create_shadow_map(device, size);
        let layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::depth_texture_2d())
            .next_binding_fragment(binding_types::sampler(
                wgpu::SamplerBindingType::Comparison,
            ))
            .create(device, "Shadow Bind Group");
        let bind_group = BindGroupBuilder::new(&layout)
            .texture(&map.view)
            .sampler(&map.sampler)
            .create(device, "Shadow Bind Group");
        log::debug!("Shadow map {}x{}", size, size);

        Self {
            map,
            layout,
            bind_group,
        }
    }

    pub fn layout(&self) -> &BindGroupLayout {
        &self.layout.layout
    }

    pub fn bind_group(&self) -> &BindGroup {
        &self.bind_group
    }

    /// Registers the depth-only caster pipeline
    ///
    /// Both faces are drawn so thin casters never leak light.
    pub fn register_pipeline(
        pipelines: &mut PipelineManager,
        globals_layout: &BindGroupLayout,
        object_layout: &BindGroupLayout,
    ) {
        pipelines.load_shader(SHADOW_SHADER, SHADOW_WGSL);
        pipelines.register_pipeline(
            SHADOW_PIPELINE,
            PipelineConfig::default_with_shader(SHADOW_SHADER)
                .with_label("Shadow Pipeline")
                .with_bind_group_layouts(vec![globals_layout.clone(), object_layout.clone()])
                .with_vertex_layouts(vec![Vertex3D::desc()])
                .with_depth(TextureResource::DEPTH_FORMAT, true)
                .with_depth_bias(2, 2.0)
                .with_cull_mode(None)
                .with_vertex_only(),
        );
    }

    /// Clears the map and draws every caster into it
    pub fn render(
        &self,
        encoder: &mut CommandEncoder,
        pipeline: &RenderPipeline,
        globals: &BindGroup,
        scene: &Scene,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Depth Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.map.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, globals, &[]);
        for (object, mesh) in shadow_casters(scene) {
            if let Some(object_group) = object.bind_group() {
                pass.set_bind_group(1, object_group, &[]);
                pass.draw_mesh(mesh);
            }
        }
    }
}

/// Meshes of visible objects that cast shadows
pub fn shadow_casters(scene: &Scene) -> impl Iterator<Item = (&Object, &Mesh)> + '_ {
    scene
        .objects
        .iter()
        .filter(|o| o.visible && o.cast_shadows)
        .flat_map(|object| object.meshes.iter().map(move |mesh| (object, mesh)))
}

const SHADOW_WGSL: &str = r#"
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

struct ObjectUniform {
    model: mat4x4<f32>,
    highlight: vec4<f32>,
    shadows: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: Globals;

@group(1) @binding(0)
var<uniform> object: ObjectUniform;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return globals.light_view_proj * object.model * vec4<f32>(position, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::generate_sphere;

    #[test]
    fn only_visible_casters_are_drawn() {
        let sphere = generate_sphere(1.0, 8, 6);
        let mut scene = Scene::default();
        scene.add_object(
            Object::new("Earth", vec![Mesh::from_geometry(&sphere)]).with_shadows(true, true),
        );
        scene.add_object(
            Object::new("Clouds", vec![Mesh::from_geometry(&sphere)]).with_shadows(false, true),
        );
        scene.add_object(
            Object::new("Moon", vec![Mesh::from_geometry(&sphere)]).with_shadows(true, true),
        );
        if let Some(moon) = scene.object_by_name_mut("Moon") {
            moon.visible = false;
        }

        let names: Vec<&str> = shadow_casters(&scene)
            .map(|(object, _)| object.name.as_str())
            .collect();
        assert_eq!(names, ["Earth"]);
    }
}
