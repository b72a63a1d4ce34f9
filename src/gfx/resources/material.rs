//! Material system for Phong shading
//!
//! Materials are stored in [`MaterialManager`] and referenced by name from
//! objects and meshes. Each material owns its uniform buffer and bind group;
//! the bind group is rebuilt whenever one of its textures finishes loading.

use std::collections::HashMap;
use wgpu::Device;

use crate::wgpu_utils::{
    binding_types, BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc,
    UniformBuffer,
};

use super::texture_library::TextureLibrary;

/// Material ID for referencing materials
pub type MaterialId = String;

/// GPU uniform data for materials. MUST match `MaterialUniform` in phong.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    /// rgb colour, a opacity
    pub color: [f32; 4],
    /// rgb specular colour, a shininess
    pub specular: [f32; 4],
    /// rgb emissive colour premultiplied by intensity, a bump scale
    pub emissive: [f32; 4],
    /// has map, has bump map, has emissive map, lit
    pub flags: [u32; 4],
}

type MaterialUBO = UniformBuffer<MaterialUniform>;

/// Shared layout of every material bind group (group 2)
pub struct MaterialBindings;

impl MaterialBindings {
    pub fn create_layout(device: &Device) -> BindGroupLayoutWithDesc {
        BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::texture_2d())
            .create(device, "Material Bind Group")
    }
}

/// Phong material
///
/// Texture slots hold keys into the [`TextureLibrary`]; a slot only counts
/// as present once its texture is on the GPU, and samples black until then.
pub struct Material {
    pub name: String,
    pub color: [f32; 3],
    pub opacity: f32,
    pub transparent: bool,
    pub depth_write: bool,
    pub specular: [f32; 3],
    pub shininess: f32,
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
    pub bump_scale: f32,
    /// Unlit materials output colour plus emission only
    pub lit: bool,
    pub map: Option<String>,
    pub bump_map: Option<String>,
    pub emissive_map: Option<String>,

    material_ubo: Option<MaterialUBO>,
    bind_group: Option<wgpu::BindGroup>,
    bound_textures: [bool; 3],
}

impl Default for Material {
    fn default() -> Self {
        Self::new("default")
    }
}

impl Material {
    /// White, opaque, lit, with a faint specular highlight
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            color: [1.0, 1.0, 1.0],
            opacity: 1.0,
            transparent: false,
            depth_write: true,
            specular: [0.067, 0.067, 0.067],
            shininess: 30.0,
            emissive: [0.0, 0.0, 0.0],
            emissive_intensity: 1.0,
            bump_scale: 1.0,
            lit: true,
            map: None,
            bump_map: None,
            emissive_map: None,
            material_ubo: None,
            bind_group: None,
            bound_textures: [false; 3],
        }
    }

    /// Purely diffuse surface
    pub fn matte(name: &str) -> Self {
        Self {
            specular: [0.0, 0.0, 0.0],
            shininess: 0.0,
            ..Self::new(name)
        }
    }

    pub fn with_color(mut self, color: [f32; 3]) -> Self {
        self.color = color;
        self
    }

    pub fn with_map(mut self, key: &str) -> Self {
        self.map = Some(key.to_string());
        self
    }

    pub fn with_bump_map(mut self, key: &str, scale: f32) -> Self {
        self.bump_map = Some(key.to_string());
        self.bump_scale = scale;
        self
    }

    pub fn with_specular(mut self, specular: [f32; 3], shininess: f32) -> Self {
        self.specular = specular;
        self.shininess = shininess;
        self
    }

    pub fn with_emissive(mut self, emissive: [f32; 3], intensity: f32) -> Self {
        self.emissive = emissive;
        self.emissive_intensity = intensity;
        self
    }

    pub fn with_emissive_map(mut self, key: &str) -> Self {
        self.emissive_map = Some(key.to_string());
        self
    }

    /// Blended, with depth writes disabled so objects behind stay visible
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self.transparent = self.opacity < 1.0;
        self.depth_write = !self.transparent;
        self
    }

    pub fn is_blended(&self) -> bool {
        self.transparent
    }

    /// Uniform block for the current texture state
    ///
    /// A named colour or emissive map that is not on the GPU yet (or failed to
    /// load) counts as black, so an unloaded night map emits nothing.
    pub fn uniform(&self, textures: &TextureLibrary) -> MaterialUniform {
        let ready = self.texture_readiness(textures);
        let color_scale = if self.map.is_some() && !ready[0] { 0.0 } else { 1.0 };
        let emissive_scale = if self.emissive_map.is_some() && !ready[2] {
            0.0
        } else {
            self.emissive_intensity
        };
        let color = self.color.map(|c| c * color_scale);
        let emissive = self.emissive.map(|c| c * emissive_scale);
        MaterialUniform {
            color: [color[0], color[1], color[2], self.opacity],
            specular: [self.specular[0], self.specular[1], self.specular[2], self.shininess],
            emissive: [emissive[0], emissive[1], emissive[2], self.bump_scale],
            flags: [ready[0] as u32, ready[1] as u32, ready[2] as u32, self.lit as u32],
        }
    }

    fn texture_readiness(&self, textures: &TextureLibrary) -> [bool; 3] {
        let ready = |slot: &Option<String>| slot.as_deref().is_some_and(|k| textures.is_ready(k));
        [
            ready(&self.map),
            ready(&self.bump_map),
            ready(&self.emissive_map),
        ]
    }

    /// Creates or refreshes the uniform buffer and bind group
    pub fn update_gpu_resources(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        layout: &BindGroupLayoutWithDesc,
        textures: &TextureLibrary,
    ) {
        let uniform = self.uniform(textures);
        let readiness = self.texture_readiness(textures);
        let ubo = self
            .material_ubo
            .get_or_insert_with(|| MaterialUBO::new_with_data(device, &uniform));
        ubo.update_content(queue, uniform);

        if self.bind_group.is_some() && self.bound_textures == readiness {
            return;
        }

        let (Some(map), Some(bump), Some(emissive), Some(fallback)) = (
            textures.resource(self.map.as_deref()),
            textures.resource(self.bump_map.as_deref()),
            textures.resource(self.emissive_map.as_deref()),
            textures.resource(None),
        ) else {
            return;
        };

        self.bind_group = Some(
            BindGroupBuilder::new(layout)
                .resource(ubo.binding_resource())
                .sampler(&fallback.sampler)
                .texture(&map.view)
                .texture(&bump.view)
                .texture(&emissive.view)
                .create(device, &format!("{} Material Bind Group", self.name)),
        );
        self.bound_textures = readiness;
        log::debug!("Material '{}' bound with textures {:?}", self.name, readiness);
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }
}

/// Manages all materials in the engine
pub struct MaterialManager {
    materials: HashMap<MaterialId, Material>,
    default_material: Material,
}

impl Default for MaterialManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialManager {
    pub fn new() -> Self {
        Self {
            materials: HashMap::new(),
            default_material: Material::default(),
        }
    }

    /// Adds a material, replacing any with the same name
    pub fn add_material(&mut self, material: Material) {
        self.materials.insert(material.name.clone(), material);
    }

    pub fn get_material(&self, id: &str) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn get_material_mut(&mut self, id: &str) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    pub fn get_default_material(&self) -> &Material {
        &self.default_material
    }

    /// Material for an object or mesh, falling back to the default
    pub fn get_material_for_object(&self, material_id: Option<&MaterialId>) -> &Material {
        material_id
            .and_then(|id| self.get_material(id))
            .unwrap_or(&self.default_material)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn update_all_gpu_resources(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        layout: &BindGroupLayoutWithDesc,
        textures: &TextureLibrary,
    ) {
        self.default_material
            .update_gpu_resources(device, queue, layout, textures);
        for material in self.materials.values_mut() {
            material.update_gpu_resources(device, queue, layout, textures);
        }
    }
}
