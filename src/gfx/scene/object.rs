use std::ops::Range;

use cgmath::{Matrix4, Rad, SquareMatrix, Vector3, Zero};
use wgpu::util::DeviceExt;
use wgpu::Device;

use crate::gfx::geometry::GeometryData;
use crate::gfx::picking::AABB;
use crate::gfx::resources::material::MaterialId;
use crate::wgpu_utils::{BindGroupBuilder, BindGroupLayoutWithDesc, UniformBuffer};

use super::vertex::Vertex3D;

/// Triangle mesh with CPU data kept for picking and lazily created GPU buffers
pub struct Mesh {
    vertices: Vec<Vertex3D>,
    indices: Vec<u32>,
    bounds: AABB,
    /// Overrides the owning object's material when set
    pub material: Option<MaterialId>,
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex3D>, indices: Vec<u32>) -> Self {
        let bounds = AABB::from_points(vertices.iter().map(|v| Vector3::from(v.position)));
        Self {
            vertices,
            indices,
            bounds,
            material: None,
            vertex_buffer: None,
            index_buffer: None,
        }
    }

    pub fn from_geometry(geometry: &GeometryData) -> Self {
        Self::new(geometry.to_vertices(), geometry.indices.clone())
    }

    pub fn with_material(mut self, material: impl Into<MaterialId>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn vertices(&self) -> &[Vertex3D] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Object-space bounding box
    pub fn bounds(&self) -> &AABB {
        &self.bounds
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vector3<f32>; 3]> + '_ {
        self.indices.chunks_exact(3).map(move |tri| {
            [
                Vector3::from(self.vertices[tri[0] as usize].position),
                Vector3::from(self.vertices[tri[1] as usize].position),
                Vector3::from(self.vertices[tri[2] as usize].position),
            ]
        })
    }

    pub fn is_uploaded(&self) -> bool {
        self.vertex_buffer.is_some() && self.index_buffer.is_some()
    }

    pub fn upload(&mut self, device: &Device, label: &str) {
        self.vertex_buffer = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        }));
        self.index_buffer = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        }));
    }
}

/// Position, Euler rotation (radians, applied X then Y then Z) and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::zero(),
            rotation: Vector3::zero(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Matrix4<f32> {
        let rotation = Matrix4::from_angle_x(Rad(self.rotation.x))
            * Matrix4::from_angle_y(Rad(self.rotation.y))
            * Matrix4::from_angle_z(Rad(self.rotation.z));
        Matrix4::from_translation(self.position)
            * rotation
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

/// Per-object uniform block, bound at group 1
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    /// Replaces the material colour while `w` is 1
    pub highlight: [f32; 4],
    /// x: receives shadows, y: casts shadows
    pub shadows: [f32; 4],
}

impl ObjectUniform {
    /// Diffuse colour the shader uses in place of `material_color`
    pub fn surface_color(&self, material_color: [f32; 3]) -> [f32; 3] {
        if self.highlight[3] > 0.5 {
            [self.highlight[0], self.highlight[1], self.highlight[2]]
        } else {
            material_color
        }
    }

    pub fn receives_shadows(&self) -> bool {
        self.shadows[0] > 0.5
    }
}

fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

pub struct ObjectGpuResources {
    pub uniform: UniformBuffer<ObjectUniform>,
    pub bind_group: wgpu::BindGroup,
}

pub struct Object {
    pub name: String,
    pub meshes: Vec<Mesh>,
    pub transform: Transform,
    pub material: Option<MaterialId>,
    pub visible: bool,
    /// Colour drawn instead of the material colour, e.g. while hovered
    pub highlight: Option<[f32; 3]>,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
    pub gpu_resources: Option<ObjectGpuResources>,
}

impl Object {
    pub fn new(name: impl Into<String>, meshes: Vec<Mesh>) -> Self {
        Self {
            name: name.into(),
            meshes,
            transform: Transform::default(),
            material: None,
            visible: true,
            highlight: None,
            cast_shadows: false,
            receive_shadows: false,
            gpu_resources: None,
        }
    }

    pub fn with_material(mut self, material: impl Into<MaterialId>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn with_position(mut self, position: Vector3<f32>) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.transform.scale = Vector3::new(scale, scale, scale);
        self
    }

    pub fn with_shadows(mut self, cast: bool, receive: bool) -> Self {
        self.cast_shadows = cast;
        self.receive_shadows = receive;
        self
    }

    /// Material used for `mesh`, falling back to the object's own
    pub fn material_for<'a>(&'a self, mesh: &'a Mesh) -> Option<&'a MaterialId> {
        mesh.material.as_ref().or(self.material.as_ref())
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.transform.matrix()
    }

    /// World-to-object matrix, identity when the transform is singular
    pub fn inverse_model_matrix(&self) -> Matrix4<f32> {
        self.model_matrix().invert().unwrap_or_else(Matrix4::identity)
    }

    pub fn uniform(&self) -> ObjectUniform {
        let highlight = match self.highlight {
            Some([r, g, b]) => [r, g, b, 1.0],
            None => [0.0; 4],
        };
        ObjectUniform {
            model: self.model_matrix().into(),
            highlight,
            shadows: [flag(self.receive_shadows), flag(self.cast_shadows), 0.0, 0.0],
        }
    }

    pub fn has_gpu_resources(&self) -> bool {
        self.gpu_resources.is_some() && self.meshes.iter().all(Mesh::is_uploaded)
    }

    pub fn init_gpu_resources(&mut self, device: &Device, layout: &BindGroupLayoutWithDesc) {
        for (i, mesh) in self.meshes.iter_mut().enumerate() {
            if !mesh.is_uploaded() {
                mesh.upload(device, &format!("{} #{i}", self.name));
            }
        }

        if self.gpu_resources.is_none() {
            let uniform = UniformBuffer::new_with_data(device, &self.uniform());
            let bind_group = BindGroupBuilder::new(layout)
                .resource(uniform.binding_resource())
                .create(device, &format!("{} Object Bind Group", self.name));
            self.gpu_resources = Some(ObjectGpuResources {
                uniform,
                bind_group,
            });
            log::debug!("GPU resources created for '{}'", self.name);
        }
    }

    /// Writes transform, highlight and shadow flags; unchanged values are not re-uploaded
    pub fn update_gpu(&mut self, queue: &wgpu::Queue) {
        let content = self.uniform();
        if let Some(resources) = &mut self.gpu_resources {
            resources.uniform.update_content(queue, content);
        }
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.gpu_resources.as_ref().map(|res| &res.bind_group)
    }
}

pub trait DrawObject<'a> {
    fn draw_mesh(&mut self, mesh: &'a Mesh);
    fn draw_mesh_instanced(&mut self, mesh: &'a Mesh, instances: Range<u32>);
}

impl<'a, 'b> DrawObject<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh(&mut self, mesh: &'b Mesh) {
        self.draw_mesh_instanced(mesh, 0..1);
    }

    fn draw_mesh_instanced(&mut self, mesh: &'b Mesh, instances: Range<u32>) {
        let (Some(vertex_buffer), Some(index_buffer)) = (&mesh.vertex_buffer, &mesh.index_buffer)
        else {
            return;
        };

        self.set_vertex_buffer(0, vertex_buffer.slice(..));
        self.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.index_count(), 0, instances);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::generate_sphere;
    use cgmath::{InnerSpace, Point3, Transform as _};

    #[test]
    fn transform_applies_scale_then_rotation_then_translation() {
        let transform = Transform {
            position: Vector3::new(1.0, 2.0, 3.0),
            rotation: Vector3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0),
            scale: Vector3::new(2.0, 2.0, 2.0),
        };

        // +X scaled to 2, rotated 90 degrees about Y lands on -Z
        let p = transform.matrix().transform_point(Point3::new(1.0, 0.0, 0.0));
        assert!((p - Point3::new(1.0, 2.0, 1.0)).magnitude() < 1e-5);
    }

    #[test]
    fn mesh_material_overrides_object_material() {
        let sphere = generate_sphere(1.0, 8, 6);
        let plain = Mesh::from_geometry(&sphere);
        let painted = Mesh::from_geometry(&sphere).with_material("Gold");
        let object = Object::new("Relay", vec![plain, painted]).with_material("Hull");

        assert_eq!(object.material_for(&object.meshes[0]).map(String::as_str), Some("Hull"));
        assert_eq!(object.material_for(&object.meshes[1]).map(String::as_str), Some("Gold"));
    }

    #[test]
    fn mesh_bounds_cover_sphere() {
        let mesh = Mesh::from_geometry(&generate_sphere(2.0, 16, 12));
        let bounds = mesh.bounds();
        assert!((bounds.max.y - 2.0).abs() < 1e-5);
        assert!((bounds.min.y + 2.0).abs() < 1e-5);
        assert_eq!(mesh.triangles().count() as u32, mesh.index_count() / 3);
    }

    #[test]
    fn highlight_replaces_material_color() {
        let mut object = Object::new("Satellite", Vec::new());
        let blue = [0.0, 0.0, 1.0];
        assert_eq!(object.uniform().surface_color(blue), blue);

        object.highlight = Some([1.0, 0.0, 0.0]);
        let uniform = object.uniform();
        assert_eq!(uniform.highlight, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(uniform.surface_color(blue), [1.0, 0.0, 0.0]);
        assert!(!object.has_gpu_resources());
    }

    #[test]
    fn shadow_flags_reach_the_uniform() {
        let plain = Object::new("Sun", Vec::new());
        assert!(!plain.uniform().receives_shadows());

        let clouds = Object::new("Clouds", Vec::new()).with_shadows(false, true);
        let uniform = clouds.uniform();
        assert!(uniform.receives_shadows());
        assert_eq!(uniform.shadows, [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn uniform_size_matches_shader_struct() {
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 96);
    }
}
