use cgmath::Vector3;

use crate::assets::ModelData;
use crate::config::CameraConfig;
use crate::gfx::{
    camera::{camera_utils::CameraManager, CameraController, OrbitCamera},
    rendering::starfield::StarfieldData,
    resources::{
        global_bindings::LightRig,
        material::{Material, MaterialManager},
        texture_library::TextureLibrary,
    },
    scene::{object::Mesh, vertex::Vertex3D},
};

use super::object::Object;

/// Main scene containing objects, materials, textures, lights and camera
pub struct Scene {
    pub camera_manager: CameraManager,
    pub objects: Vec<Object>,
    pub material_manager: MaterialManager,
    pub textures: TextureLibrary,
    pub lights: LightRig,
    starfield: Option<StarfieldData>,
    starfield_dirty: bool,
}

impl Default for Scene {
    fn default() -> Self {
        let config = CameraConfig::default();
        let camera = OrbitCamera::from_config(&config, 1.0);
        Self::new(CameraManager::new(
            camera,
            CameraController::new(config.damping, 800.0),
        ))
    }
}

impl Scene {
    pub fn new(camera_manager: CameraManager) -> Self {
        Self {
            camera_manager,
            objects: Vec::new(),
            material_manager: MaterialManager::new(),
            textures: TextureLibrary::new(),
            lights: LightRig::default(),
            starfield: None,
            starfield_dirty: false,
        }
    }

    /// Advances camera damping and refreshes the camera uniform
    pub fn update(&mut self) {
        self.camera_manager.update();
    }

    /// Adds an object, renaming it if the name is taken; returns its index
    pub fn add_object(&mut self, mut object: Object) -> usize {
        object.name = self.ensure_unique_name(&object.name);
        self.objects.push(object);
        self.objects.len() - 1
    }

    /// Builds an object from a loaded model
    ///
    /// Every model material becomes a scene material named
    /// `"<name>/<material>"`, assigned per mesh.
    pub fn add_model(&mut self, name: &str, model: &ModelData) -> usize {
        let material_ids: Vec<String> = model
            .materials
            .iter()
            .enumerate()
            .map(|(i, mtl)| {
                let id = if mtl.name.is_empty() {
                    format!("{}/material_{}", name, i)
                } else {
                    format!("{}/{}", name, mtl.name)
                };
                let material = Material::new(&id)
                    .with_color(mtl.diffuse)
                    .with_specular(mtl.specular, mtl.shininess)
                    .with_opacity(mtl.opacity);
                self.material_manager.add_material(material);
                id
            })
            .collect();

        let meshes = model
            .meshes
            .iter()
            .map(|m| {
                let vertices = (0..m.positions.len())
                    .map(|i| Vertex3D {
                        position: m.positions[i],
                        normal: m.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                        uv: m.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
                    })
                    .collect();
                let mesh = Mesh::new(vertices, m.indices.clone());
                match m.material.and_then(|i| material_ids.get(i)) {
                    Some(id) => mesh.with_material(id.clone()),
                    None => mesh,
                }
            })
            .collect();

        self.add_object(Object::new(name, meshes))
    }

    pub fn add_material(&mut self, material: Material) {
        self.material_manager.add_material(material);
    }

    pub fn object_index(&self, name: &str) -> Option<usize> {
        self.objects.iter().position(|obj| obj.name == name)
    }

    pub fn object_by_name(&self, name: &str) -> Option<&Object> {
        self.objects.iter().find(|obj| obj.name == name)
    }

    pub fn object_by_name_mut(&mut self, name: &str) -> Option<&mut Object> {
        self.objects.iter_mut().find(|obj| obj.name == name)
    }

    pub fn remove_object(&mut self, name: &str) -> Option<Object> {
        let index = self.object_index(name)?;
        Some(self.objects.remove(index))
    }

    /// Material used to draw `mesh` of `object`
    pub fn material_for(&self, object: &Object, mesh: &Mesh) -> &Material {
        self.material_manager
            .get_material_for_object(object.material_for(mesh))
    }

    /// Replaces the starfield; the renderer re-uploads it on the next frame
    pub fn set_starfield(&mut self, starfield: StarfieldData) {
        self.starfield = Some(starfield);
        self.starfield_dirty = true;
    }

    pub fn starfield(&self) -> Option<&StarfieldData> {
        self.starfield.as_ref()
    }

    /// Returns the starfield once after each [`Scene::set_starfield`]
    pub fn take_starfield_update(&mut self) -> Option<&StarfieldData> {
        if std::mem::take(&mut self.starfield_dirty) {
            self.starfield.as_ref()
        } else {
            None
        }
    }

    pub fn move_point_light(&mut self, position: Vector3<f32>) {
        self.lights.point.position = position;
    }

    /// Gets statistics about the scene
    pub fn get_statistics(&self) -> SceneStatistics {
        let meshes = || self.objects.iter().flat_map(|obj| obj.meshes.iter());
        let (pending_textures, ready_textures, failed_textures) = self.textures.counts();

        SceneStatistics {
            object_count: self.objects.len(),
            material_count: self.material_manager.len(),
            total_triangles: meshes().map(|m| m.index_count() / 3).sum(),
            total_vertices: meshes().map(Mesh::vertex_count).sum(),
            star_count: self.starfield.as_ref().map_or(0, StarfieldData::len),
            pending_textures,
            ready_textures,
            failed_textures,
        }
    }

    pub fn ensure_unique_name(&self, desired_name: &str) -> String {
        let mut counter = 0;
        let mut test_name = desired_name.to_string();

        while self.objects.iter().any(|obj| obj.name == test_name) {
            counter += 1;
            test_name = format!("{} ({})", desired_name, counter);
        }

        test_name
    }
}

/// Scene statistics for debugging and UI display
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneStatistics {
    pub object_count: usize,
    pub material_count: usize,
    pub total_triangles: u32,
    pub total_vertices: u32,
    pub star_count: usize,
    pub pending_textures: usize,
    pub ready_textures: usize,
    pub failed_textures: usize,
}
