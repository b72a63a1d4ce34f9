//! The Earth, Moon and Sun scene
//!
//! Builds the scene, feeds asynchronously loaded assets into it, animates the
//! bodies on a fixed tick and reacts to the pointer: hovering the satellite
//! paints it red, clicking the moon pauses or resumes its orbit.

use cgmath::{Vector3, Zero};
use imgui::Ui;

use crate::assets::{AssetEvent, AssetLoader, ModelData};
use crate::config::{SceneConfig, SphereConfig};
use crate::gfx::{
    geometry::generate_sphere,
    picking::{intersect_object, Ray},
    rendering::starfield::StarfieldData,
    resources::{ColorSpace, LightRig, Material},
    scene::{Mesh, Object, Scene},
};
use crate::ui::panel::{earth_info_panel, EarthPanel};

use super::orbits::{FixedTimestep, OrbitState};
use super::traits::Simulation;

pub const EARTH: &str = "Earth";
pub const CLOUDS: &str = "Clouds";
pub const SUN: &str = "Sun";
pub const MOON: &str = "Moon";
pub const SATELLITE: &str = "Satellite";

const EARTH_DAY: &str = "earth_day";
const EARTH_NIGHT: &str = "earth_night";
const EARTH_BUMP: &str = "earth_bump";
const EARTH_CLOUDS: &str = "earth_clouds";
const SUN_TEXTURE: &str = "sun";

/// Ticks replayed at most per frame after a stall
const MAX_TICKS_PER_FRAME: u32 = 10;

const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatelliteStatus {
    Loading,
    Loaded,
    Failed,
}

pub struct EarthSystem {
    config: SceneConfig,
    orbits: OrbitState,
    timestep: FixedTimestep,
    loader: AssetLoader,
    satellite: SatelliteStatus,
    satellite_hovered: bool,
    running: bool,
}

impl EarthSystem {
    pub fn new(config: SceneConfig) -> Self {
        let timestep = FixedTimestep::new(config.motion.tick_rate, MAX_TICKS_PER_FRAME);
        Self {
            config,
            orbits: OrbitState::default(),
            timestep,
            loader: AssetLoader::new(),
            satellite: SatelliteStatus::Loading,
            satellite_hovered: false,
            running: true,
        }
    }

    pub fn orbits(&self) -> &OrbitState {
        &self.orbits
    }

    pub fn satellite_status(&self) -> SatelliteStatus {
        self.satellite
    }

    pub fn is_satellite_hovered(&self) -> bool {
        self.satellite_hovered
    }

    pub fn moon_orbit_enabled(&self) -> bool {
        self.orbits.moon_orbit_enabled
    }

    /// Pauses or resumes the moon and logs the change
    pub fn toggle_moon_orbit(&mut self) {
        if self.orbits.toggle_moon_orbit() {
            log::info!("Moon orbit resumed");
        } else {
            log::info!("Moon orbit paused");
        }
    }

    fn sphere(sphere: &SphereConfig) -> Mesh {
        Mesh::from_geometry(&generate_sphere(
            sphere.radius,
            sphere.width_segments,
            sphere.height_segments,
        ))
    }

    fn request_textures(&mut self, scene: &mut Scene) {
        let paths = &self.config.assets;
        let requests = [
            (EARTH_DAY, &paths.earth_day, ColorSpace::Srgb),
            (EARTH_NIGHT, &paths.earth_night, ColorSpace::Srgb),
            (EARTH_BUMP, &paths.earth_bump, ColorSpace::Linear),
            (EARTH_CLOUDS, &paths.earth_clouds, ColorSpace::Srgb),
            (SUN_TEXTURE, &paths.sun, ColorSpace::Srgb),
        ];
        for (key, path, color_space) in requests {
            scene.textures.request(key, color_space);
            self.loader.request_texture(key, path);
        }
    }

    fn add_materials(&self, scene: &mut Scene) {
        let c = &self.config;

        scene.add_material(
            Material::new(EARTH)
                .with_map(EARTH_DAY)
                .with_bump_map(EARTH_BUMP, c.earth_bump_scale)
                .with_specular(c.earth_specular, c.earth_shininess)
                .with_emissive(WHITE, c.earth_emissive_intensity)
                .with_emissive_map(EARTH_NIGHT),
        );
        scene.add_material(
            Material::new(CLOUDS)
                .with_map(EARTH_CLOUDS)
                .with_opacity(c.cloud_opacity),
        );
        scene.add_material(
            Material::matte(SUN)
                .with_map(SUN_TEXTURE)
                .with_emissive(c.sun_emissive, c.sun_emissive_intensity)
                .with_emissive_map(SUN_TEXTURE),
        );
        scene.add_material(Material::new(MOON).with_color(c.moon_color));
    }

    fn add_bodies(&self, scene: &mut Scene) {
        let c = &self.config;
        scene.add_object(
            Object::new(EARTH, vec![Self::sphere(&c.earth)])
                .with_material(EARTH)
                .with_shadows(true, true),
        );
        scene.add_object(
            Object::new(CLOUDS, vec![Self::sphere(&c.clouds)])
                .with_material(CLOUDS)
                .with_shadows(false, true),
        );
        scene.add_object(
            Object::new(SUN, vec![Self::sphere(&c.sun)])
                .with_material(SUN)
                .with_position(c.sun_position.into()),
        );
        scene.add_object(
            Object::new(MOON, vec![Self::sphere(&c.moon)])
                .with_material(MOON)
                .with_shadows(true, true),
        );
    }

    /// Adds the loaded satellite model to the scene
    pub fn add_satellite(&mut self, scene: &mut Scene, model: &ModelData) {
        if scene.object_by_name(SATELLITE).is_some() {
            log::warn!("Satellite already in the scene, ignoring second load");
            return;
        }
        let index = scene.add_model(SATELLITE, model);
        scene.objects[index].transform.scale = Vector3::new(
            self.config.satellite_scale,
            self.config.satellite_scale,
            self.config.satellite_scale,
        );
        self.satellite = SatelliteStatus::Loaded;
        log::info!(
            "Satellite model loaded ({} meshes, {} triangles)",
            model.meshes.len(),
            model.triangle_count()
        );
        self.apply_orbits(scene);
    }

    /// Routes one finished asset request into the scene
    pub fn handle_asset_event(&mut self, event: AssetEvent, scene: &mut Scene) {
        match event {
            AssetEvent::TextureLoaded { key, data } => scene.textures.insert(&key, data),
            AssetEvent::ModelLoaded { data, .. } => self.add_satellite(scene, &data),
            AssetEvent::Failed { key, error } => {
                log::error!("Failed to load '{}': {}", key, error);
                if key == SATELLITE {
                    self.satellite = SatelliteStatus::Failed;
                } else {
                    scene.textures.mark_failed(&key);
                }
            }
        }
    }

    fn poll_assets(&mut self, scene: &mut Scene) {
        for event in self.loader.poll() {
            self.handle_asset_event(event, scene);
        }
    }

    fn satellite_loaded(&self) -> bool {
        self.satellite == SatelliteStatus::Loaded
    }

    /// Writes the current angles into the scene objects
    fn apply_orbits(&self, scene: &mut Scene) {
        let motion = &self.config.motion;
        let orbits = &self.orbits;

        let earth_position = match scene.object_by_name_mut(EARTH) {
            Some(earth) => {
                earth.transform.rotation.y = orbits.earth_rotation;
                earth.transform.position
            }
            None => Vector3::zero(),
        };
        if let Some(clouds) = scene.object_by_name_mut(CLOUDS) {
            clouds.transform.rotation.y = orbits.cloud_rotation;
        }
        if let Some(moon) = scene.object_by_name_mut(MOON) {
            moon.transform.position = orbits.moon_position(earth_position, motion);
        }
        if let Some(satellite) = scene.object_by_name_mut(SATELLITE) {
            satellite.transform.position = orbits.satellite_position(earth_position, motion);
            satellite.transform.rotation.y = orbits.satellite_rotation;
        }
    }

    fn clear_hover(&mut self, scene: &mut Scene) {
        self.satellite_hovered = false;
        if let Some(satellite) = scene.object_by_name_mut(SATELLITE) {
            satellite.highlight = None;
        }
    }

    fn panel(&self, scene: &Scene) -> EarthPanel {
        EarthPanel {
            moon_orbit_enabled: self.orbits.moon_orbit_enabled,
            satellite: self.satellite,
            satellite_hovered: self.satellite_hovered,
            earth_rotation: self.orbits.earth_rotation,
            moon_angle: self.orbits.moon_angle,
            satellite_angle: self.orbits.satellite_angle,
            running: self.running,
            stats: scene.get_statistics(),
        }
    }
}

impl Simulation for EarthSystem {
    fn initialize(&mut self, scene: &mut Scene) {
        let c = &self.config;
        scene.lights = LightRig::from_config(&c.lighting, c.sun_position.into());
        scene.set_starfield(StarfieldData::generate(
            c.starfield.count,
            c.starfield.spread,
            c.starfield.size,
            c.starfield.seed,
        ));

        self.request_textures(scene);
        self.add_materials(scene);
        self.add_bodies(scene);

        let satellite_path = self.config.assets.satellite.clone();
        self.loader.request_model(SATELLITE, &satellite_path);

        self.apply_orbits(scene);
        log::info!(
            "Earth system ready, {} assets loading",
            self.loader.pending()
        );
    }

    fn update(&mut self, delta_time: f32, scene: &mut Scene) {
        self.poll_assets(scene);
        if !self.running {
            return;
        }

        let ticks = self.timestep.advance(delta_time);
        let satellite_loaded = self.satellite_loaded();
        for _ in 0..ticks {
            self.orbits.tick(&self.config.motion, satellite_loaded);
        }
        if ticks > 0 {
            self.apply_orbits(scene);
        }
    }

    fn on_pointer_move(&mut self, ray: &Ray, scene: &mut Scene) {
        if !self.satellite_loaded() {
            return;
        }
        let Some(satellite) = scene.object_by_name_mut(SATELLITE) else {
            return;
        };

        let hovered = intersect_object(ray, satellite).is_some();
        satellite.highlight = hovered.then_some(self.config.hover_color);
        self.satellite_hovered = hovered;
    }

    fn on_pointer_leave(&mut self, scene: &mut Scene) {
        self.clear_hover(scene);
    }

    fn on_click(&mut self, ray: &Ray, scene: &mut Scene) {
        let moon_hit = scene
            .object_by_name(MOON)
            .is_some_and(|moon| intersect_object(ray, moon).is_some());
        if moon_hit {
            self.toggle_moon_orbit();
        }
    }

    fn render_ui(&mut self, ui: &Ui, scene: &mut Scene) {
        if earth_info_panel(ui, &self.panel(scene)) {
            self.toggle_moon_orbit();
        }
    }

    fn name(&self) -> &str {
        "Earth System"
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    fn reset(&mut self, scene: &mut Scene) {
        self.orbits = OrbitState::default();
        self.timestep.reset();
        self.clear_hover(scene);
        self.apply_orbits(scene);
        log::info!("Earth system reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetError, ModelMaterial, ModelMesh, TextureData};
    use crate::config::AssetPaths;
    use crate::gfx::resources::TextureStatus;
    use cgmath::InnerSpace;

    const TICK: f32 = 1.0 / 60.0 + 1e-6;

    fn config() -> SceneConfig {
        let mut config = SceneConfig::default();
        config.assets =
            AssetPaths::from_root(&std::env::temp_dir().join("earthview_no_assets_here"));
        config.starfield.count = 20;
        config.starfield.seed = Some(1);
        config
    }

    fn setup() -> (EarthSystem, Scene) {
        let mut scene = Scene::default();
        let mut system = EarthSystem::new(config());
        system.initialize(&mut scene);
        (system, scene)
    }

    /// A flat triangle about 0.6 units wide once scaled by 0.03
    fn satellite_model() -> ModelData {
        ModelData {
            name: String::from("Satellite"),
            meshes: vec![ModelMesh {
                name: String::from("panel"),
                positions: vec![[-10.0, -10.0, 0.0], [10.0, -10.0, 0.0], [0.0, 10.0, 0.0]],
                normals: vec![[0.0, 0.0, 1.0]; 3],
                uvs: Vec::new(),
                indices: vec![0, 1, 2],
                material: Some(0),
            }],
            materials: vec![ModelMaterial::default()],
        }
    }

    fn down_z(x: f32, y: f32) -> Ray {
        Ray::new(Vector3::new(x, y, 10.0), Vector3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn initialize_builds_the_scene() {
        let (system, scene) = setup();

        for name in [EARTH, CLOUDS, SUN, MOON] {
            assert!(scene.object_by_name(name).is_some(), "missing {name}");
        }
        assert!(scene.object_by_name(SATELLITE).is_none());
        assert_eq!(system.satellite_status(), SatelliteStatus::Loading);

        let sun = scene.object_by_name(SUN).unwrap();
        assert_eq!(sun.transform.position, Vector3::new(8.0, 0.0, 0.0));
        assert_eq!(scene.lights.point.position, Vector3::new(8.0, 0.0, 0.0));

        let moon = scene.object_by_name(MOON).unwrap();
        assert_eq!(moon.transform.position, Vector3::new(3.0, 0.0, 0.0));

        assert_eq!(scene.starfield().map(StarfieldData::len), Some(20));
        assert_eq!(scene.textures.status(EARTH_BUMP), TextureStatus::Pending);
        assert!(scene.material_manager.get_material(CLOUDS).unwrap().is_blended());
    }

    #[test]
    fn one_tick_per_sixtieth_of_a_second() {
        let (mut system, mut scene) = setup();
        system.update(TICK, &mut scene);

        let earth = scene.object_by_name(EARTH).unwrap();
        assert!((earth.transform.rotation.y - 0.001).abs() < 1e-7);
        let clouds = scene.object_by_name(CLOUDS).unwrap();
        assert!((clouds.transform.rotation.y - 0.0012).abs() < 1e-7);

        let moon = scene.object_by_name(MOON).unwrap().transform.position;
        let expected = Vector3::new(0.002f32.cos() * 3.0, 0.0, 0.002f32.sin() * 3.0);
        assert!((moon - expected).magnitude() < 1e-6);
    }

    #[test]
    fn paused_system_does_not_move() {
        let (mut system, mut scene) = setup();
        system.set_running(false);
        system.update(1.0, &mut scene);
        assert_eq!(system.orbits().earth_rotation, 0.0);
        assert!(!system.is_running());
    }

    #[test]
    fn clicking_the_moon_toggles_its_orbit() {
        let (mut system, mut scene) = setup();

        system.on_click(&down_z(3.01, 0.013), &mut scene);
        assert!(!system.moon_orbit_enabled());

        for _ in 0..10 {
            system.update(TICK, &mut scene);
        }
        assert_eq!(system.orbits().moon_angle, 0.0);
        assert!(system.orbits().earth_rotation > 0.0);

        system.on_click(&down_z(3.01, 0.013), &mut scene);
        assert!(system.moon_orbit_enabled());
    }

    #[test]
    fn clicking_elsewhere_changes_nothing() {
        let (mut system, mut scene) = setup();
        // straight through the Earth
        system.on_click(&down_z(0.01, 0.013), &mut scene);
        system.on_click(&down_z(50.0, 50.0), &mut scene);
        assert!(system.moon_orbit_enabled());
    }

    #[test]
    fn hover_without_satellite_is_ignored() {
        let (mut system, mut scene) = setup();
        system.on_pointer_move(&down_z(0.01, 0.01), &mut scene);
        assert!(!system.is_satellite_hovered());
    }

    #[test]
    fn hovering_the_satellite_paints_it_red() {
        let (mut system, mut scene) = setup();
        system.add_satellite(&mut scene, &satellite_model());
        assert_eq!(system.satellite_status(), SatelliteStatus::Loaded);

        let satellite = scene.object_by_name(SATELLITE).unwrap();
        assert_eq!(satellite.transform.position, Vector3::new(0.0, 0.0, 4.0));

        system.on_pointer_move(&down_z(0.01, 0.01), &mut scene);
        assert!(system.is_satellite_hovered());
        assert_eq!(
            scene.object_by_name(SATELLITE).unwrap().highlight,
            Some([1.0, 0.0, 0.0])
        );

        system.on_pointer_move(&down_z(1.5, 1.5), &mut scene);
        assert!(!system.is_satellite_hovered());
        assert_eq!(scene.object_by_name(SATELLITE).unwrap().highlight, None);
    }

    #[test]
    fn pointer_leaving_the_scene_clears_the_hover() {
        let (mut system, mut scene) = setup();
        system.add_satellite(&mut scene, &satellite_model());
        system.on_pointer_move(&down_z(0.01, 0.01), &mut scene);
        assert!(system.is_satellite_hovered());

        system.on_pointer_leave(&mut scene);
        assert!(!system.is_satellite_hovered());
        assert_eq!(scene.object_by_name(SATELLITE).unwrap().highlight, None);
    }

    #[test]
    fn earth_and_moon_cast_shadows_clouds_only_receive() {
        let (_, scene) = setup();
        let flags = |name| {
            let object = scene.object_by_name(name).unwrap();
            (object.cast_shadows, object.receive_shadows)
        };
        assert_eq!(flags(EARTH), (true, true));
        assert_eq!(flags(MOON), (true, true));
        assert_eq!(flags(CLOUDS), (false, true));
        assert_eq!(flags(SUN), (false, false));
    }

    #[test]
    fn satellite_orbits_once_loaded() {
        let (mut system, mut scene) = setup();
        system.update(TICK, &mut scene);
        assert_eq!(system.orbits().satellite_angle, 0.0);

        system.add_satellite(&mut scene, &satellite_model());
        system.update(TICK, &mut scene);
        assert!((system.orbits().satellite_angle - 0.005).abs() < 1e-7);

        let satellite = scene.object_by_name(SATELLITE).unwrap();
        assert!((satellite.transform.rotation.y - 0.01).abs() < 1e-7);
        assert!((satellite.transform.position.y - 0.005f32.sin()).abs() < 1e-6);
    }

    #[test]
    fn asset_events_update_textures_and_status() {
        let (mut system, mut scene) = setup();

        system.handle_asset_event(
            AssetEvent::TextureLoaded {
                key: EARTH_DAY.to_string(),
                data: TextureData::solid([0, 0, 255, 255]),
            },
            &mut scene,
        );
        system.handle_asset_event(
            AssetEvent::Failed {
                key: SUN_TEXTURE.to_string(),
                error: AssetError::NotFound("sun.jpg".into()),
            },
            &mut scene,
        );
        system.handle_asset_event(
            AssetEvent::Failed {
                key: SATELLITE.to_string(),
                error: AssetError::NotFound("Satellite.obj".into()),
            },
            &mut scene,
        );

        assert_eq!(scene.textures.status(SUN_TEXTURE), TextureStatus::Failed);
        assert_eq!(system.satellite_status(), SatelliteStatus::Failed);
        assert!(scene.object_by_name(SATELLITE).is_none());
    }

    #[test]
    fn reset_restores_initial_state() {
        let (mut system, mut scene) = setup();
        system.add_satellite(&mut scene, &satellite_model());
        system.on_pointer_move(&down_z(0.01, 0.01), &mut scene);
        system.on_click(&down_z(3.01, 0.013), &mut scene);
        for _ in 0..5 {
            system.update(TICK, &mut scene);
        }

        system.reset(&mut scene);
        assert_eq!(*system.orbits(), OrbitState::default());
        assert!(system.moon_orbit_enabled());
        assert!(!system.is_satellite_hovered());
        let satellite = scene.object_by_name(SATELLITE).unwrap();
        assert_eq!(satellite.highlight, None);
        assert_eq!(satellite.transform.position, Vector3::new(0.0, 0.0, 4.0));
    }
}
