//! WGPU-based rendering engine
//!
//! Owns the surface, device and every pipeline. Each frame is split in two:
//! [`RenderEngine::prepare`] brings GPU state in line with the scene
//! (textures, object and material buffers, starfield, globals) and
//! [`RenderEngine::render_frame`] records the sun's shadow depth pass, a
//! multisampled scene pass and the optional UI overlay.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use cgmath::{InnerSpace, Vector3};
use wgpu::{Device, TextureFormat};

use crate::gfx::{
    resources::{
        global_bindings::{update_global_ubo, GlobalBindings, GlobalUBO},
        material::{Material, MaterialBindings},
        texture_resource::TextureResource,
    },
    scene::{
        object::{DrawObject, Mesh, Object},
        scene::Scene,
        vertex::Vertex3D,
    },
};
use crate::wgpu_utils::{binding_types, BindGroupLayoutBuilder, BindGroupLayoutWithDesc};

use super::pipeline_manager::{PipelineConfig, PipelineManager};
use super::shadow::{ShadowMap, SHADOW_PIPELINE};
use super::starfield::{StarfieldRenderer, STARFIELD_PIPELINE};

const PHONG_SHADER: &str = "phong";
const OPAQUE_PIPELINE: &str = "Phong";
const BLENDED_PIPELINE: &str = "PhongBlended";
const BLENDED_NO_DEPTH_PIPELINE: &str = "PhongBlendedNoDepthWrite";

/// Preferred MSAA sample count when the adapter supports it
const MSAA_SAMPLES: u32 = 4;

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    format: TextureFormat,
    sample_count: u32,
    depth_texture: TextureResource,
    msaa_target: Option<TextureResource>,
    pub pipeline_manager: PipelineManager,
    global_ubo: GlobalUBO,
    global_bindings: GlobalBindings,
    object_layout: BindGroupLayoutWithDesc,
    material_layout: BindGroupLayoutWithDesc,
    shadow_map: ShadowMap,
    starfield: StarfieldRenderer,
}

impl RenderEngine {
    /// Creates a render engine drawing into `window`
    ///
    /// Fails when no adapter or device is available or the surface cannot
    /// be created.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        vsync: bool,
        shadow_map_size: u32,
    ) -> anyhow::Result<RenderEngine> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("Failed to create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("Failed to request adapter")?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to request a device")?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        // Shading happens in linear space, the sRGB surface encodes on write.
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| anyhow!("Surface reports no supported formats"))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: present_mode(vsync),
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let supports_msaa = |f: TextureFormat| {
            adapter
                .get_texture_format_features(f)
                .flags
                .sample_count_supported(MSAA_SAMPLES)
        };
        let sample_count = if supports_msaa(format) && supports_msaa(TextureResource::DEPTH_FORMAT)
        {
            MSAA_SAMPLES
        } else {
            1
        };
        log::info!("Surface format {:?}, {}x MSAA", format, sample_count);

        let depth_texture =
            TextureResource::create_depth_texture(&device, &config, sample_count, "depth_texture");
        let msaa_target = (sample_count > 1)
            .then(|| TextureResource::create_msaa_target(&device, &config, sample_count));

        let global_ubo = GlobalUBO::new(&device);
        let mut global_bindings = GlobalBindings::new(&device);
        global_bindings.create_bind_group(&device, &global_ubo);

        let object_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(&device, "Object Bind Group");
        let material_layout = MaterialBindings::create_layout(&device);
        let shadow_map = ShadowMap::new(&device, shadow_map_size);

        let device_handle: Arc<Device> = device.into();
        let queue_handle: Arc<wgpu::Queue> = queue.into();
        let mut pipeline_manager = PipelineManager::new(device_handle.clone());

        pipeline_manager.load_shader(PHONG_SHADER, include_str!("shaders/phong.wgsl"));

        let base = PipelineConfig::default_with_shader(PHONG_SHADER)
            .with_bind_group_layouts(vec![
                global_bindings.bind_group_layouts().clone(),
                object_layout.layout.clone(),
                material_layout.layout.clone(),
                shadow_map.layout().clone(),
            ])
            .with_vertex_layouts(vec![Vertex3D::desc()])
            .with_depth(TextureResource::DEPTH_FORMAT, true)
            .with_color_target(format, Some(wgpu::BlendState::REPLACE))
            .with_sample_count(sample_count);

        pipeline_manager.register_pipeline(
            OPAQUE_PIPELINE,
            base.clone().with_label("Phong Pipeline"),
        );
        pipeline_manager.register_pipeline(
            BLENDED_PIPELINE,
            base.clone()
                .with_label("Phong Blended Pipeline")
                .with_color_target(format, Some(wgpu::BlendState::ALPHA_BLENDING)),
        );
        pipeline_manager.register_pipeline(
            BLENDED_NO_DEPTH_PIPELINE,
            base.clone()
                .with_label("Phong Blended Pipeline (no depth write)")
                .with_color_target(format, Some(wgpu::BlendState::ALPHA_BLENDING))
                .with_depth(TextureResource::DEPTH_FORMAT, false),
        );
        StarfieldRenderer::register_pipeline(&mut pipeline_manager, &base);
        ShadowMap::register_pipeline(
            &mut pipeline_manager,
            global_bindings.bind_group_layouts(),
            &object_layout.layout,
        );

        if let Err(errors) = pipeline_manager.create_all_pipelines() {
            return Err(anyhow!("Pipeline creation failed: {}", errors.join("; ")));
        }

        Ok(RenderEngine {
            surface,
            device: device_handle,
            queue: queue_handle,
            config,
            format,
            sample_count,
            depth_texture,
            msaa_target,
            pipeline_manager,
            global_ubo,
            global_bindings,
            object_layout,
            material_layout,
            shadow_map,
            starfield: StarfieldRenderer::new(),
        })
    }

    /// Brings GPU resources in line with `scene`
    ///
    /// Uploads textures that finished decoding, creates buffers for new
    /// objects, writes transforms and highlights, rebinds materials whose textures
    /// changed, re-uploads a replaced starfield and writes the globals.
    pub fn prepare(&mut self, scene: &mut Scene) {
        let uploaded = scene.textures.upload_pending(&self.device, &self.queue);
        if uploaded > 0 {
            log::debug!("Uploaded {} texture(s)", uploaded);
        }

        for object in scene.objects.iter_mut() {
            if !object.has_gpu_resources() {
                object.init_gpu_resources(&self.device, &self.object_layout);
            }
            object.update_gpu(&self.queue);
        }

        scene.material_manager.update_all_gpu_resources(
            &self.device,
            &self.queue,
            &self.material_layout,
            &scene.textures,
        );

        let fovy = scene.camera_manager.camera.fovy;
        if let Some(stars) = scene.take_starfield_update() {
            self.starfield.upload(&self.device, stars, fovy);
        }

        update_global_ubo(
            &mut self.global_ubo,
            &self.queue,
            &scene.camera_manager.camera.uniform,
            &scene.lights,
        );
    }

    /// Renders a frame with an optional UI overlay
    ///
    /// Shadow casters are drawn into the shadow map first. Then come stars,
    /// opaque meshes and blended meshes from far to near. The UI callback
    /// draws onto the resolved surface image.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped;
    /// other surface errors are returned.
    pub fn render_frame<F>(
        &mut self,
        scene: &Scene,
        ui_callback: Option<F>,
    ) -> Result<(), wgpu::SurfaceError>
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timed out waiting for the next surface texture");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        if let (Some(globals), Some(pipeline)) = (
            self.global_bindings.bind_groups(),
            self.pipeline_manager.pipeline(SHADOW_PIPELINE),
        ) {
            self.shadow_map.render(&mut encoder, pipeline, globals, scene);
        }

        let (color_view, resolve_target, store) = match &self.msaa_target {
            Some(msaa) => (
                &msaa.view,
                Some(&surface_texture_view),
                wgpu::StoreOp::Discard,
            ),
            None => (&surface_texture_view, None, wgpu::StoreOp::Store),
        };

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(globals) = self.global_bindings.bind_groups() {
                if let Some(pipeline) = self.pipeline_manager.pipeline(STARFIELD_PIPELINE) {
                    self.starfield.render(&mut render_pass, pipeline, globals);
                }

                render_pass.set_bind_group(0, globals, &[]);
                render_pass.set_bind_group(3, self.shadow_map.bind_group(), &[]);

                if let Some(pipeline) = self.pipeline_manager.pipeline(OPAQUE_PIPELINE) {
                    render_pass.set_pipeline(pipeline);
                    for object in scene.objects.iter().filter(|o| o.visible) {
                        for mesh in &object.meshes {
                            let material = scene.material_for(object, mesh);
                            if !material.is_blended() {
                                draw_with_material(&mut render_pass, object, mesh, material);
                            }
                        }
                    }
                }

                let eye = scene.camera_manager.camera.eye;
                for (object, mesh, material) in blended_back_to_front(scene, eye) {
                    let name = if material.depth_write {
                        BLENDED_PIPELINE
                    } else {
                        BLENDED_NO_DEPTH_PIPELINE
                    };
                    if let Some(pipeline) = self.pipeline_manager.pipeline(name) {
                        render_pass.set_pipeline(pipeline);
                        draw_with_material(&mut render_pass, object, mesh, material);
                    }
                }
            }
        }

        if let Some(ui_callback) = ui_callback {
            ui_callback(
                &self.device,
                &self.queue,
                &mut encoder,
                &surface_texture_view,
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    /// Resizes the surface and recreates the depth and multisample targets
    ///
    /// Zero sizes (minimised windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        self.depth_texture = TextureResource::create_depth_texture(
            &self.device,
            &self.config,
            self.sample_count,
            "depth_texture",
        );
        if self.sample_count > 1 {
            self.msaa_target = Some(TextureResource::create_msaa_target(
                &self.device,
                &self.config,
                self.sample_count,
            ));
        }
    }

    /// Switches between synchronised and immediate presentation
    pub fn set_vsync(&mut self, enable: bool) {
        self.config.present_mode = present_mode(enable);
        self.surface.configure(&self.device, &self.config);
        log::info!("VSync {}", if enable { "enabled" } else { "disabled" });
    }

    pub fn is_vsync(&self) -> bool {
        self.config.present_mode == wgpu::PresentMode::AutoVsync
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }
}

fn draw_with_material<'a>(
    render_pass: &mut wgpu::RenderPass<'a>,
    object: &'a Object,
    mesh: &'a Mesh,
    material: &'a Material,
) {
    let (Some(object_group), Some(material_group)) = (object.bind_group(), material.bind_group())
    else {
        log::trace!("Skipping '{}': GPU resources not ready", object.name);
        return;
    };
    render_pass.set_bind_group(1, object_group, &[]);
    render_pass.set_bind_group(2, material_group, &[]);
    render_pass.draw_mesh(mesh);
}

/// Visible blended meshes, farthest object first
fn blended_back_to_front(
    scene: &Scene,
    eye: Vector3<f32>,
) -> Vec<(&Object, &Mesh, &Material)> {
    let mut blended: Vec<(f32, &Object, &Mesh, &Material)> = scene
        .objects
        .iter()
        .filter(|o| o.visible)
        .flat_map(|object| {
            let distance = (object.transform.position - eye).magnitude2();
            object.meshes.iter().filter_map(move |mesh| {
                let material = scene.material_for(object, mesh);
                material
                    .is_blended()
                    .then_some((distance, object, mesh, material))
            })
        })
        .collect();

    blended.sort_by(|a, b| b.0.total_cmp(&a.0));
    blended
        .into_iter()
        .map(|(_, object, mesh, material)| (object, mesh, material))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::generate_sphere;

    fn blended_scene() -> Scene {
        let mut scene = Scene::default();
        scene.add_material(Material::new("haze").with_opacity(0.4));
        let sphere = generate_sphere(1.0, 8, 6);
        for (name, z) in [("near", 3.0), ("far", -10.0), ("middle", 0.0)] {
            scene.add_object(
                Object::new(name, vec![Mesh::from_geometry(&sphere)])
                    .with_material("haze")
                    .with_position(Vector3::new(0.0, 0.0, z)),
            );
        }
        scene.add_object(Object::new("solid", vec![Mesh::from_geometry(&sphere)]));
        scene
    }

    #[test]
    fn blended_meshes_are_sorted_far_to_near() {
        let scene = blended_scene();
        let order: Vec<&str> = blended_back_to_front(&scene, Vector3::new(0.0, 0.0, 5.0))
            .into_iter()
            .map(|(object, _, _)| object.name.as_str())
            .collect();
        assert_eq!(order, ["far", "middle", "near"]);
    }

    #[test]
    fn hidden_objects_are_not_sorted() {
        let mut scene = blended_scene();
        if let Some(far) = scene.object_by_name_mut("far") {
            far.visible = false;
        }
        let blended = blended_back_to_front(&scene, Vector3::new(0.0, 0.0, 5.0));
        assert_eq!(blended.len(), 2);
    }

    #[test]
    fn vsync_selects_present_mode() {
        assert_eq!(present_mode(true), wgpu::PresentMode::AutoVsync);
        assert_eq!(present_mode(false), wgpu::PresentMode::AutoNoVsync);
    }
}
