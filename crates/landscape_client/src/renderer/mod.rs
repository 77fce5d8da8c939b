pub mod mesh_pipeline;
pub mod particles;
pub mod sun;
pub mod textures;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use landscape_shared::biome::Biome;
use landscape_shared::landscape::{DirtyFlags, Landscape};
use tracing::debug;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::camera::OrbitCamera;
use crate::renderer::mesh_pipeline::{GpuMesh, MeshPipeline};
use crate::renderer::particles::{ParticleRenderer, WeatherLayer};
use crate::renderer::sun::{
    sun_mesh, SunGlowRenderer, SUN_LIGHT_DECAY, SUN_LIGHT_INTENSITY, SUN_LIGHT_RANGE, SUN_POSITION,
};
use crate::renderer::textures::{
    create_sampler, load_normal_map, load_or_fallback, solid_rgba, GpuTexture, FLAT_NORMAL,
};
use crate::ui::panel::PanelLine;
use crate::ui::text_overlay::PanelOverlayRenderer;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const NORMAL_MAP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const AMBIENT_INTENSITY: f32 = 0.5;
const DIRECTIONAL_INTENSITY: f32 = 0.5;
const DIRECTIONAL_LIGHT_POSITION: Vec3 = Vec3::new(0.0, 100.0, 100.0);
const TERRAIN_VERTEX_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct SceneUniform {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    ambient: [f32; 4],
    /// xyz: unit vector towards the light, w: intensity.
    sun_direction: [f32; 4],
    /// xyz: position, w: intensity.
    point_light: [f32; 4],
    /// x: range, y: decay exponent.
    point_light_params: [f32; 4],
}

impl SceneUniform {
    fn from_camera(camera: &OrbitCamera) -> Self {
        let eye = camera.position();
        let to_light = DIRECTIONAL_LIGHT_POSITION.normalize_or_zero();
        Self {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            camera_pos: eye.extend(1.0).to_array(),
            ambient: [AMBIENT_INTENSITY, AMBIENT_INTENSITY, AMBIENT_INTENSITY, 1.0],
            sun_direction: to_light.extend(DIRECTIONAL_INTENSITY).to_array(),
            point_light: SUN_POSITION.extend(SUN_LIGHT_INTENSITY).to_array(),
            point_light_params: [SUN_LIGHT_RANGE, SUN_LIGHT_DECAY, 0.0, 0.0],
        }
    }
}

#[derive(Debug)]
struct DepthTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthTexture {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Landscape Depth Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Terrain mesh and surface texture of one biome.
struct BiomeSurface {
    biome: Biome,
    mesh: Option<GpuMesh>,
    bind_group: wgpu::BindGroup,
    _texture: GpuTexture,
    _normal_map: GpuTexture,
}

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    depth_texture: DepthTexture,
    mesh_pipeline: MeshPipeline,
    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    surfaces: Vec<BiomeSurface>,
    active_biome: Biome,
    flat_bind_group: wgpu::BindGroup,
    _flat_texture: GpuTexture,
    _flat_normal_map: GpuTexture,
    tree_mesh: Option<GpuMesh>,
    sun_mesh: Option<GpuMesh>,
    particle_renderer: ParticleRenderer,
    sun_glow: SunGlowRenderer,
    panel_overlay: PanelOverlayRenderer,
}

#[derive(Debug)]
pub enum RendererInitError {
    CreateSurface(wgpu::CreateSurfaceError),
    RequestAdapter(wgpu::RequestAdapterError),
    RequestDevice(wgpu::RequestDeviceError),
    UnsupportedSurface,
}

impl fmt::Display for RendererInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateSurface(err) => write!(f, "failed to create surface: {err}"),
            Self::RequestAdapter(err) => write!(f, "failed to request adapter: {err}"),
            Self::RequestDevice(err) => write!(f, "failed to request device: {err}"),
            Self::UnsupportedSurface => write!(f, "adapter does not support this surface"),
        }
    }
}

impl std::error::Error for RendererInitError {}

impl Renderer {
    pub fn new(window: Arc<Window>, landscape: &Landscape) -> Result<Self, RendererInitError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(RendererInitError::CreateSurface)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(RendererInitError::RequestAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Landscape Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(RendererInitError::RequestDevice)?;

        let initial_size = window.inner_size();
        let surface_config = surface
            .get_default_config(&adapter, initial_size.width.max(1), initial_size.height.max(1))
            .ok_or(RendererInitError::UnsupportedSurface)?;
        surface.configure(&device, &surface_config);

        let mesh_pipeline = MeshPipeline::new(&device, surface_config.format, DEPTH_FORMAT);
        let scene_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Uniform Buffer"),
            contents: bytemuck::bytes_of(&SceneUniform::from_camera(&OrbitCamera::default())),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &mesh_pipeline.scene_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
        });

        let repeat_sampler = create_sampler(&device, wgpu::AddressMode::Repeat, "Surface Sampler");
        let surfaces = Biome::ALL
            .iter()
            .map(|&biome| {
                let material = biome.material();
                let image = load_or_fallback(Path::new(material.texture_path), material.tint);
                let texture = GpuTexture::from_image(&device, &queue, &image, TEXTURE_FORMAT, biome.name());
                let normal_image = load_normal_map(material.normal_map_path.map(Path::new));
                let normal_map = GpuTexture::from_image(
                    &device,
                    &queue,
                    &normal_image,
                    NORMAL_MAP_FORMAT,
                    "Terrain Normal Map",
                );
                let bind_group = create_texture_bind_group(
                    &device,
                    &mesh_pipeline.texture_bind_group_layout,
                    &texture.view,
                    &normal_map.view,
                    &repeat_sampler,
                    "Terrain Texture Bind Group",
                );
                let (vertices, indices) = landscape.terrain(biome).mesh.vertices(TERRAIN_VERTEX_COLOR);
                BiomeSurface {
                    biome,
                    mesh: GpuMesh::upload(&device, "Terrain Mesh", &vertices, &indices),
                    bind_group,
                    _texture: texture,
                    _normal_map: normal_map,
                }
            })
            .collect();

        let flat_texture = GpuTexture::from_image(
            &device,
            &queue,
            &solid_rgba([1.0, 1.0, 1.0]),
            TEXTURE_FORMAT,
            "Flat White Texture",
        );
        let flat_normal_map = GpuTexture::from_image(
            &device,
            &queue,
            &solid_rgba(FLAT_NORMAL),
            NORMAL_MAP_FORMAT,
            "Flat Normal Map",
        );
        let flat_bind_group = create_texture_bind_group(
            &device,
            &mesh_pipeline.texture_bind_group_layout,
            &flat_texture.view,
            &flat_normal_map.view,
            &repeat_sampler,
            "Flat Texture Bind Group",
        );
        let (sun_vertices, sun_indices) = sun_mesh();
        let sun_mesh = GpuMesh::upload(&device, "Sun Mesh", &sun_vertices, &sun_indices);

        let particle_renderer = ParticleRenderer::new(
            &device,
            surface_config.format,
            DEPTH_FORMAT,
            &mesh_pipeline.scene_bind_group_layout,
        );
        let sun_glow = SunGlowRenderer::new(
            &device,
            &queue,
            surface_config.format,
            DEPTH_FORMAT,
            &mesh_pipeline.scene_bind_group_layout,
        );
        let panel_overlay = PanelOverlayRenderer::new(&device, surface_config.format);
        let depth_texture = DepthTexture::new(&device, surface_config.width, surface_config.height);

        let mut renderer = Self {
            device,
            queue,
            surface,
            surface_config,
            depth_texture,
            mesh_pipeline,
            scene_buffer,
            scene_bind_group,
            surfaces,
            active_biome: landscape.active_biome(),
            flat_bind_group,
            _flat_texture: flat_texture,
            _flat_normal_map: flat_normal_map,
            tree_mesh: None,
            sun_mesh,
            particle_renderer,
            sun_glow,
            panel_overlay,
        };
        renderer.sync(landscape, DirtyFlags::all());
        Ok(renderer)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_texture = DepthTexture::new(&self.device, width, height);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    /// Uploads whatever `dirty` marks as stale.
    pub fn sync(&mut self, landscape: &Landscape, dirty: DirtyFlags) {
        if dirty.contains(DirtyFlags::TERRAIN) {
            self.active_biome = landscape.active_biome();
        }
        if dirty.contains(DirtyFlags::TREES) {
            let (vertices, indices) = landscape.tree_batch();
            debug!("Uploading {} tree vertices", vertices.len());
            self.tree_mesh = GpuMesh::upload(&self.device, "Tree Mesh", &vertices, &indices);
        }
        let layers = [
            (DirtyFlags::CLOUDS, WeatherLayer::Clouds, landscape.clouds().positions()),
            (DirtyFlags::SNOW, WeatherLayer::Snow, landscape.snow().positions()),
            (DirtyFlags::RAIN, WeatherLayer::Rain, landscape.rain().positions()),
        ];
        for (flag, layer, positions) in layers {
            if dirty.contains(flag) {
                self.particle_renderer
                    .upload(&self.device, &self.queue, layer, positions);
            }
        }
        if dirty.contains(DirtyFlags::VISIBILITY) {
            let visibility = landscape.visibility();
            self.particle_renderer
                .set_visible(WeatherLayer::Snow, visibility.snow);
            self.particle_renderer
                .set_visible(WeatherLayer::Rain, visibility.rain);
        }
    }

    pub fn update_camera(&self, camera: &OrbitCamera) {
        let uniform = SceneUniform::from_camera(camera);
        self.queue
            .write_buffer(&self.scene_buffer, 0, bytemuck::bytes_of(&uniform));
        let (right, up) = camera.billboard_axes();
        self.particle_renderer.update_camera(&self.queue, right, up);
        self.sun_glow.update_camera(&self.queue, right, up);
    }

    pub fn update_panel(&mut self, lines: &[PanelLine]) {
        self.panel_overlay.update(
            &self.queue,
            self.surface_config.width,
            self.surface_config.height,
            lines,
        );
    }

    pub fn render_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Landscape Command Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Landscape Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
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
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(self.mesh_pipeline.pipeline());
            render_pass.set_bind_group(0, &self.scene_bind_group, &[]);
            if let Some(surface) = self
                .surfaces
                .iter()
                .find(|surface| surface.biome == self.active_biome)
            {
                if let Some(mesh) = &surface.mesh {
                    render_pass.set_bind_group(1, &surface.bind_group, &[]);
                    mesh.draw(&mut render_pass);
                }
            }

            render_pass.set_bind_group(1, &self.flat_bind_group, &[]);
            for mesh in [&self.tree_mesh, &self.sun_mesh].into_iter().flatten() {
                mesh.draw(&mut render_pass);
            }

            self.particle_renderer
                .render(&mut render_pass, &self.scene_bind_group);
            self.sun_glow.render(&mut render_pass, &self.scene_bind_group);
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Landscape Panel Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.panel_overlay.render(&mut render_pass);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn create_texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture_view: &wgpu::TextureView,
    normal_view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    label: &'static str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(texture_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(normal_view),
            },
        ],
    })
}
