use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use image::{Rgba, RgbaImage};
use landscape_shared::geometry::{sphere, MeshVertex};
use wgpu::util::DeviceExt;

use crate::renderer::particles::ADDITIVE_BLEND;
use crate::renderer::textures::{create_sampler, GpuTexture};

pub const SUN_POSITION: Vec3 = Vec3::new(0.0, 100.0, 100.0);
pub const SUN_RADIUS: f32 = 5.0;
const SUN_SEGMENTS: u32 = 32;
const SUN_COLOR: [f32; 3] = [1.0, 1.0, 0.0];
const SUN_EMISSIVE: f32 = 0.9;
pub const SUN_LIGHT_INTENSITY: f32 = 1.8;
pub const SUN_LIGHT_RANGE: f32 = 200.0;
pub const SUN_LIGHT_DECAY: f32 = 2.0;
const GLOW_TEXTURE_SIZE: u32 = 16;
const GLOW_WORLD_SIZE: f32 = 30.0;

/// Radial gradient colour stops as (offset, rgba).
const GLOW_STOPS: [(f32, [f32; 4]); 3] = [
    (0.1, [1.0, 1.0, 0.0, 1.0]),
    (0.5, [64.0 / 255.0, 0.0, 0.0, 0.5]),
    (1.0, [0.0, 0.0, 0.0, 0.0]),
];

/// Sun body as an emissive sphere, ready for the mesh pipeline.
pub fn sun_mesh() -> (Vec<MeshVertex>, Vec<u32>) {
    let mut mesh = sphere(SUN_RADIUS, SUN_SEGMENTS, SUN_SEGMENTS);
    mesh.translate(SUN_POSITION);
    let mut vertices = Vec::with_capacity(mesh.vertex_count());
    let mut indices = Vec::with_capacity(mesh.indices.len());
    mesh.append_to(&mut vertices, &mut indices, SUN_COLOR, SUN_EMISSIVE);
    (vertices, indices)
}

fn gradient_at(t: f32) -> [f32; 4] {
    let (first_offset, first_color) = GLOW_STOPS[0];
    if t <= first_offset {
        return first_color;
    }
    for pair in GLOW_STOPS.windows(2) {
        let (start, from) = pair[0];
        let (end, to) = pair[1];
        if t <= end {
            let f = (t - start) / (end - start);
            return std::array::from_fn(|i| from[i] + (to[i] - from[i]) * f);
        }
    }
    GLOW_STOPS[GLOW_STOPS.len() - 1].1
}

/// Square RGBA image of the glow gradient, sampled at pixel centres.
pub fn glow_image(size: u32) -> RgbaImage {
    let half = size as f32 * 0.5;
    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 + 0.5 - half;
        let dy = y as f32 + 0.5 - half;
        let t = (dx * dx + dy * dy).sqrt() / half;
        let color = gradient_at(t);
        Rgba(color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
    })
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct GlowParams {
    center: [f32; 4],
    camera_right: [f32; 4],
    camera_up: [f32; 4],
    size: f32,
    _pad: [f32; 3],
}

impl GlowParams {
    fn new(camera_right: Vec3, camera_up: Vec3) -> Self {
        Self {
            center: SUN_POSITION.extend(1.0).to_array(),
            camera_right: camera_right.extend(0.0).to_array(),
            camera_up: camera_up.extend(0.0).to_array(),
            size: GLOW_WORLD_SIZE,
            _pad: [0.0; 3],
        }
    }
}

/// Additive camera-facing sprite around the sun.
pub struct SunGlowRenderer {
    pipeline: wgpu::RenderPipeline,
    params_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    _texture: GpuTexture,
}

impl SunGlowRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        scene_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sun Glow Shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/../../assets/shaders/glow.wgsl"
                ))
                .into(),
            ),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sun Glow Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sun Glow Pipeline Layout"),
            bind_group_layouts: &[scene_bind_group_layout, &bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sun Glow Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(ADDITIVE_BLEND),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let texture = GpuTexture::from_image(
            device,
            queue,
            &glow_image(GLOW_TEXTURE_SIZE),
            wgpu::TextureFormat::Rgba8UnormSrgb,
            "Sun Glow Texture",
        );
        let sampler = create_sampler(device, wgpu::AddressMode::ClampToEdge, "Sun Glow Sampler");
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sun Glow Params Buffer"),
            contents: bytemuck::bytes_of(&GlowParams::new(Vec3::X, Vec3::Y)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sun Glow Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Self {
            pipeline,
            params_buffer,
            bind_group,
            _texture: texture,
        }
    }

    pub fn update_camera(&self, queue: &wgpu::Queue, camera_right: Vec3, camera_up: Vec3) {
        let params = GlowParams::new(camera_right, camera_up);
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));
    }

    pub fn render(&self, render_pass: &mut wgpu::RenderPass<'_>, scene_bind_group: &wgpu::BindGroup) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, scene_bind_group, &[]);
        render_pass.set_bind_group(1, &self.bind_group, &[]);
        render_pass.draw(0..4, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::{glow_image, gradient_at, sun_mesh, SUN_POSITION, SUN_RADIUS};

    #[test]
    fn gradient_follows_colour_stops() {
        assert_eq!(gradient_at(0.0), [1.0, 1.0, 0.0, 1.0]);
        assert_eq!(gradient_at(0.1), [1.0, 1.0, 0.0, 1.0]);
        let mid = gradient_at(0.5);
        assert!((mid[3] - 0.5).abs() < 1e-6);
        assert_eq!(gradient_at(1.0)[3], 0.0);
        assert_eq!(gradient_at(2.0)[3], 0.0);
    }

    #[test]
    fn glow_is_bright_in_centre_and_clear_at_corners() {
        let image = glow_image(16);
        assert_eq!(image.dimensions(), (16, 16));
        let centre = image.get_pixel(8, 8).0;
        assert_eq!(centre[0], 255);
        assert!(centre[3] > 200);
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        assert!(image.get_pixel(8, 8).0[3] > image.get_pixel(12, 8).0[3]);
    }

    #[test]
    fn sun_body_sits_on_its_sphere() {
        let (vertices, indices) = sun_mesh();
        assert!(!indices.is_empty());
        for vertex in &vertices {
            let distance = (glam::Vec3::from_array(vertex.position) - SUN_POSITION).length();
            assert!((distance - SUN_RADIUS).abs() < 1e-3);
            assert!(vertex.emissive > 0.0);
        }
    }
}
