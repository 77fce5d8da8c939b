use std::mem;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherLayer {
    Clouds,
    Snow,
    Rain,
}

impl WeatherLayer {
    pub const ALL: [WeatherLayer; 3] = [WeatherLayer::Clouds, WeatherLayer::Snow, WeatherLayer::Rain];

    fn index(self) -> usize {
        match self {
            Self::Clouds => 0,
            Self::Snow => 1,
            Self::Rain => 2,
        }
    }

    fn style(self) -> ParticleStyle {
        match self {
            Self::Clouds => ParticleStyle {
                color: [1.0, 1.0, 1.0, 0.35],
                size: 0.5,
                additive: true,
            },
            Self::Snow => ParticleStyle {
                color: [1.0, 1.0, 1.0, 0.6],
                size: 0.2,
                additive: true,
            },
            Self::Rain => ParticleStyle {
                color: [0.467, 0.467, 1.0, 0.9],
                size: 0.2,
                additive: false,
            },
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Clouds => "Cloud Particles",
            Self::Snow => "Snow Particles",
            Self::Rain => "Rain Particles",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ParticleStyle {
    color: [f32; 4],
    /// Billboard edge length in world units.
    size: f32,
    additive: bool,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct QuadVertex {
    corner: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct ParticleParams {
    color: [f32; 4],
    camera_right: [f32; 4],
    camera_up: [f32; 4],
    size: f32,
    _pad: [f32; 3],
}

struct ParticleLayerBuffers {
    style: ParticleStyle,
    instance_buffer: Option<wgpu::Buffer>,
    capacity: usize,
    instance_count: u32,
    params_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    visible: bool,
}

/// Draws every weather field as camera-facing quads, one instance per particle.
pub struct ParticleRenderer {
    additive_pipeline: wgpu::RenderPipeline,
    alpha_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    layers: Vec<ParticleLayerBuffers>,
}

/// Adds source colour weighted by its alpha; destination alpha is kept.
pub(crate) const ADDITIVE_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Zero,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

impl ParticleRenderer {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        scene_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/../../assets/shaders/particles.wgsl"
                ))
                .into(),
            ),
        });

        let params_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Particle Params Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Pipeline Layout"),
            bind_group_layouts: &[scene_bind_group_layout, &params_bind_group_layout],
            push_constant_ranges: &[],
        });

        let build_pipeline = |label: &str, blend: wgpu::BlendState| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[
                        wgpu::VertexBufferLayout {
                            array_stride: mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
                            step_mode: wgpu::VertexStepMode::Vertex,
                            attributes: &[wgpu::VertexAttribute {
                                offset: 0,
                                shader_location: 0,
                                format: wgpu::VertexFormat::Float32x2,
                            }],
                        },
                        wgpu::VertexBufferLayout {
                            array_stride: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                            step_mode: wgpu::VertexStepMode::Instance,
                            attributes: &[wgpu::VertexAttribute {
                                offset: 0,
                                shader_location: 1,
                                format: wgpu::VertexFormat::Float32x3,
                            }],
                        },
                    ],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: color_format,
                        blend: Some(blend),
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
            })
        };
        let additive_pipeline = build_pipeline("Additive Particle Pipeline", ADDITIVE_BLEND);
        let alpha_pipeline = build_pipeline("Alpha Particle Pipeline", wgpu::BlendState::ALPHA_BLENDING);

        let quad_vertices = [
            QuadVertex { corner: [-0.5, -0.5] },
            QuadVertex { corner: [0.5, -0.5] },
            QuadVertex { corner: [-0.5, 0.5] },
            QuadVertex { corner: [0.5, 0.5] },
        ];
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Quad Buffer"),
            contents: bytemuck::cast_slice(&quad_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let layers = WeatherLayer::ALL
            .iter()
            .map(|layer| {
                let style = layer.style();
                let params = layer_params(style, Vec3::X, Vec3::Y);
                let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(layer.label()),
                    contents: bytemuck::bytes_of(&params),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(layer.label()),
                    layout: &params_bind_group_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params_buffer.as_entire_binding(),
                    }],
                });
                ParticleLayerBuffers {
                    style,
                    instance_buffer: None,
                    capacity: 0,
                    instance_count: 0,
                    params_buffer,
                    bind_group,
                    visible: *layer == WeatherLayer::Clouds,
                }
            })
            .collect();

        Self {
            additive_pipeline,
            alpha_pipeline,
            vertex_buffer,
            layers,
        }
    }

    /// Replaces a layer's instances, growing its buffer when needed.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layer: WeatherLayer,
        positions: &[[f32; 3]],
    ) {
        let buffers = &mut self.layers[layer.index()];
        buffers.instance_count = positions.len() as u32;
        if positions.is_empty() {
            return;
        }

        if buffers.instance_buffer.is_none() || positions.len() > buffers.capacity {
            buffers.capacity = positions.len();
            buffers.instance_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(layer.label()),
                size: (buffers.capacity * mem::size_of::<[f32; 3]>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }
        if let Some(buffer) = &buffers.instance_buffer {
            queue.write_buffer(buffer, 0, bytemuck::cast_slice(positions));
        }
    }

    pub fn set_visible(&mut self, layer: WeatherLayer, visible: bool) {
        self.layers[layer.index()].visible = visible;
    }

    pub fn update_camera(&self, queue: &wgpu::Queue, camera_right: Vec3, camera_up: Vec3) {
        for buffers in &self.layers {
            let params = layer_params(buffers.style, camera_right, camera_up);
            queue.write_buffer(&buffers.params_buffer, 0, bytemuck::bytes_of(&params));
        }
    }

    pub fn render(&self, render_pass: &mut wgpu::RenderPass<'_>, scene_bind_group: &wgpu::BindGroup) {
        render_pass.set_bind_group(0, scene_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));

        // Alpha-blended rain before the additive layers.
        let mut order: Vec<&ParticleLayerBuffers> = self.layers.iter().collect();
        order.sort_by_key(|buffers| buffers.style.additive);

        for buffers in order {
            let Some(instance_buffer) = &buffers.instance_buffer else {
                continue;
            };
            if !buffers.visible || buffers.instance_count == 0 {
                continue;
            }
            let pipeline = if buffers.style.additive {
                &self.additive_pipeline
            } else {
                &self.alpha_pipeline
            };
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(1, &buffers.bind_group, &[]);
            render_pass.set_vertex_buffer(1, instance_buffer.slice(..));
            render_pass.draw(0..4, 0..buffers.instance_count);
        }
    }
}

fn layer_params(style: ParticleStyle, camera_right: Vec3, camera_up: Vec3) -> ParticleParams {
    ParticleParams {
        color: style.color,
        camera_right: camera_right.extend(0.0).to_array(),
        camera_up: camera_up.extend(0.0).to_array(),
        size: style.size,
        _pad: [0.0; 3],
    }
}

#[cfg(test)]
mod tests {
    use super::{WeatherLayer, ADDITIVE_BLEND};

    #[test]
    fn additive_blend_keeps_destination() {
        assert_eq!(ADDITIVE_BLEND.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(ADDITIVE_BLEND.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(ADDITIVE_BLEND.alpha.src_factor, wgpu::BlendFactor::Zero);
        assert_eq!(ADDITIVE_BLEND.alpha.dst_factor, wgpu::BlendFactor::One);
    }

    #[test]
    fn only_rain_is_alpha_blended() {
        let additive: Vec<bool> = WeatherLayer::ALL.iter().map(|layer| layer.style().additive).collect();
        assert_eq!(additive, vec![true, true, false]);
    }
}
