use std::mem;

use bytemuck::{Pod, Zeroable};

use crate::ui::panel::PanelLine;

const MAX_QUADS: usize = 8_000;
const MAX_VERTICES: usize = MAX_QUADS * 4;
const MAX_INDICES: usize = MAX_QUADS * 6;

const PANEL_MARGIN_PX: f32 = 10.0;
const PANEL_PADDING_PX: f32 = 8.0;
const FONT_PIXEL_SCALE: f32 = 2.0;
const LINE_GAP_PX: f32 = 4.0;
const GLYPH_ROWS: usize = 7;
const HIGHLIGHT_BLEED_PX: f32 = 2.0;

const PANEL_BG_COLOR: [f32; 4] = [0.03, 0.03, 0.04, 0.7];
const HIGHLIGHT_COLOR: [f32; 4] = [0.25, 0.35, 0.55, 0.6];
const TEXT_COLOR: [f32; 4] = [0.95, 0.95, 0.95, 1.0];

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct UiVertex {
    position: [f32; 2],
    color: [f32; 4],
}

/// Screen-space quads for the settings panel, drawn over the scene.
pub struct PanelOverlayRenderer {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl PanelOverlayRenderer {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Panel Shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/../../assets/shaders/ui.wgsl"
                ))
                .into(),
            ),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Panel Pipeline Layout"),
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });

        let attributes = &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x4,
            },
        ];

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Panel Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: mem::size_of::<UiVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Panel Vertex Buffer"),
            size: (MAX_VERTICES * mem::size_of::<UiVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Panel Index Buffer"),
            size: (MAX_INDICES * mem::size_of::<u16>()) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pipeline,
            vertex_buffer,
            index_buffer,
            index_count: 0,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, width: u32, height: u32, lines: &[PanelLine]) {
        let mut vertices = panel_vertices(lines, width.max(1) as f32, height.max(1) as f32);

        let mut quad_count = vertices.len() / 4;
        if quad_count > MAX_QUADS {
            quad_count = MAX_QUADS;
            vertices.truncate(MAX_VERTICES);
        }

        let mut indices = Vec::with_capacity(quad_count * 6);
        for i in 0..quad_count {
            let base = (i * 4) as u16;
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        self.index_count = indices.len() as u32;

        if !vertices.is_empty() {
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
        }
        if !indices.is_empty() {
            queue.write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&indices));
        }
    }

    pub fn render(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        if self.index_count == 0 {
            return;
        }

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// Lays the panel out in the top-right corner: background, row highlight, text.
fn panel_vertices(lines: &[PanelLine], screen_w: f32, screen_h: f32) -> Vec<UiVertex> {
    let mut vertices = Vec::new();
    if lines.is_empty() {
        return vertices;
    }

    let char_stride_px = 6.0 * FONT_PIXEL_SCALE;
    let line_height_px = 7.0 * FONT_PIXEL_SCALE + LINE_GAP_PX;
    let longest_line_len = lines
        .iter()
        .map(|line| line.text.chars().count())
        .max()
        .unwrap_or(0);
    let text_width_px = if longest_line_len == 0 {
        0.0
    } else {
        longest_line_len as f32 * char_stride_px - FONT_PIXEL_SCALE
    };
    let text_height_px = lines.len() as f32 * line_height_px - LINE_GAP_PX;

    let panel_width_px = text_width_px + PANEL_PADDING_PX * 2.0;
    let panel_height_px = text_height_px + PANEL_PADDING_PX * 2.0;
    let panel_x_px = (screen_w - PANEL_MARGIN_PX - panel_width_px).max(0.0);
    create_quad_px(
        &mut vertices,
        panel_x_px,
        PANEL_MARGIN_PX,
        panel_width_px,
        panel_height_px,
        screen_w,
        screen_h,
        PANEL_BG_COLOR,
    );

    let text_x = panel_x_px + PANEL_PADDING_PX;
    let mut text_y = PANEL_MARGIN_PX + PANEL_PADDING_PX;
    for line in lines {
        if line.highlighted {
            create_quad_px(
                &mut vertices,
                text_x - HIGHLIGHT_BLEED_PX,
                text_y - HIGHLIGHT_BLEED_PX,
                text_width_px + HIGHLIGHT_BLEED_PX * 2.0,
                7.0 * FONT_PIXEL_SCALE + HIGHLIGHT_BLEED_PX * 2.0,
                screen_w,
                screen_h,
                HIGHLIGHT_COLOR,
            );
        }
        render_text_px(
            &mut vertices,
            &line.text,
            text_x,
            text_y,
            FONT_PIXEL_SCALE,
            screen_w,
            screen_h,
            TEXT_COLOR,
        );
        text_y += line_height_px;
    }

    vertices
}

fn create_quad_px(
    vertices: &mut Vec<UiVertex>,
    x_px: f32,
    y_px: f32,
    w_px: f32,
    h_px: f32,
    screen_w: f32,
    screen_h: f32,
    color: [f32; 4],
) {
    let (x0, y0) = screen_to_ndc(x_px, y_px, screen_w, screen_h);
    let (x1, y1) = screen_to_ndc(x_px + w_px, y_px + h_px, screen_w, screen_h);

    vertices.extend_from_slice(&[
        UiVertex {
            position: [x0, y1],
            color,
        },
        UiVertex {
            position: [x1, y1],
            color,
        },
        UiVertex {
            position: [x1, y0],
            color,
        },
        UiVertex {
            position: [x0, y0],
            color,
        },
    ]);
}

fn render_text_px(
    vertices: &mut Vec<UiVertex>,
    text: &str,
    origin_x_px: f32,
    origin_y_px: f32,
    pixel_scale: f32,
    screen_w: f32,
    screen_h: f32,
    color: [f32; 4],
) {
    let mut x_px = origin_x_px;
    let char_stride = 6.0 * pixel_scale;

    for ch in text.chars() {
        let Some(bits) = glyph(ch.to_ascii_uppercase()) else {
            x_px += char_stride;
            continue;
        };

        for row_idx in 0..GLYPH_ROWS {
            let row_bits = glyph_row(bits, row_idx);
            for col in 0..5 {
                if (row_bits & (0x10 >> col)) == 0 {
                    continue;
                }
                create_quad_px(
                    vertices,
                    x_px + col as f32 * pixel_scale,
                    origin_y_px + row_idx as f32 * pixel_scale,
                    pixel_scale,
                    pixel_scale,
                    screen_w,
                    screen_h,
                    color,
                );
            }
        }
        x_px += char_stride;
    }
}

fn screen_to_ndc(x_px: f32, y_px: f32, screen_w: f32, screen_h: f32) -> (f32, f32) {
    ((x_px / screen_w) * 2.0 - 1.0, 1.0 - (y_px / screen_h) * 2.0)
}

/// 5x7 glyph packed row-major, top row in the highest five bits.
fn glyph(ch: char) -> Option<u64> {
    Some(match ch {
        'A' => 0x1151FC631,
        'B' => 0x7A31F463E,
        'C' => 0x3A308422E,
        'D' => 0x72518C65C,
        'E' => 0x7E10F421F,
        'F' => 0x7E10F4210,
        'G' => 0x3A30BC62F,
        'H' => 0x4631FC631,
        'I' => 0x38842108E,
        'J' => 0x1C4210A4C,
        'K' => 0x4654C5251,
        'L' => 0x42108421F,
        'M' => 0x4775AC631,
        'N' => 0x47359C631,
        'O' => 0x3A318C62E,
        'P' => 0x7A31F4210,
        'Q' => 0x3A318D64D,
        'R' => 0x7A31F5251,
        'S' => 0x3A307062E,
        'T' => 0x7C8421084,
        'U' => 0x46318C62E,
        'V' => 0x46318C544,
        'W' => 0x4631AD771,
        'X' => 0x462A22A31,
        'Y' => 0x462A21084,
        'Z' => 0x7C222221F,
        '0' => 0x3A33AE62E,
        '1' => 0x11842108E,
        '2' => 0x3A213221F,
        '3' => 0x3A213062E,
        '4' => 0x08CA97C42,
        '5' => 0x7E1E0862E,
        '6' => 0x1910F462E,
        '7' => 0x7C2222108,
        '8' => 0x3A317462E,
        '9' => 0x3A317844C,
        ' ' => 0x000000000,
        '.' => 0x00000018C,
        ':' => 0x018C03180,
        '-' => 0x0000F8000,
        '>' => 0x410411110,
        '(' => 0x088842082,
        ')' => 0x208210888,
        _ => return None,
    })
}

fn glyph_row(bits: u64, row: usize) -> u8 {
    ((bits >> ((GLYPH_ROWS - 1 - row) * 5)) & 0x1F) as u8
}
