use rayon::prelude::*;

use crate::geometry::{compute_vertex_normals, MeshData, MeshVertex};
use crate::terrain::HeightField;

pub const PLANE_SEGMENTS: u32 = 64;

/// Square grid in world XZ whose vertex heights come from a [`HeightField`].
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMesh {
    size: f32,
    segments: u32,
    data: MeshData,
}

impl TerrainMesh {
    /// Flat plane of `size` × `size` split into `segments` × `segments` quads,
    /// with texture coordinates repeated `uv_repeat` times across it.
    pub fn plane(size: f32, segments: u32, uv_repeat: f32) -> Self {
        let segments = segments.max(1);
        let row = segments + 1;
        let step = size / segments as f32;
        let half = size * 0.5;

        let mut data = MeshData::default();
        data.positions.reserve((row * row) as usize);
        data.uvs.reserve((row * row) as usize);

        for iz in 0..row {
            for ix in 0..row {
                data.positions
                    .push([ix as f32 * step - half, 0.0, iz as f32 * step - half]);
                data.uvs.push([
                    ix as f32 / segments as f32 * uv_repeat,
                    iz as f32 / segments as f32 * uv_repeat,
                ]);
            }
        }

        data.indices.reserve((segments * segments * 6) as usize);
        for iz in 0..segments {
            for ix in 0..segments {
                let a = ix + row * iz;
                let b = ix + row * (iz + 1);
                let c = ix + 1 + row * (iz + 1);
                let d = ix + 1 + row * iz;
                data.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        data.normals = vec![[0.0, 1.0, 0.0]; data.positions.len()];

        Self {
            size,
            segments,
            data,
        }
    }

    /// Sets every vertex height from `field`, then recomputes normals.
    pub fn displace(&mut self, field: &HeightField) {
        self.data.positions.par_iter_mut().for_each(|position| {
            position[1] = field.height(position[0], position[2]);
        });
        self.data.normals = compute_vertex_normals(&self.data.positions, &self.data.indices);
    }

    pub fn build(field: &HeightField, uv_repeat: f32, size: f32, segments: u32) -> Self {
        let mut mesh = Self::plane(size, segments, uv_repeat);
        mesh.displace(field);
        mesh
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn segments(&self) -> u32 {
        self.segments
    }

    pub fn data(&self) -> &MeshData {
        &self.data
    }

    pub fn vertices(&self, tint: [f32; 3]) -> (Vec<MeshVertex>, Vec<u32>) {
        let mut vertices = Vec::with_capacity(self.data.vertex_count());
        let mut indices = Vec::with_capacity(self.data.indices.len());
        self.data.append_to(&mut vertices, &mut indices, tint, 0.0);
        (vertices, indices)
    }
}
