use std::f32::consts::{PI, TAU};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Vertex layout shared by every lit mesh: terrain, trees and the sun.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 3],
    pub emissive: f32,
}
const _: [(); 48] = [(); std::mem::size_of::<MeshVertex>()];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn scale(&mut self, factor: Vec3) {
        for position in &mut self.positions {
            *position = (Vec3::from_array(*position) * factor).to_array();
        }
    }

    pub fn translate(&mut self, offset: Vec3) {
        for position in &mut self.positions {
            *position = (Vec3::from_array(*position) + offset).to_array();
        }
    }

    pub fn recompute_normals(&mut self) {
        self.normals = compute_vertex_normals(&self.positions, &self.indices);
    }

    /// Appends this mesh to a vertex/index batch with a flat colour.
    pub fn append_to(
        &self,
        vertices: &mut Vec<MeshVertex>,
        indices: &mut Vec<u32>,
        color: [f32; 3],
        emissive: f32,
    ) {
        let base = vertices.len() as u32;
        for (i, position) in self.positions.iter().enumerate() {
            vertices.push(MeshVertex {
                position: *position,
                normal: self.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                uv: self.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
                color,
                emissive,
            });
        }
        indices.extend(self.indices.iter().map(|index| base + index));
    }
}

/// UV sphere centred on the origin.
pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);
    let mut mesh = MeshData::default();
    let mut grid = Vec::with_capacity(height_segments as usize + 1);

    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let mut row = Vec::with_capacity(width_segments as usize + 1);
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let direction = Vec3::new(
                -(u * TAU).cos() * (v * PI).sin(),
                (v * PI).cos(),
                (u * TAU).sin() * (v * PI).sin(),
            );
            row.push(mesh.positions.len() as u32);
            mesh.positions.push((direction * radius).to_array());
            mesh.normals.push(direction.normalize_or_zero().to_array());
            mesh.uvs.push([u, 1.0 - v]);
        }
        grid.push(row);
    }

    for iy in 0..height_segments as usize {
        for ix in 0..width_segments as usize {
            let a = grid[iy][ix + 1];
            let b = grid[iy][ix];
            let c = grid[iy + 1][ix];
            let d = grid[iy + 1][ix + 1];
            if iy != 0 {
                mesh.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments as usize - 1 {
                mesh.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    mesh
}

/// Capped cylinder centred on the origin, axis along +Y.
pub fn cylinder(radius: f32, height: f32, radial_segments: u32) -> MeshData {
    let radial_segments = radial_segments.max(3);
    let half_height = height * 0.5;
    let mut mesh = MeshData::default();

    for (row, y) in [half_height, -half_height].into_iter().enumerate() {
        for ix in 0..=radial_segments {
            let u = ix as f32 / radial_segments as f32;
            let theta = u * TAU;
            let (sin, cos) = theta.sin_cos();
            mesh.positions.push([radius * sin, y, radius * cos]);
            mesh.normals.push([sin, 0.0, cos]);
            mesh.uvs.push([u, 1.0 - row as f32]);
        }
    }

    let ring = radial_segments + 1;
    for ix in 0..radial_segments {
        let a = ix;
        let b = ix + ring;
        let c = ix + 1 + ring;
        let d = ix + 1;
        mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
    }

    for (y, up) in [(half_height, 1.0_f32), (-half_height, -1.0_f32)] {
        let center = mesh.positions.len() as u32;
        mesh.positions.push([0.0, y, 0.0]);
        mesh.normals.push([0.0, up, 0.0]);
        mesh.uvs.push([0.5, 0.5]);

        let first = mesh.positions.len() as u32;
        for ix in 0..=radial_segments {
            let theta = ix as f32 / radial_segments as f32 * TAU;
            let (sin, cos) = theta.sin_cos();
            mesh.positions.push([radius * sin, y, radius * cos]);
            mesh.normals.push([0.0, up, 0.0]);
            mesh.uvs.push([cos * 0.5 + 0.5, sin * 0.5 * up + 0.5]);
        }

        for ix in 0..radial_segments {
            let current = first + ix;
            let next = first + ix + 1;
            if up > 0.0 {
                mesh.indices.extend_from_slice(&[center, current, next]);
            } else {
                mesh.indices.extend_from_slice(&[center, next, current]);
            }
        }
    }

    mesh
}

/// Area-weighted vertex normals. Vertices touched by no face point up.
pub fn compute_vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut accum = vec![Vec3::ZERO; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [ia, ib, ic] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        if ia >= positions.len() || ib >= positions.len() || ic >= positions.len() {
            continue;
        }
        let a = Vec3::from_array(positions[ia]);
        let b = Vec3::from_array(positions[ib]);
        let c = Vec3::from_array(positions[ic]);
        let face = (b - a).cross(c - a);
        accum[ia] += face;
        accum[ib] += face;
        accum[ic] += face;
    }

    accum
        .into_iter()
        .map(|normal| {
            if normal.length_squared() > f32::EPSILON {
                normal.normalize().to_array()
            } else {
                [0.0, 1.0, 0.0]
            }
        })
        .collect()
}

pub fn hex_color(rgb: u32) -> [f32; 3] {
    [
        ((rgb >> 16) & 0xFF) as f32 / 255.0,
        ((rgb >> 8) & 0xFF) as f32 / 255.0,
        (rgb & 0xFF) as f32 / 255.0,
    ]
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::{compute_vertex_normals, cylinder, hex_color, sphere};

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let mesh = sphere(2.0, 32, 32);
        assert_eq!(mesh.vertex_count(), 33 * 33);
        for position in &mesh.positions {
            assert!((Vec3::from_array(*position).length() - 2.0).abs() < 1e-4);
        }
        // Poles drop one triangle per segment.
        assert_eq!(mesh.indices.len(), (32 * 32 * 2 - 2 * 32) * 3);
    }

    #[test]
    fn cylinder_spans_requested_height() {
        let mesh = cylinder(0.2, 1.5, 16);
        let min_y = mesh.positions.iter().map(|p| p[1]).fold(f32::MAX, f32::min);
        let max_y = mesh.positions.iter().map(|p| p[1]).fold(f32::MIN, f32::max);
        assert!((min_y + 0.75).abs() < 1e-6);
        assert!((max_y - 0.75).abs() < 1e-6);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn flat_quad_normals_point_up() {
        let positions = [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 0.0, 0.0]];
        let indices = [0, 1, 3, 1, 2, 3];
        for normal in compute_vertex_normals(&positions, &indices) {
            assert!((Vec3::from_array(normal) - Vec3::Y).length() < 1e-6);
        }
    }

    #[test]
    fn hex_color_splits_channels() {
        assert_eq!(hex_color(0xFF0000), [1.0, 0.0, 0.0]);
        let brown = hex_color(0x8B4513);
        assert!((brown[0] - 139.0 / 255.0).abs() < 1e-6);
        assert!((brown[2] - 19.0 / 255.0).abs() < 1e-6);
    }
}
