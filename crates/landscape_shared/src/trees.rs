use glam::Vec3;
use rand::Rng;

use crate::geometry::{cylinder, hex_color, sphere, MeshData, MeshVertex};
use crate::terrain::{HeightField, HALF_EXTENT};

const TRUNK_COLOR: u32 = 0x8B4513;
const LEAFY_CANOPY_COLOR: u32 = 0x228B22;
const SNOWY_CANOPY_COLOR: u32 = 0xF0F8FF;
const TRUNK_BASE_HEIGHT: f32 = 1.0;
const TRUNK_BASE_RADIUS: f32 = 0.2;
const CANOPY_BASE_RADIUS: f32 = 0.4;
const CANOPY_BASE_HEIGHT: f32 = 1.5;
const CANOPY_STRETCH: f32 = 1.5;
const CANOPY_NOISE_LEVEL: f32 = 1.9;
const MESH_SEGMENTS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeKind {
    Leafy,
    Snowy,
}

impl TreeKind {
    pub fn canopy_color(self) -> [f32; 3] {
        match self {
            Self::Leafy => hex_color(LEAFY_CANOPY_COLOR),
            Self::Snowy => hex_color(SNOWY_CANOPY_COLOR),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trunk {
    pub center: Vec3,
    pub radius: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Canopy {
    pub center: Vec3,
    pub radius: f32,
    pub height: f32,
    /// Jittered ellipsoid in canopy-local space.
    pub mesh: MeshData,
}

/// One trunk + canopy pair standing on the terrain.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeInstance {
    pub kind: TreeKind,
    pub ground: Vec3,
    pub trunk: Trunk,
    pub canopy: Canopy,
}

impl TreeInstance {
    pub fn append_to(&self, vertices: &mut Vec<MeshVertex>, indices: &mut Vec<u32>) {
        let mut trunk = cylinder(self.trunk.radius, self.trunk.height, MESH_SEGMENTS);
        trunk.translate(self.trunk.center);
        trunk.append_to(vertices, indices, hex_color(TRUNK_COLOR), 0.0);

        let mut canopy = self.canopy.mesh.clone();
        canopy.translate(self.canopy.center);
        canopy.append_to(vertices, indices, self.kind.canopy_color(), 0.0);
    }
}

/// Builds a single vertex/index batch for a whole tree list.
pub fn batch_trees(trees: &[TreeInstance]) -> (Vec<MeshVertex>, Vec<u32>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for tree in trees {
        tree.append_to(&mut vertices, &mut indices);
    }
    (vertices, indices)
}

#[derive(Debug, Clone)]
pub struct TreePlacer {
    pub half_extent: f32,
    pub canopy_noise: f32,
    pub segments: u32,
}

impl Default for TreePlacer {
    fn default() -> Self {
        Self {
            half_extent: HALF_EXTENT,
            canopy_noise: CANOPY_NOISE_LEVEL,
            segments: MESH_SEGMENTS,
        }
    }
}

impl TreePlacer {
    pub fn place<R: Rng + ?Sized>(
        &self,
        kind: TreeKind,
        count: usize,
        field: &HeightField,
        rng: &mut R,
    ) -> Vec<TreeInstance> {
        (0..count)
            .map(|_| {
                let x = rng.gen_range(-self.half_extent..self.half_extent);
                let z = rng.gen_range(-self.half_extent..self.half_extent);
                self.place_at(kind, x, z, field, rng)
            })
            .collect()
    }

    pub fn place_at<R: Rng + ?Sized>(
        &self,
        kind: TreeKind,
        x: f32,
        z: f32,
        field: &HeightField,
        rng: &mut R,
    ) -> TreeInstance {
        let y = field.height(x, z);
        let height_factor = rng.gen_range(0.75..1.25);
        let radius_factor = rng.gen_range(0.5..1.0);

        let trunk_height = TRUNK_BASE_HEIGHT * height_factor;
        let trunk = Trunk {
            center: Vec3::new(x, y + trunk_height * 0.5, z),
            radius: TRUNK_BASE_RADIUS * radius_factor,
            height: trunk_height,
        };

        let canopy_radius = CANOPY_BASE_RADIUS * radius_factor;
        let canopy_height = CANOPY_BASE_HEIGHT * height_factor;
        let mut mesh = sphere(canopy_radius, self.segments, self.segments);
        mesh.scale(Vec3::new(1.0, CANOPY_STRETCH, 1.0));
        let half_noise = self.canopy_noise * 0.5;
        if half_noise > 0.0 {
            for position in &mut mesh.positions {
                for axis in position.iter_mut() {
                    *axis += rng.gen_range(-half_noise..half_noise);
                }
            }
        }
        mesh.recompute_normals();

        TreeInstance {
            kind,
            ground: Vec3::new(x, y, z),
            trunk,
            canopy: Canopy {
                center: Vec3::new(x, y + trunk_height + canopy_height * 0.5, z),
                radius: canopy_radius,
                height: canopy_height,
                mesh,
            },
        }
    }
}

/// Tree lists per kind, cleared wholesale on every biome switch.
#[derive(Debug, Clone, Default)]
pub struct TreeSets {
    pub forest_trees: Vec<TreeInstance>,
    pub snowy_trees: Vec<TreeInstance>,
}

impl TreeSets {
    pub fn clear(&mut self) {
        self.forest_trees.clear();
        self.snowy_trees.clear();
    }

    pub fn list(&self, kind: TreeKind) -> &[TreeInstance] {
        match kind {
            TreeKind::Leafy => &self.forest_trees,
            TreeKind::Snowy => &self.snowy_trees,
        }
    }

    pub fn list_mut(&mut self, kind: TreeKind) -> &mut Vec<TreeInstance> {
        match kind {
            TreeKind::Leafy => &mut self.forest_trees,
            TreeKind::Snowy => &mut self.snowy_trees,
        }
    }

    pub fn total(&self) -> usize {
        self.forest_trees.len() + self.snowy_trees.len()
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::{batch_trees, TreeKind, TreePlacer, TreeSets};
    use crate::terrain::{HeightField, JitterMode, TerrainParams};

    fn field() -> HeightField {
        HeightField::generate(
            TerrainParams::default(),
            4,
            JitterMode::Fixed,
            &mut StdRng::seed_from_u64(3),
        )
    }

    #[test]
    fn trees_stand_on_the_height_field() {
        let field = field();
        let trees = TreePlacer::default().place(TreeKind::Leafy, 25, &field, &mut StdRng::seed_from_u64(9));
        assert_eq!(trees.len(), 25);

        for tree in &trees {
            let ground = field.height(tree.ground.x, tree.ground.z);
            assert_eq!(tree.ground.y, ground);
            let trunk_base = tree.trunk.center.y - tree.trunk.height * 0.5;
            assert!((trunk_base - ground).abs() < 1e-4);
            assert!(tree.ground.x >= -50.0 && tree.ground.x < 50.0);
            assert!(tree.ground.z >= -50.0 && tree.ground.z < 50.0);
            assert!(tree.canopy.center.y > tree.trunk.center.y);
        }
    }

    #[test]
    fn dimensions_stay_in_randomized_ranges() {
        let field = field();
        let trees = TreePlacer::default().place(TreeKind::Snowy, 40, &field, &mut StdRng::seed_from_u64(11));
        for tree in &trees {
            assert!((0.75..1.25).contains(&tree.trunk.height));
            assert!((0.1..0.2).contains(&tree.trunk.radius));
            assert!((0.2..0.4).contains(&tree.canopy.radius));
            assert!((1.125..1.875).contains(&tree.canopy.height));
        }
    }

    #[test]
    fn canopy_jitter_is_bounded_by_noise_level() {
        let placer = TreePlacer {
            segments: 8,
            ..TreePlacer::default()
        };
        let tree = placer.place_at(TreeKind::Leafy, 0.0, 0.0, &field(), &mut StdRng::seed_from_u64(5));
        // Stretched ellipsoid extent plus half the noise level on each axis.
        let max_extent = tree.canopy.radius * 1.5 + 0.95;
        for position in &tree.canopy.mesh.positions {
            assert!(position.iter().all(|axis| axis.abs() <= max_extent));
        }
    }

    #[test]
    fn batch_contains_trunk_and_canopy_for_every_tree() {
        let placer = TreePlacer {
            segments: 8,
            ..TreePlacer::default()
        };
        let trees = placer.place(TreeKind::Leafy, 3, &field(), &mut StdRng::seed_from_u64(2));
        let (vertices, indices) = batch_trees(&trees);
        let canopy_vertices = 9 * 9;
        let trunk_vertices = 33 * 2 + 2 * (33 + 1);
        assert_eq!(vertices.len(), 3 * (canopy_vertices + trunk_vertices));
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn tree_sets_clear_both_lists() {
        let field = field();
        let placer = TreePlacer {
            segments: 4,
            ..TreePlacer::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut sets = TreeSets::default();
        sets.list_mut(TreeKind::Leafy)
            .extend(placer.place(TreeKind::Leafy, 2, &field, &mut rng));
        sets.list_mut(TreeKind::Snowy)
            .extend(placer.place(TreeKind::Snowy, 3, &field, &mut rng));
        assert_eq!(sets.total(), 5);

        sets.clear();
        assert!(sets.forest_trees.is_empty());
        assert!(sets.snowy_trees.is_empty());
    }
}
