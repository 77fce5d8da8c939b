use rand::Rng;

use crate::density::CloudDensity;
use crate::terrain::{HeightField, HALF_EXTENT, PLANE_SIZE};

pub const CLOUD_BASE_HEIGHT: f32 = 55.0;
pub const CLOUD_BAND: f32 = 1.0;
pub const SNOW_FALL_RATE: f32 = 0.1;
pub const SNOW_RELEASE_INTERVAL_SECS: f32 = 0.1;
pub const SNOW_RELEASE_FRACTION: f32 = 0.01;
pub const RAIN_TOP_HEIGHT: f32 = CLOUD_BASE_HEIGHT;
const CLOUD_BOB_AMPLITUDE: f32 = 0.001;
const CLOUD_BOB_SPATIAL: f32 = 0.0001;
const MAX_SPAWN_ATTEMPTS: usize = 64;
const GROUND_CLEARANCE: f32 = 0.5;

/// Wraps a coordinate that left `[-HALF_EXTENT, HALF_EXTENT]` onto the opposite edge.
fn wrap_edge(value: f32) -> f32 {
    if value > HALF_EXTENT {
        -HALF_EXTENT
    } else if value < -HALF_EXTENT {
        HALF_EXTENT
    } else {
        value
    }
}

/// Maps any coordinate into `[-HALF_EXTENT, HALF_EXTENT)` by plane periods.
fn wrap_periodic(value: f32) -> f32 {
    (value + HALF_EXTENT).rem_euclid(PLANE_SIZE) - HALF_EXTENT
}

fn random_column<R: Rng + ?Sized>(rng: &mut R) -> (f32, f32) {
    (
        rng.gen_range(-HALF_EXTENT..HALF_EXTENT),
        rng.gen_range(-HALF_EXTENT..HALF_EXTENT),
    )
}

#[derive(Debug, Clone)]
pub struct CloudField {
    positions: Vec<[f32; 3]>,
    drift: f32,
}

impl CloudField {
    pub fn new<R: Rng + ?Sized>(count: usize, density: &CloudDensity, rng: &mut R) -> Self {
        let positions = (0..count)
            .map(|_| {
                let mut candidate = [0.0; 3];
                for _ in 0..MAX_SPAWN_ATTEMPTS {
                    let (x, z) = random_column(rng);
                    let y = CLOUD_BASE_HEIGHT + rng.gen::<f32>() * CLOUD_BAND;
                    candidate = [x, y, z];
                    if density.is_dense(x, y, z) {
                        break;
                    }
                }
                let [x, y, z] = candidate;
                [x, y + density.vertical_offset(x, y, z), z]
            })
            .collect();

        Self {
            positions,
            drift: 0.0,
        }
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    /// Total translation applied along each horizontal axis since creation.
    pub fn drift(&self) -> f32 {
        self.drift
    }

    pub fn step(&mut self, speed: f32, elapsed_secs: f32) {
        self.drift += speed;
        for position in &mut self.positions {
            position[0] = wrap_edge(position[0] + speed);
            position[2] = wrap_edge(position[2] + speed);
            position[1] += (elapsed_secs + position[0] * position[2] * CLOUD_BOB_SPATIAL).sin()
                * CLOUD_BOB_AMPLITUDE;
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnowField {
    positions: Vec<[f32; 3]>,
    falling: Vec<bool>,
    fall_rate: f32,
    last_release_secs: f32,
}

impl SnowField {
    pub fn new<R: Rng + ?Sized>(
        count: usize,
        density: &CloudDensity,
        field: &HeightField,
        rng: &mut R,
    ) -> Self {
        let positions = (0..count)
            .map(|_| spawn_snowflake(density, field, 0.0, rng))
            .collect();
        Self {
            positions,
            falling: vec![false; count],
            fall_rate: SNOW_FALL_RATE,
            last_release_secs: 0.0,
        }
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn falling_count(&self) -> usize {
        self.falling.iter().filter(|falling| **falling).count()
    }

    /// Re-seats every flake above `field`, e.g. after the terrain changed.
    pub fn respawn<R: Rng + ?Sized>(&mut self, density: &CloudDensity, field: &HeightField, drift: f32, rng: &mut R) {
        for (position, falling) in self.positions.iter_mut().zip(self.falling.iter_mut()) {
            *position = spawn_snowflake(density, field, drift, rng);
            *falling = false;
        }
    }

    pub fn step<R: Rng + ?Sized>(
        &mut self,
        elapsed_secs: f32,
        density: &CloudDensity,
        field: &HeightField,
        drift: f32,
        rng: &mut R,
    ) {
        let count = self.positions.len();
        if count == 0 {
            return;
        }

        if elapsed_secs - self.last_release_secs > SNOW_RELEASE_INTERVAL_SECS {
            self.last_release_secs = elapsed_secs;
            let release = (rng.gen::<f32>() * count as f32 * SNOW_RELEASE_FRACTION).floor() as usize;
            for _ in 0..release {
                let index = rng.gen_range(0..count);
                self.falling[index] = true;
            }
        }

        for (position, falling) in self.positions.iter_mut().zip(self.falling.iter_mut()) {
            if *falling {
                position[1] -= self.fall_rate;
            }
            if position[1] <= field.height(position[0], position[2]) {
                *position = spawn_snowflake(density, field, drift, rng);
                *falling = false;
            }
        }
    }
}

/// Resting position in the cloud band, under a dense part of the drifted
/// clouds, above the terrain.
fn spawn_snowflake<R: Rng + ?Sized>(
    density: &CloudDensity,
    field: &HeightField,
    drift: f32,
    rng: &mut R,
) -> [f32; 3] {
    let mut candidate = [0.0; 3];
    for _ in 0..MAX_SPAWN_ATTEMPTS {
        let (x, z) = random_column(rng);
        let y = CLOUD_BASE_HEIGHT + rng.gen::<f32>() * CLOUD_BAND;
        candidate = [x, y, z];
        let source_x = wrap_periodic(x - drift);
        let source_z = wrap_periodic(z - drift);
        if density.is_dense(source_x, CLOUD_BASE_HEIGHT, source_z) && y > field.height(x, z) {
            return candidate;
        }
    }
    lift_above_ground(candidate, field)
}

#[derive(Debug, Clone)]
pub struct RainField {
    positions: Vec<[f32; 3]>,
}

impl RainField {
    pub fn new<R: Rng + ?Sized>(count: usize, field: &HeightField, rng: &mut R) -> Self {
        let positions = (0..count)
            .map(|_| {
                let top = RAIN_TOP_HEIGHT + rng.gen::<f32>() * CLOUD_BAND;
                spawn_raindrop(field, top, rng)
            })
            .collect();
        Self { positions }
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn respawn<R: Rng + ?Sized>(&mut self, field: &HeightField, rng: &mut R) {
        for position in &mut self.positions {
            *position = spawn_raindrop(field, RAIN_TOP_HEIGHT, rng);
        }
    }

    pub fn step<R: Rng + ?Sized>(&mut self, fall_rate: f32, field: &HeightField, rng: &mut R) {
        for position in &mut self.positions {
            position[1] -= fall_rate;
            if position[1] <= field.height(position[0], position[2]) {
                *position = spawn_raindrop(field, RAIN_TOP_HEIGHT, rng);
            }
        }
    }
}

fn spawn_raindrop<R: Rng + ?Sized>(field: &HeightField, top: f32, rng: &mut R) -> [f32; 3] {
    let mut candidate = [0.0; 3];
    for _ in 0..MAX_SPAWN_ATTEMPTS {
        let (x, z) = random_column(rng);
        candidate = [x, top, z];
        if top > field.height(x, z) {
            return candidate;
        }
    }
    lift_above_ground(candidate, field)
}

fn lift_above_ground(mut position: [f32; 3], field: &HeightField) -> [f32; 3] {
    let ground = field.height(position[0], position[2]);
    if position[1] <= ground {
        position[1] = ground + GROUND_CLEARANCE;
    }
    position
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::{wrap_periodic, CloudField, RainField, SnowField, CLOUD_BASE_HEIGHT};
    use crate::density::CloudDensity;
    use crate::terrain::{HeightField, JitterMode, TerrainParams};

    fn field(rng: &mut StdRng) -> HeightField {
        HeightField::generate(TerrainParams::default(), 4, JitterMode::Fixed, rng)
    }

    fn assert_above_terrain(positions: &[[f32; 3]], field: &HeightField) {
        for p in positions {
            assert!(p[1] > field.height(p[0], p[2]), "particle {p:?} at or below terrain");
        }
    }

    #[test]
    fn clouds_stay_inside_plane_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let density = CloudDensity::new(1);
        let mut clouds = CloudField::new(500, &density, &mut rng);

        for frame in 0..3_000 {
            clouds.step(0.05, frame as f32 / 60.0);
            for p in clouds.positions() {
                assert!((-50.0..=50.0).contains(&p[0]));
                assert!((-50.0..=50.0).contains(&p[2]));
            }
        }
        assert!((clouds.drift() - 150.0).abs() < 0.1);
    }

    #[test]
    fn clouds_wrap_with_large_and_negative_speeds() {
        let mut rng = StdRng::seed_from_u64(2);
        let density = CloudDensity::new(2);
        let mut clouds = CloudField::new(100, &density, &mut rng);
        for speed in [7.5, -3.25, 120.0] {
            for _ in 0..40 {
                clouds.step(speed, 0.0);
                assert!(clouds
                    .positions()
                    .iter()
                    .all(|p| p[0].abs() <= 50.0 && p[2].abs() <= 50.0));
            }
        }
    }

    #[test]
    fn clouds_spawn_in_dense_band() {
        let mut rng = StdRng::seed_from_u64(3);
        let density = CloudDensity::new(3);
        let clouds = CloudField::new(300, &density, &mut rng);
        for p in clouds.positions() {
            // Band is [55, 56) plus a vertical offset of at most 3.
            assert!(p[1] >= CLOUD_BASE_HEIGHT - 3.0 - 1e-3 && p[1] <= 59.0 + 1e-3);
        }
    }

    #[test]
    fn snow_never_rests_below_terrain() {
        let mut rng = StdRng::seed_from_u64(4);
        let field = field(&mut rng);
        let density = CloudDensity::new(4);
        let mut snow = SnowField::new(2_000, &density, &field, &mut rng);
        assert_above_terrain(snow.positions(), &field);
        assert_eq!(snow.falling_count(), 0);

        let mut drift = 0.0;
        for frame in 1..=1_200 {
            drift += 0.01;
            snow.step(frame as f32 / 60.0, &density, &field, drift, &mut rng);
            assert_above_terrain(snow.positions(), &field);
        }
    }

    #[test]
    fn snow_releases_only_after_interval() {
        let mut rng = StdRng::seed_from_u64(5);
        let field = field(&mut rng);
        let density = CloudDensity::new(5);
        let mut snow = SnowField::new(5_000, &density, &field, &mut rng);
        let resting_heights: Vec<f32> = snow.positions().iter().map(|p| p[1]).collect();

        snow.step(0.05, &density, &field, 0.0, &mut rng);
        assert_eq!(snow.falling_count(), 0);
        let unchanged = snow
            .positions()
            .iter()
            .zip(&resting_heights)
            .all(|(p, y)| p[1] == *y);
        assert!(unchanged);

        let mut released = false;
        for frame in 0..20 {
            snow.step(0.2 + frame as f32 * 0.15, &density, &field, 0.0, &mut rng);
            if snow.falling_count() > 0 {
                released = true;
                break;
            }
        }
        assert!(released);
        assert!(snow.falling_count() <= 5_000 / 100 * 20);
    }

    #[test]
    fn rain_falls_and_resets_above_terrain() {
        let mut rng = StdRng::seed_from_u64(6);
        let field = field(&mut rng);
        let mut rain = RainField::new(3_000, &field, &mut rng);
        assert_above_terrain(rain.positions(), &field);

        let before: Vec<f32> = rain.positions().iter().map(|p| p[1]).collect();
        rain.step(0.3, &field, &mut rng);
        let dropped = rain
            .positions()
            .iter()
            .zip(&before)
            .filter(|(p, y)| (p[1] - (*y - 0.3)).abs() < 1e-4)
            .count();
        assert!(dropped > 2_700);

        for _ in 0..600 {
            rain.step(1.0, &field, &mut rng);
            assert_above_terrain(rain.positions(), &field);
        }
    }

    #[test]
    fn periodic_wrap_maps_into_plane() {
        assert_eq!(wrap_periodic(0.0), 0.0);
        assert!((wrap_periodic(60.0) + 40.0).abs() < 1e-5);
        assert!((wrap_periodic(-130.0) - (-30.0)).abs() < 1e-5);
        assert_eq!(wrap_periodic(50.0), -50.0);
    }
}
