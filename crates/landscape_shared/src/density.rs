use noise::{NoiseFn, Simplex};

const DENSITY_SCALE: f64 = 0.05;
const VERTICAL_SCALE: f64 = 0.1;
const VERTICAL_AMPLITUDE: f32 = 3.0;
pub const DENSITY_THRESHOLD: f32 = 0.5;

/// Noise-derived cloud density in `[0, 1]`, thresholded to decide where cloud
/// and snow particles may spawn.
#[derive(Debug, Clone)]
pub struct CloudDensity {
    noise: Simplex,
    threshold: f32,
}

impl CloudDensity {
    pub fn new(seed: u32) -> Self {
        Self {
            noise: Simplex::new(seed),
            threshold: DENSITY_THRESHOLD,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn density(&self, x: f32, y: f32, z: f32) -> f32 {
        let n = self.noise.get([
            x as f64 * DENSITY_SCALE,
            y as f64 * DENSITY_SCALE,
            z as f64 * DENSITY_SCALE,
        ]);
        ((1.0 + n) * 0.5) as f32
    }

    pub fn is_dense(&self, x: f32, y: f32, z: f32) -> bool {
        self.density(x, y, z) > self.threshold
    }

    /// Height offset that gives the cloud layer its lumpy underside.
    pub fn vertical_offset(&self, x: f32, y: f32, z: f32) -> f32 {
        let n = self.noise.get([
            x as f64 * VERTICAL_SCALE,
            y as f64 * VERTICAL_SCALE,
            z as f64 * VERTICAL_SCALE,
        ]);
        n as f32 * VERTICAL_AMPLITUDE
    }
}

#[cfg(test)]
mod tests {
    use super::CloudDensity;

    #[test]
    fn density_is_normalized_and_repeatable() {
        let density = CloudDensity::new(17);
        let other = CloudDensity::new(17);
        for i in 0..200 {
            let x = (i as f32 * 0.73) - 50.0;
            let z = (i as f32 * 1.31) % 100.0 - 50.0;
            let d = density.density(x, 55.0, z);
            assert!((0.0..=1.0).contains(&d));
            assert_eq!(d, other.density(x, 55.0, z));
        }
    }

    #[test]
    fn some_of_the_cloud_band_is_dense() {
        let density = CloudDensity::new(0);
        let dense = (0..400)
            .filter(|i| {
                let x = (i % 20) as f32 * 5.0 - 50.0;
                let z = (i / 20) as f32 * 5.0 - 50.0;
                density.is_dense(x, 55.0, z)
            })
            .count();
        assert!(dense > 0);
        assert!(dense < 400);
    }
}
