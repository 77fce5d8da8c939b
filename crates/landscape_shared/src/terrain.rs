use rand::Rng;
use serde::{Deserialize, Serialize};

/// Side length of the square terrain plane, centred on the origin.
pub const PLANE_SIZE: f32 = 100.0;
pub const HALF_EXTENT: f32 = PLANE_SIZE * 0.5;

/// Constants of the fractal height function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainParams {
    pub base_height: f32,
    pub amplitude: f32,
    pub frequency: f32,
    pub corner_lowering: f32,
    pub bowl: f32,
    /// Width of the per-octave phase jitter range, centred on zero.
    pub irregularity: f32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            base_height: 10.0,
            amplitude: 6.0,
            frequency: 0.09,
            corner_lowering: 0.05,
            bowl: 0.01,
            irregularity: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterMode {
    /// Offsets drawn once when the field is generated.
    #[default]
    Fixed,
    /// Offsets redrawn on every sample. Heights at one point disagree between calls.
    PerSample,
    Zero,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TerrainJitter {
    Fixed(Vec<f32>),
    PerSample,
    Zero,
}

impl TerrainJitter {
    pub fn mode(&self) -> JitterMode {
        match self {
            Self::Fixed(_) => JitterMode::Fixed,
            Self::PerSample => JitterMode::PerSample,
            Self::Zero => JitterMode::Zero,
        }
    }
}

/// Heights of one terrain: the fractal sum plus the bowl and corner-lowering
/// radial terms.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    params: TerrainParams,
    layers: u32,
    jitter: TerrainJitter,
}

impl HeightField {
    pub fn with_jitter(params: TerrainParams, layers: u32, jitter: TerrainJitter) -> Self {
        Self {
            params,
            layers,
            jitter,
        }
    }

    pub fn flat_jitter(params: TerrainParams, layers: u32) -> Self {
        Self::with_jitter(params, layers, TerrainJitter::Zero)
    }

    pub fn generate<R: Rng + ?Sized>(
        params: TerrainParams,
        layers: u32,
        mode: JitterMode,
        rng: &mut R,
    ) -> Self {
        let jitter = match mode {
            JitterMode::Fixed => TerrainJitter::Fixed(
                (0..layers)
                    .map(|_| sample_offset(params.irregularity, rng))
                    .collect(),
            ),
            JitterMode::PerSample => TerrainJitter::PerSample,
            JitterMode::Zero => TerrainJitter::Zero,
        };
        Self::with_jitter(params, layers, jitter)
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    pub fn layers(&self) -> u32 {
        self.layers
    }

    pub fn jitter(&self) -> &TerrainJitter {
        &self.jitter
    }

    pub fn height(&self, x: f32, z: f32) -> f32 {
        self.params.base_height + self.octaves(x, z) + self.bowl(x, z) - self.corner_lowering(x, z)
    }

    /// Sum of the sine/cosine layers alone.
    pub fn octaves(&self, x: f32, z: f32) -> f32 {
        let mut amplitude = self.params.amplitude;
        let mut frequency = self.params.frequency;
        let mut total = 0.0;

        for layer in 0..self.layers as usize {
            let offset = self.offset(layer);
            total += ((x * frequency + offset).sin() + (z * frequency + offset).cos()) * amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }

        total
    }

    pub fn bowl(&self, x: f32, z: f32) -> f32 {
        self.params.bowl * (x * x + z * z)
    }

    pub fn corner_lowering(&self, x: f32, z: f32) -> f32 {
        (x * x + z * z).sqrt() * self.params.corner_lowering
    }

    fn offset(&self, layer: usize) -> f32 {
        match &self.jitter {
            TerrainJitter::Fixed(offsets) => offsets.get(layer).copied().unwrap_or(0.0),
            TerrainJitter::PerSample => {
                sample_offset(self.params.irregularity, &mut rand::thread_rng())
            }
            TerrainJitter::Zero => 0.0,
        }
    }
}

fn sample_offset<R: Rng + ?Sized>(irregularity: f32, rng: &mut R) -> f32 {
    (rng.gen::<f32>() - 0.5) * irregularity
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::{HeightField, JitterMode, TerrainJitter, TerrainParams};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn origin_height_matches_closed_form() {
        let field = HeightField::flat_jitter(TerrainParams::default(), 4);
        // 10 + (6 + 3 + 1.5 + 0.75) * (sin 0 + cos 0)
        assert!(approx(field.height(0.0, 0.0), 21.25));

        // 10 + 6 * (sin 0 + cos 0)
        let single = HeightField::flat_jitter(TerrainParams::default(), 1);
        assert!(approx(single.height(0.0, 0.0), 16.0));
    }

    #[test]
    fn zero_layers_leave_only_base_and_radial_terms() {
        let field = HeightField::flat_jitter(TerrainParams::default(), 0);
        let (x, z) = (30.0_f32, -40.0_f32);
        // r = 50, bowl = 0.01 * 2500, lowering = 0.05 * 50
        assert!(approx(field.height(x, z), 10.0 + 25.0 - 2.5));
    }

    #[test]
    fn fixed_jitter_is_deterministic_and_seeded() {
        let params = TerrainParams::default();
        let a = HeightField::generate(params, 4, JitterMode::Fixed, &mut StdRng::seed_from_u64(7));
        let b = HeightField::generate(params, 4, JitterMode::Fixed, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);

        for &(x, z) in &[(0.0, 0.0), (12.5, -8.0), (-49.0, 49.0)] {
            assert_eq!(a.height(x, z), a.height(x, z));
            assert_eq!(a.height(x, z), b.height(x, z));
        }

        let TerrainJitter::Fixed(offsets) = a.jitter() else {
            panic!("expected fixed jitter");
        };
        assert_eq!(offsets.len(), 4);
        assert!(offsets.iter().all(|o| o.abs() <= params.irregularity * 0.5));
    }

    #[test]
    fn per_sample_jitter_stays_within_amplitude_envelope() {
        let params = TerrainParams::default();
        let field = HeightField::generate(params, 4, JitterMode::PerSample, &mut StdRng::seed_from_u64(1));
        let envelope = 2.0 * (6.0 + 3.0 + 1.5 + 0.75);
        for _ in 0..64 {
            let octaves = field.octaves(5.0, 5.0);
            assert!(octaves.abs() <= envelope + 1e-4);
        }
    }

    #[test]
    fn radial_terms_are_symmetric_under_axis_swap() {
        let field = HeightField::flat_jitter(TerrainParams::default(), 4);
        for &(x, z) in &[(3.0, 17.0), (-20.0, 45.0), (49.5, -0.5)] {
            assert!(approx(field.bowl(x, z), field.bowl(z, x)));
            assert!(approx(field.corner_lowering(x, z), field.corner_lowering(z, x)));
        }
    }

    #[test]
    fn swapping_axes_swaps_trig_roles() {
        let field = HeightField::flat_jitter(TerrainParams::default(), 1);
        let (x, z) = (10.0_f32, 20.0_f32);
        let f = 0.09_f32;
        assert!(approx(field.octaves(x, z), (x * f).sin() * 6.0 + (z * f).cos() * 6.0));
        assert!(approx(field.octaves(z, x), (z * f).sin() * 6.0 + (x * f).cos() * 6.0));
    }

    #[test]
    fn corner_lowering_grows_with_radial_distance() {
        let field = HeightField::flat_jitter(TerrainParams::default(), 4);
        let mut previous = -1.0;
        for step in 0..=70 {
            let r = step as f32;
            let lowering = field.corner_lowering(r * 0.6, r * 0.8);
            assert!(lowering > previous);
            previous = lowering;
        }
    }

    #[test]
    fn non_finite_input_propagates() {
        let field = HeightField::flat_jitter(TerrainParams::default(), 4);
        assert!(field.height(f32::NAN, 0.0).is_nan());
    }
}
