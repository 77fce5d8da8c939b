use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::trees::TreeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Biome {
    #[default]
    Forest,
    Snow,
    Desert,
}

/// Surface look of a biome's terrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMaterial {
    pub texture_path: &'static str,
    /// Tangent-space normal map, OpenGL convention.
    pub normal_map_path: Option<&'static str>,
    pub uv_repeat: f32,
    /// Colour of the flat stand-in used when the texture cannot be loaded.
    pub tint: [f32; 3],
}

impl Biome {
    /// Order used by the settings panel.
    pub const ALL: [Biome; 3] = [Biome::Snow, Biome::Forest, Biome::Desert];

    pub fn name(self) -> &'static str {
        match self {
            Self::Forest => "forest",
            Self::Snow => "snow",
            Self::Desert => "desert",
        }
    }

    pub fn terrain_layers(self) -> u32 {
        match self {
            Self::Forest | Self::Snow => 4,
            Self::Desert => 1,
        }
    }

    pub fn tree_kind(self) -> Option<TreeKind> {
        match self {
            Self::Forest => Some(TreeKind::Leafy),
            Self::Snow => Some(TreeKind::Snowy),
            Self::Desert => None,
        }
    }

    pub fn has_snow(self) -> bool {
        self == Self::Snow
    }

    pub fn allows_rain(self) -> bool {
        self != Self::Desert
    }

    pub fn material(self) -> SurfaceMaterial {
        match self {
            Self::Forest => SurfaceMaterial {
                texture_path: "textures/everytexture.com-stock-nature-grass-texture-00007-diffuse-2048.jpg",
                normal_map_path: Some(
                    "textures/everytexture.com-stock-nature-grass-texture-00007-normal-2048.jpg",
                ),
                uv_repeat: 7.0,
                tint: [0.36, 0.55, 0.24],
            },
            Self::Snow => SurfaceMaterial {
                texture_path: "textures/rock_0008_color_2k.jpg",
                normal_map_path: Some("textures/rock_0008_normal_opengl_2k.png"),
                uv_repeat: 4.0,
                tint: [0.78, 0.8, 0.84],
            },
            Self::Desert => SurfaceMaterial {
                texture_path: "textures/4429.jpg",
                normal_map_path: None,
                uv_repeat: 5.0,
                tint: [0.86, 0.74, 0.5],
            },
        }
    }

    /// Neighbour in [`Biome::ALL`], wrapping at either end.
    pub fn cycle(self, step: i32) -> Biome {
        let len = Self::ALL.len() as i32;
        let index = Self::ALL.iter().position(|b| *b == self).unwrap_or(0) as i32;
        Self::ALL[(index + step).rem_euclid(len) as usize]
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBiome(pub String);

impl fmt::Display for UnknownBiome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown biome '{}' (expected snow, forest or desert)", self.0)
    }
}

impl std::error::Error for UnknownBiome {}

impl FromStr for Biome {
    type Err = UnknownBiome;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forest" => Ok(Self::Forest),
            "snow" => Ok(Self::Snow),
            "desert" => Ok(Self::Desert),
            other => Err(UnknownBiome(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Biome;
    use crate::trees::TreeKind;

    #[test]
    fn biome_properties_follow_presets() {
        assert_eq!(Biome::Forest.terrain_layers(), 4);
        assert_eq!(Biome::Snow.terrain_layers(), 4);
        assert_eq!(Biome::Desert.terrain_layers(), 1);
        assert_eq!(Biome::Forest.tree_kind(), Some(TreeKind::Leafy));
        assert_eq!(Biome::Snow.tree_kind(), Some(TreeKind::Snowy));
        assert_eq!(Biome::Desert.tree_kind(), None);
        assert!(Biome::Snow.has_snow());
        assert!(!Biome::Desert.allows_rain());
    }

    #[test]
    fn grass_and_rock_carry_normal_maps() {
        for biome in [Biome::Forest, Biome::Snow] {
            let material = biome.material();
            assert!(material.normal_map_path.is_some_and(|path| path.contains("normal")));
        }
        assert_eq!(Biome::Desert.material().normal_map_path, None);
        assert_eq!(Biome::Forest.material().uv_repeat, 7.0);
    }

    #[test]
    fn cycle_wraps_in_panel_order() {
        assert_eq!(Biome::Snow.cycle(1), Biome::Forest);
        assert_eq!(Biome::Desert.cycle(1), Biome::Snow);
        assert_eq!(Biome::Snow.cycle(-1), Biome::Desert);
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Snow".parse::<Biome>(), Ok(Biome::Snow));
        assert_eq!(" desert ".parse::<Biome>(), Ok(Biome::Desert));
        assert!("tundra".parse::<Biome>().is_err());
    }
}
