use bitflags::bitflags;
use landscape_core::events::EventHandler;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::biome::Biome;
use crate::density::CloudDensity;
use crate::geometry::MeshVertex;
use crate::mesh::{TerrainMesh, PLANE_SEGMENTS};
use crate::settings::{LandscapeSettings, SettingChange};
use crate::terrain::{HeightField, TerrainParams, PLANE_SIZE};
use crate::trees::{batch_trees, TreeInstance, TreePlacer, TreeSets};
use crate::weather::{CloudField, RainField, SnowField};

bitflags! {
    /// GPU-side buffers that no longer match the simulation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DirtyFlags: u8 {
        const TERRAIN    = 0b0000_0001;
        const TREES      = 0b0000_0010;
        const CLOUDS     = 0b0000_0100;
        const SNOW       = 0b0000_1000;
        const RAIN       = 0b0001_0000;
        const VISIBILITY = 0b0010_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeatherVisibility {
    pub snow: bool,
    pub rain: bool,
}

impl WeatherVisibility {
    pub fn for_biome(biome: Biome, rain_enabled: bool) -> Self {
        Self {
            snow: biome.has_snow(),
            rain: rain_enabled && biome.allows_rain(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BiomeTerrain {
    pub biome: Biome,
    pub field: HeightField,
    pub mesh: TerrainMesh,
}

impl BiomeTerrain {
    fn generate(biome: Biome, settings: &LandscapeSettings, rng: &mut StdRng) -> Self {
        let field = HeightField::generate(
            TerrainParams::default(),
            biome.terrain_layers(),
            settings.jitter,
            rng,
        );
        let mesh = TerrainMesh::build(&field, biome.material().uv_repeat, PLANE_SIZE, PLANE_SEGMENTS);
        Self { biome, field, mesh }
    }
}

/// Everything the frame loop simulates: one terrain per biome, the active
/// biome's trees, and the three weather fields.
pub struct Landscape {
    settings: LandscapeSettings,
    terrains: [BiomeTerrain; 3],
    active: Biome,
    trees: TreeSets,
    placer: TreePlacer,
    density: CloudDensity,
    clouds: CloudField,
    snow: SnowField,
    rain: RainField,
    visibility: WeatherVisibility,
    rng: StdRng,
    elapsed_secs: f32,
    dirty: DirtyFlags,
}

fn slot(biome: Biome) -> usize {
    match biome {
        Biome::Snow => 0,
        Biome::Forest => 1,
        Biome::Desert => 2,
    }
}

impl Landscape {
    pub fn new(settings: LandscapeSettings) -> Self {
        let settings = settings.sanitize();
        let mut rng = StdRng::seed_from_u64(settings.seed);
        let terrains = Biome::ALL.map(|biome| BiomeTerrain::generate(biome, &settings, &mut rng));
        let active = settings.biome;
        let density = CloudDensity::new(settings.seed as u32);
        let active_field = &terrains[slot(active)].field;

        let clouds = CloudField::new(settings.cloud_particles, &density, &mut rng);
        let snow = SnowField::new(settings.snow_particles, &density, active_field, &mut rng);
        let rain = RainField::new(settings.rain_particles, active_field, &mut rng);

        let mut landscape = Self {
            visibility: WeatherVisibility::for_biome(active, settings.rain),
            settings,
            terrains,
            active,
            trees: TreeSets::default(),
            placer: TreePlacer::default(),
            density,
            clouds,
            snow,
            rain,
            rng,
            elapsed_secs: 0.0,
            dirty: DirtyFlags::all(),
        };
        landscape.regenerate_trees();
        landscape.dirty = DirtyFlags::all();
        landscape
    }

    pub fn settings(&self) -> &LandscapeSettings {
        &self.settings
    }

    pub fn active_biome(&self) -> Biome {
        self.active
    }

    pub fn terrain(&self, biome: Biome) -> &BiomeTerrain {
        &self.terrains[slot(biome)]
    }

    pub fn active_terrain(&self) -> &BiomeTerrain {
        self.terrain(self.active)
    }

    pub fn trees(&self) -> &TreeSets {
        &self.trees
    }

    /// Trees standing in the active biome.
    pub fn active_trees(&self) -> &[TreeInstance] {
        match self.active.tree_kind() {
            Some(kind) => self.trees.list(kind),
            None => &[],
        }
    }

    pub fn tree_batch(&self) -> (Vec<MeshVertex>, Vec<u32>) {
        batch_trees(self.active_trees())
    }

    pub fn clouds(&self) -> &CloudField {
        &self.clouds
    }

    pub fn snow(&self) -> &SnowField {
        &self.snow
    }

    pub fn rain(&self) -> &RainField {
        &self.rain
    }

    pub fn visibility(&self) -> WeatherVisibility {
        self.visibility
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed_secs
    }

    pub fn switch_biome(&mut self, biome: Biome) {
        let changed = biome != self.active;
        self.settings.biome = biome;
        self.active = biome;
        self.regenerate_trees();
        if changed {
            self.respawn_weather();
            self.dirty |= DirtyFlags::TERRAIN;
        }
    }

    /// Clears both tree lists and replants the active biome with
    /// `settings.trees` trees.
    pub fn regenerate_trees(&mut self) {
        self.trees.clear();
        self.visibility = WeatherVisibility::for_biome(self.active, self.settings.rain);

        if let Some(kind) = self.active.tree_kind() {
            let field = &self.terrains[slot(self.active)].field;
            let planted = self
                .placer
                .place(kind, self.settings.trees as usize, field, &mut self.rng);
            self.trees.list_mut(kind).extend(planted);
        }

        info!(
            "Biome {} with {} trees",
            self.active,
            self.active_trees().len()
        );
        self.dirty |= DirtyFlags::TREES | DirtyFlags::VISIBILITY;
    }

    fn respawn_weather(&mut self) {
        let field = &self.terrains[slot(self.active)].field;
        self.snow
            .respawn(&self.density, field, self.clouds.drift(), &mut self.rng);
        self.rain.respawn(field, &mut self.rng);
        self.dirty |= DirtyFlags::SNOW | DirtyFlags::RAIN;
    }

    pub fn apply(&mut self, change: SettingChange) {
        debug!("Applying {change:?}");
        self.settings.apply(change);
        match change {
            SettingChange::Biome(biome) => self.switch_biome(biome),
            SettingChange::Trees(_) => self.regenerate_trees(),
            SettingChange::Rain(_) => {
                let visibility = WeatherVisibility::for_biome(self.active, self.settings.rain);
                if visibility.rain && !self.visibility.rain {
                    let field = &self.terrains[slot(self.active)].field;
                    self.rain.respawn(field, &mut self.rng);
                    self.dirty |= DirtyFlags::RAIN;
                }
                self.visibility = visibility;
                self.dirty |= DirtyFlags::VISIBILITY;
            }
            SettingChange::RainSpeed(_) | SettingChange::CloudSpeed(_) => {}
        }
    }

    /// Advances the weather by one frame that took `dt_secs`.
    pub fn step(&mut self, dt_secs: f32) {
        self.elapsed_secs += dt_secs.max(0.0);
        let field = &self.terrains[slot(self.active)].field;

        self.clouds.step(self.settings.cloud_speed, self.elapsed_secs);
        self.dirty |= DirtyFlags::CLOUDS;

        if self.visibility.snow {
            self.snow.step(
                self.elapsed_secs,
                &self.density,
                field,
                self.clouds.drift(),
                &mut self.rng,
            );
            self.dirty |= DirtyFlags::SNOW;
        }

        if self.visibility.rain {
            self.rain
                .step(self.settings.rain_speed, field, &mut self.rng);
            self.dirty |= DirtyFlags::RAIN;
        }
    }

    /// Returns the accumulated dirty set and clears it.
    pub fn take_dirty(&mut self) -> DirtyFlags {
        std::mem::replace(&mut self.dirty, DirtyFlags::empty())
    }
}

impl EventHandler<SettingChange> for Landscape {
    fn handle(&mut self, event: SettingChange) {
        self.apply(event);
    }
}

#[cfg(test)]
mod tests {
    use landscape_core::events::{channel, dispatch};

    use super::{DirtyFlags, Landscape, WeatherVisibility};
    use crate::biome::Biome;
    use crate::settings::{LandscapeSettings, SettingChange};

    fn small_settings(biome: Biome) -> LandscapeSettings {
        LandscapeSettings {
            biome,
            trees: 12,
            cloud_particles: 300,
            snow_particles: 300,
            rain_particles: 300,
            ..LandscapeSettings::default()
        }
    }

    fn assert_trees_on_active_terrain(landscape: &Landscape) {
        let field = &landscape.active_terrain().field;
        for tree in landscape.active_trees() {
            let trunk_base = tree.trunk.center.y - tree.trunk.height * 0.5;
            assert!((trunk_base - field.height(tree.ground.x, tree.ground.z)).abs() < 1e-4);
        }
    }

    #[test]
    fn forest_to_snow_replaces_tree_list() {
        let mut landscape = Landscape::new(small_settings(Biome::Forest));
        assert_eq!(landscape.trees().forest_trees.len(), 12);
        assert!(landscape.trees().snowy_trees.is_empty());

        landscape.switch_biome(Biome::Snow);
        assert!(landscape.trees().forest_trees.is_empty());
        assert_eq!(landscape.trees().snowy_trees.len(), 12);
        assert_eq!(landscape.active_biome(), Biome::Snow);
        assert_trees_on_active_terrain(&landscape);
    }

    #[test]
    fn desert_has_no_trees_and_no_weather() {
        let mut settings = small_settings(Biome::Snow);
        settings.rain = true;
        let mut landscape = Landscape::new(settings);
        assert!(landscape.visibility().snow);
        assert!(landscape.visibility().rain);

        landscape.switch_biome(Biome::Desert);
        assert_eq!(landscape.trees().total(), 0);
        assert_eq!(landscape.visibility(), WeatherVisibility::default());
        assert!(landscape.tree_batch().0.is_empty());
    }

    #[test]
    fn terrains_use_biome_layer_counts() {
        let landscape = Landscape::new(small_settings(Biome::Forest));
        assert_eq!(landscape.terrain(Biome::Forest).field.layers(), 4);
        assert_eq!(landscape.terrain(Biome::Snow).field.layers(), 4);
        assert_eq!(landscape.terrain(Biome::Desert).field.layers(), 1);
    }

    #[test]
    fn same_seed_builds_same_landscape() {
        let a = Landscape::new(small_settings(Biome::Forest));
        let b = Landscape::new(small_settings(Biome::Forest));
        assert_eq!(a.active_terrain().field, b.active_terrain().field);
        assert_eq!(a.active_trees(), b.active_trees());
        assert_eq!(a.clouds().positions(), b.clouds().positions());
    }

    #[test]
    fn settings_events_drive_the_landscape() {
        let mut landscape = Landscape::new(small_settings(Biome::Forest));
        let (tx, rx) = channel();
        tx.emit(SettingChange::Trees(5));
        tx.emit(SettingChange::Rain(true));
        tx.emit(SettingChange::CloudSpeed(0.04));

        assert_eq!(dispatch(&rx, &mut landscape), 3);
        assert_eq!(landscape.trees().forest_trees.len(), 5);
        assert!(landscape.visibility().rain);
        assert_eq!(landscape.settings().cloud_speed, 0.04);

        tx.emit(SettingChange::Biome(Biome::Desert));
        dispatch(&rx, &mut landscape);
        assert_eq!(landscape.settings().biome, Biome::Desert);
        assert!(!landscape.visibility().rain);
        assert!(landscape.settings().rain);
    }

    #[test]
    fn stepping_keeps_visible_weather_above_ground() {
        let mut settings = small_settings(Biome::Snow);
        settings.rain = true;
        settings.rain_speed = 1.0;
        let mut landscape = Landscape::new(settings);
        landscape.take_dirty();

        for _ in 0..600 {
            landscape.step(1.0 / 60.0);
            let field = &landscape.active_terrain().field;
            for p in landscape.snow().positions().iter().chain(landscape.rain().positions()) {
                assert!(p[1] > field.height(p[0], p[2]));
            }
        }

        let dirty = landscape.take_dirty();
        assert!(dirty.contains(DirtyFlags::CLOUDS | DirtyFlags::SNOW | DirtyFlags::RAIN));
        assert!(!dirty.contains(DirtyFlags::TERRAIN));
        assert!(landscape.take_dirty().is_empty());
        assert!((landscape.elapsed_secs() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn switching_terrain_reseats_weather_on_new_ground() {
        let mut settings = small_settings(Biome::Forest);
        settings.rain = true;
        let mut landscape = Landscape::new(settings);
        landscape.switch_biome(Biome::Snow);
        let field = &landscape.active_terrain().field;
        for p in landscape.rain().positions() {
            assert!(p[1] > field.height(p[0], p[2]));
        }
        assert!(landscape.take_dirty().contains(DirtyFlags::TERRAIN));
    }
}
