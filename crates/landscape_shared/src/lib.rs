pub mod biome;
pub mod density;
pub mod geometry;
pub mod landscape;
pub mod mesh;
pub mod settings;
pub mod terrain;
pub mod trees;
pub mod weather;
