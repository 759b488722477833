// Environment simulation
//
// Extracts a coarse triangle mesh from the host scene and runs one direct-path
// pass per tick for every registered source. All game-to-native coordinate
// conversion lives in this module.

mod convert;
mod geometry;
mod material;
mod params;
mod simulator;

pub use geometry::{GeometryStats, ObstacleLayer, ObstacleProxy, SceneGeometry, SceneQuery};
pub use material::{AcousticMaterial, MaterialId};
pub use params::{DirectParams, SharedParams};
pub use simulator::{EnvironmentSimulator, SourceId};

pub(crate) use convert::to_hrtf_direction;
