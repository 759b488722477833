mod emitter_config;
mod engine_desc;
mod geometry_settings;

pub use emitter_config::{BeaconConfig, CompassConfig};
pub use engine_desc::CueSonicDesc;
pub use geometry_settings::GeometrySettings;
