// Per-source processing stages of an emitter chain: direct-path filtering,
// binaural rendering (or panning) and gain.

mod direct;
mod gain;
mod spatializer;

pub use direct::{DirectEffectStage, DirectProcessor};
pub use gain::{GainControl, GainStage};
pub use spatializer::{SharedTarget, SpatialTarget, Spatializer, pan_gains};
