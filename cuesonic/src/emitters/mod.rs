//! Audio cue emitters
//!
//! Each emitter owns one [`chain::AttachedChain`] registered with the simulator
//! and the mixer, and only talks to it through shared controls afterwards.

mod beacon;
mod cadence;
mod chain;
mod compass;
mod guide;
mod quadrant;

pub use beacon::{BeaconState, PathfindingBeacon, beacon_pan, closeness, compute_beacon_state};
pub use cadence::{BeepCadence, CadenceControl};
pub use chain::{AttachedChain, ChainControls, EmitterChain};
pub use compass::{CompassReading, CompassWallEmitter, compass_bearing, compass_volume};
pub use guide::{GuidePoint, compute_guide_point};
pub use quadrant::{
    Quadrant, QuadrantMux, QuadrantSelector, angular_distance, normalize_bearing,
    quadrant_for_bearing,
};
