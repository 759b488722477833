//! # CueSonic
//!
//! Real-time spatial audio cues for game accessibility, built on Steam Audio.
//!
//! CueSonic renders sounds that stand in for visual information: a compass tone
//! that tells which way a nearby wall lies, and a beacon that beeps faster and
//! louder as the player follows a path to its destination. Both are occluded by
//! a coarse copy of the level geometry, so sound behind a wall is muffled.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cuesonic::*;
//! use std::time::Duration;
//!
//! # struct Level;
//! # impl SceneQuery for Level {
//! #     fn area_bounds(&self) -> Option<math::Aabb> { None }
//! #     fn walkable_height(&self, _: f32, _: f32) -> Option<f32> { None }
//! #     fn static_obstacles(&self) -> Vec<ObstacleProxy> { Vec::new() }
//! # }
//! # let level = Level;
//! let mut engine = CueSonicEngine::new(CueSonicDesc::default())?;
//! engine.start()?;
//! let handles = engine.handles();
//!
//! // Four direction tones: North, East, South, West
//! let tones = [440.0, 523.0, 659.0, 784.0]
//!     .map(|f| ToneClip::sine(f, Duration::from_millis(500), 48000, 0.4));
//! let mut compass = CompassWallEmitter::new(&handles, CompassConfig::default(), tones)?;
//! compass.activate();
//!
//! let beep = ToneClip::sine(880.0, Duration::from_millis(80), 48000, 0.5);
//! let mut beacon = PathfindingBeacon::new(&handles, BeaconConfig::default(), beep)?;
//! beacon.start(vec![Vec3::ZERO, Vec3::new(0.0, 0.0, 30.0)])?;
//!
//! // Every frame
//! let player = Pose::identity();
//! engine.simulator().notify_area_changed();
//! engine.tick(player, &level);
//! compass.update(&player, Vec3::new(4.0, 0.0, 1.0));
//! beacon.update_player(player);
//!
//! for event in engine.poll_events() {
//!     log::info!("{:?}", event);
//! }
//!
//! beacon.stop();
//! compass.dispose();
//! engine.shutdown();
//! # Ok::<(), CueSonicError>(())
//! ```
//!
//! ## Key Components
//!
//! - **[`CueSonicEngine`]**: Owns the acoustic context, simulator and output mixer; ticked by the host
//! - **[`AcousticContext`](dsp::AcousticContext)**: Steam Audio context and HRTF, with a non-native fallback
//! - **[`EnvironmentSimulator`]**: Occlusion geometry and per-source direct-path simulation
//! - **[`MixerHandle`](mixer::MixerHandle)**: The shared render graph every emitter feeds into
//! - **[`CompassWallEmitter`]** and **[`PathfindingBeacon`]**: The two audio cues
//! - **[`SceneQuery`]**: Trait the host implements to expose walkable ground and obstacles
//!
//! ## Threading
//!
//! 1. **Host thread**: ticks the engine, updates emitters, owns the output device
//! 2. **Audio callback**: pulls every emitter chain through the mixer
//! 3. **Beacon thread**: recomputes the beacon cue at a fixed rate
//!
//! State crosses threads as short snapshot copies or atomics. Emitters are always
//! detached from the mixer before their native resources are released.
//!
//! ## Coordinates
//!
//! Positions use the game's left-handed convention (`+X` right, `+Y` up, `+Z`
//! forward). Conversion to Steam Audio's right-handed space is internal.

pub mod audio_data;
pub mod config;
pub mod dsp;
pub mod effects;
pub mod emitters;
pub mod engine;
pub mod error;
pub mod events;
pub mod math;
pub mod mixer;
pub mod simulation;
pub mod stream;

pub use audio_data::ToneClip;
pub use config::{BeaconConfig, CompassConfig, CueSonicDesc, GeometrySettings};
pub use emitters::{CompassWallEmitter, PathfindingBeacon, Quadrant};
pub use engine::{CueSonicEngine, EngineHandles};
pub use error::CueSonicError;
pub use events::CueSonicEvent;
pub use math::{Pose, Quat, Vec3};
pub use simulation::{
    DirectParams, EnvironmentSimulator, ObstacleLayer, ObstacleProxy, SceneQuery, SourceId,
};
