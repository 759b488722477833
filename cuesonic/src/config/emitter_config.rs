use crate::error::{CueSonicError, Result};
use std::time::Duration;

/// Tuning for the compass wall emitter.
#[derive(Debug, Clone)]
pub struct CompassConfig {
    /// Rotation of map north relative to the game's `+Z` axis, in degrees
    pub north_offset_deg: f32,
    /// How far (degrees) the bearing must pass a quadrant boundary before switching
    pub hysteresis_deg: f32,
    /// Distance at which the tone reaches its quietest level, in game units
    pub max_distance: f32,
    pub min_volume: f32,
    pub max_volume: f32,
}

impl Default for CompassConfig {
    fn default() -> Self {
        Self {
            north_offset_deg: 0.0,
            hysteresis_deg: 5.0,
            max_distance: 30.0,
            min_volume: 0.05,
            max_volume: 1.0,
        }
    }
}

impl CompassConfig {
    pub fn validate(&self) -> Result<()> {
        validate_volume_range(self.min_volume, self.max_volume)?;
        if !(self.max_distance > 0.0) {
            return Err(CueSonicError::Configuration(
                "Compass max distance must be positive".into(),
            ));
        }
        if !(0.0..45.0).contains(&self.hysteresis_deg) {
            return Err(CueSonicError::Configuration(
                "Compass hysteresis must be within [0, 45) degrees".into(),
            ));
        }
        Ok(())
    }
}

/// Tuning for the pathfinding beacon.
#[derive(Debug, Clone)]
pub struct BeaconConfig {
    /// Arc length ahead of the player (along the path) where the beacon aims
    pub lookahead_distance: f32,
    /// Distance at which the beacon is at its slowest and quietest
    pub max_beacon_distance: f32,
    /// Beep period when the destination is reached
    pub min_interval: Duration,
    /// Beep period at or beyond `max_beacon_distance`
    pub max_interval: Duration,
    /// Length of the audible part of each beep
    pub on_duration: Duration,
    pub min_volume: f32,
    pub max_volume: f32,
    /// Background update rate
    pub update_rate_hz: f32,
    /// How long `stop` waits for the update thread before giving up on it
    pub join_timeout: Duration,
}

/// Slowest background refresh a beacon accepts.
const MIN_UPDATE_RATE_HZ: f32 = 1.0;

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            lookahead_distance: 4.0,
            max_beacon_distance: 50.0,
            min_interval: Duration::from_millis(150),
            max_interval: Duration::from_millis(1200),
            on_duration: Duration::from_millis(80),
            min_volume: 0.2,
            max_volume: 1.0,
            update_rate_hz: 60.0,
            join_timeout: Duration::from_millis(500),
        }
    }
}

impl BeaconConfig {
    pub fn validate(&self) -> Result<()> {
        validate_volume_range(self.min_volume, self.max_volume)?;
        if !(self.max_beacon_distance > 0.0) || self.lookahead_distance < 0.0 {
            return Err(CueSonicError::Configuration(
                "Beacon distances must be positive".into(),
            ));
        }
        if self.min_interval > self.max_interval {
            return Err(CueSonicError::Configuration(
                "Beacon min interval exceeds max interval".into(),
            ));
        }
        if !(self.update_rate_hz >= MIN_UPDATE_RATE_HZ) || !self.update_rate_hz.is_finite() {
            return Err(CueSonicError::Configuration(format!(
                "Beacon update rate must be at least {} Hz, got {}",
                MIN_UPDATE_RATE_HZ, self.update_rate_hz
            )));
        }
        Ok(())
    }

    pub fn update_period(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.update_rate_hz)
    }
}

fn validate_volume_range(min_volume: f32, max_volume: f32) -> Result<()> {
    if !(0.0..=max_volume).contains(&min_volume) {
        return Err(CueSonicError::Configuration(format!(
            "Volume range [{}, {}] is invalid",
            min_volume, max_volume
        )));
    }
    Ok(())
}
