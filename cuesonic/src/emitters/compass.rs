use crate::audio_data::{ToneClip, align_loops};
use crate::config::CompassConfig;
use crate::effects::SpatialTarget;
use crate::emitters::chain::AttachedChain;
use crate::emitters::quadrant::{
    Quadrant, QuadrantMux, QuadrantSelector, normalize_bearing, quadrant_for_bearing,
};
use crate::engine::EngineHandles;
use crate::error::Result;
use crate::math::{Pose, Vec3, clamp_unit};

/// Bearing of `target` seen from `from`, clockwise from map north, in `[0, 360)`.
pub fn compass_bearing(from: Vec3, target: Vec3, north_offset_deg: f32) -> f32 {
    let offset = target - from;
    normalize_bearing(offset.x.atan2(offset.z).to_degrees() - north_offset_deg)
}

/// Squared distance falloff clamped to `[min_volume, max_volume]`.
pub fn compass_volume(distance: f32, config: &CompassConfig) -> f32 {
    let normalized = if distance.is_finite() {
        (distance.max(0.0) / config.max_distance).min(1.0)
    } else {
        1.0
    };
    let falloff = (1.0 - normalized) * (1.0 - normalized);
    (config.max_volume * falloff).clamp(config.min_volume, config.max_volume)
}

/// What one update decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompassReading {
    pub bearing: f32,
    pub quadrant: Quadrant,
    pub pan: f32,
    pub volume: f32,
}

/// Plays one of four direction tones from the position of a nearby wall or obstacle.
///
/// The tone tells which compass quadrant the obstacle lies in; its position
/// in the stereo field and its loudness tell where and how far it is.
pub struct CompassWallEmitter {
    config: CompassConfig,
    chain: AttachedChain<QuadrantMux>,
    selector: QuadrantSelector,
    quadrant: Option<Quadrant>,
}

impl CompassWallEmitter {
    /// `tones` are ordered North, East, South, West. They are resampled to the
    /// engine rate and padded to a common length.
    pub fn new(handles: &EngineHandles, config: CompassConfig, tones: [ToneClip; 4]) -> Result<Self> {
        config.validate()?;
        let [n, e, s, w] = tones;
        let tones = align_loops([
            n.resample(handles.sample_rate)?,
            e.resample(handles.sample_rate)?,
            s.resample(handles.sample_rate)?,
            w.resample(handles.sample_rate)?,
        ])?;

        let mux = QuadrantMux::new(tones);
        let selector = mux.selector();
        let chain = AttachedChain::attach(handles, mux, Vec3::ZERO, config.max_volume);

        Ok(Self {
            config,
            chain,
            selector,
            quadrant: None,
        })
    }

    /// Re-aims the emitter at `obstacle` as heard from `listener`.
    pub fn update(&mut self, listener: &Pose, obstacle: Vec3) -> CompassReading {
        let bearing = compass_bearing(listener.position, obstacle, self.config.north_offset_deg);
        let quadrant = quadrant_for_bearing(bearing, self.quadrant, self.config.hysteresis_deg);
        if self.quadrant != Some(quadrant) {
            log::debug!("Compass quadrant {:?} -> {:?}", self.quadrant, quadrant);
            self.selector.select(quadrant);
            self.quadrant = Some(quadrant);
        }

        let direction = listener.local_direction_to(obstacle);
        let pan = clamp_unit(direction.x);
        let volume = compass_volume(listener.position.distance(obstacle), &self.config);

        let controls = self.chain.controls();
        controls.target.set(SpatialTarget::new(direction, pan));
        controls.gain.set_volume(volume);
        self.chain.set_position(obstacle);

        CompassReading {
            bearing,
            quadrant,
            pan,
            volume,
        }
    }

    pub fn activate(&self) {
        self.chain.controls().gain.set_enabled(true);
    }

    pub fn deactivate(&self) {
        self.chain.controls().gain.set_enabled(false);
    }

    pub fn is_active(&self) -> bool {
        self.chain.is_attached() && self.chain.controls().gain.is_enabled()
    }

    pub fn quadrant(&self) -> Option<Quadrant> {
        self.quadrant
    }

    pub fn volume(&self) -> f32 {
        self.chain.controls().gain.volume()
    }

    /// Detaches from the mixer, then releases native handles and the simulation source.
    pub fn dispose(&mut self) {
        self.chain.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CueSonicDesc;
    use crate::engine::CueSonicEngine;
    use std::time::Duration;

    fn tones() -> [ToneClip; 4] {
        [440.0, 550.0, 660.0, 770.0]
            .map(|f| ToneClip::sine(f, Duration::from_millis(50), 48000, 0.5))
    }

    #[test]
    fn test_compass_example() {
        let engine = CueSonicEngine::headless(CueSonicDesc::default()).unwrap();
        let mut emitter =
            CompassWallEmitter::new(&engine.handles(), CompassConfig::default(), tones()).unwrap();
        let listener = Pose::identity();

        let reading = emitter.update(&listener, Vec3::new(10.0, 0.0, 0.0));
        assert!((reading.bearing - 90.0).abs() < 1e-4);
        assert_eq!(reading.quadrant, Quadrant::East);
        assert!((reading.pan - 1.0).abs() < 1e-5);

        let reading = emitter.update(&listener, Vec3::new(0.0, 0.0, 10.0));
        assert!(reading.bearing.abs() < 1e-4);
        assert_eq!(reading.quadrant, Quadrant::North);
        assert!(reading.pan.abs() < 1e-5);
    }

    #[test]
    fn test_north_offset_rotates_bearing() {
        let bearing = compass_bearing(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0), 90.0);
        assert!((bearing - 270.0).abs() < 1e-4);
    }

    #[test]
    fn test_volume_falls_off_with_distance() {
        let config = CompassConfig::default();
        let mut previous = f32::INFINITY;
        for step in 0..=40 {
            let volume = compass_volume(step as f32, &config);
            assert!(volume <= previous);
            assert!((config.min_volume..=config.max_volume).contains(&volume));
            previous = volume;
        }
        assert_eq!(compass_volume(0.0, &config), config.max_volume);
        assert_eq!(compass_volume(1000.0, &config), config.min_volume);
        assert_eq!(compass_volume(f32::NAN, &config), config.min_volume);
    }

    #[test]
    fn test_activate_dispose_lifecycle() {
        let engine = CueSonicEngine::headless(CueSonicDesc::default()).unwrap();
        let handles = engine.handles();
        let mut emitter =
            CompassWallEmitter::new(&handles, CompassConfig::default(), tones()).unwrap();
        assert_eq!(handles.mixer.input_count(), 1);
        assert_eq!(handles.simulator.source_count(), 1);
        assert!(!emitter.is_active());

        emitter.activate();
        assert!(emitter.is_active());
        emitter.deactivate();
        assert!(!emitter.is_active());
        // Deactivation keeps the chain in the mixer.
        assert_eq!(handles.mixer.input_count(), 1);

        emitter.dispose();
        emitter.dispose();
        assert_eq!(handles.mixer.input_count(), 0);
        assert_eq!(handles.simulator.source_count(), 0);
        assert!(!emitter.is_active());
    }
}
