use crate::dsp::BinauralHandle;
use crate::math::{Vec3, clamp_unit};
use crate::simulation::to_hrtf_direction;
use crate::stream::{FrameBuffer, MonoStream, StereoStream};
use std::f32::consts::FRAC_PI_4;
use std::sync::{Arc, Mutex};

/// Where a source sits relative to the listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialTarget {
    /// Normalized listener-local direction as `(right, up, forward)`
    pub direction: Vec3,
    /// Stereo position used when HRTF rendering is unavailable, in `[-1, 1]`
    pub pan: f32,
}

impl SpatialTarget {
    pub const AHEAD: Self = Self {
        direction: Vec3::Z,
        pan: 0.0,
    };

    pub fn new(direction: Vec3, pan: f32) -> Self {
        let direction = direction.normalize_or_zero();
        Self {
            direction: if direction == Vec3::ZERO {
                Vec3::Z
            } else {
                direction
            },
            pan: clamp_unit(pan),
        }
    }
}

impl Default for SpatialTarget {
    fn default() -> Self {
        Self::AHEAD
    }
}

/// Spatial target written by the control side and copied by the render side.
#[derive(Debug, Clone, Default)]
pub struct SharedTarget(Arc<Mutex<SpatialTarget>>);

impl SharedTarget {
    pub fn set(&self, target: SpatialTarget) {
        match self.0.lock() {
            Ok(mut guard) => *guard = target,
            Err(poisoned) => *poisoned.into_inner() = target,
        }
    }

    pub fn get(&self) -> SpatialTarget {
        match self.0.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Constant-power gains `(left, right)` for a pan in `[-1, 1]`.
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let angle = (clamp_unit(pan) + 1.0) * FRAC_PI_4;
    (angle.cos(), angle.sin())
}

struct BinauralRenderer<S> {
    upstream: S,
    handle: Option<BinauralHandle>,
    target: SharedTarget,
    mono: Vec<f32>,
}

impl<S: MonoStream> BinauralRenderer<S> {
    fn render_frame(&mut self, frame: &mut [f32]) {
        self.upstream.read(&mut self.mono);
        let target = self.target.get();

        if let Some(handle) = self.handle.as_mut() {
            let direction = to_hrtf_direction(target.direction);
            match handle.apply(direction, &self.mono, frame) {
                Ok(()) if frame.iter().all(|s| s.is_finite()) => return,
                Ok(()) => log::debug!("Binaural effect produced non-finite samples; panning frame"),
                Err(e) => log::error!("Binaural effect failed, panning frame: {}", e),
            }
        }

        let (left, right) = pan_gains(target.pan);
        for (out, sample) in frame.chunks_exact_mut(2).zip(&self.mono) {
            out[0] = sample * left;
            out[1] = sample * right;
        }
    }
}

/// Turns a mono stream into stereo, through the HRTF when available and a
/// constant-power pan otherwise.
pub struct Spatializer<S> {
    renderer: BinauralRenderer<S>,
    frames: FrameBuffer,
}

impl<S: MonoStream> Spatializer<S> {
    pub fn new(
        upstream: S,
        handle: Option<BinauralHandle>,
        target: SharedTarget,
        frame_size: usize,
    ) -> Self {
        let frame_size = handle.as_ref().map_or(frame_size, |h| h.frame_size());
        Self {
            renderer: BinauralRenderer {
                upstream,
                handle,
                target,
                mono: vec![0.0; frame_size],
            },
            frames: FrameBuffer::new(frame_size * 2),
        }
    }

    pub fn upstream(&self) -> &S {
        &self.renderer.upstream
    }

    pub fn upstream_mut(&mut self) -> &mut S {
        &mut self.renderer.upstream
    }

    pub fn is_binaural(&self) -> bool {
        self.renderer.handle.is_some()
    }

    /// Detaches the HRTF handle; the spatializer falls back to panning.
    pub fn take_handle(&mut self) -> Option<BinauralHandle> {
        self.renderer.handle.take()
    }
}

impl<S: MonoStream> StereoStream for Spatializer<S> {
    fn read_stereo(&mut self, out: &mut [f32]) {
        let renderer = &mut self.renderer;
        self.frames.read(out, |frame| renderer.render_frame(frame));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_data::ToneClip;
    use crate::stream::LoopingClip;

    fn dc_spatializer(target: SharedTarget) -> Spatializer<LoopingClip> {
        let source = LoopingClip::new(ToneClip::from_samples(vec![1.0], 48000));
        Spatializer::new(source, None, target, 64)
    }

    #[test]
    fn test_pan_gains_are_constant_power() {
        for pan in [-1.0, -0.3, 0.0, 0.7, 1.0] {
            let (l, r) = pan_gains(pan);
            assert!((l * l + r * r - 1.0).abs() < 1e-5);
        }
        let (l, r) = pan_gains(-1.0);
        assert!((l - 1.0).abs() < 1e-6 && r.abs() < 1e-6);
        let (l, r) = pan_gains(5.0);
        assert!(l.abs() < 1e-6 && (r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fallback_pans_hard_right() {
        let target = SharedTarget::default();
        let mut spatializer = dc_spatializer(target.clone());
        assert!(!spatializer.is_binaural());

        target.set(SpatialTarget::new(Vec3::X, 1.0));
        let mut out = vec![0.0; 100];
        spatializer.read_stereo(&mut out);
        for frame in out.chunks_exact(2) {
            assert!(frame[0].abs() < 1e-6);
            assert!((frame[1] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_target_clamps_pan_and_defaults_direction() {
        let target = SpatialTarget::new(Vec3::ZERO, -4.0);
        assert_eq!(target.direction, Vec3::Z);
        assert_eq!(target.pan, -1.0);
    }
}
