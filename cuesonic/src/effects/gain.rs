use crate::stream::StereoStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Volume and on/off switch of one chain, shared with its emitter.
#[derive(Debug)]
pub struct GainControl {
    volume: AtomicU32,
    enabled: AtomicBool,
    max_volume: f32,
}

impl GainControl {
    pub fn new(max_volume: f32) -> Arc<Self> {
        let max_volume = if max_volume.is_finite() {
            max_volume.max(0.0)
        } else {
            1.0
        };
        Arc::new(Self {
            volume: AtomicU32::new(max_volume.to_bits()),
            enabled: AtomicBool::new(false),
            max_volume,
        })
    }

    /// Sets the volume, clamped to `[0, max_volume]`. NaN is treated as silence.
    pub fn set_volume(&self, volume: f32) {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, self.max_volume)
        };
        self.volume.store(volume.to_bits(), Ordering::Relaxed);
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    pub fn max_volume(&self) -> f32 {
        self.max_volume
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Gain the render side should reach by the end of the next block.
    fn target(&self) -> f32 {
        if self.is_enabled() { self.volume() } else { 0.0 }
    }
}

/// Final chain stage: applies the shared volume, ramping linearly across each
/// block to avoid clicks.
pub struct GainStage<S> {
    upstream: S,
    control: Arc<GainControl>,
    current: f32,
}

impl<S: StereoStream> GainStage<S> {
    pub fn new(upstream: S, control: Arc<GainControl>) -> Self {
        let current = control.target();
        Self {
            upstream,
            control,
            current,
        }
    }

    pub fn upstream_mut(&mut self) -> &mut S {
        &mut self.upstream
    }

    pub fn upstream(&self) -> &S {
        &self.upstream
    }
}

impl<S: StereoStream> StereoStream for GainStage<S> {
    fn read_stereo(&mut self, out: &mut [f32]) {
        self.upstream.read_stereo(out);

        let target = self.control.target();
        let frames = out.len() / 2;
        if frames == 0 {
            return;
        }
        if self.current == target {
            if target != 1.0 {
                out.iter_mut().for_each(|s| *s *= target);
            }
            return;
        }

        let step = (target - self.current) / frames as f32;
        for (i, frame) in out.chunks_exact_mut(2).enumerate() {
            let gain = self.current + step * (i + 1) as f32;
            frame[0] *= gain;
            frame[1] *= gain;
        }
        self.current = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ones;

    impl StereoStream for Ones {
        fn read_stereo(&mut self, out: &mut [f32]) {
            out.fill(1.0);
        }
    }

    #[test]
    fn test_volume_clamps_to_max() {
        let control = GainControl::new(0.8);
        control.set_volume(3.0);
        assert_eq!(control.volume(), 0.8);
        control.set_volume(-1.0);
        assert_eq!(control.volume(), 0.0);
        control.set_volume(f32::NAN);
        assert_eq!(control.volume(), 0.0);
    }

    #[test]
    fn test_disabled_stage_is_silent() {
        let control = GainControl::new(1.0);
        let mut stage = GainStage::new(Ones, control.clone());
        let mut out = [1.0; 8];
        stage.read_stereo(&mut out);
        assert_eq!(out, [0.0; 8]);
    }

    #[test]
    fn test_enable_ramps_up_then_holds() {
        let control = GainControl::new(1.0);
        let mut stage = GainStage::new(Ones, control.clone());
        control.set_volume(0.5);
        control.set_enabled(true);

        let mut out = [0.0; 8];
        stage.read_stereo(&mut out);
        assert!(out[0] > 0.0 && out[0] < 0.5);
        assert!((out[7] - 0.5).abs() < 1e-6);

        stage.read_stereo(&mut out);
        assert!(out.iter().all(|s| (*s - 0.5).abs() < 1e-6));
    }
}
