//! Mono tone clips used as emitter sources.
//!
//! Every cue in the engine is a mono signal: clips are downmixed and resampled to
//! the engine rate once, at load time, so nothing on the render thread converts.

mod loader;
mod resampler;

use crate::error::{CueSonicError, Result};
pub use loader::{ClipLoader, SymphoniaClipLoader};
pub use resampler::MonoResampler;
use std::sync::Arc;
use std::time::Duration;

/// Shared, immutable mono sample buffer at a known sample rate.
#[derive(Debug, Clone)]
pub struct ToneClip {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl ToneClip {
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// Decodes an audio file and converts it to a mono clip at `target_sample_rate`.
    pub fn from_path(path: &str, target_sample_rate: u32) -> Result<Self> {
        Self::from_path_with_loader(path, &SymphoniaClipLoader, target_sample_rate)
    }

    pub fn from_path_with_loader<L: ClipLoader>(
        path: &str,
        loader: &L,
        target_sample_rate: u32,
    ) -> Result<Self> {
        let clip = loader.load(path)?;
        clip.resample(target_sample_rate)
    }

    /// Synthesizes a sine tone with short linear fades at both ends so that looping
    /// or gating it never clicks.
    pub fn sine(frequency_hz: f32, duration: Duration, sample_rate: u32, amplitude: f32) -> Self {
        let len = (duration.as_secs_f64() * sample_rate as f64).round() as usize;
        let fade = ((sample_rate as usize) / 200).min(len / 2).max(1);
        let step = std::f32::consts::TAU * frequency_hz / sample_rate as f32;
        let samples = (0..len)
            .map(|i| {
                let edge = i.min(len - 1 - i);
                let envelope = if edge < fade {
                    edge as f32 / fade as f32
                } else {
                    1.0
                };
                (step * i as f32).sin() * amplitude * envelope
            })
            .collect();
        Self::from_samples(samples, sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Resamples to `target_sample_rate`, returning a clone if the rate already matches.
    pub fn resample(&self, target_sample_rate: u32) -> Result<Self> {
        if target_sample_rate == self.sample_rate {
            return Ok(self.clone());
        }
        let resampler = MonoResampler::new(self.sample_rate, target_sample_rate, None)?;
        let resampled = resampler.resample(&self.samples)?;
        Ok(Self::from_samples(resampled, target_sample_rate))
    }

    /// Returns a copy zero-padded to `len` samples. Clips longer than `len` are kept whole.
    pub fn padded_to(&self, len: usize) -> Self {
        if self.samples.len() >= len {
            return self.clone();
        }
        let mut samples = self.samples.to_vec();
        samples.resize(len, 0.0);
        Self::from_samples(samples, self.sample_rate)
    }
}

/// Pads a set of loops to a common length so they stay sample-aligned when looped together.
pub fn align_loops<const N: usize>(clips: [ToneClip; N]) -> Result<[ToneClip; N]> {
    let rate = clips.first().map(ToneClip::sample_rate).unwrap_or_default();
    if clips.iter().any(|clip| clip.sample_rate() != rate) {
        return Err(CueSonicError::AudioFormat(
            "Aligned loops must share one sample rate".into(),
        ));
    }
    if clips.iter().any(ToneClip::is_empty) {
        return Err(CueSonicError::AudioFormat(
            "Aligned loops must not be empty".into(),
        ));
    }
    let len = clips.iter().map(ToneClip::len).max().unwrap_or(0);
    Ok(clips.map(|clip| clip.padded_to(len)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_length_and_fades() {
        let clip = ToneClip::sine(440.0, Duration::from_millis(100), 48000, 0.5);
        assert_eq!(clip.len(), 4800);
        assert_eq!(clip.samples()[0], 0.0);
        assert!(clip.samples().iter().all(|s| s.abs() <= 0.5));
    }

    #[test]
    fn test_align_loops_pads_to_longest() {
        let a = ToneClip::from_samples(vec![1.0; 10], 48000);
        let b = ToneClip::from_samples(vec![1.0; 25], 48000);
        let [a, b] = align_loops([a, b]).unwrap();
        assert_eq!(a.len(), 25);
        assert_eq!(b.len(), 25);
        assert_eq!(a.samples()[24], 0.0);
    }

    #[test]
    fn test_align_loops_rejects_mixed_rates() {
        let a = ToneClip::from_samples(vec![1.0; 10], 48000);
        let b = ToneClip::from_samples(vec![1.0; 10], 44100);
        assert!(align_loops([a, b]).is_err());
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let clip = ToneClip::from_samples(vec![0.25; 64], 48000);
        let same = clip.resample(48000).unwrap();
        assert_eq!(same.samples(), clip.samples());
    }
}
