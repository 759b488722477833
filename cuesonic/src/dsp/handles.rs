use crate::dsp::NativeContext;
use crate::error::{CueSonicError, Result};
use crate::simulation::DirectParams;
use audionimbus::{
    AudioBufferSettings, BinauralEffect, BinauralEffectParams, BinauralEffectSettings,
    DirectEffect, DirectEffectParams, DirectEffectSettings, Direction, Equalizer,
    HrtfInterpolation, Transmission, audio_buffer::AudioBuffer,
};
use glam::Vec3;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared count of live handles of one kind.
#[derive(Debug, Clone, Default)]
pub(crate) struct LiveCounter(Arc<AtomicUsize>);

impl LiveCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn acquire(&self) -> LiveToken {
        self.0.fetch_add(1, Ordering::AcqRel);
        LiveToken(self.clone())
    }
}

/// Decrements its counter when the owning handle is dropped.
#[derive(Debug)]
struct LiveToken(LiveCounter);

impl Drop for LiveToken {
    fn drop(&mut self) {
        self.0.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Per-source HRTF effect. Processes exactly one native frame per call.
pub struct BinauralHandle {
    effect: BinauralEffect,
    input: Vec<f32>,
    deinterleaved: Vec<f32>,
    native: Arc<NativeContext>,
    _live: LiveToken,
}

impl BinauralHandle {
    pub(crate) fn new(native: Arc<NativeContext>, counter: LiveCounter) -> Result<Self> {
        let effect = BinauralEffect::try_new(
            &native.context,
            &native.audio_settings(),
            &BinauralEffectSettings { hrtf: &native.hrtf },
        )
        .map_err(|e| {
            CueSonicError::SpatialAudio(format!("Failed to create BinauralEffect: {}", e))
        })?;

        let frame_size = native.frame_size;
        Ok(Self {
            effect,
            input: vec![0.0; frame_size],
            deinterleaved: vec![0.0; frame_size * 2],
            native,
            _live: counter.acquire(),
        })
    }

    pub fn frame_size(&self) -> usize {
        self.native.frame_size
    }

    /// Renders one frame of mono `input` into interleaved stereo `output`.
    ///
    /// `direction` is listener-relative in Steam Audio's right-handed space and must be
    /// normalized.
    pub fn apply(&mut self, direction: Vec3, input: &[f32], output: &mut [f32]) -> Result<()> {
        let frame_size = self.native.frame_size;
        if input.len() != frame_size || output.len() != frame_size * 2 {
            return Err(CueSonicError::SpatialAudio(format!(
                "Binaural effect expects {} frames, got {} in / {} out",
                frame_size,
                input.len(),
                output.len() / 2
            )));
        }
        self.input.copy_from_slice(input);

        let params = BinauralEffectParams {
            direction: Direction::new(direction.x, direction.y, direction.z),
            interpolation: HrtfInterpolation::Bilinear,
            spatial_blend: 1.0,
            hrtf: &self.native.hrtf,
            peak_delays: None,
        };

        let input_buf = AudioBuffer::try_with_data_and_settings(
            &self.input,
            AudioBufferSettings {
                num_channels: Some(1),
                ..Default::default()
            },
        )
        .map_err(|e| CueSonicError::SpatialAudio(format!("Failed to create input buffer: {}", e)))?;

        let output_buf = AudioBuffer::try_with_data_and_settings(
            &mut self.deinterleaved,
            AudioBufferSettings {
                num_channels: Some(2),
                ..Default::default()
            },
        )
        .map_err(|e| {
            CueSonicError::SpatialAudio(format!("Failed to create output buffer: {}", e))
        })?;

        self.effect.apply(&params, &input_buf, &output_buf);
        output_buf.interleave(&self.native.context, output);

        Ok(())
    }
}

/// Per-source direct-path effect (attenuation, air absorption, occlusion, transmission).
pub struct DirectHandle {
    effect: DirectEffect,
    input: Vec<f32>,
    output: Vec<f32>,
    native: Arc<NativeContext>,
    _live: LiveToken,
}

impl DirectHandle {
    pub(crate) fn new(native: Arc<NativeContext>, counter: LiveCounter) -> Result<Self> {
        let effect = DirectEffect::try_new(
            &native.context,
            &native.audio_settings(),
            &DirectEffectSettings { num_channels: 1 },
        )
        .map_err(|e| CueSonicError::SpatialAudio(format!("Failed to create DirectEffect: {}", e)))?;

        let frame_size = native.frame_size;
        Ok(Self {
            effect,
            input: vec![0.0; frame_size],
            output: vec![0.0; frame_size],
            native,
            _live: counter.acquire(),
        })
    }

    pub fn frame_size(&self) -> usize {
        self.native.frame_size
    }

    /// Filters one mono frame with `params`, writing into `output`.
    pub fn apply(&mut self, params: &DirectParams, input: &[f32], output: &mut [f32]) -> Result<()> {
        let frame_size = self.native.frame_size;
        if input.len() != frame_size || output.len() != frame_size {
            return Err(CueSonicError::SpatialAudio(format!(
                "Direct effect expects {} frames, got {} in / {} out",
                frame_size,
                input.len(),
                output.len()
            )));
        }
        self.input.copy_from_slice(input);

        let effect_params = DirectEffectParams {
            distance_attenuation: Some(params.distance_attenuation),
            air_absorption: Some(Equalizer(params.air_absorption)),
            directivity: Some(params.directivity),
            occlusion: Some(params.occlusion),
            transmission: Some(Transmission::FrequencyDependent(Equalizer(
                params.transmission,
            ))),
        };

        {
            let input_buf = AudioBuffer::try_with_data_and_settings(
                &self.input,
                AudioBufferSettings {
                    num_channels: Some(1),
                    ..Default::default()
                },
            )
            .map_err(|e| {
                CueSonicError::SpatialAudio(format!("Failed to create input buffer: {}", e))
            })?;

            let output_buf = AudioBuffer::try_with_data_and_settings(
                &mut self.output,
                AudioBufferSettings {
                    num_channels: Some(1),
                    ..Default::default()
                },
            )
            .map_err(|e| {
                CueSonicError::SpatialAudio(format!("Failed to create output buffer: {}", e))
            })?;

            self.effect.apply(&effect_params, &input_buf, &output_buf);
        }
        output.copy_from_slice(&self.output);

        Ok(())
    }
}
