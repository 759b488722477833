use crate::error::{CueSonicError, Result};
use rubato::{FftFixedIn, Resampler};

/// Offline resampler for mono clips, run once at load time.
pub struct MonoResampler {
    source_sample_rate: u32,
    target_sample_rate: u32,
    chunk_size: usize,
}

impl MonoResampler {
    pub fn new(
        source_sample_rate: u32,
        target_sample_rate: u32,
        chunk_size: Option<usize>,
    ) -> Result<Self> {
        if source_sample_rate == 0 || target_sample_rate == 0 {
            return Err(CueSonicError::AudioFormat(
                "Sample rates must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            source_sample_rate,
            target_sample_rate,
            chunk_size: chunk_size.unwrap_or(1024),
        })
    }

    /// Resamples the whole clip. The output is trimmed to the exact expected length so
    /// a looped clip keeps its period.
    pub fn resample(&self, samples: &[f32]) -> Result<Vec<f32>> {
        if self.source_sample_rate == self.target_sample_rate {
            return Ok(samples.to_vec());
        }

        let mut resampler = FftFixedIn::<f32>::new(
            self.source_sample_rate as usize,
            self.target_sample_rate as usize,
            self.chunk_size,
            2,
            1,
        )
        .map_err(|e| CueSonicError::AudioLoading(format!("Failed to create resampler: {}", e)))?;

        let delay = resampler.output_delay();
        let expected = (samples.len() as f64 * self.ratio()).round() as usize;
        let mut output = Vec::with_capacity(expected + delay + self.chunk_size);
        let mut input_chunk = vec![0.0f32; self.chunk_size];
        let mut index = 0;

        // Keep feeding zero-padded chunks until the filter delay has been flushed.
        while output.len() < expected + delay {
            input_chunk.fill(0.0);
            if index < samples.len() {
                let take = (samples.len() - index).min(self.chunk_size);
                input_chunk[..take].copy_from_slice(&samples[index..index + take]);
                index += take;
            }

            let waves_out = resampler
                .process(std::slice::from_ref(&input_chunk), None)
                .map_err(|e| CueSonicError::AudioLoading(format!("Resampling error: {}", e)))?;
            match waves_out.first() {
                Some(channel) if !channel.is_empty() => output.extend_from_slice(channel),
                _ => break,
            }
        }

        let start = delay.min(output.len());
        let end = (start + expected).min(output.len());
        Ok(output[start..end].to_vec())
    }

    pub fn ratio(&self) -> f64 {
        self.target_sample_rate as f64 / self.source_sample_rate as f64
    }
}
