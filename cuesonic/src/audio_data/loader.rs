use crate::audio_data::ToneClip;
use crate::error::{CueSonicError, Result};
use std::fs::File;
use std::path::Path;
use symphonia::{
    core::{
        audio::SampleBuffer, codecs::DecoderOptions, errors::Error, formats::FormatOptions,
        io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
    },
    default::{get_codecs, get_probe},
};

/// Source of mono clips at the file's native sample rate.
///
/// Implement this to feed tones from a game's own asset archive instead of loose files.
pub trait ClipLoader {
    fn load(&self, path: &str) -> Result<ToneClip>;
}

/// Loader backed by Symphonia (WAV, OGG, FLAC, MP3, ...). Multi-channel files are
/// downmixed by averaging.
pub struct SymphoniaClipLoader;

impl ClipLoader for SymphoniaClipLoader {
    fn load(&self, path: &str) -> Result<ToneClip> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                CueSonicError::AudioLoading(format!("Failed to probe {}: {:?}", path, e))
            })?;
        let mut format = probed.format;

        let track = format.default_track().ok_or_else(|| {
            CueSonicError::AudioLoading(format!("No default audio track in {}", path))
        })?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| CueSonicError::AudioLoading("Sample rate not found".into()))?;
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count())
            .ok_or_else(|| CueSonicError::AudioLoading("Channel count not found".into()))?;

        let mut decoder = get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| {
                CueSonicError::AudioLoading(format!("Failed to create decoder: {:?}", e))
            })?;

        let mut mono: Vec<f32> = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(Error::IoError(_)) => break,
                Err(e) => {
                    return Err(CueSonicError::AudioLoading(format!(
                        "Error reading packet: {:?}",
                        e
                    )));
                }
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(Error::IoError(_)) => break,
                Err(Error::DecodeError(e)) => {
                    log::warn!("Skipping corrupt packet in {}: {}", path, e);
                    continue;
                }
                Err(e) => {
                    return Err(CueSonicError::AudioLoading(format!(
                        "Error decoding packet: {:?}",
                        e
                    )));
                }
            };

            let spec = *decoded.spec();
            let mut interleaved = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            interleaved.copy_interleaved_ref(decoded);

            mono.extend(
                interleaved
                    .samples()
                    .chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        }

        log::debug!(
            "Loaded {} ({} Hz, {} channel(s) -> mono, {} samples)",
            path,
            sample_rate,
            channels,
            mono.len()
        );

        Ok(ToneClip::from_samples(mono, sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_io_error() {
        let result = SymphoniaClipLoader.load("does/not/exist.wav");
        assert!(matches!(result, Err(CueSonicError::Io(_))));
    }
}
