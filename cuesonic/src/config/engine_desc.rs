use crate::config::GeometrySettings;
use crate::error::{CueSonicError, Result};

/// Configuration descriptor for a CueSonic engine
#[derive(Debug, Clone)]
pub struct CueSonicDesc {
    /// Sample rate shared by the output device and all DSP stages
    pub sample_rate: u32,
    /// Native frame size: the fixed block every DSP stage pulls from upstream and
    /// the buffer size requested from the output device
    pub frame_size: usize,
    /// Output channel count. Only stereo is supported.
    pub channels: u16,
    /// Scale factor converting game units to metres before native simulation
    pub distance_scaler: f32,
    /// Optional path to a custom HRTF SOFA file (None uses Steam Audio's default HRTF)
    pub hrtf_path: Option<String>,
    /// Occlusion geometry extraction settings
    pub geometry: GeometrySettings,
}

impl Default for CueSonicDesc {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            frame_size: 1024,
            channels: 2,
            distance_scaler: 1.0,
            hrtf_path: None,
            geometry: GeometrySettings::default(),
        }
    }
}

impl CueSonicDesc {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(CueSonicError::Configuration(
                "Sample rate must be greater than 0".into(),
            ));
        }
        if self.frame_size == 0 {
            return Err(CueSonicError::Configuration(
                "Frame size must be greater than 0".into(),
            ));
        }
        if self.channels != 2 {
            return Err(CueSonicError::Configuration(format!(
                "Only stereo output is supported, got {} channels",
                self.channels
            )));
        }
        if !(self.distance_scaler > 0.0) {
            return Err(CueSonicError::Configuration(
                "Distance scaler must be positive".into(),
            ));
        }
        self.geometry.validate()
    }

    /// Duration of one native frame in seconds
    pub fn frame_duration_secs(&self) -> f64 {
        self.frame_size as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_desc_is_valid() {
        assert!(CueSonicDesc::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_stereo() {
        let desc = CueSonicDesc {
            channels: 6,
            ..Default::default()
        };
        assert!(matches!(
            desc.validate(),
            Err(CueSonicError::Configuration(_))
        ));
    }
}
