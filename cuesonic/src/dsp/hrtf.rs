use crate::error::{CueSonicError, Result};
use audionimbus::{AudioSettings, Context, Hrtf, HrtfSettings, Sofa, VolumeNormalization};

/// Load Steam Audio's built-in HRTF
pub fn create_default_hrtf(context: &Context, audio_settings: &AudioSettings) -> Result<Hrtf> {
    let hrtf = Hrtf::try_new(
        context,
        audio_settings,
        &HrtfSettings {
            volume_normalization: VolumeNormalization::RootMeanSquared,
            sofa_information: None,
            ..Default::default()
        },
    )
    .map_err(|e| CueSonicError::SpatialAudio(format!("Failed to create HRTF: {}", e)))?;

    log::info!("Created default HRTF");
    Ok(hrtf)
}

/// Load an HRTF from a SOFA file
pub fn create_hrtf_from_file(
    context: &Context,
    audio_settings: &AudioSettings,
    sofa_path: &str,
) -> Result<Hrtf> {
    let hrtf_data = std::fs::read(sofa_path)?;

    let hrtf = Hrtf::try_new(
        context,
        audio_settings,
        &HrtfSettings {
            volume_normalization: VolumeNormalization::RootMeanSquared,
            sofa_information: Some(Sofa::Buffer(hrtf_data)),
            ..Default::default()
        },
    )
    .map_err(|e| {
        CueSonicError::SpatialAudio(format!("Failed to create HRTF from {}: {}", sofa_path, e))
    })?;

    log::info!("Created HRTF from file: {}", sofa_path);
    Ok(hrtf)
}

/// Custom HRTF if one is configured and loads, otherwise the built-in one.
pub fn create_hrtf(
    context: &Context,
    audio_settings: &AudioSettings,
    sofa_path: Option<&str>,
) -> Result<Hrtf> {
    if let Some(path) = sofa_path {
        match create_hrtf_from_file(context, audio_settings, path) {
            Ok(hrtf) => return Ok(hrtf),
            Err(e) => log::warn!("{}; falling back to the default HRTF", e),
        }
    }
    create_default_hrtf(context, audio_settings)
}
