use crate::config::CueSonicDesc;
use crate::dsp::handles::{BinauralHandle, DirectHandle, LiveCounter};
use crate::dsp::hrtf;
use crate::error::{CueSonicError, Result};
use crate::events::{CueSonicEvent, EventSink};
use audionimbus::{AudioSettings, Context, ContextSettings, Hrtf};
use std::sync::{Arc, Mutex};

/// Native objects shared by every effect handle.
///
/// Field order is drop order: the HRTF is released before the context.
pub(crate) struct NativeContext {
    pub hrtf: Hrtf,
    pub context: Context,
    pub sample_rate: u32,
    pub frame_size: usize,
}

impl NativeContext {
    pub fn audio_settings(&self) -> AudioSettings {
        AudioSettings {
            sampling_rate: self.sample_rate,
            frame_size: self.frame_size as u32,
        }
    }
}

/// Process-wide acoustic context: one Steam Audio context plus one HRTF.
///
/// Created once at startup and shared by `Arc` with the simulator and the emitters.
/// Creation never fails: when the native library is missing the context is
/// constructed in an unavailable state and every dependent falls back to plain
/// stereo panning and unfiltered direct sound, with identical timing.
pub struct AcousticContext {
    native: Mutex<Option<Arc<NativeContext>>>,
    sample_rate: u32,
    frame_size: usize,
    live_binaural: LiveCounter,
    live_direct: LiveCounter,
}

impl AcousticContext {
    /// Best-effort initialization of the native context and HRTF.
    pub fn initialize(desc: &CueSonicDesc, events: &EventSink) -> Self {
        let native = match Self::create_native(desc) {
            Ok(native) => {
                log::info!(
                    "Steam Audio context ready (sample_rate: {} Hz, frame_size: {})",
                    desc.sample_rate,
                    desc.frame_size
                );
                Some(Arc::new(native))
            }
            Err(e) => {
                log::warn!("Native spatial audio unavailable, using panning fallback: {}", e);
                events.emit(CueSonicEvent::NativeUnavailable {
                    reason: e.to_string(),
                });
                None
            }
        };

        Self {
            native: Mutex::new(native),
            sample_rate: desc.sample_rate,
            frame_size: desc.frame_size,
            live_binaural: LiveCounter::default(),
            live_direct: LiveCounter::default(),
        }
    }

    /// A context that never touches the native library.
    pub fn disabled(desc: &CueSonicDesc) -> Self {
        Self {
            native: Mutex::new(None),
            sample_rate: desc.sample_rate,
            frame_size: desc.frame_size,
            live_binaural: LiveCounter::default(),
            live_direct: LiveCounter::default(),
        }
    }

    fn create_native(desc: &CueSonicDesc) -> Result<NativeContext> {
        let context = Context::try_new(&ContextSettings::default()).map_err(|e| {
            CueSonicError::SpatialAudio(format!("Failed to create Steam Audio context: {}", e))
        })?;

        let audio_settings = AudioSettings {
            sampling_rate: desc.sample_rate,
            frame_size: desc.frame_size as u32,
        };
        let hrtf = hrtf::create_hrtf(&context, &audio_settings, desc.hrtf_path.as_deref())?;

        Ok(NativeContext {
            hrtf,
            context,
            sample_rate: desc.sample_rate,
            frame_size: desc.frame_size,
        })
    }

    pub fn is_available(&self) -> bool {
        self.native().is_some()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub(crate) fn native(&self) -> Option<Arc<NativeContext>> {
        match self.native.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Creates a per-source HRTF effect, or `None` in fallback mode or on native failure.
    pub fn create_binaural_effect(&self) -> Option<BinauralHandle> {
        let native = self.native()?;
        match BinauralHandle::new(native, self.live_binaural.clone()) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("{}", e);
                None
            }
        }
    }

    /// Releases a binaural handle. The handle must already be unreachable from the
    /// render thread, i.e. its chain has been removed from the mixer.
    pub fn release_binaural_effect(&self, handle: BinauralHandle) {
        drop(handle);
        log::debug!(
            "Released binaural effect ({} still live)",
            self.live_binaural.get()
        );
    }

    /// Creates a per-source direct effect, or `None` in fallback mode or on native failure.
    pub fn create_direct_effect(&self) -> Option<DirectHandle> {
        let native = self.native()?;
        match DirectHandle::new(native, self.live_direct.clone()) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("{}", e);
                None
            }
        }
    }

    pub fn release_direct_effect(&self, handle: DirectHandle) {
        drop(handle);
        log::debug!(
            "Released direct effect ({} still live)",
            self.live_direct.get()
        );
    }

    /// Number of binaural and direct handles that have not been released yet.
    pub fn live_handles(&self) -> (usize, usize) {
        (self.live_binaural.get(), self.live_direct.get())
    }

    /// Drops the context's own reference to the HRTF and native context. Handles still
    /// alive keep the native objects until they are released. Safe to call repeatedly.
    pub fn shutdown(&self) {
        let native = match self.native.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(native) = native else {
            return;
        };

        let (binaural, direct) = self.live_handles();
        if binaural + direct > 0 {
            log::warn!(
                "Acoustic context shut down with {} binaural and {} direct effects still live",
                binaural,
                direct
            );
        }
        drop(native);
        log::info!("Acoustic context shut down");
    }
}

impl Drop for AcousticContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
