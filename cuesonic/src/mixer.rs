use crate::config::CueSonicDesc;
use crate::error::{CueSonicError, Result};
use crate::stream::StereoStream;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Identifies one input of the output mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MixerInputId(u64);

/// A stereo stream shared between its emitter and the render thread.
pub type SharedStream = Arc<Mutex<dyn StereoStream>>;

#[derive(Clone)]
struct MixerInput {
    id: MixerInputId,
    stream: SharedStream,
}

struct MixerBus {
    // Replaced wholesale on mutation; the render thread only clones the `Arc`.
    inputs: Mutex<Arc<Vec<MixerInput>>>,
    next_id: AtomicU64,
    frames_rendered: AtomicUsize,
}

/// Cloneable, thread-safe handle to the mixing graph.
///
/// Rendering does not need a device, so the whole graph can be driven headless.
#[derive(Clone)]
pub struct MixerHandle {
    bus: Arc<MixerBus>,
}

impl Default for MixerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl MixerHandle {
    pub fn new() -> Self {
        Self {
            bus: Arc::new(MixerBus {
                inputs: Mutex::new(Arc::new(Vec::new())),
                next_id: AtomicU64::new(1),
                frames_rendered: AtomicUsize::new(0),
            }),
        }
    }

    fn inputs(&self) -> MutexGuard<'_, Arc<Vec<MixerInput>>> {
        match self.bus.inputs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Reserves an id for a future input.
    pub fn allocate_id(&self) -> MixerInputId {
        MixerInputId(self.bus.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Adds `stream` under `id`. Adding an id that is already present does nothing.
    pub fn add_input(&self, id: MixerInputId, stream: SharedStream) -> bool {
        let mut inputs = self.inputs();
        if inputs.iter().any(|input| input.id == id) {
            log::debug!("Mixer input {:?} already registered", id);
            return false;
        }
        let mut next = Vec::with_capacity(inputs.len() + 1);
        next.extend(inputs.iter().cloned());
        next.push(MixerInput { id, stream });
        *inputs = Arc::new(next);
        log::debug!("Added mixer input {:?} ({} total)", id, inputs.len());
        true
    }

    /// Removes the input with `id`. Removing an unknown id does nothing.
    ///
    /// Once this returns, the render thread no longer starts reads on the stream,
    /// but a read already in flight holds the stream lock until it finishes.
    pub fn remove_input(&self, id: MixerInputId) -> bool {
        let mut inputs = self.inputs();
        if !inputs.iter().any(|input| input.id == id) {
            return false;
        }
        let next: Vec<MixerInput> = inputs
            .iter()
            .filter(|input| input.id != id)
            .cloned()
            .collect();
        *inputs = Arc::new(next);
        log::debug!("Removed mixer input {:?} ({} left)", id, inputs.len());
        true
    }

    pub fn contains(&self, id: MixerInputId) -> bool {
        self.inputs().iter().any(|input| input.id == id)
    }

    pub fn input_count(&self) -> usize {
        self.inputs().len()
    }

    pub fn frames_rendered(&self) -> usize {
        self.bus.frames_rendered.load(Ordering::Relaxed)
    }

    /// Renders interleaved stereo into `out`, allocating a scratch buffer.
    pub fn render(&self, out: &mut [f32]) {
        let mut scratch = Vec::new();
        self.render_into(out, &mut scratch);
    }

    /// Sums every input into `out` and hard-clips to `[-1, 1]`. Silence when empty.
    ///
    /// An input whose stream is locked by its owner (mid-teardown) is skipped for
    /// this block.
    pub fn render_into(&self, out: &mut [f32], scratch: &mut Vec<f32>) {
        out.fill(0.0);
        let inputs = Arc::clone(&self.inputs());
        if !inputs.is_empty() {
            scratch.resize(out.len(), 0.0);
            for input in inputs.iter() {
                let Ok(mut stream) = input.stream.try_lock() else {
                    continue;
                };
                stream.read_stereo(scratch);
                for (o, s) in out.iter_mut().zip(scratch.iter()) {
                    *o += *s;
                }
            }
            for sample in out.iter_mut() {
                *sample = if sample.is_nan() {
                    0.0
                } else {
                    sample.clamp(-1.0, 1.0)
                };
            }
        }
        self.bus
            .frames_rendered
            .fetch_add(out.len() / 2, Ordering::Relaxed);
    }
}

/// Owns the output device stream that pulls from the mixing graph.
///
/// The device stream is not `Send`, so this lives on the thread that created it;
/// everything else talks to the graph through [`MixerHandle`].
pub struct OutputMixer {
    handle: MixerHandle,
    stream: Option<cpal::Stream>,
    sample_rate: u32,
    frame_size: usize,
}

impl OutputMixer {
    pub fn new(desc: &CueSonicDesc) -> Self {
        Self {
            handle: MixerHandle::new(),
            stream: None,
            sample_rate: desc.sample_rate,
            frame_size: desc.frame_size,
        }
    }

    pub fn handle(&self) -> MixerHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    /// Opens the default output device and starts rendering. Does nothing if
    /// already running.
    pub fn initialize(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            CueSonicError::AudioDevice("No default output device available".into())
        })?;

        let config = cpal::StreamConfig {
            channels: 2,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(self.frame_size as u32),
        };

        let default_config = device.default_output_config().map_err(|e| {
            CueSonicError::AudioDevice(format!("Failed to get default config: {}", e))
        })?;

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => self.create_stream::<f32>(&device, &config)?,
            cpal::SampleFormat::I16 => self.create_stream::<i16>(&device, &config)?,
            cpal::SampleFormat::U16 => self.create_stream::<u16>(&device, &config)?,
            other => {
                return Err(CueSonicError::AudioFormat(format!(
                    "Unsupported sample format: {:?}",
                    other
                )));
            }
        };

        stream
            .play()
            .map_err(|e| CueSonicError::AudioDevice(format!("Failed to start stream: {}", e)))?;

        log::info!(
            "Output mixer started ({} Hz, {} frames per block)",
            self.sample_rate,
            self.frame_size
        );
        self.stream = Some(stream);
        Ok(())
    }

    /// Stops the device stream. Safe to call repeatedly or before `initialize`.
    pub fn shutdown(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            log::info!("Output mixer stopped");
        }
    }

    fn create_stream<T>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
    ) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let handle = self.handle.clone();
        let mut mixed = vec![0.0f32; self.frame_size * 2];
        let mut scratch = vec![0.0f32; self.frame_size * 2];

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    if mixed.len() != data.len() {
                        mixed.resize(data.len(), 0.0);
                    }
                    handle.render_into(&mut mixed, &mut scratch);
                    for (sample, value) in data.iter_mut().zip(mixed.iter()) {
                        *sample = T::from_sample(*value);
                    }
                },
                move |err| {
                    log::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| CueSonicError::AudioDevice(format!("Failed to build stream: {}", e)))
    }
}

impl Drop for OutputMixer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(f32);

    impl StereoStream for Constant {
        fn read_stereo(&mut self, out: &mut [f32]) {
            out.fill(self.0);
        }
    }

    fn constant(value: f32) -> SharedStream {
        Arc::new(Mutex::new(Constant(value)))
    }

    #[test]
    fn test_empty_mixer_renders_silence() {
        let mixer = MixerHandle::new();
        let mut out = [0.7; 16];
        mixer.render(&mut out);
        assert_eq!(out, [0.0; 16]);
        assert_eq!(mixer.frames_rendered(), 8);
    }

    #[test]
    fn test_add_and_remove_are_idempotent() {
        let mixer = MixerHandle::new();
        let id = mixer.allocate_id();
        let stream = constant(0.25);

        assert!(mixer.add_input(id, stream.clone()));
        assert!(!mixer.add_input(id, stream));
        assert_eq!(mixer.input_count(), 1);

        let mut out = [0.0; 4];
        mixer.render(&mut out);
        assert_eq!(out, [0.25; 4]);

        assert!(mixer.remove_input(id));
        assert!(!mixer.remove_input(id));
        assert_eq!(mixer.input_count(), 0);
    }

    #[test]
    fn test_sum_is_hard_clipped() {
        let mixer = MixerHandle::new();
        mixer.add_input(mixer.allocate_id(), constant(0.75));
        mixer.add_input(mixer.allocate_id(), constant(0.75));
        let mut out = [0.0; 4];
        mixer.render(&mut out);
        assert_eq!(out, [1.0; 4]);
    }

    #[test]
    fn test_locked_input_is_skipped() {
        let mixer = MixerHandle::new();
        let busy = constant(0.5);
        mixer.add_input(mixer.allocate_id(), busy.clone());
        mixer.add_input(mixer.allocate_id(), constant(0.25));

        let _guard = busy.lock().unwrap();
        let mut out = [0.0; 4];
        mixer.render(&mut out);
        assert_eq!(out, [0.25; 4]);
    }

    #[test]
    fn test_shutdown_without_initialize() {
        let mut mixer = OutputMixer::new(&CueSonicDesc::default());
        mixer.shutdown();
        mixer.shutdown();
        assert!(!mixer.is_running());
    }
}
