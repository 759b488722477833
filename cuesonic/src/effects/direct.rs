use crate::dsp::DirectHandle;
use crate::error::Result;
use crate::simulation::{DirectParams, SharedParams};
use crate::stream::{FrameBuffer, MonoStream};

/// Filters one fixed-size mono frame with direct-path parameters.
pub trait DirectProcessor: Send {
    fn frame_size(&self) -> usize;

    fn process(&mut self, params: &DirectParams, input: &[f32], output: &mut [f32]) -> Result<()>;
}

impl DirectProcessor for DirectHandle {
    fn frame_size(&self) -> usize {
        DirectHandle::frame_size(self)
    }

    fn process(&mut self, params: &DirectParams, input: &[f32], output: &mut [f32]) -> Result<()> {
        self.apply(params, input, output)
    }
}

struct DirectRenderer<S, P> {
    upstream: S,
    handle: Option<P>,
    params: SharedParams,
    input: Vec<f32>,
    corrupt_frames: u64,
}

impl<S: MonoStream, P: DirectProcessor> DirectRenderer<S, P> {
    fn render_frame(&mut self, frame: &mut [f32]) {
        self.upstream.read(&mut self.input);

        let Some(handle) = self.handle.as_mut() else {
            frame.copy_from_slice(&self.input);
            return;
        };

        // Copied out so the lock is released before native processing.
        let params = self.params.snapshot();
        if let Err(e) = handle.process(&params, &self.input, frame) {
            log::error!("Direct effect failed, passing audio through: {}", e);
            frame.copy_from_slice(&self.input);
            return;
        }

        if frame.iter().any(|s| !s.is_finite()) {
            if self.corrupt_frames == 0 {
                log::warn!("Direct effect produced non-finite samples; substituting dry input");
            }
            self.corrupt_frames += 1;
            frame.copy_from_slice(&self.input);
        }
    }
}

/// Applies the simulator's cached direct-path parameters to a mono stream.
///
/// Native processing runs on whole frames; reads of any size are served from
/// the frame buffer. Without a native handle the stage is a passthrough.
pub struct DirectEffectStage<S, P = DirectHandle> {
    renderer: DirectRenderer<S, P>,
    frames: FrameBuffer,
}

impl<S: MonoStream, P: DirectProcessor> DirectEffectStage<S, P> {
    pub fn new(
        upstream: S,
        handle: Option<P>,
        params: SharedParams,
        frame_size: usize,
    ) -> Self {
        let frame_size = handle.as_ref().map_or(frame_size, |h| h.frame_size());
        Self {
            renderer: DirectRenderer {
                upstream,
                handle,
                params,
                input: vec![0.0; frame_size],
                corrupt_frames: 0,
            },
            frames: FrameBuffer::new(frame_size),
        }
    }

    pub fn upstream(&self) -> &S {
        &self.renderer.upstream
    }

    pub fn is_native(&self) -> bool {
        self.renderer.handle.is_some()
    }

    /// Frames whose processed output was non-finite and replaced by the dry input.
    pub fn corrupt_frames(&self) -> u64 {
        self.renderer.corrupt_frames
    }

    /// Detaches the native handle; the stage keeps running as a passthrough.
    pub fn take_handle(&mut self) -> Option<P> {
        self.renderer.handle.take()
    }
}

impl<S: MonoStream, P: DirectProcessor> MonoStream for DirectEffectStage<S, P> {
    fn read(&mut self, out: &mut [f32]) {
        let renderer = &mut self.renderer;
        self.frames.read(out, |frame| renderer.render_frame(frame));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_data::ToneClip;
    use crate::error::CueSonicError;
    use crate::stream::LoopingClip;

    /// Stand-in for the native effect that writes whatever `fill` returns.
    struct FakeProcessor {
        frame_size: usize,
        fill: fn(f32) -> f32,
        fail: bool,
    }

    impl DirectProcessor for FakeProcessor {
        fn frame_size(&self) -> usize {
            self.frame_size
        }

        fn process(&mut self, _: &DirectParams, input: &[f32], output: &mut [f32]) -> Result<()> {
            if self.fail {
                return Err(CueSonicError::SpatialAudio("effect lost".into()));
            }
            for (o, i) in output.iter_mut().zip(input) {
                *o = (self.fill)(*i);
            }
            Ok(())
        }
    }

    fn fake_stage(fill: fn(f32) -> f32, fail: bool) -> DirectEffectStage<LoopingClip, FakeProcessor> {
        DirectEffectStage::new(
            LoopingClip::new(ToneClip::from_samples(vec![0.5, -0.25], 48000)),
            Some(FakeProcessor {
                frame_size: 4,
                fill,
                fail,
            }),
            SharedParams::default(),
            4,
        )
    }

    fn ramp_stage() -> DirectEffectStage<LoopingClip, DirectHandle> {
        let samples: Vec<f32> = (0..3000).map(|i| (i as f32 * 0.001).sin()).collect();
        let source = LoopingClip::new(ToneClip::from_samples(samples, 48000));
        DirectEffectStage::new(source, None, SharedParams::default(), 1024)
    }

    #[test]
    fn test_odd_sized_reads_match_one_large_read() {
        let mut chunked = ramp_stage();
        let mut whole = ramp_stage();

        let mut chunked_out = vec![0.0; 4800];
        for chunk in chunked_out.chunks_mut(480) {
            chunked.read(chunk);
        }
        let mut whole_out = vec![0.0; 4800];
        whole.read(&mut whole_out);

        assert_eq!(chunked_out, whole_out);
    }

    #[test]
    fn test_passthrough_without_native_handle() {
        let mut stage: DirectEffectStage<_, DirectHandle> = DirectEffectStage::new(
            LoopingClip::new(ToneClip::from_samples(vec![0.5, -0.5], 48000)),
            None,
            SharedParams::default(),
            4,
        );
        assert!(!stage.is_native());
        let mut out = [0.0; 6];
        stage.read(&mut out);
        assert_eq!(out, [0.5, -0.5, 0.5, -0.5, 0.5, -0.5]);
    }

    #[test]
    fn test_processed_output_is_used() {
        let mut stage = fake_stage(|s| s * 0.5, false);
        assert!(stage.is_native());
        let mut out = [0.0; 4];
        stage.read(&mut out);
        assert_eq!(out, [0.25, -0.125, 0.25, -0.125]);
        assert_eq!(stage.corrupt_frames(), 0);
    }

    #[test]
    fn test_non_finite_output_falls_back_to_dry_input() {
        let mut stage = fake_stage(|_| f32::NAN, false);
        let mut out = [0.0; 8];
        stage.read(&mut out);
        assert_eq!(out, [0.5, -0.25, 0.5, -0.25, 0.5, -0.25, 0.5, -0.25]);
        assert_eq!(stage.corrupt_frames(), 2);

        let mut stage = fake_stage(|_| f32::INFINITY, false);
        stage.read(&mut out[..4]);
        assert_eq!(&out[..4], &[0.5, -0.25, 0.5, -0.25]);
        assert_eq!(stage.corrupt_frames(), 1);
    }

    #[test]
    fn test_failed_processing_passes_audio_through() {
        let mut stage = fake_stage(|s| s * 0.5, true);
        let mut out = [0.0; 4];
        stage.read(&mut out);
        assert_eq!(out, [0.5, -0.25, 0.5, -0.25]);
        assert_eq!(stage.corrupt_frames(), 0);
    }
}
