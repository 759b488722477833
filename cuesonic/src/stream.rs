//! Pull-based audio streams that make up an emitter chain.
//!
//! Every stream is pulled from the render thread and must fill the whole buffer
//! it is handed, writing silence when it has nothing to play.

use crate::audio_data::ToneClip;
use ringbuf::{
    HeapRb,
    traits::{Consumer, Observer, Producer},
};

/// A mono sample source.
pub trait MonoStream: Send {
    /// Fills `out` completely.
    fn read(&mut self, out: &mut [f32]);
}

/// An interleaved stereo sample source.
pub trait StereoStream: Send {
    /// Fills the interleaved `out` completely. `out.len()` is always even.
    fn read_stereo(&mut self, out: &mut [f32]);
}

impl<S: MonoStream + ?Sized> MonoStream for Box<S> {
    fn read(&mut self, out: &mut [f32]) {
        (**self).read(out)
    }
}

/// Endless playback of one clip.
pub struct LoopingClip {
    clip: ToneClip,
    cursor: usize,
}

impl LoopingClip {
    pub fn new(clip: ToneClip) -> Self {
        Self { clip, cursor: 0 }
    }

    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl MonoStream for LoopingClip {
    fn read(&mut self, out: &mut [f32]) {
        let samples = self.clip.samples();
        if samples.is_empty() {
            out.fill(0.0);
            return;
        }

        let mut written = 0;
        while written < out.len() {
            let take = (samples.len() - self.cursor).min(out.len() - written);
            out[written..written + take].copy_from_slice(&samples[self.cursor..self.cursor + take]);
            written += take;
            self.cursor = (self.cursor + take) % samples.len();
        }
    }
}

/// Adapts fixed-size frame processing to reads of any length.
///
/// Frames are rendered whole; the part of a frame a read did not consume is kept
/// in an overflow ring and served first on the next read.
pub(crate) struct FrameBuffer {
    frame: Vec<f32>,
    overflow: HeapRb<f32>,
}

impl FrameBuffer {
    /// `frame_len` is the number of samples in one rendered frame, across all channels.
    pub fn new(frame_len: usize) -> Self {
        Self {
            frame: vec![0.0; frame_len],
            overflow: HeapRb::new(frame_len.max(1)),
        }
    }

    pub fn buffered(&self) -> usize {
        self.overflow.occupied_len()
    }

    /// Fills `out`, calling `render` once per new frame.
    pub fn read(&mut self, out: &mut [f32], mut render: impl FnMut(&mut [f32])) {
        let mut written = self.overflow.pop_slice(out);
        if self.frame.is_empty() {
            out[written..].fill(0.0);
            return;
        }

        while written < out.len() {
            render(&mut self.frame);
            let take = (out.len() - written).min(self.frame.len());
            out[written..written + take].copy_from_slice(&self.frame[..take]);
            written += take;
            if take < self.frame.len() {
                self.overflow.push_slice(&self.frame[take..]);
            }
        }
    }
}
