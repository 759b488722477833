use crate::audio_data::ToneClip;
use crate::stream::MonoStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    On,
    Silence,
}

/// Beep interval shared between the beacon thread and the render thread, in samples.
#[derive(Debug, Clone)]
pub struct CadenceControl {
    interval: Arc<AtomicU32>,
    sample_rate: u32,
}

impl CadenceControl {
    pub fn set_interval(&self, interval: Duration) {
        let samples = (interval.as_secs_f64() * self.sample_rate as f64).round();
        self.interval
            .store(samples.min(u32::MAX as f64) as u32, Ordering::Relaxed);
    }

    pub fn interval(&self) -> Duration {
        let samples = self.interval.load(Ordering::Relaxed) as u64;
        Duration::from_nanos(samples * 1_000_000_000 / self.sample_rate.max(1) as u64)
    }
}

/// Repeating beep: a fixed-length "on" window of the tone followed by silence.
///
/// The silence length is `max(0, interval - on)`, with the interval read only
/// when a new silence phase begins, so changes never cut a beep or gap short.
pub struct BeepCadence {
    tone: ToneClip,
    on_samples: usize,
    interval: Arc<AtomicU32>,
    phase: Phase,
    remaining: usize,
    tone_cursor: usize,
}

impl BeepCadence {
    pub fn new(tone: ToneClip, on_duration: Duration, interval: Duration) -> (Self, CadenceControl) {
        let sample_rate = tone.sample_rate();
        let on_samples = (on_duration.as_secs_f64() * sample_rate as f64).round() as usize;
        let control = CadenceControl {
            interval: Arc::new(AtomicU32::new(0)),
            sample_rate,
        };
        control.set_interval(interval);

        let cadence = Self {
            tone,
            on_samples,
            interval: control.interval.clone(),
            phase: Phase::On,
            remaining: on_samples,
            tone_cursor: 0,
        };
        (cadence, control)
    }

    fn next_phase(&mut self) {
        match self.phase {
            Phase::On => {
                let interval = self.interval.load(Ordering::Relaxed) as usize;
                self.phase = Phase::Silence;
                self.remaining = interval.saturating_sub(self.on_samples);
            }
            Phase::Silence => {
                self.phase = Phase::On;
                self.remaining = self.on_samples;
                self.tone_cursor = 0;
            }
        }
    }
}

impl MonoStream for BeepCadence {
    fn read(&mut self, out: &mut [f32]) {
        if self.on_samples == 0 {
            out.fill(0.0);
            return;
        }

        let mut written = 0;
        while written < out.len() {
            if self.remaining == 0 {
                self.next_phase();
                continue;
            }
            let take = self.remaining.min(out.len() - written);
            let chunk = &mut out[written..written + take];
            match self.phase {
                Phase::On => {
                    let samples = self.tone.samples();
                    for sample in chunk.iter_mut() {
                        *sample = samples.get(self.tone_cursor).copied().unwrap_or(0.0);
                        self.tone_cursor += 1;
                    }
                }
                Phase::Silence => chunk.fill(0.0),
            }
            self.remaining -= take;
            written += take;
        }
    }
}
