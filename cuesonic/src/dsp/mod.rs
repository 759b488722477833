// Native DSP binding
//
// Owns the process-wide Steam Audio context and HRTF, and hands out per-source
// effect handles. Every consumer must cope with `AcousticContext::is_available()`
// being false: the engine then runs on panning and passthrough fallbacks.

mod context;
mod handles;
mod hrtf;

pub use context::AcousticContext;
pub use handles::{BinauralHandle, DirectHandle};
pub(crate) use context::NativeContext;
