use std::sync::{Arc, Mutex};

/// Direct-path parameters for one source, as produced by one simulation pass.
///
/// Every field is a linear gain in `[0, 1]`. Three-band values are
/// `[low, mid, high]` (400 Hz, 2.5 kHz, 15 kHz).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectParams {
    pub distance_attenuation: f32,
    pub occlusion: f32,
    pub air_absorption: [f32; 3],
    pub transmission: [f32; 3],
    pub directivity: f32,
}

impl DirectParams {
    /// Parameters of a source with an unobstructed line of sight and no falloff.
    pub const UNOBSTRUCTED: Self = Self {
        distance_attenuation: 1.0,
        occlusion: 1.0,
        air_absorption: [1.0; 3],
        transmission: [1.0; 3],
        directivity: 1.0,
    };

    /// Clamps every value into `[0, 1]`, returning `None` if any value is not finite.
    pub fn sanitized(self) -> Option<Self> {
        let finite = self.distance_attenuation.is_finite()
            && self.occlusion.is_finite()
            && self.directivity.is_finite()
            && self.air_absorption.iter().all(|v| v.is_finite())
            && self.transmission.iter().all(|v| v.is_finite());
        if !finite {
            return None;
        }
        Some(Self {
            distance_attenuation: self.distance_attenuation.clamp(0.0, 1.0),
            occlusion: self.occlusion.clamp(0.0, 1.0),
            air_absorption: self.air_absorption.map(|v| v.clamp(0.0, 1.0)),
            transmission: self.transmission.map(|v| v.clamp(0.0, 1.0)),
            directivity: self.directivity.clamp(0.0, 1.0),
        })
    }
}

impl Default for DirectParams {
    fn default() -> Self {
        Self::UNOBSTRUCTED
    }
}

/// Lock-guarded parameter cache shared between the simulator (writer) and one
/// direct effect stage (reader). Both sides only ever copy the value in or out.
#[derive(Debug, Clone, Default)]
pub struct SharedParams(Arc<Mutex<DirectParams>>);

impl SharedParams {
    pub fn store(&self, params: DirectParams) {
        match self.0.lock() {
            Ok(mut guard) => *guard = params,
            Err(poisoned) => *poisoned.into_inner() = params,
        }
    }

    pub fn snapshot(&self) -> DirectParams {
        match self.0.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
