//! Event types for CueSonic
//!
//! Events report degraded states and background work back to the host thread.
//! They are informational only: nothing in the engine waits for them to be read.

use crossbeam_channel::{Receiver, Sender, unbounded};

#[derive(Debug, Clone, PartialEq)]
pub enum CueSonicEvent {
    /// The native library or HRTF could not be created; panning fallback is active
    NativeUnavailable { reason: String },
    /// Occlusion geometry for a new area has been committed
    GeometryRebuilt {
        ground_triangles: usize,
        obstacle_triangles: usize,
        skipped_obstacles: usize,
    },
    /// Geometry extraction or native mesh creation failed; previous geometry stays active
    GeometryRebuildFailed { error: String },
    /// A direct simulation pass failed; cached parameters were kept
    SimulationFailed { error: String },
    /// The beacon update thread did not finish within its join timeout
    BeaconJoinTimedOut,
}

impl CueSonicEvent {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::NativeUnavailable { .. }
                | Self::GeometryRebuildFailed { .. }
                | Self::SimulationFailed { .. }
                | Self::BeaconJoinTimedOut
        )
    }
}

/// Cloneable sending half handed to every component that reports events.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: Option<Sender<CueSonicEvent>>,
}

impl EventSink {
    /// Creates a connected sink and the receiver the host drains.
    pub fn channel() -> (Self, Receiver<CueSonicEvent>) {
        let (sender, receiver) = unbounded();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// A sink that drops every event
    pub fn disconnected() -> Self {
        Self { sender: None }
    }

    pub fn emit(&self, event: CueSonicEvent) {
        if let Some(sender) = &self.sender {
            // A dropped receiver only means nobody is listening.
            let _ = sender.send(event);
        }
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::disconnected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_delivers_events() {
        let (sink, receiver) = EventSink::channel();
        sink.emit(CueSonicEvent::BeaconJoinTimedOut);
        assert_eq!(receiver.try_recv(), Ok(CueSonicEvent::BeaconJoinTimedOut));
    }

    #[test]
    fn test_disconnected_sink_is_silent() {
        EventSink::disconnected().emit(CueSonicEvent::SimulationFailed {
            error: "ignored".into(),
        });
    }
}
