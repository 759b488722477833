use crate::config::CueSonicDesc;
use crate::dsp::AcousticContext;
use crate::error::{CueSonicError, Result};
use crate::events::{CueSonicEvent, EventSink};
use crate::math::Pose;
use crate::mixer::{MixerHandle, OutputMixer};
use crate::simulation::{EnvironmentSimulator, SceneQuery};
use crossbeam_channel::Receiver;
use std::sync::Arc;

/// Shared engine singletons handed to every emitter.
#[derive(Clone)]
pub struct EngineHandles {
    pub context: Arc<AcousticContext>,
    pub simulator: Arc<EnvironmentSimulator>,
    pub mixer: MixerHandle,
    pub events: EventSink,
    pub sample_rate: u32,
    pub frame_size: usize,
}

/// Owns the acoustic context, the environment simulator and the output mixer,
/// and drives them from the host's tick.
///
/// The output device stream is not `Send`, so the engine stays on the thread
/// that created it. Emitters only need [`EngineHandles`].
pub struct CueSonicEngine {
    desc: CueSonicDesc,
    handles: EngineHandles,
    mixer: OutputMixer,
    events: Receiver<CueSonicEvent>,
    shut_down: bool,
}

impl CueSonicEngine {
    /// Creates the engine, initializing the native acoustic context best-effort.
    pub fn new(desc: CueSonicDesc) -> Result<Self> {
        desc.validate()?;
        let (sink, events) = EventSink::channel();
        let context = Arc::new(AcousticContext::initialize(&desc, &sink));
        Ok(Self::with_context(desc, context, sink, events))
    }

    /// Creates an engine that never touches the native library. Audio renders
    /// through the panning and passthrough fallbacks.
    pub fn headless(desc: CueSonicDesc) -> Result<Self> {
        desc.validate()?;
        let (sink, events) = EventSink::channel();
        let context = Arc::new(AcousticContext::disabled(&desc));
        Ok(Self::with_context(desc, context, sink, events))
    }

    fn with_context(
        desc: CueSonicDesc,
        context: Arc<AcousticContext>,
        sink: EventSink,
        events: Receiver<CueSonicEvent>,
    ) -> Self {
        let simulator = Arc::new(EnvironmentSimulator::new(context.clone(), &desc, sink.clone()));
        let mixer = OutputMixer::new(&desc);

        log::info!(
            "CueSonic engine created (native spatial audio: {})",
            context.is_available()
        );

        Self {
            handles: EngineHandles {
                context,
                simulator,
                mixer: mixer.handle(),
                events: sink,
                sample_rate: desc.sample_rate,
                frame_size: desc.frame_size,
            },
            desc,
            mixer,
            events,
            shut_down: false,
        }
    }

    pub fn handles(&self) -> EngineHandles {
        self.handles.clone()
    }

    pub fn desc(&self) -> &CueSonicDesc {
        &self.desc
    }

    pub fn context(&self) -> &Arc<AcousticContext> {
        &self.handles.context
    }

    pub fn simulator(&self) -> &Arc<EnvironmentSimulator> {
        &self.handles.simulator
    }

    pub fn mixer(&self) -> &MixerHandle {
        &self.handles.mixer
    }

    /// Opens the output device. Idempotent.
    pub fn start(&mut self) -> Result<()> {
        if self.shut_down {
            return Err(CueSonicError::Engine("Engine has been shut down".into()));
        }
        self.mixer.initialize()
    }

    pub fn is_running(&self) -> bool {
        self.mixer.is_running()
    }

    /// One host tick: listener pose, pending geometry rebuild, direct simulation.
    pub fn tick(&self, listener: Pose, scene: &dyn SceneQuery) {
        let simulator = &self.handles.simulator;
        simulator.set_listener_pose(listener);
        simulator.update_geometry(scene);
        simulator.run_direct_simulation();
    }

    /// Drains every event published since the last call.
    pub fn poll_events(&self) -> Vec<CueSonicEvent> {
        self.events.try_iter().collect()
    }

    /// Stops the device, then releases simulator and native context resources.
    /// Emitters should be disposed first; safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        self.mixer.shutdown();
        self.handles.simulator.shutdown();
        self.handles.context.shutdown();
        log::info!("CueSonic engine shut down");
    }
}

impl Drop for CueSonicEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_desc_is_rejected() {
        let desc = CueSonicDesc {
            channels: 6,
            ..Default::default()
        };
        assert!(CueSonicEngine::headless(desc).is_err());
    }

    #[test]
    fn test_headless_engine_lifecycle() {
        let mut engine = CueSonicEngine::headless(CueSonicDesc::default()).unwrap();
        assert!(!engine.context().is_available());
        assert!(!engine.is_running());
        assert!(engine.poll_events().is_empty());
        engine.shutdown();
        engine.shutdown();
        assert!(matches!(engine.start(), Err(CueSonicError::Engine(_))));
    }
}
