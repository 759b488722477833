use crate::dsp::{BinauralHandle, DirectHandle};
use crate::effects::{DirectEffectStage, GainControl, GainStage, SharedTarget, Spatializer};
use crate::engine::EngineHandles;
use crate::math::Vec3;
use crate::mixer::{MixerInputId, SharedStream};
use crate::simulation::{SharedParams, SourceId};
use crate::stream::{MonoStream, StereoStream};
use std::sync::{Arc, Mutex, MutexGuard};

/// source -> direct effect -> spatializer -> gain, rendered as one mixer input.
pub struct EmitterChain<S> {
    stages: GainStage<Spatializer<DirectEffectStage<S>>>,
}

impl<S: MonoStream> EmitterChain<S> {
    pub fn source(&self) -> &S {
        self.stages.upstream().upstream().upstream()
    }

    pub fn is_native(&self) -> bool {
        let spatializer = self.stages.upstream();
        spatializer.is_binaural() || spatializer.upstream().is_native()
    }

    fn take_handles(&mut self) -> (Option<DirectHandle>, Option<BinauralHandle>) {
        let spatializer = self.stages.upstream_mut();
        let binaural = spatializer.take_handle();
        let direct = spatializer.upstream_mut().take_handle();
        (direct, binaural)
    }
}

impl<S: MonoStream> StereoStream for EmitterChain<S> {
    fn read_stereo(&mut self, out: &mut [f32]) {
        self.stages.read_stereo(out);
    }
}

/// Control-side view of a chain: everything here is safe to touch while the
/// render thread is reading.
#[derive(Clone)]
pub struct ChainControls {
    pub params: SharedParams,
    pub target: SharedTarget,
    pub gain: Arc<GainControl>,
}

/// An emitter chain registered with the simulator and the mixer.
///
/// Teardown always runs in the same order: the chain leaves the mixer, its native
/// handles are released, then its simulation source is unregistered.
pub struct AttachedChain<S: MonoStream + 'static> {
    handles: EngineHandles,
    chain: Arc<Mutex<EmitterChain<S>>>,
    input_id: MixerInputId,
    source_id: SourceId,
    controls: ChainControls,
    attached: bool,
}

impl<S: MonoStream + 'static> AttachedChain<S> {
    /// Builds a chain around `source` and adds it to the mixer, muted.
    pub fn attach(handles: &EngineHandles, source: S, position: Vec3, max_volume: f32) -> Self {
        let (source_id, params) = handles.simulator.register_source(position);
        let direct = handles.context.create_direct_effect();
        let binaural = handles.context.create_binaural_effect();
        if binaural.is_none() {
            log::debug!("Source {} uses stereo panning", source_id);
        }

        let target = SharedTarget::default();
        let gain = GainControl::new(max_volume);
        let frame_size = handles.frame_size;
        let stages = GainStage::new(
            Spatializer::new(
                DirectEffectStage::new(source, direct, params.clone(), frame_size),
                binaural,
                target.clone(),
                frame_size,
            ),
            gain.clone(),
        );

        let chain = Arc::new(Mutex::new(EmitterChain { stages }));
        let input_id = handles.mixer.allocate_id();
        let stream: SharedStream = chain.clone();
        handles.mixer.add_input(input_id, stream);

        Self {
            handles: handles.clone(),
            chain,
            input_id,
            source_id,
            controls: ChainControls {
                params,
                target,
                gain,
            },
            attached: true,
        }
    }

    pub fn controls(&self) -> &ChainControls {
        &self.controls
    }

    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    pub fn input_id(&self) -> MixerInputId {
        self.input_id
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn set_position(&self, position: Vec3) {
        if self.attached {
            self.handles.simulator.set_source_position(self.source_id, position);
        }
    }

    /// Locks the chain. Blocks while the render thread is reading it.
    pub fn lock(&self) -> MutexGuard<'_, EmitterChain<S>> {
        match self.chain.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Removes the chain from the mixer and releases its native resources.
    /// Safe to call repeatedly.
    pub fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;

        self.controls.gain.set_enabled(false);
        self.handles.mixer.remove_input(self.input_id);

        let (direct, binaural) = self.lock().take_handles();
        if let Some(handle) = binaural {
            self.handles.context.release_binaural_effect(handle);
        }
        if let Some(handle) = direct {
            self.handles.context.release_direct_effect(handle);
        }

        self.handles.simulator.unregister_source(self.source_id);
        log::debug!("Detached emitter chain for source {}", self.source_id);
    }
}

impl<S: MonoStream + 'static> Drop for AttachedChain<S> {
    fn drop(&mut self) {
        self.detach();
    }
}
