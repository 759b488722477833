use crate::config::{CueSonicDesc, GeometrySettings};
use crate::dsp::{AcousticContext, NativeContext};
use crate::error::{CueSonicError, Result};
use crate::events::{CueSonicEvent, EventSink};
use crate::math::{Pose, Vec3};
use crate::simulation::convert;
use crate::simulation::geometry::{GeometryStats, SceneGeometry, SceneQuery};
use crate::simulation::material::MaterialId;
use crate::simulation::params::{DirectParams, SharedParams};
use audionimbus::{
    AirAbsorptionModel, Direct, DirectSimulationParameters, DirectSimulationSettings, Directivity,
    DistanceAttenuationModel, Occlusion, OcclusionAlgorithm, Point, Scene, SceneParams,
    SceneSettings, SimulationFlags, SimulationInputs, SimulationSharedInputs, Simulator, Source,
    SourceSettings, StaticMesh, StaticMeshSettings, Transmission, TransmissionParameters,
    Triangle,
};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Unique identifier of a registered simulation source. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct SourceEntry {
    position: Vec3,
    params: SharedParams,
}

/// A committed native scene. The mesh is released before its scene.
struct LoadedScene {
    _mesh: StaticMesh,
    scene: Scene,
}

/// Ids whose native source could not be created. Creation is not retried and the
/// failure is reported once, until the id is unregistered.
#[derive(Default)]
struct FailedSources(HashSet<SourceId>);

impl FailedSources {
    fn contains(&self, id: SourceId) -> bool {
        self.0.contains(&id)
    }

    /// Returns true the first time `id` is recorded.
    fn insert(&mut self, id: SourceId) -> bool {
        self.0.insert(id)
    }

    fn retain_live(&mut self, snapshot: &[(SourceId, Vec3, SharedParams)]) {
        self.0
            .retain(|id| snapshot.iter().any(|(live, _, _)| live == id));
    }
}

/// Native simulator state, only touched under its own lock.
struct NativeSim {
    sources: HashMap<SourceId, Source>,
    failed: FailedSources,
    scene: Option<LoadedScene>,
    simulator: Simulator<Direct>,
    native: Arc<NativeContext>,
}

#[derive(Default)]
struct RebuildState {
    deadline: Option<Instant>,
    stats: Option<GeometryStats>,
}

/// Direct-path occlusion simulator for every registered source against one listener.
///
/// The source map and the native simulator have separate locks. The source map lock
/// is only held to copy positions in or out; the native lock serializes geometry
/// swaps against simulation passes.
pub struct EnvironmentSimulator {
    context: Arc<AcousticContext>,
    native: Mutex<Option<NativeSim>>,
    sources: Mutex<HashMap<SourceId, SourceEntry>>,
    next_id: AtomicU64,
    listener: Mutex<Pose>,
    rebuild: Mutex<RebuildState>,
    settings: GeometrySettings,
    distance_scaler: f32,
    events: EventSink,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl EnvironmentSimulator {
    pub fn new(context: Arc<AcousticContext>, desc: &CueSonicDesc, events: EventSink) -> Self {
        let native = context
            .native()
            .and_then(|native| match Self::create_native(native, desc) {
                Ok(sim) => Some(sim),
                Err(e) => {
                    log::error!("{}", e);
                    events.emit(CueSonicEvent::SimulationFailed {
                        error: e.to_string(),
                    });
                    None
                }
            });

        Self {
            context,
            native: Mutex::new(native),
            sources: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            listener: Mutex::new(Pose::identity()),
            rebuild: Mutex::new(RebuildState::default()),
            settings: desc.geometry.clone(),
            distance_scaler: desc.distance_scaler,
            events,
        }
    }

    fn create_native(native: Arc<NativeContext>, desc: &CueSonicDesc) -> Result<NativeSim> {
        let simulator = Simulator::builder(
            SceneParams::Default,
            native.sample_rate,
            native.frame_size as u32,
        )
        .with_direct(DirectSimulationSettings {
            max_num_occlusion_samples: desc.geometry.max_occlusion_samples,
        })
        .try_build(&native.context)
        .map_err(|e| CueSonicError::SpatialAudio(format!("Failed to create simulator: {}", e)))?;

        log::info!("Created Steam Audio direct simulator");

        Ok(NativeSim {
            sources: HashMap::new(),
            failed: FailedSources::default(),
            scene: None,
            simulator,
            native,
        })
    }

    pub fn context(&self) -> &Arc<AcousticContext> {
        &self.context
    }

    /// Registers a source and returns its id plus the parameter cell the
    /// simulator writes into. The cell starts unobstructed.
    pub fn register_source(&self, position: Vec3) -> (SourceId, SharedParams) {
        let id = SourceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let params = SharedParams::default();
        lock(&self.sources).insert(
            id,
            SourceEntry {
                position,
                params: params.clone(),
            },
        );
        log::debug!("Registered simulation source {}", id);
        (id, params)
    }

    /// Removes a source. Unknown ids are ignored.
    pub fn unregister_source(&self, id: SourceId) {
        if lock(&self.sources).remove(&id).is_some() {
            log::debug!("Unregistered simulation source {}", id);
        }
    }

    pub fn set_source_position(&self, id: SourceId, position: Vec3) {
        match lock(&self.sources).get_mut(&id) {
            Some(entry) => entry.position = position,
            None => log::debug!("Position update for unknown source {}", id),
        }
    }

    pub fn source_count(&self) -> usize {
        lock(&self.sources).len()
    }

    /// Latest parameters computed for `id`.
    pub fn params(&self, id: SourceId) -> Option<DirectParams> {
        lock(&self.sources).get(&id).map(|entry| entry.params.snapshot())
    }

    pub fn set_listener_pose(&self, pose: Pose) {
        *lock(&self.listener) = pose;
    }

    pub fn listener_pose(&self) -> Pose {
        *lock(&self.listener)
    }

    /// Whether occlusion geometry is loaded into the native simulator.
    pub fn has_geometry(&self) -> bool {
        lock(&self.native)
            .as_ref()
            .is_some_and(|sim| sim.scene.is_some())
    }

    /// Statistics of the most recent successful rebuild.
    pub fn geometry_stats(&self) -> Option<GeometryStats> {
        lock(&self.rebuild).stats
    }

    pub fn rebuild_pending(&self) -> bool {
        lock(&self.rebuild).deadline.is_some()
    }

    /// Schedules a rebuild after the grace delay.
    pub fn notify_area_changed(&self) {
        self.notify_area_changed_at(Instant::now());
    }

    pub fn notify_area_changed_at(&self, now: Instant) {
        lock(&self.rebuild).deadline = Some(now + self.settings.rebuild_delay);
        log::debug!(
            "Area changed; geometry rebuild in {:?}",
            self.settings.rebuild_delay
        );
    }

    /// The host finished loading the scene: rebuild on the next update without
    /// waiting for the grace delay.
    pub fn notify_scene_loaded(&self) {
        lock(&self.rebuild).deadline = Some(Instant::now());
        log::debug!("Scene loaded; geometry rebuild requested");
    }

    /// Runs a scheduled rebuild once its deadline has passed. Returns whether a
    /// rebuild was attempted. Failures are logged and published as events.
    pub fn update_geometry(&self, scene: &dyn SceneQuery) -> bool {
        self.update_geometry_at(scene, Instant::now())
    }

    pub fn update_geometry_at(&self, scene: &dyn SceneQuery, now: Instant) -> bool {
        {
            let mut state = lock(&self.rebuild);
            match state.deadline {
                Some(deadline) if deadline <= now => state.deadline = None,
                _ => return false,
            }
        }

        if let Err(e) = self.rebuild_geometry(scene) {
            log::error!("Geometry rebuild failed, keeping previous geometry: {}", e);
            self.events.emit(CueSonicEvent::GeometryRebuildFailed {
                error: e.to_string(),
            });
        }
        true
    }

    /// Extracts geometry from `scene` and swaps it into the native simulator.
    ///
    /// The new mesh is built without holding the simulator lock; only the swap
    /// itself is serialized against simulation passes.
    pub fn rebuild_geometry(&self, scene: &dyn SceneQuery) -> Result<GeometryStats> {
        let geometry = SceneGeometry::build(scene, &self.settings);
        let stats = geometry.stats;

        if let Some(native) = self.context.native() {
            let loaded = if geometry.is_empty() {
                None
            } else {
                Some(build_native_scene(&native, &geometry, self.distance_scaler)?)
            };

            let previous = {
                let mut guard = lock(&self.native);
                match guard.as_mut() {
                    Some(sim) => {
                        if let Some(loaded) = &loaded {
                            sim.simulator.set_scene(&loaded.scene);
                            sim.simulator.commit();
                        }
                        std::mem::replace(&mut sim.scene, loaded)
                    }
                    None => None,
                }
            };
            drop(previous);
        }

        lock(&self.rebuild).stats = Some(stats);
        self.events.emit(CueSonicEvent::GeometryRebuilt {
            ground_triangles: stats.ground_triangles,
            obstacle_triangles: stats.obstacle_triangles,
            skipped_obstacles: stats.skipped_obstacles,
        });
        Ok(stats)
    }

    /// Runs one direct simulation pass and writes the results into every source's
    /// parameter cell.
    ///
    /// Without geometry or native support every source gets unobstructed parameters.
    pub fn run_direct_simulation(&self) {
        let listener = self.listener_pose();
        let snapshot: Vec<(SourceId, Vec3, SharedParams)> = lock(&self.sources)
            .iter()
            .map(|(id, entry)| (*id, entry.position, entry.params.clone()))
            .collect();

        let mut guard = lock(&self.native);
        let has_scene = guard.as_ref().is_some_and(|sim| sim.scene.is_some());
        if !has_scene {
            drop(guard);
            for (_, _, params) in &snapshot {
                params.store(DirectParams::UNOBSTRUCTED);
            }
            return;
        }
        let Some(sim) = guard.as_mut() else {
            return;
        };

        self.sync_native_sources(sim, &snapshot);

        for (id, position, _) in &snapshot {
            if let Some(source) = sim.sources.get_mut(id) {
                source.set_inputs(SimulationFlags::DIRECT, self.source_inputs(*position));
            }
        }
        sim.simulator.commit();

        let shared_inputs = SimulationSharedInputs {
            listener: convert::listener_coordinates(&listener, self.distance_scaler),
            num_rays: 1024,
            num_bounces: 10,
            duration: 3.0,
            order: 2,
            irradiance_min_distance: 1.0,
            pathing_visualization_callback: None,
        };
        sim.simulator
            .set_shared_inputs(SimulationFlags::DIRECT, &shared_inputs);
        sim.simulator.run_direct();

        let mut rejected = 0usize;
        for (id, _, params) in &snapshot {
            let Some(source) = sim.sources.get_mut(id) else {
                // No native source could be created for it.
                params.store(DirectParams::UNOBSTRUCTED);
                continue;
            };
            let outputs = source.get_outputs(SimulationFlags::DIRECT);
            let direct = outputs.direct();

            let transmission = match direct.transmission.as_ref() {
                Some(Transmission::FrequencyDependent(eq))
                | Some(Transmission::FrequencyIndependent(eq)) => [eq[0], eq[1], eq[2]],
                None => [1.0; 3],
            };
            let result = DirectParams {
                distance_attenuation: direct.distance_attenuation.unwrap_or(1.0),
                occlusion: direct.occlusion.unwrap_or(1.0),
                air_absorption: direct
                    .air_absorption
                    .as_ref()
                    .map(|eq| [eq[0], eq[1], eq[2]])
                    .unwrap_or([1.0; 3]),
                transmission,
                directivity: direct.directivity.unwrap_or(1.0),
            };

            match result.sanitized() {
                Some(result) => params.store(result),
                None => rejected += 1,
            }
        }

        if rejected > 0 {
            log::warn!(
                "Direct simulation produced non-finite parameters for {} sources; keeping cached values",
                rejected
            );
        }
    }

    /// Mirrors the registered sources into the native simulator, creating and
    /// removing native sources as needed.
    fn sync_native_sources(&self, sim: &mut NativeSim, snapshot: &[(SourceId, Vec3, SharedParams)]) {
        let stale: Vec<SourceId> = sim
            .sources
            .keys()
            .filter(|id| !snapshot.iter().any(|(live, _, _)| live == *id))
            .copied()
            .collect();
        for id in stale {
            if let Some(source) = sim.sources.remove(&id) {
                sim.simulator.remove_source(&source);
            }
        }

        sim.failed.retain_live(snapshot);

        for (id, _, _) in snapshot {
            if sim.sources.contains_key(id) || sim.failed.contains(*id) {
                continue;
            }
            match Source::try_new(
                &sim.simulator,
                &SourceSettings {
                    flags: SimulationFlags::DIRECT,
                },
            ) {
                Ok(source) => {
                    sim.simulator.add_source(&source);
                    sim.sources.insert(*id, source);
                }
                Err(e) => self.report_source_failure(&mut sim.failed, *id, &e),
            }
        }
    }

    fn report_source_failure(
        &self,
        failed: &mut FailedSources,
        id: SourceId,
        reason: &dyn fmt::Display,
    ) {
        if !failed.insert(id) {
            return;
        }
        let error = format!("Failed to create simulation source {}: {}", id, reason);
        log::error!("{}; it stays unobstructed", error);
        self.events.emit(CueSonicEvent::SimulationFailed { error });
    }

    fn source_inputs(&self, position: Vec3) -> SimulationInputs {
        SimulationInputs {
            source: convert::source_coordinates(position, self.distance_scaler),
            direct_simulation: Some(DirectSimulationParameters {
                distance_attenuation: Some(DistanceAttenuationModel::Default),
                air_absorption: Some(AirAbsorptionModel::Default),
                directivity: Some(Directivity::default()),
                occlusion: Some(Occlusion {
                    transmission: Some(TransmissionParameters {
                        num_transmission_rays: self.settings.transmission_rays,
                    }),
                    algorithm: OcclusionAlgorithm::Raycast,
                }),
            }),
            reflections_simulation: None,
            pathing_simulation: None,
        }
    }

    /// Releases native sources and geometry. Registered sources keep their ids
    /// and fall back to unobstructed parameters.
    pub fn shutdown(&self) {
        let released = lock(&self.native).take();
        if let Some(sim) = released {
            log::info!(
                "Environment simulator shut down ({} native sources released)",
                sim.sources.len()
            );
        }
    }
}

fn build_native_scene(
    native: &NativeContext,
    geometry: &SceneGeometry,
    distance_scaler: f32,
) -> Result<LoadedScene> {
    let mut scene = Scene::try_new(&native.context, &SceneSettings::default())
        .map_err(|e| CueSonicError::Geometry(format!("Failed to create scene: {}", e)))?;

    let vertices: Vec<Point> = geometry
        .vertices
        .iter()
        .map(|v| convert::to_native_point(*v, distance_scaler))
        .collect();
    let triangles: Vec<Triangle> = geometry
        .triangles
        .iter()
        .map(|t| convert::to_native_triangle(*t))
        .collect();
    let material_indices: Vec<usize> = geometry.materials.iter().map(|m| m.index()).collect();
    let materials: Vec<audionimbus::Material> = MaterialId::TABLE
        .iter()
        .map(audionimbus::Material::from)
        .collect();

    let mesh = StaticMesh::try_new(
        &scene,
        &StaticMeshSettings {
            vertices: &vertices,
            triangles: &triangles,
            material_indices: &material_indices,
            materials: &materials,
        },
    )
    .map_err(|e| CueSonicError::Geometry(format!("Failed to create static mesh: {}", e)))?;

    scene.add_static_mesh(mesh.clone());
    scene.commit();

    Ok(LoadedScene { _mesh: mesh, scene })
}
