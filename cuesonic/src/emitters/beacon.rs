use crate::audio_data::ToneClip;
use crate::config::BeaconConfig;
use crate::effects::SpatialTarget;
use crate::emitters::cadence::{BeepCadence, CadenceControl};
use crate::emitters::chain::{AttachedChain, ChainControls};
use crate::emitters::guide::compute_guide_point;
use crate::engine::EngineHandles;
use crate::error::Result;
use crate::events::CueSonicEvent;
use crate::math::{Pose, Vec3, clamp_unit};
use crate::simulation::{EnvironmentSimulator, SourceId};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Cue parameters derived from the player pose and the path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeaconState {
    pub aim: Vec3,
    pub distance: f32,
    pub closeness: f32,
    pub interval: Duration,
    pub volume: f32,
    pub pan: f32,
    /// Listener-local direction of the aim point as `(right, up, forward)`
    pub direction: Vec3,
}

/// `1 - min(1, distance / max_distance)`; non-finite distances count as far away.
pub fn closeness(distance: f32, max_distance: f32) -> f32 {
    if !distance.is_finite() || max_distance <= 0.0 {
        return 0.0;
    }
    1.0 - (distance.max(0.0) / max_distance).min(1.0)
}

/// Pan towards the aim point. When the aim point is behind the player the pan
/// snaps to the nearer extreme so the player turns the short way round.
pub fn beacon_pan(direction: Vec3) -> f32 {
    if direction.z < 0.0 {
        if direction.x >= 0.0 { 1.0 } else { -1.0 }
    } else {
        clamp_unit(direction.x)
    }
}

/// Computes the cue for `player` following `path`. `None` without a path.
pub fn compute_beacon_state(player: &Pose, path: &[Vec3], config: &BeaconConfig) -> Option<BeaconState> {
    let guide = compute_guide_point(path, player.position, config.lookahead_distance)?;
    let closeness = closeness(guide.remaining_distance, config.max_beacon_distance);

    let interval = config.max_interval.as_secs_f64()
        + (config.min_interval.as_secs_f64() - config.max_interval.as_secs_f64()) * closeness as f64;
    let volume = config.min_volume + (config.max_volume - config.min_volume) * closeness;
    let direction = player.local_direction_to(guide.point);

    Some(BeaconState {
        aim: guide.point,
        distance: guide.remaining_distance,
        closeness,
        interval: Duration::from_secs_f64(interval.max(0.0)),
        volume: volume.clamp(0.0, config.max_volume),
        pan: beacon_pan(direction),
        direction,
    })
}

/// Data exchanged between the control side and the update thread.
#[derive(Debug, Default)]
struct BeaconShared {
    player: Pose,
    path: Vec<Vec3>,
    last_state: Option<BeaconState>,
}

fn lock(shared: &Mutex<BeaconShared>) -> MutexGuard<'_, BeaconShared> {
    match shared.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

struct BeaconRun {
    chain: AttachedChain<BeepCadence>,
    stop_tx: Sender<()>,
    done_rx: Receiver<()>,
    thread: Option<JoinHandle<()>>,
}

/// Everything the update thread owns.
struct BeaconWorker {
    shared: Arc<Mutex<BeaconShared>>,
    controls: ChainControls,
    cadence: CadenceControl,
    simulator: Arc<EnvironmentSimulator>,
    source_id: SourceId,
    config: BeaconConfig,
}

impl BeaconWorker {
    fn run(self, stop_rx: Receiver<()>, done_tx: Sender<()>) {
        log::debug!("Beacon update thread started");
        let period = self.config.update_period();
        loop {
            self.update();
            match stop_rx.recv_timeout(period) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        let _ = done_tx.send(());
        log::debug!("Beacon update thread exiting");
    }

    fn update(&self) {
        let (player, path) = {
            let shared = lock(&self.shared);
            (shared.player, shared.path.clone())
        };

        let state = compute_beacon_state(&player, &path, &self.config);
        match &state {
            Some(state) => {
                self.cadence.set_interval(state.interval);
                self.controls.gain.set_volume(state.volume);
                self.controls
                    .target
                    .set(SpatialTarget::new(state.direction, state.pan));
                self.simulator.set_source_position(self.source_id, state.aim);
            }
            None => self.controls.gain.set_volume(0.0),
        }
        lock(&self.shared).last_state = state;
    }
}

/// Beeping guide that leads the player along a path.
///
/// A background thread recomputes aim point, pan, volume and beep interval at
/// a fixed rate from the latest player pose and path.
pub struct PathfindingBeacon {
    handles: EngineHandles,
    config: BeaconConfig,
    tone: ToneClip,
    shared: Arc<Mutex<BeaconShared>>,
    run: Option<BeaconRun>,
}

impl PathfindingBeacon {
    pub fn new(handles: &EngineHandles, config: BeaconConfig, tone: ToneClip) -> Result<Self> {
        config.validate()?;
        let tone = tone.resample(handles.sample_rate)?;
        Ok(Self {
            handles: handles.clone(),
            config,
            tone,
            shared: Arc::new(Mutex::new(BeaconShared::default())),
            run: None,
        })
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Most recent cue computed by the update thread.
    pub fn state(&self) -> Option<BeaconState> {
        lock(&self.shared).last_state
    }

    pub fn update_player(&self, player: Pose) {
        lock(&self.shared).player = player;
    }

    pub fn update_path(&self, path: Vec<Vec3>) {
        lock(&self.shared).path = path;
    }

    /// Sets the path and starts beeping. If already running only the path is replaced.
    pub fn start(&mut self, path: Vec<Vec3>) -> Result<()> {
        self.update_path(path);
        if self.run.is_some() {
            return Ok(());
        }

        let (cadence, cadence_control) =
            BeepCadence::new(self.tone.clone(), self.config.on_duration, self.config.max_interval);
        let player = lock(&self.shared).player;
        let chain = AttachedChain::attach(
            &self.handles,
            cadence,
            player.position,
            self.config.max_volume,
        );

        let worker = BeaconWorker {
            shared: self.shared.clone(),
            controls: chain.controls().clone(),
            cadence: cadence_control,
            simulator: self.handles.simulator.clone(),
            source_id: chain.source_id(),
            config: self.config.clone(),
        };
        // Compute the first cue before the chain becomes audible.
        worker.update();
        chain.controls().gain.set_enabled(true);

        let (stop_tx, stop_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(1);
        let thread = thread::Builder::new()
            .name("cuesonic-beacon".into())
            .spawn(move || worker.run(stop_rx, done_tx))?;

        log::info!("Pathfinding beacon started");
        self.run = Some(BeaconRun {
            chain,
            stop_tx,
            done_rx,
            thread: Some(thread),
        });
        Ok(())
    }

    /// Stops the update thread, waiting at most the join timeout, then tears the
    /// chain down. A thread that misses the timeout is left to finish on its own.
    pub fn stop(&mut self) {
        let Some(mut run) = self.run.take() else {
            return;
        };
        run.chain.controls().gain.set_enabled(false);
        let _ = run.stop_tx.send(());

        match run.done_rx.recv_timeout(self.config.join_timeout) {
            Ok(()) => {
                if let Some(thread) = run.thread.take() {
                    if thread.join().is_err() {
                        log::error!("Beacon update thread panicked");
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Beacon update thread did not stop within {:?}; detaching it",
                    self.config.join_timeout
                );
                self.handles.events.emit(CueSonicEvent::BeaconJoinTimedOut);
            }
            Err(RecvTimeoutError::Disconnected) => {
                log::error!("Beacon update thread exited unexpectedly");
            }
        }

        run.chain.detach();
        lock(&self.shared).last_state = None;
        log::info!("Pathfinding beacon stopped");
    }
}

impl Drop for PathfindingBeacon {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CueSonicDesc;
    use crate::engine::CueSonicEngine;
    use std::time::Instant;

    fn straight_path() -> Vec<Vec3> {
        vec![Vec3::ZERO, Vec3::new(0.0, 0.0, 100.0)]
    }

    #[test]
    fn test_interval_and_volume_track_distance() {
        let config = BeaconConfig::default();
        let path = straight_path();
        let mut previous: Option<BeaconState> = None;
        // Walk towards the destination: closer means faster and louder.
        for step in 0..=100 {
            let player = Pose::from_position(Vec3::new(0.0, 0.0, step as f32));
            let state = compute_beacon_state(&player, &path, &config).unwrap();
            if let Some(previous) = previous {
                assert!(state.interval <= previous.interval);
                assert!(state.volume >= previous.volume);
            }
            previous = Some(state);
        }

        let arrived = compute_beacon_state(&Pose::from_position(Vec3::new(0.0, 0.0, 100.0)), &path, &config)
            .unwrap();
        assert!((arrived.closeness - 1.0).abs() < 1e-6);
        assert!((arrived.volume - config.max_volume).abs() < 1e-6);
        assert!(arrived.interval.abs_diff(config.min_interval) < Duration::from_micros(1));
    }

    #[test]
    fn test_far_away_is_slowest_and_quietest() {
        let config = BeaconConfig::default();
        let state = compute_beacon_state(&Pose::identity(), &straight_path(), &config).unwrap();
        assert_eq!(state.closeness, 0.0);
        assert!((state.volume - config.min_volume).abs() < 1e-6);
        assert!(state.interval.abs_diff(config.max_interval) < Duration::from_micros(1));
    }

    #[test]
    fn test_pan_flips_when_aim_is_behind() {
        assert_eq!(beacon_pan(Vec3::new(0.2, 0.0, -0.9)), 1.0);
        assert_eq!(beacon_pan(Vec3::new(-0.2, 0.0, -0.9)), -1.0);
        assert!((beacon_pan(Vec3::new(0.5, 0.0, 0.8)) - 0.5).abs() < 1e-6);

        let config = BeaconConfig::default();
        let path = vec![Vec3::ZERO, Vec3::new(-1.0, 0.0, -20.0)];
        let state = compute_beacon_state(&Pose::identity(), &path, &config).unwrap();
        assert_eq!(state.pan, -1.0);
    }

    #[test]
    fn test_no_path_no_state() {
        assert!(compute_beacon_state(&Pose::identity(), &[], &BeaconConfig::default()).is_none());
        assert_eq!(closeness(f32::NAN, 10.0), 0.0);
    }

    #[test]
    fn test_start_stop_lifecycle() {
        let engine = CueSonicEngine::headless(CueSonicDesc::default()).unwrap();
        let handles = engine.handles();
        let tone = ToneClip::sine(880.0, Duration::from_millis(80), 48000, 0.5);
        let mut beacon = PathfindingBeacon::new(&handles, BeaconConfig::default(), tone).unwrap();

        beacon.update_player(Pose::from_position(Vec3::new(0.0, 0.0, 10.0)));
        beacon.start(straight_path()).unwrap();
        beacon.start(straight_path()).unwrap();
        assert!(beacon.is_running());
        assert_eq!(handles.mixer.input_count(), 1);
        assert_eq!(handles.simulator.source_count(), 1);

        let state = beacon.state().unwrap();
        assert!((state.distance - 90.0).abs() < 1e-3);

        // The worker picks up a new pose on its next tick.
        beacon.update_player(Pose::from_position(Vec3::new(0.0, 0.0, 60.0)));
        let deadline = Instant::now() + Duration::from_secs(2);
        while beacon.state().is_some_and(|s| s.distance > 41.0) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!((beacon.state().unwrap().distance - 40.0).abs() < 1e-3);

        let mut out = vec![0.0; 2048];
        handles.mixer.render(&mut out);
        assert!(out.iter().any(|s| *s != 0.0));

        beacon.stop();
        beacon.stop();
        assert!(!beacon.is_running());
        assert_eq!(handles.mixer.input_count(), 0);
        assert_eq!(handles.simulator.source_count(), 0);
    }

    #[test]
    fn test_stop_detaches_stuck_worker() {
        let engine = CueSonicEngine::headless(CueSonicDesc::default()).unwrap();
        let handles = engine.handles();
        let tone = ToneClip::sine(880.0, Duration::from_millis(80), 48000, 0.5);
        let config = BeaconConfig {
            join_timeout: Duration::ZERO,
            ..Default::default()
        };
        let mut beacon = PathfindingBeacon::new(&handles, config, tone).unwrap();
        beacon.start(straight_path()).unwrap();

        // Hold the shared state so the worker blocks inside its next update.
        let shared = beacon.shared.clone();
        let (held_tx, held_rx) = bounded(1);
        let holder = thread::spawn(move || {
            let _guard = lock(&shared);
            let _ = held_tx.send(());
            thread::sleep(Duration::from_millis(200));
        });
        held_rx.recv().unwrap();
        thread::sleep(Duration::from_millis(60));

        beacon.stop();
        assert!(!beacon.is_running());
        assert!(engine.poll_events().contains(&CueSonicEvent::BeaconJoinTimedOut));
        assert_eq!(handles.mixer.input_count(), 0);
        assert_eq!(handles.simulator.source_count(), 0);

        let mut out = vec![0.0; 512];
        handles.mixer.render(&mut out);
        assert!(out.iter().all(|s| *s == 0.0));
        holder.join().unwrap();
    }
}
