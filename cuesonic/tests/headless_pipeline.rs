use cuesonic::math::Aabb;
use cuesonic::*;
use std::time::Duration;

struct Yard;

impl SceneQuery for Yard {
    fn area_bounds(&self) -> Option<Aabb> {
        Some(Aabb::new(Vec3::new(-4.0, 0.0, -4.0), Vec3::new(4.0, 0.0, 4.0)))
    }

    fn walkable_height(&self, _x: f32, _z: f32) -> Option<f32> {
        Some(0.0)
    }

    fn static_obstacles(&self) -> Vec<ObstacleProxy> {
        vec![
            ObstacleProxy::world(Aabb::from_center_size(Vec3::new(0.0, 1.0, 2.0), Vec3::splat(2.0))),
            ObstacleProxy {
                bounds: Aabb::from_center_size(Vec3::new(2.0, 1.0, 0.0), Vec3::ONE),
                layer: ObstacleLayer::Ui,
            },
        ]
    }
}

fn tones() -> [ToneClip; 4] {
    [440.0, 550.0, 660.0, 770.0].map(|f| ToneClip::sine(f, Duration::from_millis(100), 44100, 0.5))
}

fn peak(block: &[f32]) -> f32 {
    block.iter().fold(0.0f32, |p, s| p.max(s.abs()))
}

#[test]
fn test_headless_pipeline_renders_and_tears_down() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut engine = CueSonicEngine::headless(CueSonicDesc::default()).unwrap();
    let handles = engine.handles();
    let player = Pose::identity();

    engine.simulator().notify_scene_loaded();
    engine.tick(player, &Yard);
    let events = engine.poll_events();
    assert!(events.contains(&CueSonicEvent::GeometryRebuilt {
        ground_triangles: 32,
        obstacle_triangles: 12,
        skipped_obstacles: 1,
    }));

    let mut compass = CompassWallEmitter::new(&handles, CompassConfig::default(), tones()).unwrap();
    compass.activate();
    let reading = compass.update(&player, Vec3::new(0.0, 0.0, 1.0));
    assert_eq!(reading.quadrant, Quadrant::North);

    let beep = ToneClip::sine(880.0, Duration::from_millis(80), 48000, 0.5);
    let mut beacon = PathfindingBeacon::new(&handles, BeaconConfig::default(), beep).unwrap();
    beacon.update_player(player);
    beacon.start(vec![Vec3::ZERO, Vec3::new(0.0, 0.0, 20.0)]).unwrap();
    assert!(beacon.state().is_some());
    assert_eq!(handles.mixer.input_count(), 2);
    assert_eq!(handles.simulator.source_count(), 2);

    let mut block = vec![0.0f32; 2048];
    let mut loudest = 0.0f32;
    for _ in 0..8 {
        engine.tick(player, &Yard);
        handles.mixer.render(&mut block);
        assert!(block.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
        loudest = loudest.max(peak(&block));
    }
    assert!(loudest > 0.0);
    assert_eq!(handles.mixer.frames_rendered(), 8 * 1024);

    beacon.stop();
    assert!(!beacon.is_running());
    compass.dispose();
    assert_eq!(handles.mixer.input_count(), 0);
    assert_eq!(handles.simulator.source_count(), 0);

    handles.mixer.render(&mut block);
    assert_eq!(peak(&block), 0.0);

    engine.shutdown();
    assert!(engine.poll_events().iter().all(|e| !e.is_error()));
}

#[test]
fn test_emitters_survive_engine_without_geometry() {
    let engine = CueSonicEngine::headless(CueSonicDesc::default()).unwrap();
    let handles = engine.handles();

    let mut compass = CompassWallEmitter::new(&handles, CompassConfig::default(), tones()).unwrap();
    compass.activate();
    compass.update(&Pose::identity(), Vec3::new(-5.0, 0.0, 0.0));
    assert_eq!(compass.quadrant(), Some(Quadrant::West));

    engine.tick(Pose::identity(), &Yard);
    assert!(!handles.simulator.has_geometry());

    let mut block = vec![0.0f32; 512];
    handles.mixer.render(&mut block);
    // Wall on the left: the left channel carries the tone.
    let left: f32 = block.iter().step_by(2).map(|s| s.abs()).sum();
    let right: f32 = block.iter().skip(1).step_by(2).map(|s| s.abs()).sum();
    assert!(left >= right);
}
