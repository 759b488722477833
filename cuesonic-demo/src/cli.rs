use crate::scene::Courtyard;
use anyhow::{Context, Result, bail};
use clap::Parser;
use cuesonic::emitters::compute_guide_point;
use cuesonic::{
    BeaconConfig, CompassConfig, CompassWallEmitter, CueSonicDesc, CueSonicEngine,
    PathfindingBeacon, Pose, ToneClip, Vec3,
};
use std::time::{Duration, Instant};

const TICK_RATE_HZ: u32 = 60;
const WALK_SPEED: f32 = 1.5;

#[derive(Parser)]
#[command(name = "cuesonic-demo")]
#[command(version, about = "Walks a simulated player through a courtyard with compass and beacon cues")]
pub struct Options {
    /// Render without an output device and report levels instead
    #[arg(long)]
    pub headless: bool,

    /// How long to walk, in seconds
    #[arg(long, default_value = "25")]
    pub seconds: f32,

    /// Custom HRTF in SOFA format
    #[arg(long = "hrtf")]
    pub hrtf_path: Option<String>,

    /// Directory with north.wav, east.wav, south.wav and west.wav
    #[arg(long = "tones")]
    pub tone_dir: Option<String>,
}

fn load_tones(dir: Option<&str>, sample_rate: u32) -> Result<[ToneClip; 4]> {
    let Some(dir) = dir else {
        return Ok([392.0, 494.0, 587.0, 698.0]
            .map(|f| ToneClip::sine(f, Duration::from_millis(600), sample_rate, 0.35)));
    };

    let load = |name: &str| {
        let path = format!("{}/{}.wav", dir, name);
        ToneClip::from_path(&path, sample_rate).with_context(|| format!("loading {}", path))
    };
    Ok([load("north")?, load("east")?, load("south")?, load("west")?])
}

/// Player position after walking `distance` along `route`, facing along it.
fn walk(route: &[Vec3], distance: f32) -> Pose {
    let mut remaining = distance;
    for segment in route.windows(2) {
        let length = segment[0].distance(segment[1]);
        let heading = segment[1] - segment[0];
        if remaining <= length {
            let t = if length > 0.0 { remaining / length } else { 0.0 };
            return Pose::looking(segment[0].lerp(segment[1], t), heading);
        }
        remaining -= length;
    }
    match route {
        [.., before, last] => Pose::looking(*last, *last - *before),
        [only] => Pose::from_position(*only),
        [] => Pose::identity(),
    }
}

pub fn run(options: Options) -> Result<()> {
    let desc = CueSonicDesc {
        hrtf_path: options.hrtf_path.clone(),
        ..Default::default()
    };
    let sample_rate = desc.sample_rate;

    let mut engine = if options.headless {
        CueSonicEngine::headless(desc)?
    } else {
        let mut engine = CueSonicEngine::new(desc)?;
        engine.start()?;
        engine
    };
    let handles = engine.handles();

    let scene = Courtyard::new();
    let route = scene.route();

    let tones = load_tones(options.tone_dir.as_deref(), sample_rate)?;
    let mut compass = CompassWallEmitter::new(&handles, CompassConfig::default(), tones)?;
    compass.activate();

    let beep = ToneClip::sine(880.0, Duration::from_millis(80), sample_rate, 0.5);
    let mut beacon = PathfindingBeacon::new(&handles, BeaconConfig::default(), beep)?;
    beacon.update_player(walk(&route, 0.0));
    beacon.start(route.clone())?;

    engine.simulator().notify_area_changed();
    engine.simulator().notify_scene_loaded();

    let tick = Duration::from_secs_f32(1.0 / TICK_RATE_HZ as f32);
    let ticks = (options.seconds * TICK_RATE_HZ as f32) as u32;
    let frames_per_tick = (sample_rate / TICK_RATE_HZ) as usize;
    let mut block = vec![0.0f32; frames_per_tick * 2];
    let mut scratch = Vec::new();
    let mut peak = 0.0f32;
    let started = Instant::now();

    for n in 0..ticks {
        let walked = n as f32 / TICK_RATE_HZ as f32 * WALK_SPEED;
        let player = walk(&route, walked);

        engine.tick(player, &scene);
        let reading = compass.update(&player, scene.nearest_obstacle_point(player.position));
        beacon.update_player(player);

        if options.headless {
            handles.mixer.render_into(&mut block, &mut scratch);
            peak = block.iter().fold(peak, |p, s| p.max(s.abs()));
        } else {
            let next = started + tick * (n + 1);
            std::thread::sleep(next.saturating_duration_since(Instant::now()));
        }

        for event in engine.poll_events() {
            if event.is_error() {
                log::warn!("{:?}", event);
            } else {
                log::info!("{:?}", event);
            }
        }

        if n % TICK_RATE_HZ == 0 {
            let guide = compute_guide_point(&route, player.position, BeaconConfig::default().lookahead_distance);
            log::info!(
                "t={:>4.1}s player=({:>5.1}, {:>5.1}) compass={:?} {:>5.1} deg vol {:.2} | beacon {:?}",
                n as f32 / TICK_RATE_HZ as f32,
                player.position.x,
                player.position.z,
                reading.quadrant,
                reading.bearing,
                reading.volume,
                beacon.state().map(|s| (s.distance, s.interval)),
            );
            if let Some(guide) = guide {
                log::debug!("guide point {:?}", guide.point);
            }
        }
    }

    beacon.stop();
    compass.dispose();
    if options.headless {
        log::info!(
            "Rendered {} frames headless, peak level {:.3}",
            handles.mixer.frames_rendered(),
            peak
        );
        if handles.mixer.frames_rendered() == 0 {
            bail!("nothing was rendered");
        }
    }
    engine.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_follows_route() {
        let route = [Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0), Vec3::new(10.0, 0.0, 10.0)];
        let pose = walk(&route, 15.0);
        assert!(pose.position.distance(Vec3::new(5.0, 0.0, 10.0)) < 1e-4);
        assert!(pose.forward().distance(Vec3::X) < 1e-4);

        let end = walk(&route, 100.0);
        assert_eq!(end.position, Vec3::new(10.0, 0.0, 10.0));
    }

    #[test]
    fn test_parse_options() {
        let options =
            Options::try_parse_from(["cuesonic-demo", "--headless", "--seconds", "3"]).unwrap();
        assert!(options.headless);
        assert_eq!(options.seconds, 3.0);
        assert!(options.hrtf_path.is_none());

        let options = Options::try_parse_from(["cuesonic-demo", "--tones", "assets/tones"]).unwrap();
        assert!(!options.headless);
        assert_eq!(options.seconds, 25.0);
        assert_eq!(options.tone_dir.as_deref(), Some("assets/tones"));

        assert!(Options::try_parse_from(["cuesonic-demo", "--bogus"]).is_err());
        assert!(Options::try_parse_from(["cuesonic-demo", "--seconds", "soon"]).is_err());
    }
}
