use crate::audio_data::ToneClip;
use crate::stream::{LoopingClip, MonoStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Compass quadrant of a bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [Self::North, Self::East, Self::South, Self::West];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    /// Center bearing in degrees.
    pub fn center(self) -> f32 {
        self.index() as f32 * 90.0
    }

    /// Quadrant of a bearing without hysteresis.
    ///
    /// North covers `[315, 45)`, East `[45, 135)`, South `[135, 225)`, West `[225, 315)`.
    pub fn from_bearing(bearing: f32) -> Self {
        let bearing = normalize_bearing(bearing);
        let shifted = (bearing + 45.0) % 360.0;
        Self::from_index((shifted / 90.0) as usize)
    }

    /// Whether `bearing` lies inside this quadrant widened by `margin` degrees on both sides.
    fn contains_with_margin(self, bearing: f32, margin: f32) -> bool {
        angular_distance(bearing, self.center()) <= 45.0 + margin
    }
}

/// Wraps degrees into `[0, 360)`. Non-finite input maps to 0.
pub fn normalize_bearing(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Smallest absolute difference between two bearings, in `[0, 180]`.
pub fn angular_distance(a: f32, b: f32) -> f32 {
    let diff = normalize_bearing(a - b);
    diff.min(360.0 - diff)
}

/// Picks the quadrant for `bearing`, keeping `current` until the bearing is more
/// than `margin` degrees past its boundary.
pub fn quadrant_for_bearing(bearing: f32, current: Option<Quadrant>, margin: f32) -> Quadrant {
    let bearing = normalize_bearing(bearing);
    match current {
        Some(current) if current.contains_with_margin(bearing, margin.max(0.0)) => current,
        _ => Quadrant::from_bearing(bearing),
    }
}

/// Four time-aligned loops with one audible at a time.
///
/// All four loops advance on every read so that switching quadrant never
/// restarts or shifts a loop.
pub struct QuadrantMux {
    loops: [LoopingClip; 4],
    active: Arc<AtomicUsize>,
    scratch: Vec<f32>,
}

impl QuadrantMux {
    /// `tones` are ordered North, East, South, West and must already be aligned.
    pub fn new(tones: [ToneClip; 4]) -> Self {
        Self {
            loops: tones.map(LoopingClip::new),
            active: Arc::new(AtomicUsize::new(Quadrant::North.index())),
            scratch: Vec::new(),
        }
    }

    /// Selector shared with the control side.
    pub fn selector(&self) -> QuadrantSelector {
        QuadrantSelector(self.active.clone())
    }

    pub fn positions(&self) -> [usize; 4] {
        [
            self.loops[0].position(),
            self.loops[1].position(),
            self.loops[2].position(),
            self.loops[3].position(),
        ]
    }
}

impl MonoStream for QuadrantMux {
    fn read(&mut self, out: &mut [f32]) {
        let active = self.active.load(Ordering::Acquire) % 4;
        if self.scratch.len() != out.len() {
            self.scratch.resize(out.len(), 0.0);
        }
        for (index, tone) in self.loops.iter_mut().enumerate() {
            if index == active {
                tone.read(out);
            } else {
                tone.read(&mut self.scratch);
            }
        }
    }
}

/// Control-side handle that swaps the audible quadrant.
#[derive(Debug, Clone)]
pub struct QuadrantSelector(Arc<AtomicUsize>);

impl QuadrantSelector {
    pub fn select(&self, quadrant: Quadrant) {
        self.0.swap(quadrant.index(), Ordering::AcqRel);
    }

    pub fn current(&self) -> Quadrant {
        Quadrant::from_index(self.0.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_every_bearing() {
        let mut bearing = 0.0f32;
        while bearing < 360.0 {
            let quadrant = Quadrant::from_bearing(bearing);
            let expected = if !(45.0..315.0).contains(&bearing) {
                Quadrant::North
            } else if bearing < 135.0 {
                Quadrant::East
            } else if bearing < 225.0 {
                Quadrant::South
            } else {
                Quadrant::West
            };
            assert_eq!(quadrant, expected, "bearing {}", bearing);
            bearing += 0.5;
        }
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(Quadrant::from_bearing(315.0), Quadrant::North);
        assert_eq!(Quadrant::from_bearing(44.99), Quadrant::North);
        assert_eq!(Quadrant::from_bearing(45.0), Quadrant::East);
        assert_eq!(Quadrant::from_bearing(135.0), Quadrant::South);
        assert_eq!(Quadrant::from_bearing(225.0), Quadrant::West);
        assert_eq!(Quadrant::from_bearing(-10.0), Quadrant::North);
        assert_eq!(Quadrant::from_bearing(720.0 + 90.0), Quadrant::East);
    }

    #[test]
    fn test_hysteresis_at_every_boundary_both_ways() {
        // (boundary, quadrant below it, quadrant above it)
        let boundaries = [
            (45.0, Quadrant::North, Quadrant::East),
            (135.0, Quadrant::East, Quadrant::South),
            (225.0, Quadrant::South, Quadrant::West),
            (315.0, Quadrant::West, Quadrant::North),
        ];
        let margin = 5.0;
        for (boundary, below, above) in boundaries {
            // Crossing upward: held inside the margin, switches beyond it.
            assert_eq!(quadrant_for_bearing(boundary + 4.0, Some(below), margin), below);
            assert_eq!(quadrant_for_bearing(boundary + 6.0, Some(below), margin), above);
            // Crossing downward.
            assert_eq!(quadrant_for_bearing(boundary - 4.0, Some(above), margin), above);
            assert_eq!(quadrant_for_bearing(boundary - 6.0, Some(above), margin), below);
        }
    }

    #[test]
    fn test_no_current_quadrant_uses_table() {
        assert_eq!(quadrant_for_bearing(46.0, None, 5.0), Quadrant::East);
        // A large jump leaves the current quadrant immediately.
        assert_eq!(
            quadrant_for_bearing(180.0, Some(Quadrant::North), 5.0),
            Quadrant::South
        );
    }

    #[test]
    fn test_mux_advances_every_loop() {
        let tones = [1.0, 2.0, 3.0, 4.0].map(|v| ToneClip::from_samples(vec![v; 10], 48000));
        let mut mux = QuadrantMux::new(tones);
        let selector = mux.selector();

        let mut out = [0.0; 4];
        mux.read(&mut out);
        assert_eq!(out, [1.0; 4]);

        selector.select(Quadrant::South);
        mux.read(&mut out);
        assert_eq!(out, [3.0; 4]);
        assert_eq!(mux.positions(), [8; 4]);
        assert_eq!(selector.current(), Quadrant::South);
    }
}
