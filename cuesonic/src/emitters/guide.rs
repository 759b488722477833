use crate::math::{Vec3, closest_point_on_segment};

/// Aim point on a path, ahead of the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidePoint {
    pub point: Vec3,
    /// Arc length from the player's projection on the path to the destination
    pub remaining_distance: f32,
}

/// Projects `player` onto the nearest segment of `path` and walks
/// `lookahead` units of arc length towards the destination, stopping at the
/// last corner.
///
/// Returns `None` for an empty path. A single-corner path aims at that corner.
pub fn compute_guide_point(path: &[Vec3], player: Vec3, lookahead: f32) -> Option<GuidePoint> {
    match path {
        [] => return None,
        [only] => {
            return Some(GuidePoint {
                point: *only,
                remaining_distance: player.distance(*only),
            });
        }
        _ => {}
    }

    let mut nearest = (0usize, path[0], f32::INFINITY);
    for (i, segment) in path.windows(2).enumerate() {
        let (point, _) = closest_point_on_segment(player, segment[0], segment[1]);
        let distance = player.distance_squared(point);
        if distance < nearest.2 {
            nearest = (i, point, distance);
        }
    }
    let (segment, projection, _) = nearest;

    let remaining_distance = projection.distance(path[segment + 1])
        + path[segment + 1..]
            .windows(2)
            .map(|w| w[0].distance(w[1]))
            .sum::<f32>();

    let mut budget = lookahead.max(0.0);
    let mut from = projection;
    for &corner in &path[segment + 1..] {
        let length = from.distance(corner);
        if length >= budget {
            let point = if length > 0.0 {
                from + (corner - from) * (budget / length)
            } else {
                corner
            };
            return Some(GuidePoint {
                point,
                remaining_distance,
            });
        }
        budget -= length;
        from = corner;
    }

    Some(GuidePoint {
        point: from,
        remaining_distance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!(a.distance(b) < 1e-4, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_straight_path_lookahead() {
        let path = [Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0)];
        let guide = compute_guide_point(&path, Vec3::new(5.0, 0.0, 0.0), 10.0).unwrap();
        assert_close(guide.point, Vec3::new(15.0, 0.0, 0.0));
        assert!((guide.remaining_distance - 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_lookahead_turns_the_corner() {
        let path = [
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 10.0),
        ];
        let guide = compute_guide_point(&path, Vec3::new(8.0, 0.0, 1.0), 4.0).unwrap();
        assert_close(guide.point, Vec3::new(10.0, 0.0, 2.0));
        assert!((guide.remaining_distance - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_stops_at_destination() {
        let path = [Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0)];
        let guide = compute_guide_point(&path, Vec3::new(0.0, 0.0, 4.0), 10.0).unwrap();
        assert_close(guide.point, Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_degenerate_paths() {
        assert!(compute_guide_point(&[], Vec3::ZERO, 4.0).is_none());
        let corner = Vec3::new(3.0, 0.0, 4.0);
        let guide = compute_guide_point(&[corner], Vec3::ZERO, 4.0).unwrap();
        assert_eq!(guide.point, corner);
        assert!((guide.remaining_distance - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_player_behind_start_is_clamped_to_path() {
        let path = [Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0)];
        let guide = compute_guide_point(&path, Vec3::new(-5.0, 0.0, 0.0), 4.0).unwrap();
        assert_close(guide.point, Vec3::new(4.0, 0.0, 0.0));
        assert!((guide.remaining_distance - 20.0).abs() < 1e-4);
    }
}
