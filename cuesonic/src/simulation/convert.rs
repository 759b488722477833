//! Game space to Steam Audio space.
//!
//! The game is left-handed (`+Z` forward) while Steam Audio is right-handed with
//! `-Z` ahead, so every point and vector has its Z negated. Negating one axis
//! mirrors the mesh, which reverses triangle orientation; winding is swapped to
//! keep normals facing the same way. Points are additionally scaled from game
//! units to metres.

use crate::math::{Pose, Vec3};
use audionimbus::{Point, Triangle, Vector3, geometry};

pub fn to_native_vec(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, -v.z)
}

pub fn to_native_point(p: Vec3, distance_scaler: f32) -> Point {
    let p = to_native_vec(p) * distance_scaler;
    Point::new(p.x, p.y, p.z)
}

fn to_native_vector(v: Vec3) -> Vector3 {
    let v = to_native_vec(v);
    Vector3::new(v.x, v.y, v.z)
}

/// Listener coordinate system for the simulator's shared inputs.
pub fn listener_coordinates(pose: &Pose, distance_scaler: f32) -> geometry::CoordinateSystem {
    geometry::CoordinateSystem {
        origin: to_native_point(pose.position, distance_scaler),
        right: to_native_vector(pose.right()),
        up: to_native_vector(pose.up()),
        ahead: to_native_vector(pose.forward()),
    }
}

/// Source coordinate system; only the origin matters for direct simulation.
pub fn source_coordinates(position: Vec3, distance_scaler: f32) -> geometry::CoordinateSystem {
    geometry::CoordinateSystem {
        origin: to_native_point(position, distance_scaler),
        ..Default::default()
    }
}

/// Maps a listener-local `(right, up, forward)` direction to the HRTF's
/// listener space, where ahead is `-Z`.
pub fn to_hrtf_direction(local: Vec3) -> Vec3 {
    let direction = Vec3::new(local.x, local.y, -local.z).normalize_or_zero();
    if direction == Vec3::ZERO {
        Vec3::NEG_Z
    } else {
        direction
    }
}

/// Swaps the second and third index to preserve facing after the Z mirror.
pub fn to_native_triangle(triangle: [u32; 3]) -> Triangle {
    Triangle::new(triangle[0] as i32, triangle[2] as i32, triangle[1] as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_z_is_negated_and_scaled() {
        let v = to_native_vec(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(v, Vec3::new(1.0, 2.0, -3.0));

        let p = to_native_point(Vec3::new(1.0, 2.0, 3.0), 2.0);
        assert_eq!((p.x, p.y, p.z), (2.0, 4.0, -6.0));

        // Only points are scaled; axes stay unit length.
        let coordinates = listener_coordinates(&Pose::from_position(Vec3::new(0.0, 0.0, 5.0)), 0.5);
        assert_eq!(coordinates.origin.z, -2.5);
        assert_eq!((coordinates.ahead.x, coordinates.ahead.y, coordinates.ahead.z), (0.0, 0.0, -1.0));
        assert_eq!(source_coordinates(Vec3::X, 3.0).origin.x, 3.0);
    }

    #[test]
    fn test_mirrored_triangle_keeps_facing() {
        let (a, b, c) = (
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
        );
        let game_normal = (b - a).cross(c - a);
        assert!(game_normal.y > 0.0);

        // After mirroring Z, the swapped order b <-> c still faces up.
        let (a, b, c) = (to_native_vec(a), to_native_vec(b), to_native_vec(c));
        let native_normal = (c - a).cross(b - a);
        assert!(native_normal.y > 0.0);
    }

    #[test]
    fn test_hrtf_direction() {
        assert_eq!(to_hrtf_direction(Vec3::Z), Vec3::NEG_Z);
        assert_eq!(to_hrtf_direction(Vec3::X), Vec3::X);
        assert_eq!(to_hrtf_direction(Vec3::ZERO), Vec3::NEG_Z);
    }
}
