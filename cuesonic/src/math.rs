//! Math types for CueSonic
//!
//! All positions handed to the engine use the host game's convention: left-handed,
//! `+X` right, `+Y` up, `+Z` forward. Conversion to Steam Audio's right-handed space
//! happens only inside [`crate::simulation`].

pub use glam::{Quat, Vec3};

/// Position and orientation of the listener (or any oriented object) in game space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Builds a pose facing `forward` with the world up axis as reference.
    ///
    /// Falls back to the identity rotation when `forward` is degenerate.
    pub fn looking(position: Vec3, forward: Vec3) -> Self {
        let forward = forward.normalize_or_zero();
        if forward == Vec3::ZERO {
            return Self::from_position(position);
        }
        Self {
            position,
            rotation: Quat::from_rotation_arc(Vec3::Z, forward),
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn distance(&self, other: &Self) -> f32 {
        self.position.distance(other.position)
    }

    /// Expresses a world-space point in this pose's local axes as
    /// `(right, up, forward)` components of the normalized offset.
    ///
    /// Returns `Vec3::Z` (straight ahead) when the point coincides with the pose.
    pub fn local_direction_to(&self, target: Vec3) -> Vec3 {
        let offset = (target - self.position).normalize_or_zero();
        if offset == Vec3::ZERO {
            return Vec3::Z;
        }
        Vec3::new(
            offset.dot(self.right()),
            offset.dot(self.up()),
            offset.dot(self.forward()),
        )
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Axis-aligned bounding box in game space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self::new(center - half, center + half)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn largest_extent(&self) -> f32 {
        self.size().max_element()
    }

    /// The eight corners, bottom face first (counter-clockwise seen from above).
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(a.x, b.y, b.z),
        ]
    }
}

/// Clamps a pan or direction component into `[-1, 1]`, mapping NaN to centre.
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

/// Closest point to `p` on segment `a..b`, with the segment parameter `t` in `[0, 1]`.
pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> (Vec3, f32) {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return (a, 0.0);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (a + ab * t, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_axes_are_left_handed_game_space() {
        let pose = Pose::identity();
        assert_eq!(pose.forward(), Vec3::Z);
        assert_eq!(pose.right(), Vec3::X);
        assert_eq!(pose.up(), Vec3::Y);
    }

    #[test]
    fn test_local_direction_to() {
        let pose = Pose::identity();
        let right = pose.local_direction_to(Vec3::new(10.0, 0.0, 0.0));
        assert!((right.x - 1.0).abs() < 1e-6);
        let behind = pose.local_direction_to(Vec3::new(0.0, 0.0, -3.0));
        assert!((behind.z + 1.0).abs() < 1e-6);
        assert_eq!(pose.local_direction_to(Vec3::ZERO), Vec3::Z);
    }

    #[test]
    fn test_looking_turns_forward() {
        let pose = Pose::looking(Vec3::ZERO, Vec3::X);
        assert!(pose.forward().distance(Vec3::X) < 1e-5);
    }

    #[test]
    fn test_closest_point_on_segment() {
        let a = Vec3::ZERO;
        let b = Vec3::new(10.0, 0.0, 0.0);
        let (p, t) = closest_point_on_segment(Vec3::new(4.0, 3.0, 0.0), a, b);
        assert_eq!(p, Vec3::new(4.0, 0.0, 0.0));
        assert!((t - 0.4).abs() < 1e-6);

        let (p, t) = closest_point_on_segment(Vec3::new(-5.0, 0.0, 0.0), a, b);
        assert_eq!(p, a);
        assert_eq!(t, 0.0);
    }

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(2.0), 1.0);
        assert_eq!(clamp_unit(-7.0), -1.0);
        assert_eq!(clamp_unit(f32::NAN), 0.0);
    }
}
