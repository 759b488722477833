use cuesonic::math::Aabb;
use cuesonic::{ObstacleLayer, ObstacleProxy, SceneQuery, Vec3};

/// A 40 x 40 courtyard with a wall across the middle and a few crates.
pub struct Courtyard {
    half_size: f32,
    obstacles: Vec<ObstacleProxy>,
}

impl Courtyard {
    pub fn new() -> Self {
        let wall = Aabb::from_center_size(Vec3::new(-4.0, 1.5, 10.0), Vec3::new(24.0, 3.0, 0.5));
        let crates = [Vec3::new(6.0, 0.5, 4.0), Vec3::new(-8.0, 0.5, -6.0)]
            .map(|center| ObstacleProxy::world(Aabb::from_center_size(center, Vec3::ONE)));
        let marker = ObstacleProxy {
            bounds: Aabb::from_center_size(Vec3::new(0.0, 2.0, 18.0), Vec3::splat(1.5)),
            layer: ObstacleLayer::Ui,
        };

        let mut obstacles = vec![ObstacleProxy::world(wall), marker];
        obstacles.extend(crates);
        Self {
            half_size: 20.0,
            obstacles,
        }
    }

    /// Route from the south edge around the end of the wall to the far side.
    pub fn route(&self) -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, -15.0),
            Vec3::new(0.0, 0.0, 6.0),
            Vec3::new(12.0, 0.0, 6.0),
            Vec3::new(12.0, 0.0, 14.0),
            Vec3::new(0.0, 0.0, 16.0),
        ]
    }

    /// Closest point on any solid obstacle, used as the compass target.
    pub fn nearest_obstacle_point(&self, position: Vec3) -> Vec3 {
        self.obstacles
            .iter()
            .filter(|o| o.layer == ObstacleLayer::World)
            .map(|o| position.clamp(o.bounds.min, o.bounds.max))
            .min_by(|a, b| a.distance(position).total_cmp(&b.distance(position)))
            .unwrap_or(position)
    }
}

impl SceneQuery for Courtyard {
    fn area_bounds(&self) -> Option<Aabb> {
        Some(Aabb::new(
            Vec3::new(-self.half_size, 0.0, -self.half_size),
            Vec3::new(self.half_size, 0.0, self.half_size),
        ))
    }

    fn walkable_height(&self, x: f32, z: f32) -> Option<f32> {
        (x.abs() <= self.half_size && z.abs() <= self.half_size).then_some(0.0)
    }

    fn static_obstacles(&self) -> Vec<ObstacleProxy> {
        self.obstacles.clone()
    }
}
