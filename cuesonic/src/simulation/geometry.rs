//! Occlusion geometry extracted from the host scene.
//!
//! The mesh is a coarse proxy: a ground sheet sampled on a regular grid plus one box
//! per qualifying static obstacle. It is only meant for direct-path occlusion;
//! overhangs, multi-level terrain and unreachable ground are silently missing.

use crate::config::GeometrySettings;
use crate::math::{Aabb, Vec3};
use crate::simulation::material::MaterialId;

/// Which render layer an obstacle proxy came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleLayer {
    /// Regular world geometry: walls, props, buildings
    World,
    /// UI elements placed in world space (name plates, markers)
    Ui,
    /// Particles, decals and other visual effects
    Effect,
}

/// A static scene object reduced to its renderer bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleProxy {
    pub bounds: Aabb,
    pub layer: ObstacleLayer,
}

impl ObstacleProxy {
    pub fn world(bounds: Aabb) -> Self {
        Self {
            bounds,
            layer: ObstacleLayer::World,
        }
    }
}

/// Read-only view of the host scene used to rebuild occlusion geometry.
///
/// Implemented by the host's world query layer. All coordinates are game space.
pub trait SceneQuery {
    /// Horizontal extent of the current playable area, if known
    fn area_bounds(&self) -> Option<Aabb>;

    /// Height of the walkable surface at `(x, z)`, or `None` if the point is not walkable
    fn walkable_height(&self, x: f32, z: f32) -> Option<f32>;

    /// Static objects that may block sound
    fn static_obstacles(&self) -> Vec<ObstacleProxy>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometryStats {
    pub ground_triangles: usize,
    pub obstacle_triangles: usize,
    /// Obstacles rejected by the layer or size filter, or dropped by the budget
    pub skipped_obstacles: usize,
    /// Whether the triangle budget cut the mesh short
    pub truncated: bool,
}

/// Triangle mesh in game space with one material per triangle.
#[derive(Debug, Clone, Default)]
pub struct SceneGeometry {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub materials: Vec<MaterialId>,
    pub stats: GeometryStats,
}

/// Box faces as corner indices into [`Aabb::corners`], wound for outward normals.
const BOX_TRIANGLES: [[u32; 3]; 12] = [
    [0, 1, 2],
    [0, 2, 3],
    [4, 6, 5],
    [4, 7, 6],
    [0, 5, 1],
    [0, 4, 5],
    [3, 2, 6],
    [3, 6, 7],
    [0, 3, 7],
    [0, 7, 4],
    [1, 6, 2],
    [1, 5, 6],
];

impl SceneGeometry {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Extracts ground and obstacle geometry from `scene` within the triangle budget.
    pub fn build(scene: &dyn SceneQuery, settings: &GeometrySettings) -> Self {
        let mut geometry = Self::default();
        if let Some(bounds) = scene.area_bounds() {
            geometry.add_ground(scene, bounds, settings);
        } else {
            log::warn!("Scene reported no area bounds; building obstacles only");
        }
        geometry.add_obstacles(scene.static_obstacles(), settings);

        log::info!(
            "Built occlusion geometry: {} ground + {} obstacle triangles ({} obstacles skipped{})",
            geometry.stats.ground_triangles,
            geometry.stats.obstacle_triangles,
            geometry.stats.skipped_obstacles,
            if geometry.stats.truncated {
                ", budget reached"
            } else {
                ""
            }
        );
        geometry
    }

    fn add_ground(&mut self, scene: &dyn SceneQuery, bounds: Aabb, settings: &GeometrySettings) {
        let size = bounds.size();
        let max_cells = (settings.max_triangles / 2).max(1) as f32;
        // Coarsen the grid rather than sampling cells the budget can never hold.
        let min_cell = ((size.x * size.z).max(0.0) / max_cells).sqrt();
        let cell = settings.ground_cell_size.max(min_cell);
        if cell > settings.ground_cell_size {
            log::debug!(
                "Ground cell size raised from {} to {} to fit the triangle budget",
                settings.ground_cell_size,
                cell
            );
        }

        let nx = (size.x / cell).ceil() as usize + 1;
        let nz = (size.z / cell).ceil() as usize + 1;
        let heights: Vec<Option<f32>> = (0..nz)
            .flat_map(|iz| (0..nx).map(move |ix| (ix, iz)))
            .map(|(ix, iz)| {
                let x = bounds.min.x + ix as f32 * cell;
                let z = bounds.min.z + iz as f32 * cell;
                scene.walkable_height(x, z)
            })
            .collect();

        let mut vertex_ids: Vec<Option<u32>> = vec![None; nx * nz];
        for iz in 0..nz.saturating_sub(1) {
            for ix in 0..nx.saturating_sub(1) {
                let corners = [(ix, iz), (ix, iz + 1), (ix + 1, iz + 1), (ix + 1, iz)];
                if corners.iter().any(|&(x, z)| heights[z * nx + x].is_none()) {
                    continue;
                }
                if self.triangles.len() + 2 > settings.max_triangles {
                    self.stats.truncated = true;
                    return;
                }

                let ids = corners.map(|(x, z)| {
                    let slot = z * nx + x;
                    *vertex_ids[slot].get_or_insert_with(|| {
                        let height = heights[slot].unwrap_or(bounds.min.y);
                        self.vertices.push(Vec3::new(
                            bounds.min.x + x as f32 * cell,
                            height,
                            bounds.min.z + z as f32 * cell,
                        ));
                        (self.vertices.len() - 1) as u32
                    })
                });
                self.push_triangle([ids[0], ids[1], ids[2]], MaterialId::Ground);
                self.push_triangle([ids[0], ids[2], ids[3]], MaterialId::Ground);
                self.stats.ground_triangles += 2;
            }
        }
    }

    fn add_obstacles(&mut self, obstacles: Vec<ObstacleProxy>, settings: &GeometrySettings) {
        for obstacle in obstacles {
            let extent = obstacle.bounds.largest_extent();
            let qualifies = obstacle.layer == ObstacleLayer::World
                && extent >= settings.min_obstacle_extent
                && extent <= settings.max_obstacle_extent;
            if !qualifies {
                self.stats.skipped_obstacles += 1;
                continue;
            }
            if self.triangles.len() + BOX_TRIANGLES.len() > settings.max_triangles {
                self.stats.truncated = true;
                self.stats.skipped_obstacles += 1;
                continue;
            }

            let base = self.vertices.len() as u32;
            self.vertices.extend(obstacle.bounds.corners());
            for triangle in BOX_TRIANGLES {
                self.push_triangle(triangle.map(|i| base + i), MaterialId::Obstacle);
            }
            self.stats.obstacle_triangles += BOX_TRIANGLES.len();
        }
    }

    fn push_triangle(&mut self, triangle: [u32; 3], material: MaterialId) {
        self.triangles.push(triangle);
        self.materials.push(material);
    }
}
