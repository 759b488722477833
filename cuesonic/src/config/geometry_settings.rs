use crate::error::{CueSonicError, Result};
use std::time::Duration;

/// Settings controlling how occlusion geometry is extracted from the host scene.
#[derive(Debug, Clone)]
pub struct GeometrySettings {
    /// Grace delay after an area change before geometry is rebuilt, giving the
    /// host time to finish streaming scene objects in. Skipped when the host
    /// signals that the scene finished loading.
    pub rebuild_delay: Duration,
    /// Spacing of the walkable-surface sampling grid, in game units
    pub ground_cell_size: f32,
    /// Maximum number of triangles in one rebuilt mesh (ground is placed first)
    pub max_triangles: usize,
    /// Obstacles whose largest extent is below this are ignored
    pub min_obstacle_extent: f32,
    /// Obstacles whose largest extent is above this are ignored (terrain, skyboxes)
    pub max_obstacle_extent: f32,
    /// Maximum number of occlusion samples per source in the native simulator
    pub max_occlusion_samples: u32,
    /// Transmission rays cast per source for occlusion
    pub transmission_rays: u32,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            rebuild_delay: Duration::from_secs(2),
            ground_cell_size: 2.0,
            max_triangles: 20_000,
            min_obstacle_extent: 0.5,
            max_obstacle_extent: 50.0,
            max_occlusion_samples: 32,
            transmission_rays: 8,
        }
    }
}

impl GeometrySettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.ground_cell_size > 0.0) {
            return Err(CueSonicError::Configuration(
                "Ground cell size must be positive".into(),
            ));
        }
        if self.min_obstacle_extent > self.max_obstacle_extent {
            return Err(CueSonicError::Configuration(format!(
                "Obstacle extent range is empty ({} > {})",
                self.min_obstacle_extent, self.max_obstacle_extent
            )));
        }
        Ok(())
    }
}
