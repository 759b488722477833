//! Acoustic materials for extracted scene geometry.
//!
//! Values are given in Steam Audio's three bands (400 Hz, 2.5 kHz, 15 kHz).

/// Acoustic properties of a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcousticMaterial {
    /// Fraction of energy absorbed at [low, mid, high] frequencies (0.0 - 1.0)
    pub absorption: [f32; 3],
    /// Fraction of reflected energy scattered diffusely (0.0 - 1.0)
    pub scattering: f32,
    /// Fraction of energy transmitted through the surface at [low, mid, high] (0.0 - 1.0)
    pub transmission: [f32; 3],
}

impl AcousticMaterial {
    /// Terrain and floors: rough and fairly absorptive.
    pub const GROUND: Self = Self {
        absorption: [0.30, 0.40, 0.50],
        scattering: 0.60,
        transmission: [0.020, 0.010, 0.005],
    };

    /// Walls, crates, props: hard, reflective, good at blocking sound.
    pub const OBSTACLE: Self = Self {
        absorption: [0.05, 0.07, 0.08],
        scattering: 0.05,
        transmission: [0.015, 0.002, 0.001],
    };

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.absorption.iter().any(|v| !(0.0..=1.0).contains(v)) {
            return Err("Absorption values must be between 0.0 and 1.0");
        }
        if !(0.0..=1.0).contains(&self.scattering) {
            return Err("Scattering value must be between 0.0 and 1.0");
        }
        if self.transmission.iter().any(|v| !(0.0..=1.0).contains(v)) {
            return Err("Transmission values must be between 0.0 and 1.0");
        }
        Ok(())
    }
}

impl From<&AcousticMaterial> for audionimbus::Material {
    fn from(material: &AcousticMaterial) -> Self {
        audionimbus::Material {
            absorption: material.absorption,
            scattering: material.scattering,
            transmission: material.transmission,
        }
    }
}

/// Surface category of a triangle; its discriminant is the index into
/// [`MaterialId::TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialId {
    Ground = 0,
    Obstacle = 1,
}

impl MaterialId {
    pub const TABLE: [AcousticMaterial; 2] = [AcousticMaterial::GROUND, AcousticMaterial::OBSTACLE];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn material(self) -> &'static AcousticMaterial {
        &Self::TABLE[self.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(AcousticMaterial::GROUND.validate().is_ok());
        assert!(AcousticMaterial::OBSTACLE.validate().is_ok());
    }

    #[test]
    fn test_ground_scatters_more_and_obstacle_absorbs_less() {
        let ground = MaterialId::Ground.material();
        let obstacle = MaterialId::Obstacle.material();
        assert!(ground.scattering > obstacle.scattering);
        for band in 0..3 {
            assert!(obstacle.absorption[band] < ground.absorption[band]);
        }
    }

    #[test]
    fn test_invalid_material_rejected() {
        let material = AcousticMaterial {
            absorption: [0.5, 1.5, 0.3],
            scattering: 0.05,
            transmission: [0.1, 0.05, 0.03],
        };
        assert!(material.validate().is_err());
    }
}
