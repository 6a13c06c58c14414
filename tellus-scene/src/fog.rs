use serde::{Deserialize, Serialize};

/// Exponential-squared atmospheric fog. Only the opacity curve lives here;
/// the actual scattering shader belongs to the render backend.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Fog {
    pub enabled: bool,
    /// Falloff rate; larger means the horizon fogs out closer to the camera.
    pub density: f64,
}

impl Default for Fog {
    fn default() -> Self {
        Self {
            enabled: true,
            density: 2.0e-4,
        }
    }
}

impl Fog {
    /// Density tuned for a camera at the given height: near the ground the
    /// default applies, while from orbit the atmosphere reads as a thin
    /// shell and barely fogs anything.
    pub fn for_camera_height(height: f64) -> Fog {
        let falloff = 1.0 + (height / 1000.0).max(0.0);
        return Fog {
            enabled: true,
            density: 2.0e-4 / falloff,
        };
    }

    /// Opacity in [0, 1] at the given camera distance; saturates to exactly
    /// 1.0 once the exponential underflows.
    pub fn opacity_at_distance(&self, distance: f64) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        let scalar = distance * self.density;
        return 1.0 - (-(scalar * scalar)).exp();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opacity_grows_with_distance_and_saturates() {
        let fog = Fog::default();
        let near = fog.opacity_at_distance(1000.0);
        let far = fog.opacity_at_distance(100_000.0);
        assert!(near < far);
        assert_eq!(fog.opacity_at_distance(1.0e12), 1.0);
    }

    #[test]
    fn disabled_fog_is_transparent_everywhere() {
        let fog = Fog {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(fog.opacity_at_distance(1.0e12), 0.0);
    }
}
