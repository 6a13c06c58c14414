use std::f64::consts::PI;

use bevy::math::DVec3;

use crate::math::{Cartographic, PI_OVER_TWO};
use crate::{Ellipsoid, Projection};

/// EPSG:3857, the projection imagery tiles are usually served in. The core
/// only needs the latitude <-> mercator-angle mapping for the per-vertex
/// `web_mercator_t` channel.
#[derive(Clone, Copy, Debug)]
pub struct WebMercatorProjection {
    pub ellipsoid: Ellipsoid,
    semimajor_axis: f64,
    one_over_semimajor_axis: f64,
}

impl Default for WebMercatorProjection {
    fn default() -> Self {
        Self::new(&Ellipsoid::WGS84)
    }
}

impl WebMercatorProjection {
    /// The maximum latitude mercator can express: the latitude whose mercator
    /// angle is PI, i.e. the map is square.
    pub fn maximum_latitude() -> f64 {
        return Self::mercator_angle_to_geodetic_latitude(PI);
    }

    pub fn new(ellipsoid: &Ellipsoid) -> Self {
        Self {
            ellipsoid: *ellipsoid,
            semimajor_axis: ellipsoid.maximum_radius,
            one_over_semimajor_axis: 1.0 / ellipsoid.maximum_radius,
        }
    }

    pub fn mercator_angle_to_geodetic_latitude(mercator_angle: f64) -> f64 {
        return PI_OVER_TWO - 2.0 * (-mercator_angle).exp().atan();
    }

    pub fn geodetic_latitude_to_mercator_angle(latitude: f64) -> f64 {
        let maximum_latitude = Self::maximum_latitude();
        let latitude = latitude.clamp(-maximum_latitude, maximum_latitude);
        let sin_latitude = latitude.sin();
        return 0.5 * ((1.0 + sin_latitude) / (1.0 - sin_latitude)).ln();
    }
}

impl Projection for WebMercatorProjection {
    fn project(&self, cartographic: &Cartographic) -> DVec3 {
        let semimajor_axis = self.semimajor_axis;
        return DVec3::new(
            cartographic.longitude * semimajor_axis,
            Self::geodetic_latitude_to_mercator_angle(cartographic.latitude) * semimajor_axis,
            cartographic.height,
        );
    }

    fn un_project(&self, cartesian: &DVec3) -> Cartographic {
        return Cartographic::new(
            cartesian.x * self.one_over_semimajor_axis,
            Self::mercator_angle_to_geodetic_latitude(
                cartesian.y * self.one_over_semimajor_axis,
            ),
            cartesian.z,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{equals_epsilon, EPSILON10};

    #[test]
    fn mercator_angle_round_trips_latitude() {
        let latitude = 0.7;
        let angle = WebMercatorProjection::geodetic_latitude_to_mercator_angle(latitude);
        let back = WebMercatorProjection::mercator_angle_to_geodetic_latitude(angle);
        assert!(equals_epsilon(latitude, back, Some(EPSILON10), None));
    }

    #[test]
    fn equator_maps_to_zero() {
        assert!(
            WebMercatorProjection::geodetic_latitude_to_mercator_angle(0.0).abs() < EPSILON10
        );
    }

    #[test]
    fn maximum_latitude_is_about_85_degrees() {
        let max = WebMercatorProjection::maximum_latitude().to_degrees();
        assert!((max - 85.05112878).abs() < 1e-6);
    }
}
