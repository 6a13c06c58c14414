use bevy::math::DVec3;

use crate::math::Cartographic;
use crate::{Ellipsoid, Projection};

/// Equirectangular projection: longitude and latitude scaled by the
/// ellipsoid's semimajor axis.
#[derive(Clone, Copy, Debug)]
pub struct GeographicProjection {
    pub ellipsoid: Ellipsoid,
    semimajor_axis: f64,
    one_over_semimajor_axis: f64,
}

impl Default for GeographicProjection {
    fn default() -> Self {
        Self::new(&Ellipsoid::WGS84)
    }
}

impl GeographicProjection {
    pub const WGS84: GeographicProjection = GeographicProjection {
        ellipsoid: Ellipsoid::WGS84,
        semimajor_axis: 6378137.0,
        one_over_semimajor_axis: 1.0 / 6378137.0,
    };

    pub fn new(ellipsoid: &Ellipsoid) -> Self {
        Self {
            ellipsoid: *ellipsoid,
            semimajor_axis: ellipsoid.maximum_radius,
            one_over_semimajor_axis: 1.0 / ellipsoid.maximum_radius,
        }
    }
}

impl Projection for GeographicProjection {
    fn project(&self, cartographic: &Cartographic) -> DVec3 {
        let semimajor_axis = self.semimajor_axis;
        return DVec3::new(
            cartographic.longitude * semimajor_axis,
            cartographic.latitude * semimajor_axis,
            cartographic.height,
        );
    }

    fn un_project(&self, cartesian: &DVec3) -> Cartographic {
        let one_over_earth_semimajor_axis = self.one_over_semimajor_axis;
        return Cartographic::new(
            cartesian.x * one_over_earth_semimajor_axis,
            cartesian.y * one_over_earth_semimajor_axis,
            cartesian.z,
        );
    }
}
