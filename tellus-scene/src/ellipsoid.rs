use bevy::math::DVec3;

use crate::math::Cartographic;

/// A quadratic surface defined in Cartesian coordinates. Used as the shape of
/// the planetary body everything in this crate is draped over.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    pub radii: DVec3,
    pub radii_squared: DVec3,
    pub one_over_radii: DVec3,
    pub one_over_radii_squared: DVec3,
    pub minimum_radius: f64,
    pub maximum_radius: f64,
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Ellipsoid::WGS84
    }
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        radii: DVec3::new(6378137.0, 6378137.0, 6356752.3142451793),
        radii_squared: DVec3::new(
            6378137.0 * 6378137.0,
            6378137.0 * 6378137.0,
            6356752.3142451793 * 6356752.3142451793,
        ),
        one_over_radii: DVec3::new(
            1.0 / 6378137.0,
            1.0 / 6378137.0,
            1.0 / 6356752.3142451793,
        ),
        one_over_radii_squared: DVec3::new(
            1.0 / (6378137.0 * 6378137.0),
            1.0 / (6378137.0 * 6378137.0),
            1.0 / (6356752.3142451793 * 6356752.3142451793),
        ),
        minimum_radius: 6356752.3142451793,
        maximum_radius: 6378137.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self::from_vec3(DVec3::new(x, y, z))
    }

    pub fn from_vec3(radii: DVec3) -> Self {
        Self {
            radii,
            radii_squared: radii * radii,
            one_over_radii: DVec3::new(1.0 / radii.x, 1.0 / radii.y, 1.0 / radii.z),
            one_over_radii_squared: DVec3::new(
                1.0 / (radii.x * radii.x),
                1.0 / (radii.y * radii.y),
                1.0 / (radii.z * radii.z),
            ),
            minimum_radius: radii.x.min(radii.y).min(radii.z),
            maximum_radius: radii.x.max(radii.y).max(radii.z),
        }
    }

    pub fn geodetic_surface_normal(&self, position: DVec3) -> DVec3 {
        return (position * self.one_over_radii_squared).normalize();
    }

    pub fn geodetic_surface_normal_cartographic(&self, cartographic: &Cartographic) -> DVec3 {
        let cos_latitude = cartographic.latitude.cos();
        return DVec3::new(
            cos_latitude * cartographic.longitude.cos(),
            cos_latitude * cartographic.longitude.sin(),
            cartographic.latitude.sin(),
        );
    }

    pub fn cartographic_to_cartesian(&self, cartographic: &Cartographic) -> DVec3 {
        let n = self.geodetic_surface_normal_cartographic(cartographic);
        let mut k = self.radii_squared * n;
        let gamma = n.dot(k).sqrt();
        k = k / gamma;
        return k + n * cartographic.height;
    }

    /// Scales the position so it sits on this ellipsoid's unit sphere; the
    /// space horizon culling operates in.
    pub fn transform_position_to_scaled_space(&self, position: DVec3) -> DVec3 {
        return position * self.one_over_radii;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Cartesian3, EPSILON8, EPSILON9};

    #[test]
    fn cartographic_round_trip_at_the_equator() {
        let e = Ellipsoid::WGS84;
        let p = e.cartographic_to_cartesian(&Cartographic::from_degrees(0.0, 0.0, 0.0));
        assert!(p.equals_epsilon(DVec3::new(6378137.0, 0.0, 0.0), Some(EPSILON9), None));
    }

    #[test]
    fn surface_normal_is_unit_length_and_outward() {
        let e = Ellipsoid::WGS84;
        let p = e.cartographic_to_cartesian(&Cartographic::from_degrees(45.0, 45.0, 0.0));
        let n = e.geodetic_surface_normal(p);
        assert!((n.length() - 1.0).abs() < EPSILON9);
        assert!(n.dot(p) > 0.0);
    }

    #[test]
    fn scaled_space_puts_surface_points_on_the_unit_sphere() {
        let e = Ellipsoid::WGS84;
        let p = e.cartographic_to_cartesian(&Cartographic::from_degrees(12.0, 34.0, 0.0));
        let scaled = e.transform_position_to_scaled_space(p);
        assert!((scaled.length() - 1.0).abs() < EPSILON8);
    }
}
