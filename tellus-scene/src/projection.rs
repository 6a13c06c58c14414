use bevy::math::DVec3;

use crate::math::Cartographic;

/// Maps geodetic coordinates to a 2D map plane (x east, y north, z height).
pub trait Projection {
    fn project(&self, cartographic: &Cartographic) -> DVec3;
    fn un_project(&self, cartesian: &DVec3) -> Cartographic;
}
