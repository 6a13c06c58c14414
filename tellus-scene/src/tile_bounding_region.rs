use bevy::math::DVec3;

use crate::math::Cartographic;
use crate::{
    ray_plane, BoundingSphere, Ellipsoid, OrientedBoundingBox, Plane, Projection, Rectangle,
};

/// A bounding volume for a tile: its rectangle swept between two heights.
/// Stores precomputed corner points and outward edge-plane normals so the
/// camera distance query is cheap.
#[derive(Default, Clone, Debug)]
pub struct TileBoundingRegion {
    pub rectangle: Rectangle,
    pub minimum_height: f64,
    pub maximum_height: f64,
    pub southwest_corner_cartesian: DVec3,
    pub northeast_corner_cartesian: DVec3,
    pub west_normal: DVec3,
    pub south_normal: DVec3,
    pub east_normal: DVec3,
    pub north_normal: DVec3,
    pub oriented_bounding_box: Option<OrientedBoundingBox>,
    pub bounding_sphere: Option<BoundingSphere>,
}

impl TileBoundingRegion {
    pub fn new(
        rectangle: &Rectangle,
        minimum_height: Option<f64>,
        maximum_height: Option<f64>,
        ellipsoid: Option<&Ellipsoid>,
        compute_bounding_volumes: Option<bool>,
    ) -> Self {
        let ellipsoid = ellipsoid.unwrap_or(&Ellipsoid::WGS84);
        let mut region = Self {
            rectangle: *rectangle,
            minimum_height: minimum_height.unwrap_or(0.0),
            maximum_height: maximum_height.unwrap_or(0.0),
            ..Default::default()
        };
        region.compute_box(rectangle, ellipsoid);
        if compute_bounding_volumes.unwrap_or(false) {
            region.compute_bounding_volumes(ellipsoid);
        }
        return region;
    }

    pub fn compute_bounding_volumes(&mut self, ellipsoid: &Ellipsoid) {
        let obb = OrientedBoundingBox::from_rectangle(
            &self.rectangle,
            Some(self.minimum_height),
            Some(self.maximum_height),
            Some(ellipsoid),
        );
        self.bounding_sphere = Some(BoundingSphere::from_oriented_bounding_box(&obb));
        self.oriented_bounding_box = Some(obb);
    }

    pub fn get_bounding_volume(&self) -> Option<&OrientedBoundingBox> {
        return self.oriented_bounding_box.as_ref();
    }

    pub fn get_bounding_sphere(&self) -> Option<&BoundingSphere> {
        return self.bounding_sphere.as_ref();
    }

    fn compute_box(&mut self, rectangle: &Rectangle, ellipsoid: &Ellipsoid) {
        self.southwest_corner_cartesian =
            ellipsoid.cartographic_to_cartesian(&rectangle.southwest());
        self.northeast_corner_cartesian =
            ellipsoid.cartographic_to_cartesian(&rectangle.northeast());

        // The midpoint latitude gives the widest extent of each meridional
        // edge plane.
        let mid_latitude = (rectangle.south + rectangle.north) * 0.5;
        let western_midpoint = ellipsoid.cartographic_to_cartesian(&Cartographic::new(
            rectangle.west,
            mid_latitude,
            0.0,
        ));
        self.west_normal = western_midpoint.cross(DVec3::Z).normalize();

        let eastern_midpoint = ellipsoid.cartographic_to_cartesian(&Cartographic::new(
            rectangle.east,
            mid_latitude,
            0.0,
        ));
        self.east_normal = DVec3::Z.cross(eastern_midpoint).normalize();

        let west_vector = western_midpoint - eastern_midpoint;
        let east_west_normal = west_vector.normalize();

        let south = rectangle.south;
        let south_surface_normal;
        if south > 0.0 {
            // Entirely in the northern hemisphere: the southern edge plane
            // would cut the tile, so anchor the corner where the south edge
            // meets the west plane.
            let south_center = ellipsoid.cartographic_to_cartesian(&Cartographic::new(
                (rectangle.west + rectangle.east) * 0.5,
                south,
                0.0,
            ));
            let west_plane =
                Plane::from_point_normal(self.southwest_corner_cartesian, self.west_normal);
            if let Some(corner) = ray_plane(south_center, east_west_normal, &west_plane) {
                self.southwest_corner_cartesian = corner;
            }
            south_surface_normal = ellipsoid.geodetic_surface_normal(south_center);
        } else {
            south_surface_normal =
                ellipsoid.geodetic_surface_normal_cartographic(&rectangle.southeast());
        }
        self.south_normal = south_surface_normal.cross(west_vector).normalize();

        let north = rectangle.north;
        let north_surface_normal;
        if north < 0.0 {
            // Entirely in the southern hemisphere; mirror of the case above.
            let north_center = ellipsoid.cartographic_to_cartesian(&Cartographic::new(
                (rectangle.west + rectangle.east) * 0.5,
                north,
                0.0,
            ));
            let east_plane =
                Plane::from_point_normal(self.northeast_corner_cartesian, self.east_normal);
            if let Some(corner) = ray_plane(north_center, -east_west_normal, &east_plane) {
                self.northeast_corner_cartesian = corner;
            }
            north_surface_normal = ellipsoid.geodetic_surface_normal(north_center);
        } else {
            north_surface_normal =
                ellipsoid.geodetic_surface_normal_cartographic(&rectangle.northwest());
        }
        self.north_normal = north_surface_normal.cross(-west_vector).normalize();
    }

    /// Conservative distance from the camera to the region: squared plane
    /// separations in longitude/latitude plus the height band, with the
    /// oriented box distance folded in when one exists.
    pub fn distance_to_camera<P: Projection>(
        &self,
        position_wc: &DVec3,
        position_cartographic: &Cartographic,
        projection: &P,
    ) -> f64 {
        let region_result =
            self.distance_to_camera_region(position_wc, position_cartographic, projection);
        if let Some(obb) = &self.oriented_bounding_box {
            let obb_result = obb.distance_squared_to(position_wc).sqrt();
            return region_result.max(obb_result);
        }
        return region_result;
    }

    pub fn distance_to_camera_region<P: Projection>(
        &self,
        position_wc: &DVec3,
        position_cartographic: &Cartographic,
        _projection: &P,
    ) -> f64 {
        let mut result = 0.0;
        if !self.rectangle.contains(position_cartographic) {
            let vector_from_southwest = *position_wc - self.southwest_corner_cartesian;
            let distance_to_west_plane = vector_from_southwest.dot(self.west_normal);
            let distance_to_south_plane = vector_from_southwest.dot(self.south_normal);

            let vector_from_northeast = *position_wc - self.northeast_corner_cartesian;
            let distance_to_east_plane = vector_from_northeast.dot(self.east_normal);
            let distance_to_north_plane = vector_from_northeast.dot(self.north_normal);

            if distance_to_west_plane > 0.0 {
                result += distance_to_west_plane * distance_to_west_plane;
            } else if distance_to_east_plane > 0.0 {
                result += distance_to_east_plane * distance_to_east_plane;
            }

            if distance_to_south_plane > 0.0 {
                result += distance_to_south_plane * distance_to_south_plane;
            } else if distance_to_north_plane > 0.0 {
                result += distance_to_north_plane * distance_to_north_plane;
            }
        }

        let camera_height = position_cartographic.height;
        if camera_height > self.maximum_height {
            let distance_above_top = camera_height - self.maximum_height;
            result += distance_above_top * distance_above_top;
        } else if camera_height < self.minimum_height {
            let distance_below_bottom = self.minimum_height - camera_height;
            result += distance_below_bottom * distance_below_bottom;
        }

        return result.sqrt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeographicProjection;

    #[test]
    fn camera_inside_at_surface_has_zero_distance() {
        let rectangle = Rectangle::from_degrees(-10.0, -10.0, 10.0, 10.0);
        let region = TileBoundingRegion::new(&rectangle, Some(0.0), Some(100.0), None, None);
        let cartographic = Cartographic::from_degrees(0.0, 0.0, 50.0);
        let position = Ellipsoid::WGS84.cartographic_to_cartesian(&cartographic);
        let d = region.distance_to_camera_region(
            &position,
            &cartographic,
            &GeographicProjection::WGS84,
        );
        assert_eq!(d, 0.0);
    }

    #[test]
    fn camera_above_pays_only_the_height_separation() {
        let rectangle = Rectangle::from_degrees(-10.0, -10.0, 10.0, 10.0);
        let region = TileBoundingRegion::new(&rectangle, Some(0.0), Some(100.0), None, None);
        let cartographic = Cartographic::from_degrees(0.0, 0.0, 1100.0);
        let position = Ellipsoid::WGS84.cartographic_to_cartesian(&cartographic);
        let d = region.distance_to_camera_region(
            &position,
            &cartographic,
            &GeographicProjection::WGS84,
        );
        assert!((d - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn camera_west_of_tile_pays_the_plane_separation() {
        let rectangle = Rectangle::from_degrees(0.0, -5.0, 10.0, 5.0);
        let region = TileBoundingRegion::new(&rectangle, Some(0.0), Some(0.0), None, None);
        let cartographic = Cartographic::from_degrees(-1.0, 0.0, 0.0);
        let position = Ellipsoid::WGS84.cartographic_to_cartesian(&cartographic);
        let d = region.distance_to_camera_region(
            &position,
            &cartographic,
            &GeographicProjection::WGS84,
        );
        // Roughly one degree of arc at the equator.
        assert!(d > 100_000.0 && d < 120_000.0);
    }

    #[test]
    fn widening_the_height_range_never_increases_distance() {
        let rectangle = Rectangle::from_degrees(0.0, 0.0, 1.0, 1.0);
        let tight = TileBoundingRegion::new(&rectangle, Some(0.0), Some(10.0), None, None);
        let wide = TileBoundingRegion::new(&rectangle, Some(-500.0), Some(9000.0), None, None);
        let cartographic = Cartographic::from_degrees(5.0, 5.0, 12000.0);
        let position = Ellipsoid::WGS84.cartographic_to_cartesian(&cartographic);
        let projection = GeographicProjection::WGS84;
        let d_tight =
            tight.distance_to_camera_region(&position, &cartographic, &projection);
        let d_wide = wide.distance_to_camera_region(&position, &cartographic, &projection);
        assert!(d_wide <= d_tight);
    }
}
