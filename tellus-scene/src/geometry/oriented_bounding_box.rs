use bevy::math::{DMat3, DVec3};

use crate::math::{Cartographic, EPSILON3};
use crate::{BoundingVolume, Ellipsoid, Intersect, Plane, Rectangle};

/// A box oriented to fit a geographic rectangle: center plus three half-axes
/// stored as the columns of a matrix.
#[derive(Default, Clone, Copy, Debug)]
pub struct OrientedBoundingBox {
    pub center: DVec3,
    pub half_axes: DMat3,
}

impl OrientedBoundingBox {
    /// Fits the rectangle between `minimum_height` and `maximum_height` by
    /// projecting a 3x3 grid of samples at both heights onto the east-north-up
    /// frame at the rectangle's center.
    pub fn from_rectangle(
        rectangle: &Rectangle,
        minimum_height: Option<f64>,
        maximum_height: Option<f64>,
        ellipsoid: Option<&Ellipsoid>,
    ) -> Self {
        let minimum_height = minimum_height.unwrap_or(0.0);
        let maximum_height = maximum_height.unwrap_or(0.0);
        let ellipsoid = ellipsoid.unwrap_or(&Ellipsoid::WGS84);

        let center_cartographic = rectangle.center();
        let center = ellipsoid.cartographic_to_cartesian(&center_cartographic);
        let up = ellipsoid.geodetic_surface_normal(center);
        let mut east = DVec3::Z.cross(up);
        if east.length_squared() < EPSILON3 * EPSILON3 {
            // Centered at a pole; any tangent frame works.
            east = DVec3::X;
        }
        east = east.normalize();
        let north = up.cross(east);

        let longitudes = [
            rectangle.west,
            rectangle.west + rectangle.compute_width() * 0.5,
            rectangle.west + rectangle.compute_width(),
        ];
        let latitudes = [rectangle.south, center_cartographic.latitude, rectangle.north];

        let mut min_extent = DVec3::splat(f64::MAX);
        let mut max_extent = DVec3::splat(f64::MIN);
        for height in [minimum_height, maximum_height] {
            for longitude in longitudes {
                for latitude in latitudes {
                    let sample = ellipsoid.cartographic_to_cartesian(&Cartographic::new(
                        longitude, latitude, height,
                    ));
                    let offset = sample - center;
                    let local = DVec3::new(offset.dot(east), offset.dot(north), offset.dot(up));
                    min_extent = min_extent.min(local);
                    max_extent = max_extent.max(local);
                }
            }
        }

        let local_center = (min_extent + max_extent) * 0.5;
        let half_size = (max_extent - min_extent) * 0.5;
        let box_center =
            center + east * local_center.x + north * local_center.y + up * local_center.z;
        let half_axes = DMat3::from_cols(east * half_size.x, north * half_size.y, up * half_size.z);
        return Self {
            center: box_center,
            half_axes,
        };
    }

    pub fn distance_squared_to(&self, point: &DVec3) -> f64 {
        let offset = *point - self.center;

        let mut u = self.half_axes.x_axis;
        let mut v = self.half_axes.y_axis;
        let mut w = self.half_axes.z_axis;

        let u_half = u.length();
        let v_half = v.length();
        let w_half = w.length();

        // Degenerate axes happen when the box came from a zero-thickness
        // height range; fall back to any orthonormal completion.
        if u_half > 0.0 {
            u /= u_half;
        } else {
            u = DVec3::X;
        }
        if v_half > 0.0 {
            v /= v_half;
        } else {
            v = u.any_orthonormal_vector();
        }
        if w_half > 0.0 {
            w /= w_half;
        } else {
            w = u.cross(v);
        }

        let p_prime = DVec3::new(offset.dot(u), offset.dot(v), offset.dot(w));
        let mut distance_squared = 0.0;
        for (coordinate, half) in [
            (p_prime.x, u_half),
            (p_prime.y, v_half),
            (p_prime.z, w_half),
        ] {
            if coordinate < -half {
                let d = coordinate + half;
                distance_squared += d * d;
            } else if coordinate > half {
                let d = coordinate - half;
                distance_squared += d * d;
            }
        }
        return distance_squared;
    }

    pub fn intersect_plane(&self, plane: &Plane) -> Intersect {
        let normal = plane.normal;
        // Effective radius: the box's extent along the plane normal.
        let rad_effective = normal.dot(self.half_axes.x_axis).abs()
            + normal.dot(self.half_axes.y_axis).abs()
            + normal.dot(self.half_axes.z_axis).abs();
        let distance_to_plane = normal.dot(self.center) + plane.distance;

        if distance_to_plane <= -rad_effective {
            return Intersect::OUTSIDE;
        } else if distance_to_plane >= rad_effective {
            return Intersect::INSIDE;
        }
        return Intersect::INTERSECTING;
    }
}

impl BoundingVolume for OrientedBoundingBox {
    fn intersect_plane(&self, plane: &Plane) -> Intersect {
        return OrientedBoundingBox::intersect_plane(self, plane);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rectangle_contains_its_corners() {
        let rectangle = Rectangle::from_degrees(-10.0, -10.0, 10.0, 10.0);
        let obb =
            OrientedBoundingBox::from_rectangle(&rectangle, Some(-100.0), Some(8000.0), None);
        for cartographic in [
            rectangle.southwest(),
            rectangle.northeast(),
            rectangle.center(),
        ] {
            for height in [-100.0, 8000.0] {
                let p = Ellipsoid::WGS84.cartographic_to_cartesian(&Cartographic::new(
                    cartographic.longitude,
                    cartographic.latitude,
                    height,
                ));
                assert!(
                    obb.distance_squared_to(&p) < 1.0,
                    "corner escaped the box: {:?}",
                    p
                );
            }
        }
    }

    #[test]
    fn distance_is_zero_inside_and_positive_outside() {
        let obb = OrientedBoundingBox {
            center: DVec3::ZERO,
            half_axes: DMat3::from_cols(DVec3::X, DVec3::Y, DVec3::Z),
        };
        assert_eq!(obb.distance_squared_to(&DVec3::new(0.5, 0.5, 0.5)), 0.0);
        let d = obb.distance_squared_to(&DVec3::new(3.0, 0.0, 0.0));
        assert!((d - 4.0).abs() < 1e-12);
    }

    #[test]
    fn plane_classification_uses_effective_radius() {
        let obb = OrientedBoundingBox {
            center: DVec3::ZERO,
            half_axes: DMat3::from_cols(DVec3::X, DVec3::Y, DVec3::Z),
        };
        let far_below = Plane::from_point_normal(DVec3::new(0.0, 0.0, -5.0), DVec3::Z);
        let far_above = Plane::from_point_normal(DVec3::new(0.0, 0.0, 5.0), DVec3::Z);
        let through = Plane::from_point_normal(DVec3::ZERO, DVec3::Z);
        assert_eq!(obb.intersect_plane(&far_below), Intersect::INSIDE);
        assert_eq!(obb.intersect_plane(&far_above), Intersect::OUTSIDE);
        assert_eq!(obb.intersect_plane(&through), Intersect::INTERSECTING);
    }
}
