use bevy::math::DVec3;

use crate::{BoundingVolume, Intersect, Plane};

use super::OrientedBoundingBox;

#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}

impl BoundingSphere {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Centroid-based bounding sphere. Not minimal, but always enclosing,
    /// which is all culling needs.
    pub fn from_points(positions: &[DVec3]) -> Self {
        if positions.is_empty() {
            return Self::default();
        }
        let mut center = DVec3::ZERO;
        for p in positions {
            center += *p;
        }
        center /= positions.len() as f64;
        let mut radius_squared: f64 = 0.0;
        for p in positions {
            radius_squared = radius_squared.max(center.distance_squared(*p));
        }
        return Self {
            center,
            radius: radius_squared.sqrt(),
        };
    }

    pub fn from_oriented_bounding_box(box3d: &OrientedBoundingBox) -> Self {
        let u = box3d.half_axes.x_axis;
        let v = box3d.half_axes.y_axis;
        let w = box3d.half_axes.z_axis;
        return Self {
            center: box3d.center,
            radius: (u + v + w).length(),
        };
    }

    pub fn intersect_plane(&self, plane: &Plane) -> Intersect {
        let distance_to_plane = plane.normal.dot(self.center) + plane.distance;
        if distance_to_plane < -self.radius {
            return Intersect::OUTSIDE;
        } else if distance_to_plane < self.radius {
            return Intersect::INTERSECTING;
        }
        return Intersect::INSIDE;
    }

    pub fn distance_squared_to(&self, point: &DVec3) -> f64 {
        let distance = (self.center.distance(*point) - self.radius).max(0.0);
        return distance * distance;
    }
}

impl BoundingVolume for BoundingSphere {
    fn intersect_plane(&self, plane: &Plane) -> Intersect {
        return BoundingSphere::intersect_plane(self, plane);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_points_encloses_every_input() {
        let points = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(10.0, 0.0, 0.0),
            DVec3::new(0.0, 4.0, -3.0),
        ];
        let sphere = BoundingSphere::from_points(&points);
        for p in &points {
            assert!(sphere.center.distance(*p) <= sphere.radius + 1e-12);
        }
    }

    #[test]
    fn plane_classification() {
        let sphere = BoundingSphere::new(DVec3::ZERO, 1.0);
        let above = Plane::from_point_normal(DVec3::new(0.0, 0.0, -5.0), DVec3::Z);
        let below = Plane::from_point_normal(DVec3::new(0.0, 0.0, 5.0), DVec3::Z);
        let through = Plane::from_point_normal(DVec3::ZERO, DVec3::Z);
        assert_eq!(sphere.intersect_plane(&above), Intersect::INSIDE);
        assert_eq!(sphere.intersect_plane(&below), Intersect::OUTSIDE);
        assert_eq!(sphere.intersect_plane(&through), Intersect::INTERSECTING);
    }
}
