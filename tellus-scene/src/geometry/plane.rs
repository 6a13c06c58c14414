use bevy::math::{DVec3, DVec4};

/// A plane in Hessian normal form: `normal . p + distance = 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: DVec3,
    pub distance: f64,
}

impl Plane {
    pub fn new(normal: DVec3, distance: f64) -> Self {
        Self { normal, distance }
    }

    pub fn from_point_normal(point: DVec3, normal: DVec3) -> Self {
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    pub fn from_vec4(coefficients: DVec4) -> Self {
        Self {
            normal: DVec3::new(coefficients.x, coefficients.y, coefficients.z),
            distance: coefficients.w,
        }
    }

    pub fn get_point_distance(&self, point: DVec3) -> f64 {
        return self.normal.dot(point) + self.distance;
    }
}

/// Intersection parameter of a ray with a plane, if the ray is not parallel
/// to it.
pub fn ray_plane(origin: DVec3, direction: DVec3, plane: &Plane) -> Option<DVec3> {
    let denominator = plane.normal.dot(direction);
    if denominator.abs() < crate::math::EPSILON15 {
        return None;
    }
    let t = (-plane.distance - plane.normal.dot(origin)) / denominator;
    if t < 0.0 {
        return None;
    }
    return Some(origin + direction * t);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_distance_is_signed() {
        let plane = Plane::from_point_normal(DVec3::new(0.0, 0.0, 5.0), DVec3::Z);
        assert!((plane.get_point_distance(DVec3::new(0.0, 0.0, 7.0)) - 2.0).abs() < 1e-12);
        assert!((plane.get_point_distance(DVec3::new(0.0, 0.0, 2.0)) + 3.0).abs() < 1e-12);
    }

    #[test]
    fn ray_plane_hits_in_front_only() {
        let plane = Plane::from_point_normal(DVec3::new(0.0, 0.0, 1.0), DVec3::Z);
        let hit = ray_plane(DVec3::ZERO, DVec3::Z, &plane).unwrap();
        assert!((hit.z - 1.0).abs() < 1e-12);
        assert!(ray_plane(DVec3::ZERO, -DVec3::Z, &plane).is_none());
    }
}
