use bevy::math::{DVec3, DVec4};

use crate::{BoundingVolume, Intersect, Plane};

/// The volume enclosed by the camera frustum, as a set of inward-facing
/// planes. Anything entirely on the negative side of one plane is invisible.
#[derive(Default, Clone, Debug)]
pub struct CullingVolume {
    pub planes: Vec<DVec4>,
}

impl CullingVolume {
    pub fn new(planes: Option<Vec<DVec4>>) -> Self {
        Self {
            planes: planes.unwrap_or_default(),
        }
    }

    /// Builds the six planes of a symmetric perspective frustum. `direction`
    /// and `up` need not be normalized.
    pub fn from_perspective(
        position: DVec3,
        direction: DVec3,
        up: DVec3,
        fovy: f64,
        aspect_ratio: f64,
        near: f64,
        far: f64,
    ) -> Self {
        let direction = direction.normalize();
        let right = direction.cross(up).normalize();
        let up = right.cross(direction);

        let half_height = (fovy * 0.5).tan() * near;
        let half_width = half_height * aspect_ratio;

        let near_center = direction * near;
        let to_left = (near_center - right * half_width).normalize();
        let to_right = (near_center + right * half_width).normalize();
        let to_bottom = (near_center - up * half_height).normalize();
        let to_top = (near_center + up * half_height).normalize();

        let left_normal = to_left.cross(up);
        let right_normal = up.cross(to_right);
        let bottom_normal = right.cross(to_bottom);
        let top_normal = to_top.cross(right);

        let mut planes = Vec::with_capacity(6);
        for normal in [left_normal, right_normal, bottom_normal, top_normal] {
            planes.push(plane_coefficients(normal, position));
        }
        planes.push(plane_coefficients(direction, position + direction * near));
        planes.push(plane_coefficients(-direction, position + direction * far));
        return Self { planes };
    }

    pub fn compute_visibility(&self, bounding_volume: &dyn BoundingVolume) -> Intersect {
        if self.planes.is_empty() {
            return Intersect::INSIDE;
        }
        let mut intersecting = false;
        for coefficients in self.planes.iter() {
            let plane = Plane::from_vec4(*coefficients);
            match bounding_volume.intersect_plane(&plane) {
                Intersect::OUTSIDE => return Intersect::OUTSIDE,
                Intersect::INTERSECTING => intersecting = true,
                Intersect::INSIDE => {}
            }
        }
        if intersecting {
            return Intersect::INTERSECTING;
        }
        return Intersect::INSIDE;
    }
}

fn plane_coefficients(normal: DVec3, point: DVec3) -> DVec4 {
    let normal = normal.normalize();
    return DVec4::new(normal.x, normal.y, normal.z, -normal.dot(point));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoundingSphere;
    use std::f64::consts::FRAC_PI_3;

    fn looking_down_x() -> CullingVolume {
        CullingVolume::from_perspective(
            DVec3::ZERO,
            DVec3::X,
            DVec3::Z,
            FRAC_PI_3,
            1.0,
            1.0,
            10000.0,
        )
    }

    #[test]
    fn sphere_ahead_is_inside() {
        let volume = looking_down_x();
        let sphere = BoundingSphere::new(DVec3::new(100.0, 0.0, 0.0), 1.0);
        assert_eq!(volume.compute_visibility(&sphere), Intersect::INSIDE);
    }

    #[test]
    fn sphere_behind_is_outside() {
        let volume = looking_down_x();
        let sphere = BoundingSphere::new(DVec3::new(-100.0, 0.0, 0.0), 1.0);
        assert_eq!(volume.compute_visibility(&sphere), Intersect::OUTSIDE);
    }

    #[test]
    fn sphere_straddling_a_side_plane_intersects() {
        let volume = looking_down_x();
        // At x=100 with fov 60deg/aspect 1, the side planes sit at |y| ~ 57.7.
        let sphere = BoundingSphere::new(DVec3::new(100.0, 57.7, 0.0), 5.0);
        assert_eq!(volume.compute_visibility(&sphere), Intersect::INTERSECTING);
    }

    #[test]
    fn empty_volume_culls_nothing() {
        let volume = CullingVolume::new(None);
        let sphere = BoundingSphere::new(DVec3::new(-100.0, 0.0, 0.0), 1.0);
        assert_eq!(volume.compute_visibility(&sphere), Intersect::INSIDE);
    }
}
