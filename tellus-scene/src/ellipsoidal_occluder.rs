use bevy::math::DVec3;

use crate::math::Cartesian3;
use crate::Ellipsoid;

/// Horizon culling against the ellipsoid itself.
/// See https://cesium.com/blog/2013/04/25/Horizon-culling/
#[derive(Clone, Debug)]
pub struct EllipsoidalOccluder {
    pub ellipsoid: Ellipsoid,
    pub camera_position: DVec3,
    pub camera_position_in_scaled_space: DVec3,
    pub distance_to_limb_in_scaled_space_squared: f64,
}

impl Default for EllipsoidalOccluder {
    fn default() -> Self {
        Self::new(&Ellipsoid::WGS84)
    }
}

impl EllipsoidalOccluder {
    pub fn new(ellipsoid: &Ellipsoid) -> Self {
        Self {
            ellipsoid: *ellipsoid,
            camera_position: DVec3::ZERO,
            camera_position_in_scaled_space: DVec3::ZERO,
            distance_to_limb_in_scaled_space_squared: 0.0,
        }
    }

    pub fn set_camera_position(&mut self, camera_position: DVec3) {
        let cv = self
            .ellipsoid
            .transform_position_to_scaled_space(camera_position);
        self.camera_position = camera_position;
        self.camera_position_in_scaled_space = cv;
        self.distance_to_limb_in_scaled_space_squared = cv.length_squared() - 1.0;
    }

    pub fn is_point_visible(&self, occludee: DVec3) -> bool {
        let scaled = self.ellipsoid.transform_position_to_scaled_space(occludee);
        return self.is_scaled_space_point_visible(scaled);
    }

    pub fn is_scaled_space_point_visible(&self, occludee_scaled_space_position: DVec3) -> bool {
        return is_scaled_space_point_visible(
            occludee_scaled_space_position,
            self.camera_position_in_scaled_space,
            self.distance_to_limb_in_scaled_space_squared,
        );
    }

    /// Like `is_scaled_space_point_visible`, but for culling points computed
    /// against an ellipsoid shrunk by `minimum_height` when the tile dips
    /// below the reference surface.
    pub fn is_scaled_space_point_visible_possibly_under_ellipsoid(
        &self,
        occludee_scaled_space_position: &DVec3,
        minimum_height: Option<f64>,
    ) -> bool {
        let ellipsoid = &self.ellipsoid;
        let cv;
        let vh_magnitude_squared;
        if let Some(minimum_height) = minimum_height {
            if minimum_height < 0.0 && ellipsoid.minimum_radius > -minimum_height {
                cv = DVec3::new(
                    self.camera_position.x / (ellipsoid.radii.x + minimum_height),
                    self.camera_position.y / (ellipsoid.radii.y + minimum_height),
                    self.camera_position.z / (ellipsoid.radii.z + minimum_height),
                );
                vh_magnitude_squared = cv.length_squared() - 1.0;
            } else {
                cv = self.camera_position_in_scaled_space;
                vh_magnitude_squared = self.distance_to_limb_in_scaled_space_squared;
            }
        } else {
            cv = self.camera_position_in_scaled_space;
            vh_magnitude_squared = self.distance_to_limb_in_scaled_space_squared;
        }
        return is_scaled_space_point_visible(
            *occludee_scaled_space_position,
            cv,
            vh_magnitude_squared,
        );
    }

    pub fn compute_horizon_culling_point(
        &self,
        direction_to_point: DVec3,
        positions: &[DVec3],
    ) -> Option<DVec3> {
        return compute_horizon_culling_point_from_positions(
            &self.ellipsoid,
            direction_to_point,
            positions,
        );
    }

    pub fn compute_horizon_culling_point_possibly_under_ellipsoid(
        &self,
        direction_to_point: DVec3,
        positions: &[DVec3],
        minimum_height: f64,
    ) -> Option<DVec3> {
        let possibly_shrunk =
            get_possibly_shrunk_ellipsoid(&self.ellipsoid, Some(minimum_height));
        return compute_horizon_culling_point_from_positions(
            &possibly_shrunk,
            direction_to_point,
            positions,
        );
    }
}

fn is_scaled_space_point_visible(
    occludee_scaled_space_position: DVec3,
    camera_position_in_scaled_space: DVec3,
    distance_to_limb_in_scaled_space_squared: f64,
) -> bool {
    let cv = camera_position_in_scaled_space;
    let vh_magnitude_squared = distance_to_limb_in_scaled_space_squared;
    let vt = occludee_scaled_space_position - cv;
    let vt_dot_vc = -vt.dot(cv);
    // A camera below the surface sees nothing past the local tangent plane.
    let is_occluded = if vh_magnitude_squared < 0.0 {
        vt_dot_vc > 0.0
    } else {
        vt_dot_vc > vh_magnitude_squared
            && (vt_dot_vc * vt_dot_vc) / vt.length_squared() > vh_magnitude_squared
    };
    return !is_occluded;
}

pub fn get_possibly_shrunk_ellipsoid(
    ellipsoid: &Ellipsoid,
    minimum_height: Option<f64>,
) -> Ellipsoid {
    if let Some(minimum_height) = minimum_height {
        if minimum_height < 0.0 && ellipsoid.minimum_radius > -minimum_height {
            return Ellipsoid::from_vec3(DVec3::new(
                ellipsoid.radii.x + minimum_height,
                ellipsoid.radii.y + minimum_height,
                ellipsoid.radii.z + minimum_height,
            ));
        }
    }
    return *ellipsoid;
}

pub fn compute_horizon_culling_point_from_positions(
    ellipsoid: &Ellipsoid,
    direction_to_point: DVec3,
    positions: &[DVec3],
) -> Option<DVec3> {
    if positions.is_empty() {
        return None;
    }
    let scaled_space_direction_to_point =
        compute_scaled_space_direction_to_point(ellipsoid, direction_to_point);
    let mut result_magnitude: f64 = 0.0;
    for position in positions {
        let candidate_magnitude =
            compute_magnitude(ellipsoid, *position, scaled_space_direction_to_point);
        if candidate_magnitude < 0.0 {
            // The point sits behind the horizon plane of some position; no
            // single culling point can represent this set.
            return None;
        }
        result_magnitude = result_magnitude.max(candidate_magnitude);
    }
    return magnitude_to_point(scaled_space_direction_to_point, result_magnitude);
}

fn compute_scaled_space_direction_to_point(
    ellipsoid: &Ellipsoid,
    direction_to_point: DVec3,
) -> DVec3 {
    if direction_to_point == DVec3::ZERO {
        return direction_to_point;
    }
    return ellipsoid
        .transform_position_to_scaled_space(direction_to_point)
        .normalize();
}

fn compute_magnitude(
    ellipsoid: &Ellipsoid,
    position: DVec3,
    scaled_space_direction_to_point: DVec3,
) -> f64 {
    let scaled_space_position = ellipsoid.transform_position_to_scaled_space(position);
    let mut magnitude_squared = scaled_space_position.length_squared();
    let mut magnitude = magnitude_squared.sqrt();
    let direction = scaled_space_position / magnitude;

    // Points below the ellipsoid are treated as being on it.
    magnitude_squared = magnitude_squared.max(1.0);
    magnitude = magnitude.max(1.0);

    let cos_alpha = direction.dot(scaled_space_direction_to_point);
    let sin_alpha = direction.cross(scaled_space_direction_to_point).length();
    let cos_beta = 1.0 / magnitude;
    let sin_beta = (magnitude_squared - 1.0).sqrt() * cos_beta;

    return 1.0 / (cos_alpha * cos_beta - sin_alpha * sin_beta);
}

fn magnitude_to_point(
    scaled_space_direction_to_point: DVec3,
    result_magnitude: f64,
) -> Option<DVec3> {
    if result_magnitude <= 0.0 || !result_magnitude.is_finite() {
        return None;
    }
    return Some(scaled_space_direction_to_point.multiply_by_scalar(result_magnitude));
}
