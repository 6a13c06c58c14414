use bevy::math::DVec3;

/// Cesium-flavored helpers on top of bevy's f64 vector.
pub trait Cartesian3 {
    fn from_radians(
        longitude: f64,
        latitude: f64,
        height: Option<f64>,
        radii_squared: Option<DVec3>,
    ) -> DVec3;
    fn from_degrees(
        longitude: f64,
        latitude: f64,
        height: Option<f64>,
        radii_squared: Option<DVec3>,
    ) -> DVec3;
    fn equals_epsilon(
        &self,
        right: DVec3,
        relative_epsilon: Option<f64>,
        absolute_epsilon: Option<f64>,
    ) -> bool;
    fn midpoint(&self, right: DVec3) -> DVec3;
    fn magnitude(&self) -> f64;
    fn magnitude_squared(&self) -> f64;
    fn multiply_by_scalar(&self, scalar: f64) -> DVec3;
    fn divide_by_scalar(&self, scalar: f64) -> DVec3;
    fn subtract(self, right: DVec3) -> DVec3;
    fn negate(&self) -> DVec3;
    fn maximum_component(&self) -> f64;
}

impl Cartesian3 for DVec3 {
    fn from_radians(
        longitude: f64,
        latitude: f64,
        height: Option<f64>,
        radii_squared: Option<DVec3>,
    ) -> DVec3 {
        let height = height.unwrap_or(0.0);
        let radii_squared = radii_squared.unwrap_or(DVec3::new(
            40680631590769.0,
            40680631590769.0,
            40408299984661.445,
        ));
        let cos_latitude = latitude.cos();
        let n = DVec3::new(
            cos_latitude * longitude.cos(),
            cos_latitude * longitude.sin(),
            latitude.sin(),
        );
        let mut k = radii_squared * n;
        let gamma = n.dot(k).sqrt();
        k = k / gamma;
        return k + n * height;
    }

    fn from_degrees(
        longitude: f64,
        latitude: f64,
        height: Option<f64>,
        radii_squared: Option<DVec3>,
    ) -> DVec3 {
        return DVec3::from_radians(
            longitude.to_radians(),
            latitude.to_radians(),
            height,
            radii_squared,
        );
    }

    fn equals_epsilon(
        &self,
        right: DVec3,
        relative_epsilon: Option<f64>,
        absolute_epsilon: Option<f64>,
    ) -> bool {
        return crate::math::equals_epsilon(self.x, right.x, relative_epsilon, absolute_epsilon)
            && crate::math::equals_epsilon(self.y, right.y, relative_epsilon, absolute_epsilon)
            && crate::math::equals_epsilon(self.z, right.z, relative_epsilon, absolute_epsilon);
    }

    fn midpoint(&self, right: DVec3) -> DVec3 {
        return (*self + right) * 0.5;
    }

    fn magnitude(&self) -> f64 {
        return self.length();
    }

    fn magnitude_squared(&self) -> f64 {
        return self.length_squared();
    }

    fn multiply_by_scalar(&self, scalar: f64) -> DVec3 {
        return *self * scalar;
    }

    fn divide_by_scalar(&self, scalar: f64) -> DVec3 {
        return *self / scalar;
    }

    fn subtract(self, right: DVec3) -> DVec3 {
        return self - right;
    }

    fn negate(&self) -> DVec3 {
        return -*self;
    }

    fn maximum_component(&self) -> f64 {
        return self.x.max(self.y).max(self.z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::EPSILON9;

    #[test]
    fn from_radians_lands_on_the_ellipsoid_surface() {
        let p = DVec3::from_radians(0.0, 0.0, None, None);
        assert!(p.equals_epsilon(DVec3::new(6378137.0, 0.0, 0.0), Some(EPSILON9), None));

        let q = DVec3::from_degrees(90.0, 0.0, None, None);
        assert!(q.equals_epsilon(DVec3::new(0.0, 6378137.0, 0.0), Some(EPSILON9), Some(1e-6)));
    }

    #[test]
    fn from_radians_applies_height_along_the_normal() {
        let p = DVec3::from_radians(0.0, 0.0, Some(100.0), None);
        assert!(p.equals_epsilon(
            DVec3::new(6378237.0, 0.0, 0.0),
            Some(EPSILON9),
            Some(1e-6)
        ));
    }
}
