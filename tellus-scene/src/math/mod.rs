mod cartesian3;
mod cartographic;
mod epsilon;

pub use cartesian3::*;
pub use cartographic::*;
pub use epsilon::*;

use std::f64::consts::PI;

pub const TWO_PI: f64 = PI * 2.0;
pub const PI_OVER_TWO: f64 = PI / 2.0;

pub fn lerp(p: f64, q: f64, time: f64) -> f64 {
    return (1.0 - time) * p + time * q;
}

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    return value.max(min).min(max);
}

/// Cesium-style combined relative/absolute comparison.
pub fn equals_epsilon(
    left: f64,
    right: f64,
    relative_epsilon: Option<f64>,
    absolute_epsilon: Option<f64>,
) -> bool {
    let relative_epsilon = relative_epsilon.unwrap_or(0.0);
    let absolute_epsilon = absolute_epsilon.unwrap_or(relative_epsilon);
    let abs_diff = (left - right).abs();
    return abs_diff <= absolute_epsilon
        || abs_diff <= relative_epsilon * left.abs().max(right.abs());
}

/// Remainder that always lands in [0, m), matching JavaScript's sign rules.
pub fn modulo(m: f64, n: f64) -> f64 {
    return ((m % n) + n) % n;
}

/// Wraps a longitude-like angle into [-PI, PI).
pub fn negative_pi_to_pi(angle: f64) -> f64 {
    if angle >= -PI && angle <= PI {
        return angle;
    }
    return zero_to_two_pi(angle + PI) - PI;
}

/// Wraps an angle into [0, 2 * PI).
pub fn zero_to_two_pi(angle: f64) -> f64 {
    if angle >= 0.0 && angle <= TWO_PI {
        return angle;
    }
    let mod_value = modulo(angle, TWO_PI);
    if mod_value.abs() < EPSILON14 && angle.abs() > EPSILON14 {
        return TWO_PI;
    }
    return mod_value;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equals_epsilon_relative_and_absolute() {
        assert!(equals_epsilon(1.0, 1.0, None, None));
        assert!(equals_epsilon(1.0, 1.0 + EPSILON7, Some(EPSILON6), None));
        assert!(!equals_epsilon(1.0, 2.0, Some(EPSILON6), None));
        assert!(equals_epsilon(3000000.0, 3000000.2, Some(EPSILON7), None));
    }

    #[test]
    fn wrapping() {
        assert!(equals_epsilon(
            negative_pi_to_pi(PI + 0.1),
            -PI + 0.1,
            Some(EPSILON10),
            None
        ));
        assert!(equals_epsilon(zero_to_two_pi(-0.5), TWO_PI - 0.5, Some(EPSILON10), None));
    }
}
