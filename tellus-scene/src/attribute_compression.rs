use bevy::math::{DVec2, DVec3};

use crate::math::clamp;

/// Packs two [0, 1] texture coordinates into the integer part of one f64,
/// 12 bits each, so they survive a trip through an f32 vertex attribute.
pub fn compress_texture_coordinates(texture_coordinates: &DVec2) -> f64 {
    let x = (texture_coordinates.x * 4095.0).trunc();
    let y = (texture_coordinates.y * 4095.0).trunc();
    return 4096.0 * x + y;
}

pub fn decompress_texture_coordinates(compressed: f64) -> DVec2 {
    let temp = compressed / 4096.0;
    let x_zero_to_4095 = temp.floor();
    let x = x_zero_to_4095 / 4095.0;
    let y = (compressed - x_zero_to_4095 * 4096.0) / 4095.0;
    return DVec2::new(x, y);
}

fn sign_not_zero(value: f64) -> f64 {
    if value < 0.0 {
        return -1.0;
    }
    return 1.0;
}

fn to_snorm(value: f64, range_maximum: f64) -> f64 {
    return ((clamp(value, -1.0, 1.0) * 0.5 + 0.5) * range_maximum).round();
}

fn from_snorm(value: f64, range_maximum: f64) -> f64 {
    return (clamp(value, 0.0, range_maximum) / range_maximum) * 2.0 - 1.0;
}

/// Octahedral encoding of a unit vector into two [0, 255] components.
pub fn oct_encode(vector: &DVec3) -> DVec2 {
    let range_maximum = 255.0;
    let l1_norm = vector.x.abs() + vector.y.abs() + vector.z.abs();
    let mut x = vector.x / l1_norm;
    let mut y = vector.y / l1_norm;
    if vector.z < 0.0 {
        let old_x = x;
        let old_y = y;
        x = (1.0 - old_y.abs()) * sign_not_zero(old_x);
        y = (1.0 - old_x.abs()) * sign_not_zero(old_y);
    }
    return DVec2::new(to_snorm(x, range_maximum), to_snorm(y, range_maximum));
}

pub fn oct_decode(encoded: &DVec2) -> DVec3 {
    let range_maximum = 255.0;
    let mut x = from_snorm(encoded.x, range_maximum);
    let mut y = from_snorm(encoded.y, range_maximum);
    let z = 1.0 - (x.abs() + y.abs());
    if z < 0.0 {
        let old_x = x;
        x = (1.0 - y.abs()) * sign_not_zero(old_x);
        y = (1.0 - old_x.abs()) * sign_not_zero(y);
    }
    return DVec3::new(x, y, z).normalize();
}

/// Packs an oct-encoded normal into a single float: 256 * x + y.
pub fn oct_pack_float(encoded: &DVec2) -> f64 {
    return 256.0 * encoded.x + encoded.y;
}

pub fn oct_unpack_float(packed: f64) -> DVec2 {
    let temp = packed / 256.0;
    let x = temp.floor();
    let y = temp * 256.0 - x * 256.0;
    return DVec2::new(x, y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Cartesian3;

    #[test]
    fn texture_coordinate_ones_round_trip_exactly() {
        let coords = DVec2::new(1.0, 1.0);
        let compressed = compress_texture_coordinates(&coords);
        let decompressed = decompress_texture_coordinates(compressed);
        assert!(decompressed == coords);
    }

    #[test]
    fn texture_coordinates_round_trip_within_quantization() {
        for coords in [
            DVec2::new(0.5, 1.0),
            DVec2::new(1.0, 0.5),
            DVec2::new(0.99999999999999, 0.99999999999999),
            DVec2::new(0.25, 0.75),
        ] {
            let compressed = compress_texture_coordinates(&coords);
            let decompressed = decompress_texture_coordinates(compressed);
            assert!((decompressed.x - coords.x).abs() <= 1.0 / 4095.0);
            assert!((decompressed.y - coords.y).abs() <= 1.0 / 4095.0);
        }
    }

    #[test]
    fn oct_encoding_round_trips_within_8_bits() {
        for v in [
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(0.0, 0.0, -1.0),
            DVec3::new(1.0, 2.0, 3.0).normalize(),
            DVec3::new(-1.0, 0.5, -0.25).normalize(),
        ] {
            let encoded = oct_encode(&v);
            let unpacked = oct_unpack_float(oct_pack_float(&encoded));
            let decoded = oct_decode(&unpacked);
            assert!(decoded.equals_epsilon(v, None, Some(0.02)), "{:?} -> {:?}", v, decoded);
        }
    }

    #[test]
    fn oct_encoding_round_trips_random_unit_vectors() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(1347);
        for _ in 0..1000 {
            let v = DVec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            if v.length_squared() < 1.0e-3 {
                continue;
            }
            let v = v.normalize();
            let encoded = oct_encode(&v);
            let unpacked = oct_unpack_float(oct_pack_float(&encoded));
            let decoded = oct_decode(&unpacked);
            assert!(decoded.equals_epsilon(v, None, Some(0.02)), "{:?} -> {:?}", v, decoded);
        }
    }
}
