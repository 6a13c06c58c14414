use bevy::math::{DMat4, DVec2, DVec3, DVec4};

use crate::math::EPSILON9;
use crate::{
    compress_texture_coordinates, decompress_texture_coordinates, oct_pack_float,
    oct_unpack_float, AxisAlignedBoundingBox, Ellipsoid,
};

const SHIFT_LEFT_12: f64 = 4096.0;

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerrainQuantization {
    #[default]
    NONE,
    BITS12,
}

/// Describes how a terrain mesh's vertices are packed into its f32 buffer:
/// either relative-to-center floats or 12-bit quantized scaled-ENU
/// coordinates, plus the optional web-mercator-T and oct-normal channels.
#[derive(Default, Clone, Copy, Debug)]
pub struct TerrainEncoding {
    pub quantization: TerrainQuantization,
    pub minimum_height: f64,
    pub maximum_height: f64,
    pub center: DVec3,
    pub to_scaled_enu: DMat4,
    pub from_scaled_enu: DMat4,
    /// Scale-and-bias matrix handed to the vertex shader to undo the
    /// quantization.
    pub matrix: DMat4,
    pub has_vertex_normals: bool,
    pub has_web_mercator_t: bool,
    pub stride: u32,
    offset_web_mercator_t: u32,
    offset_vertex_normal: u32,
}

/// East-north-up frame at `origin`, as a rigid transform into world space.
pub fn east_north_up_to_fixed_frame(origin: DVec3, ellipsoid: &Ellipsoid) -> DMat4 {
    let up = ellipsoid.geodetic_surface_normal(origin);
    let mut east = DVec3::Z.cross(up);
    if east.length_squared() < EPSILON9 {
        east = DVec3::X;
    }
    east = east.normalize();
    let north = up.cross(east);
    return DMat4::from_cols(
        DVec4::new(east.x, east.y, east.z, 0.0),
        DVec4::new(north.x, north.y, north.z, 0.0),
        DVec4::new(up.x, up.y, up.z, 0.0),
        DVec4::new(origin.x, origin.y, origin.z, 1.0),
    );
}

impl TerrainEncoding {
    pub fn new(
        center: DVec3,
        axis_aligned_bounding_box: Option<AxisAlignedBoundingBox>,
        minimum_height: Option<f64>,
        maximum_height: Option<f64>,
        from_enu: Option<DMat4>,
        has_vertex_normals: bool,
        has_web_mercator_t: Option<bool>,
    ) -> Self {
        let mut quantization = TerrainQuantization::NONE;
        let mut to_scaled_enu = DMat4::IDENTITY;
        let mut from_scaled_enu = DMat4::IDENTITY;
        let mut matrix = DMat4::IDENTITY;
        let minimum_height = minimum_height.unwrap_or(0.0);
        let maximum_height = maximum_height.unwrap_or(0.0);

        if let (Some(aabb), Some(from_enu)) = (axis_aligned_bounding_box, from_enu) {
            let dimensions = (aabb.maximum - aabb.minimum).max(DVec3::splat(EPSILON9));
            let h_dim = maximum_height - minimum_height;
            let max_dim = dimensions.max_element().max(h_dim);
            if max_dim < SHIFT_LEFT_12 - 1.0 {
                quantization = TerrainQuantization::BITS12;
            }

            to_scaled_enu = from_enu.inverse();
            to_scaled_enu = DMat4::from_translation(-aabb.minimum) * to_scaled_enu;
            to_scaled_enu = DMat4::from_scale(DVec3::new(
                1.0 / dimensions.x,
                1.0 / dimensions.y,
                1.0 / dimensions.z,
            )) * to_scaled_enu;

            let mut rotation = from_enu;
            rotation.w_axis = DVec4::new(0.0, 0.0, 0.0, 1.0);

            let st = DMat4::from_translation(aabb.minimum) * DMat4::from_scale(dimensions);
            from_scaled_enu = from_enu * st;
            matrix = rotation * st;
        }

        let mut encoding = Self {
            quantization,
            minimum_height,
            maximum_height,
            center,
            to_scaled_enu,
            from_scaled_enu,
            matrix,
            has_vertex_normals,
            has_web_mercator_t: has_web_mercator_t.unwrap_or(false),
            stride: 0,
            offset_web_mercator_t: 0,
            offset_vertex_normal: 0,
        };
        encoding.calculate_stride_and_offsets();
        return encoding;
    }

    fn calculate_stride_and_offsets(&mut self) {
        let mut vertex_stride = match self.quantization {
            TerrainQuantization::BITS12 => 3,
            TerrainQuantization::NONE => 6,
        };
        if self.has_web_mercator_t {
            self.offset_web_mercator_t = vertex_stride;
            vertex_stride += 1;
        }
        if self.has_vertex_normals {
            self.offset_vertex_normal = vertex_stride;
            vertex_stride += 1;
        }
        self.stride = vertex_stride;
    }

    /// Appends one vertex to the buffer in this encoding's layout.
    pub fn encode(
        &self,
        vertex_buffer: &mut Vec<f32>,
        position: DVec3,
        uv: DVec2,
        height: f64,
        normal_to_pack: Option<DVec2>,
        web_mercator_t: Option<f64>,
    ) {
        if self.quantization == TerrainQuantization::BITS12 {
            let scaled = self.to_scaled_enu.transform_point3(position);
            let scaled = scaled.clamp(DVec3::ZERO, DVec3::ONE);

            let h_dim = (self.maximum_height - self.minimum_height).max(EPSILON9);
            let h = ((height - self.minimum_height) / h_dim).clamp(0.0, 1.0);

            vertex_buffer
                .push(compress_texture_coordinates(&DVec2::new(scaled.x, scaled.y)) as f32);
            vertex_buffer.push(compress_texture_coordinates(&DVec2::new(scaled.z, h)) as f32);
            vertex_buffer.push(compress_texture_coordinates(&uv) as f32);
            if self.has_web_mercator_t {
                vertex_buffer.push(compress_texture_coordinates(&DVec2::new(
                    web_mercator_t.unwrap_or(0.0),
                    0.0,
                )) as f32);
            }
        } else {
            let relative = position - self.center;
            vertex_buffer.push(relative.x as f32);
            vertex_buffer.push(relative.y as f32);
            vertex_buffer.push(relative.z as f32);
            vertex_buffer.push(height as f32);
            vertex_buffer.push(uv.x as f32);
            vertex_buffer.push(uv.y as f32);
            if self.has_web_mercator_t {
                vertex_buffer.push(web_mercator_t.unwrap_or(0.0) as f32);
            }
        }

        if self.has_vertex_normals {
            vertex_buffer.push(oct_pack_float(&normal_to_pack.unwrap_or(DVec2::ZERO)) as f32);
        }
    }

    pub fn decode_position(&self, buffer: &[f32], index: usize) -> DVec3 {
        let index = index * self.stride as usize;
        if self.quantization == TerrainQuantization::BITS12 {
            let xy = decompress_texture_coordinates(buffer[index] as f64);
            let zh = decompress_texture_coordinates(buffer[index + 1] as f64);
            let scaled = DVec3::new(xy.x, xy.y, zh.x);
            return self.from_scaled_enu.transform_point3(scaled);
        }
        return DVec3::new(
            buffer[index] as f64,
            buffer[index + 1] as f64,
            buffer[index + 2] as f64,
        ) + self.center;
    }

    pub fn decode_texture_coordinates(&self, buffer: &[f32], index: usize) -> DVec2 {
        let index = index * self.stride as usize;
        if self.quantization == TerrainQuantization::BITS12 {
            return decompress_texture_coordinates(buffer[index + 2] as f64);
        }
        return DVec2::new(buffer[index + 4] as f64, buffer[index + 5] as f64);
    }

    pub fn decode_height(&self, buffer: &[f32], index: usize) -> f64 {
        let index = index * self.stride as usize;
        if self.quantization == TerrainQuantization::BITS12 {
            let zh = decompress_texture_coordinates(buffer[index + 1] as f64);
            return zh.y * (self.maximum_height - self.minimum_height) + self.minimum_height;
        }
        return buffer[index + 3] as f64;
    }

    pub fn decode_web_mercator_t(&self, buffer: &[f32], index: usize) -> f64 {
        let index = index * self.stride as usize;
        if self.quantization == TerrainQuantization::BITS12 {
            return decompress_texture_coordinates(
                buffer[index + self.offset_web_mercator_t as usize] as f64,
            )
            .x;
        }
        return buffer[index + self.offset_web_mercator_t as usize] as f64;
    }

    pub fn get_oct_encoded_normal(&self, buffer: &[f32], index: usize) -> DVec2 {
        let index = index * self.stride as usize + self.offset_vertex_normal as usize;
        return oct_unpack_float(buffer[index] as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Cartesian3, Cartographic};
    use crate::Rectangle;

    fn sample_positions() -> (Vec<DVec3>, DVec3) {
        let rectangle = Rectangle::from_degrees(10.0, 10.0, 10.01, 10.01);
        let ellipsoid = Ellipsoid::WGS84;
        let mut positions = vec![];
        for (lon, lat, h) in [
            (rectangle.west, rectangle.south, 0.0),
            (rectangle.east, rectangle.south, 55.0),
            (rectangle.west, rectangle.north, 110.0),
            (rectangle.east, rectangle.north, 200.0),
        ] {
            positions
                .push(ellipsoid.cartographic_to_cartesian(&Cartographic::new(lon, lat, h)));
        }
        let center = positions.iter().copied().sum::<DVec3>() / positions.len() as f64;
        return (positions, center);
    }

    #[test]
    fn small_extents_choose_bits12() {
        let (positions, center) = sample_positions();
        let from_enu = east_north_up_to_fixed_frame(center, &Ellipsoid::WGS84);
        let local: Vec<DVec3> = positions
            .iter()
            .map(|p| from_enu.inverse().transform_point3(*p))
            .collect();
        let aabb = AxisAlignedBoundingBox::from_points(&local);
        let encoding = TerrainEncoding::new(
            center,
            Some(aabb),
            Some(0.0),
            Some(200.0),
            Some(from_enu),
            false,
            Some(false),
        );
        assert_eq!(encoding.quantization, TerrainQuantization::BITS12);
        assert_eq!(encoding.stride, 3);
    }

    #[test]
    fn quantized_positions_round_trip_within_tolerance() {
        let (positions, center) = sample_positions();
        let from_enu = east_north_up_to_fixed_frame(center, &Ellipsoid::WGS84);
        let to_enu = from_enu.inverse();
        let local: Vec<DVec3> = positions.iter().map(|p| to_enu.transform_point3(*p)).collect();
        let aabb = AxisAlignedBoundingBox::from_points(&local);
        let encoding = TerrainEncoding::new(
            center,
            Some(aabb),
            Some(0.0),
            Some(200.0),
            Some(from_enu),
            false,
            Some(false),
        );

        let mut buffer: Vec<f32> = vec![];
        for (i, p) in positions.iter().enumerate() {
            let height = [0.0, 55.0, 110.0, 200.0][i];
            encoding.encode(&mut buffer, *p, DVec2::new(0.5, 0.5), height, None, None);
        }
        assert_eq!(buffer.len(), positions.len() * encoding.stride as usize);
        for (i, p) in positions.iter().enumerate() {
            let decoded = encoding.decode_position(&buffer, i);
            // The tile spans ~1km, quantized to 12 bits per axis.
            assert!(decoded.equals_epsilon(*p, None, Some(2.0)), "{:?}", decoded);
            let height = [0.0, 55.0, 110.0, 200.0][i];
            assert!((encoding.decode_height(&buffer, i) - height).abs() < 0.1);
        }
    }

    #[test]
    fn unquantized_encoding_is_relative_to_center() {
        let (positions, center) = sample_positions();
        let encoding =
            TerrainEncoding::new(center, None, Some(0.0), Some(200.0), None, false, Some(true));
        assert_eq!(encoding.quantization, TerrainQuantization::NONE);
        assert_eq!(encoding.stride, 7);

        let mut buffer: Vec<f32> = vec![];
        encoding.encode(
            &mut buffer,
            positions[0],
            DVec2::new(0.0, 1.0),
            0.0,
            None,
            Some(0.25),
        );
        let decoded = encoding.decode_position(&buffer, 0);
        assert!(decoded.equals_epsilon(positions[0], None, Some(1.0)));
        let uv = encoding.decode_texture_coordinates(&buffer, 0);
        assert_eq!(uv, DVec2::new(0.0, 1.0));
        assert!((encoding.decode_web_mercator_t(&buffer, 0) - 0.25).abs() < 1e-6);
    }
}
