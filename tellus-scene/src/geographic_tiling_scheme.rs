use crate::math::Cartographic;
use crate::{Ellipsoid, Rectangle, TilingScheme};

/// The classic 2x1 equirectangular pyramid: two root tiles covering the whole
/// globe, each level doubling resolution in both directions.
#[derive(Clone, Debug)]
pub struct GeographicTilingScheme {
    pub ellipsoid: Ellipsoid,
    pub rectangle: Rectangle,
    pub number_of_level_zero_tiles_x: u32,
    pub number_of_level_zero_tiles_y: u32,
}

impl Default for GeographicTilingScheme {
    fn default() -> Self {
        Self {
            ellipsoid: Ellipsoid::WGS84,
            rectangle: Rectangle::MAX_VALUE,
            number_of_level_zero_tiles_x: 2,
            number_of_level_zero_tiles_y: 1,
        }
    }
}

impl TilingScheme for GeographicTilingScheme {
    fn get_ellipsoid(&self) -> &Ellipsoid {
        return &self.ellipsoid;
    }

    fn get_rectangle(&self) -> &Rectangle {
        return &self.rectangle;
    }

    fn get_number_of_x_tiles_at_level(&self, level: u32) -> u32 {
        return self.number_of_level_zero_tiles_x << level;
    }

    fn get_number_of_y_tiles_at_level(&self, level: u32) -> u32 {
        return self.number_of_level_zero_tiles_y << level;
    }

    fn tile_x_y_to_rectangle(&self, x: u32, y: u32, level: u32) -> Rectangle {
        let rectangle = &self.rectangle;
        let x_tiles = self.get_number_of_x_tiles_at_level(level) as f64;
        let y_tiles = self.get_number_of_y_tiles_at_level(level) as f64;

        let x_tile_width = rectangle.compute_width() / x_tiles;
        let west = rectangle.west + x as f64 * x_tile_width;
        let east = rectangle.west + (x + 1) as f64 * x_tile_width;

        let y_tile_height = rectangle.compute_height() / y_tiles;
        let north = rectangle.north - y as f64 * y_tile_height;
        let south = rectangle.north - (y + 1) as f64 * y_tile_height;

        return Rectangle::new(west, south, east, north);
    }

    fn position_to_tile_x_y(&self, position: &Cartographic, level: u32) -> Option<(u32, u32)> {
        let rectangle = &self.rectangle;
        if !rectangle.contains(position) {
            return None;
        }

        let x_tiles = self.get_number_of_x_tiles_at_level(level);
        let y_tiles = self.get_number_of_y_tiles_at_level(level);

        let x_tile_width = rectangle.compute_width() / x_tiles as f64;
        let y_tile_height = rectangle.compute_height() / y_tiles as f64;

        let mut x_tile_coordinate =
            ((position.longitude - rectangle.west) / x_tile_width) as i64;
        if x_tile_coordinate >= x_tiles as i64 {
            x_tile_coordinate = x_tiles as i64 - 1;
        }
        let mut y_tile_coordinate =
            ((rectangle.north - position.latitude) / y_tile_height) as i64;
        if y_tile_coordinate >= y_tiles as i64 {
            y_tile_coordinate = y_tiles as i64 - 1;
        }
        return Some((x_tile_coordinate as u32, y_tile_coordinate as u32));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::EPSILON14;

    #[test]
    fn level_zero_is_two_by_one() {
        let scheme = GeographicTilingScheme::default();
        assert_eq!(scheme.get_number_of_x_tiles_at_level(0), 2);
        assert_eq!(scheme.get_number_of_y_tiles_at_level(0), 1);
        assert_eq!(scheme.get_number_of_x_tiles_at_level(3), 16);
    }

    #[test]
    fn tile_rectangles_tile_the_globe() {
        let scheme = GeographicTilingScheme::default();
        let west_root = scheme.tile_x_y_to_rectangle(0, 0, 0);
        let east_root = scheme.tile_x_y_to_rectangle(1, 0, 0);
        assert!((west_root.east - east_root.west).abs() < EPSILON14);
        assert!((west_root.west - scheme.rectangle.west).abs() < EPSILON14);
        assert!((east_root.east - scheme.rectangle.east).abs() < EPSILON14);
    }

    #[test]
    fn position_lookup_matches_rectangle() {
        let scheme = GeographicTilingScheme::default();
        let position = Cartographic::from_degrees(12.3, 45.6, 0.0);
        let (x, y) = scheme.position_to_tile_x_y(&position, 5).unwrap();
        let rectangle = scheme.tile_x_y_to_rectangle(x, y, 5);
        assert!(rectangle.contains(&position));
    }
}
