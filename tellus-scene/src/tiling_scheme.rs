use crate::math::Cartographic;
use crate::{Ellipsoid, Rectangle};

/// How the surface of the body is cut into a pyramid of tiles.
pub trait TilingScheme: Send + Sync {
    fn get_ellipsoid(&self) -> &Ellipsoid;
    fn get_rectangle(&self) -> &Rectangle;
    fn get_number_of_x_tiles_at_level(&self, level: u32) -> u32;
    fn get_number_of_y_tiles_at_level(&self, level: u32) -> u32;
    fn tile_x_y_to_rectangle(&self, x: u32, y: u32, level: u32) -> Rectangle;
    fn position_to_tile_x_y(&self, position: &Cartographic, level: u32) -> Option<(u32, u32)>;
}
