use bevy::math::DVec4;
use tellus_scene::{
    GeographicTilingScheme, Rectangle, TerrainProvider, TilingScheme, WebMercatorProjection,
};

use super::imagery_storage::{ImageryKey, ImageryState, ImageryStorage};
use super::quadtree_tile::QuadtreeTile;
use super::tile_key::TileKey;
use super::vertex_array::{GpuResourceHub, TextureId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageryLayerId(pub u32);

/// Which half of a split-screen comparison the layer renders in.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitDirection {
    LEFT,
    #[default]
    NONE,
    RIGHT,
}

impl SplitDirection {
    pub fn to_shader_value(&self) -> f64 {
        match self {
            SplitDirection::LEFT => -1.0,
            SplitDirection::NONE => 0.0,
            SplitDirection::RIGHT => 1.0,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ImageryProviderError {
    #[error("imagery provider is not ready")]
    NotReady,
    #[error("imagery tile ({x}, {y}) at level {level} failed to load: {message}")]
    RequestFailed {
        x: u32,
        y: u32,
        level: u32,
        message: String,
    },
    #[error("imagery tile ({x}, {y}) at level {level} is outside the provider's extent")]
    OutsideExtent { x: u32, y: u32, level: u32 },
}

/// Outcome of asking a provider for one imagery tile this frame.
pub enum ImageryRequestState {
    Ready(TextureId),
    /// Still in flight somewhere outside this core; ask again next frame.
    Pending,
    Failed(ImageryProviderError),
    Invalid,
}

/// Source of imagery tiles. Like the terrain provider, transport and decode
/// live elsewhere; requests either complete immediately or report Pending.
pub trait ImageryProvider: Send + Sync {
    fn get_ready(&self) -> bool;
    fn get_rectangle(&self) -> &Rectangle;
    fn get_tiling_scheme(&self) -> &GeographicTilingScheme;
    fn get_maximum_level(&self) -> u32;
    fn get_minimum_level(&self) -> u32 {
        return 0;
    }
    fn get_tile_width(&self) -> u32;
    fn get_tile_height(&self) -> u32;
    /// Whether textures are served in web mercator and need the projected-T
    /// vertex channel for correct sampling.
    fn uses_web_mercator(&self) -> bool {
        return false;
    }
    fn request_image(
        &mut self,
        x: u32,
        y: u32,
        level: u32,
        gpu: &mut GpuResourceHub,
    ) -> ImageryRequestState;
    /// Attribution to forward to the credit display; this crate never
    /// renders it.
    fn get_credit(&self) -> Option<&str> {
        return None;
    }
}

/// One imagery layer: a provider plus the display settings the compositor
/// bakes into each draw command's texture slots.
pub struct ImageryLayer {
    pub id: ImageryLayerId,
    pub show: bool,
    pub alpha: f64,
    pub brightness: f64,
    pub contrast: f64,
    pub hue: f64,
    pub saturation: f64,
    pub gamma: f64,
    pub split: SplitDirection,
    pub rectangle: Rectangle,
    pub is_base_layer: bool,
    pub imagery_provider: Box<dyn ImageryProvider>,
}

pub const DEFAULT_BRIGHTNESS: f64 = 1.0;
pub const DEFAULT_CONTRAST: f64 = 1.0;
pub const DEFAULT_HUE: f64 = 0.0;
pub const DEFAULT_SATURATION: f64 = 1.0;
pub const DEFAULT_GAMMA: f64 = 1.0;

impl ImageryLayer {
    pub fn new(id: ImageryLayerId, imagery_provider: Box<dyn ImageryProvider>) -> Self {
        let rectangle = *imagery_provider.get_rectangle();
        Self {
            id,
            show: true,
            alpha: 1.0,
            brightness: DEFAULT_BRIGHTNESS,
            contrast: DEFAULT_CONTRAST,
            hue: DEFAULT_HUE,
            saturation: DEFAULT_SATURATION,
            gamma: DEFAULT_GAMMA,
            split: SplitDirection::NONE,
            rectangle,
            is_base_layer: false,
            imagery_provider,
        }
    }

    /// Drives one imagery tile's load state machine as far as it can go this
    /// frame. All transitions are synchronous; Pending simply leaves the
    /// state alone until a later frame.
    pub fn process_imagery_state_machine(
        &mut self,
        key: &ImageryKey,
        imagery_storage: &mut ImageryStorage,
        gpu: &mut GpuResourceHub,
        skip_loading: bool,
    ) {
        let state = match imagery_storage.get(key) {
            Some(imagery) => imagery.state,
            None => return,
        };
        match state {
            ImageryState::UNLOADED | ImageryState::REQUESTING => {
                if skip_loading {
                    return;
                }
                let tile_key = key.key;
                let result = self.imagery_provider.request_image(
                    tile_key.x,
                    tile_key.y,
                    tile_key.level,
                    gpu,
                );
                let imagery = imagery_storage.get_mut(key).unwrap();
                match result {
                    ImageryRequestState::Ready(texture) => {
                        imagery.texture = Some(texture);
                        imagery.state = ImageryState::READY;
                    }
                    ImageryRequestState::Pending => {
                        imagery.state = ImageryState::REQUESTING;
                    }
                    ImageryRequestState::Failed(error) => {
                        // Forwarded, never interpreted; retry policy belongs
                        // to the provider.
                        imagery.state = ImageryState::FAILED;
                        bevy::log::warn!("imagery layer {:?}: {}", self.id, error);
                    }
                    ImageryRequestState::Invalid => {
                        imagery.state = ImageryState::INVALID;
                    }
                }
            }
            ImageryState::PLACEHOLDER => {
                if self.imagery_provider.get_ready() {
                    let imagery = imagery_storage.get_mut(key).unwrap();
                    imagery.state = ImageryState::UNLOADED;
                }
            }
            _ => {}
        }
    }

    /// Maps an imagery tile's rectangle into a terrain tile's texture space:
    /// (translation_x, translation_y, scale_x, scale_y).
    pub fn calculate_texture_translation_and_scale(
        tile_rectangle: &Rectangle,
        imagery_rectangle: &Rectangle,
    ) -> DVec4 {
        let terrain_width = tile_rectangle.compute_width();
        let terrain_height = tile_rectangle.compute_height();
        let scale_x = terrain_width / imagery_rectangle.compute_width();
        let scale_y = terrain_height / imagery_rectangle.compute_height();
        return DVec4::new(
            (scale_x * (tile_rectangle.west - imagery_rectangle.west)) / terrain_width,
            (scale_y * (tile_rectangle.south - imagery_rectangle.south)) / terrain_height,
            scale_x,
            scale_y,
        );
    }

    /// Creates the TileImagery skeletons attaching this layer to a terrain
    /// tile: one entry per overlapping imagery tile at the level whose texel
    /// spacing matches the tile's geometric error. Returns true when at
    /// least one entry was created.
    pub fn create_tile_imagery_skeletons(
        &mut self,
        tile: &mut QuadtreeTile,
        terrain_provider: &dyn TerrainProvider,
        imagery_storage: &mut ImageryStorage,
    ) -> bool {
        if !self.imagery_provider.get_ready() {
            // Attach a placeholder so the hand-off machinery revisits this
            // layer once the provider comes up.
            let placeholder_key =
                imagery_storage.add(&TileKey::new(0, 0, 0), &self.id, self.imagery_provider.get_tiling_scheme());
            if let Some(imagery) = imagery_storage.get_mut(&placeholder_key) {
                imagery.state = ImageryState::PLACEHOLDER;
            }
            tile.data.add_imagery(placeholder_key, None, false);
            return true;
        }

        let use_web_mercator_t = self.imagery_provider.uses_web_mercator()
            && tile.rectangle.north < WebMercatorProjection::maximum_latitude()
            && tile.rectangle.south > -WebMercatorProjection::maximum_latitude();

        let imagery_bounds = match self
            .imagery_provider
            .get_rectangle()
            .intersection(&self.rectangle)
        {
            Some(bounds) => bounds,
            None => return false,
        };
        let overlap = match tile.rectangle.intersection(&imagery_bounds) {
            Some(overlap) => overlap,
            None => {
                // No overlap: only the base layer stretches its edge texels
                // over the rest of the globe.
                if !self.is_base_layer {
                    return false;
                }
                clamp_rectangle_to_bounds(&tile.rectangle, &imagery_bounds)
            }
        };

        let latitude_closest_to_equator = if overlap.south > 0.0 {
            overlap.south
        } else if overlap.north < 0.0 {
            overlap.north
        } else {
            0.0
        };

        let target_geometric_error =
            terrain_provider.get_level_maximum_geometric_error(tile.key.level);
        let imagery_level = self
            .level_with_maximum_texel_spacing(target_geometric_error, latitude_closest_to_equator)
            .clamp(
                self.imagery_provider.get_minimum_level(),
                self.imagery_provider.get_maximum_level(),
            );

        let imagery_tiling_scheme = self.imagery_provider.get_tiling_scheme().clone();
        let (mut north_west_x, mut north_west_y) = match imagery_tiling_scheme
            .position_to_tile_x_y(&overlap.northwest(), imagery_level)
        {
            Some(coordinates) => coordinates,
            None => return false,
        };
        let (mut south_east_x, mut south_east_y) = match imagery_tiling_scheme
            .position_to_tile_x_y(&overlap.southeast(), imagery_level)
        {
            Some(coordinates) => coordinates,
            None => return false,
        };

        // Drop imagery tiles that only touch the terrain tile within 1/512
        // of a tile width; they would contribute sub-texel slivers.
        let very_close_x = tile.rectangle.compute_width() / 512.0;
        let very_close_y = tile.rectangle.compute_height() / 512.0;

        let north_west_rectangle =
            imagery_tiling_scheme.tile_x_y_to_rectangle(north_west_x, north_west_y, imagery_level);
        if (north_west_rectangle.south - tile.rectangle.north).abs() < very_close_y
            && north_west_y < south_east_y
        {
            north_west_y += 1;
        }
        if (north_west_rectangle.east - tile.rectangle.west).abs() < very_close_x
            && north_west_x < south_east_x
        {
            north_west_x += 1;
        }
        let south_east_rectangle =
            imagery_tiling_scheme.tile_x_y_to_rectangle(south_east_x, south_east_y, imagery_level);
        if (south_east_rectangle.north - tile.rectangle.south).abs() < very_close_y
            && south_east_y > north_west_y
        {
            south_east_y -= 1;
        }
        if (south_east_rectangle.west - tile.rectangle.east).abs() < very_close_x
            && south_east_x > north_west_x
        {
            south_east_x -= 1;
        }

        let terrain_rectangle = tile.rectangle;
        let terrain_width = terrain_rectangle.compute_width();
        let terrain_height = terrain_rectangle.compute_height();
        let mut created_any = false;
        for x in north_west_x..=south_east_x {
            for y in north_west_y..=south_east_y {
                let imagery_rectangle =
                    imagery_tiling_scheme.tile_x_y_to_rectangle(x, y, imagery_level);
                let clipped = match imagery_rectangle.intersection(&imagery_bounds) {
                    Some(clipped) => clipped,
                    None => continue,
                };
                let min_u =
                    ((clipped.west - terrain_rectangle.west) / terrain_width).clamp(0.0, 1.0);
                let max_u =
                    ((clipped.east - terrain_rectangle.west) / terrain_width).clamp(0.0, 1.0);
                let min_v =
                    ((clipped.south - terrain_rectangle.south) / terrain_height).clamp(0.0, 1.0);
                let max_v =
                    ((clipped.north - terrain_rectangle.south) / terrain_height).clamp(0.0, 1.0);

                let imagery_key = imagery_storage.add(
                    &TileKey::new(x, y, imagery_level),
                    &self.id,
                    &imagery_tiling_scheme,
                );
                tile.data.add_imagery(
                    imagery_key,
                    Some(DVec4::new(min_u, min_v, max_u, max_v)),
                    use_web_mercator_t,
                );
                created_any = true;
            }
        }
        return created_any;
    }

    /// The imagery level whose texel spacing best matches the given
    /// geometric error at the given latitude.
    fn level_with_maximum_texel_spacing(
        &self,
        texel_spacing: f64,
        latitude_closest_to_equator: f64,
    ) -> u32 {
        let tiling_scheme = self.imagery_provider.get_tiling_scheme();
        let ellipsoid = tiling_scheme.get_ellipsoid();
        let level_zero_maximum_texel_spacing = (ellipsoid.maximum_radius
            * tiling_scheme.get_rectangle().compute_width()
            * latitude_closest_to_equator.cos())
            / (self.imagery_provider.get_tile_width() as f64
                * tiling_scheme.get_number_of_x_tiles_at_level(0) as f64);

        let two_to_the_level_power = level_zero_maximum_texel_spacing / texel_spacing;
        let level = two_to_the_level_power.ln() / 2.0_f64.ln();
        return level.round().max(0.0) as u32;
    }
}

/// Degenerates `tile_rectangle` onto the nearest edge of `bounds`, producing
/// the (possibly zero-area) rectangle whose edge texels get stretched.
fn clamp_rectangle_to_bounds(tile_rectangle: &Rectangle, bounds: &Rectangle) -> Rectangle {
    let mut result = Rectangle::default();
    if tile_rectangle.south >= bounds.north {
        result.north = bounds.north;
        result.south = bounds.north;
    } else if tile_rectangle.north <= bounds.south {
        result.north = bounds.south;
        result.south = bounds.south;
    } else {
        result.south = tile_rectangle.south.max(bounds.south);
        result.north = tile_rectangle.north.min(bounds.north);
    }
    if tile_rectangle.west >= bounds.east {
        result.west = bounds.east;
        result.east = bounds.east;
    } else if tile_rectangle.east <= bounds.west {
        result.west = bounds.west;
        result.east = bounds.west;
    } else {
        result.west = tile_rectangle.west.max(bounds.west);
        result.east = tile_rectangle.east.min(bounds.east);
    }
    return result;
}

/// An imagery provider that fabricates a distinct texture per requested
/// tile, immediately ready. Stands in for network-backed providers in tests
/// and headless runs.
pub struct ConstantImageryProvider {
    tiling_scheme: GeographicTilingScheme,
    rectangle: Rectangle,
    maximum_level: u32,
}

impl ConstantImageryProvider {
    pub fn new() -> Self {
        let tiling_scheme = GeographicTilingScheme::default();
        let rectangle = *tiling_scheme.get_rectangle();
        Self {
            tiling_scheme,
            rectangle,
            maximum_level: 20,
        }
    }
}

impl Default for ConstantImageryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageryProvider for ConstantImageryProvider {
    fn get_ready(&self) -> bool {
        return true;
    }

    fn get_rectangle(&self) -> &Rectangle {
        return &self.rectangle;
    }

    fn get_tiling_scheme(&self) -> &GeographicTilingScheme {
        return &self.tiling_scheme;
    }

    fn get_maximum_level(&self) -> u32 {
        return self.maximum_level;
    }

    fn get_tile_width(&self) -> u32 {
        return 256;
    }

    fn get_tile_height(&self) -> u32 {
        return 256;
    }

    fn request_image(
        &mut self,
        _x: u32,
        _y: u32,
        _level: u32,
        gpu: &mut GpuResourceHub,
    ) -> ImageryRequestState {
        return ImageryRequestState::Ready(gpu.create_texture());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadtree::quadtree_tile::Quadrant;

    use tellus_scene::EllipsoidTerrainProvider;

    fn test_tile(key: TileKey) -> QuadtreeTile {
        let scheme = GeographicTilingScheme::default();
        let rectangle = scheme.tile_x_y_to_rectangle(key.x, key.y, key.level);
        QuadtreeTile::new(key, Quadrant::Root(0), None, rectangle)
    }

    #[test]
    fn skeletons_cover_the_tile() {
        let mut layer = ImageryLayer::new(
            ImageryLayerId(0),
            Box::new(ConstantImageryProvider::new()),
        );
        let terrain_provider = EllipsoidTerrainProvider::new();
        let mut imagery_storage = ImageryStorage::new();
        let mut tile = test_tile(TileKey::new(2, 1, 2));
        let created = layer.create_tile_imagery_skeletons(
            &mut tile,
            &terrain_provider,
            &mut imagery_storage,
        );
        assert!(created);
        assert!(!tile.data.imagery.is_empty());
        // Every skeleton clips inside the unit square.
        for tile_imagery in &tile.data.imagery {
            let r = tile_imagery.texture_coordinate_rectangle.unwrap();
            assert!(r.x >= 0.0 && r.z <= 1.0 && r.y >= 0.0 && r.w <= 1.0);
            assert!(r.x < r.z && r.y < r.w);
        }
    }

    #[test]
    fn translation_and_scale_for_an_exactly_matching_rectangle() {
        let rectangle = Rectangle::from_degrees(0.0, 0.0, 10.0, 10.0);
        let result =
            ImageryLayer::calculate_texture_translation_and_scale(&rectangle, &rectangle);
        assert_eq!(result, DVec4::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn translation_and_scale_for_a_parent_imagery_tile() {
        // Tile covers the north-east quarter of the imagery rectangle.
        let imagery = Rectangle::from_degrees(0.0, 0.0, 10.0, 10.0);
        let tile = Rectangle::from_degrees(5.0, 5.0, 10.0, 10.0);
        let result = ImageryLayer::calculate_texture_translation_and_scale(&tile, &imagery);
        // A tile uv of (0, 0) must land at the imagery's (0.5, 0.5).
        assert!((result.x - 0.5).abs() < 1e-12);
        assert!((result.y - 0.5).abs() < 1e-12);
        assert!((result.z - 0.5).abs() < 1e-12);
        assert!((result.w - 0.5).abs() < 1e-12);
    }
}
