use tellus_scene::OrientedBoundingBox;

use super::tile_key::TileKey;

/// The one debug bounding-volume visualization, owned explicitly by the
/// provider; rebuilt only when the selected tile changes.
#[derive(Debug, Clone)]
pub struct DebugBoundingVolume {
    pub tile: TileKey,
    pub bounding_volume: OrientedBoundingBox,
}

/// Per-frame surface statistics plus debug toggles.
#[derive(Default)]
pub struct SurfaceDebugState {
    pub show_bounding_volumes: bool,
    pub selected_tile: Option<TileKey>,
    pub bounding_volume: Option<DebugBoundingVolume>,

    pub tiles_visited: u32,
    pub tiles_culled: u32,
    pub tiles_rendered: u32,
    pub fills_built: u32,
    pub max_depth_visited: u32,
}

impl SurfaceDebugState {
    pub fn reset(&mut self) {
        self.tiles_visited = 0;
        self.tiles_culled = 0;
        self.tiles_rendered = 0;
        self.fills_built = 0;
        self.max_depth_visited = 0;
    }

    /// Keeps the debug volume in sync with the selected tile, rebuilding
    /// only when the identity changes.
    pub fn update_bounding_volume(&mut self, tile: TileKey, volume: &OrientedBoundingBox) {
        if self.selected_tile != Some(tile) {
            self.bounding_volume = None;
            return;
        }
        let stale = self
            .bounding_volume
            .as_ref()
            .map_or(true, |debug| debug.tile != tile);
        if stale {
            self.bounding_volume = Some(DebugBoundingVolume {
                tile,
                bounding_volume: *volume,
            });
        }
    }
}
