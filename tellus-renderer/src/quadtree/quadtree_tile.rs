use tellus_scene::Rectangle;

use super::globe_surface_tile::GlobeSurfaceTile;
use super::tile_key::TileKey;
use super::tile_selection_result::TileSelectionResult;

#[allow(non_camel_case_types)]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QuadtreeTileLoadState {
    #[default]
    START = 0,
    LOADING = 1,
    DONE = 2,
    FAILED = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    Northwest,
    Northeast,
    Southwest,
    Southeast,
    Root(usize),
}

/// A node of the surface quadtree. The tree itself (creation, traversal,
/// eviction) belongs to the quadtree host; this core only reads the topology
/// and mutates the per-frame scratch fields plus the attached surface state.
pub struct QuadtreeTile {
    pub key: TileKey,
    pub location: Quadrant,
    pub parent: Option<TileKey>,
    pub rectangle: Rectangle,
    pub state: QuadtreeTileLoadState,
    pub renderable: bool,
    pub upsampled_from_parent: bool,

    // Per-frame scratch, written by the selection pass and read back here.
    pub distance: f64,
    pub load_priority: f64,
    pub last_selection_result: TileSelectionResult,
    pub last_selection_result_frame: Option<u32>,

    pub data: GlobeSurfaceTile,
}

impl QuadtreeTile {
    pub fn new(
        key: TileKey,
        location: Quadrant,
        parent: Option<TileKey>,
        rectangle: Rectangle,
    ) -> Self {
        Self {
            key,
            location,
            parent,
            rectangle,
            state: QuadtreeTileLoadState::START,
            renderable: false,
            upsampled_from_parent: false,
            distance: 0.0,
            load_priority: 0.0,
            last_selection_result: TileSelectionResult::NONE,
            last_selection_result_frame: None,
            data: GlobeSurfaceTile::new(),
        }
    }

    /// Whether this tile was left on screen by the given frame's selection
    /// pass (rendered and not retracted).
    pub fn was_rendered_in_frame(&self, frame_number: u32) -> bool {
        return self.last_selection_result_frame == Some(frame_number)
            && self.last_selection_result == TileSelectionResult::RENDERED;
    }

    /// Records the selection decision for this frame.
    pub fn mark_selection_result(&mut self, frame_number: u32, result: TileSelectionResult) {
        self.last_selection_result_frame = Some(frame_number);
        self.last_selection_result = result;
    }
}
