use bevy::prelude::Resource;
use bevy::utils::HashMap;
use tellus_scene::{Rectangle, TilingScheme};

use super::imagery_layer::ImageryLayerId;
use super::tile_key::TileKey;
use super::vertex_array::TextureId;

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImageryState {
    UNLOADED = 0,
    REQUESTING = 1,
    RECEIVED = 2,
    READY = 3,
    FAILED = 4,
    INVALID = 5,
    /// Stand-in used while the owning layer's provider is not ready yet.
    PLACEHOLDER = 6,
}

/// One imagery tile of one layer.
#[derive(Clone, Debug)]
pub struct Imagery {
    pub key: ImageryKey,
    pub state: ImageryState,
    pub texture: Option<TextureId>,
    pub rectangle: Rectangle,
    pub reference_count: u32,
    pub parent: Option<ImageryKey>,
}

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug)]
pub struct ImageryKey {
    pub key: TileKey,
    pub layer_id: ImageryLayerId,
}

impl ImageryKey {
    pub fn new(key: TileKey, layer_id: ImageryLayerId) -> Self {
        return Self { key, layer_id };
    }
}

/// The shared cache of imagery tiles, keyed by (tile, layer). Entries are
/// reference counted by the TileImagery instances pointing at them and by
/// their own children.
#[derive(Resource, Default)]
pub struct ImageryStorage {
    map: HashMap<ImageryKey, Imagery>,
}

impl ImageryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, key: &ImageryKey) -> Option<&Imagery> {
        return self.map.get(key);
    }

    #[inline]
    pub fn get_mut(&mut self, key: &ImageryKey) -> Option<&mut Imagery> {
        return self.map.get_mut(key);
    }

    pub fn len(&self) -> usize {
        return self.map.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.map.is_empty();
    }

    /// Finds or creates the imagery for a tile, linking it to its parent
    /// imagery (created on demand, up to the root) and taking one reference.
    pub fn add(
        &mut self,
        tile_key: &TileKey,
        layer_id: &ImageryLayerId,
        tiling_scheme: &dyn TilingScheme,
    ) -> ImageryKey {
        let imagery_key = ImageryKey::new(*tile_key, *layer_id);
        if !self.map.contains_key(&imagery_key) {
            let parent = tile_key
                .parent()
                .map(|parent_key| self.add(&parent_key, layer_id, tiling_scheme));
            let rectangle =
                tiling_scheme.tile_x_y_to_rectangle(tile_key.x, tile_key.y, tile_key.level);
            self.map.insert(
                imagery_key,
                Imagery {
                    key: imagery_key,
                    state: ImageryState::UNLOADED,
                    texture: None,
                    rectangle,
                    reference_count: 0,
                    parent,
                },
            );
        }
        self.add_reference(&imagery_key);
        return imagery_key;
    }

    pub fn add_reference(&mut self, key: &ImageryKey) {
        if let Some(imagery) = self.map.get_mut(key) {
            imagery.reference_count += 1;
        }
    }

    /// Drops one reference; at zero the entry is removed and the reference it
    /// held on its parent is released too (iteratively, since a whole chain
    /// can unravel).
    pub fn release_reference(&mut self, key: &ImageryKey) {
        let mut current = Some(*key);
        while let Some(key) = current {
            let parent = match self.map.get_mut(&key) {
                Some(imagery) => {
                    imagery.reference_count = imagery.reference_count.saturating_sub(1);
                    if imagery.reference_count > 0 {
                        break;
                    }
                    imagery.parent
                }
                None => break,
            };
            self.map.remove(&key);
            current = parent;
        }
    }
}
