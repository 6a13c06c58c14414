use bevy::math::DVec4;
use tellus_scene::Rectangle;

use super::imagery_layer::ImageryLayer;
use super::imagery_storage::{ImageryKey, ImageryState, ImageryStorage};
use super::vertex_array::GpuResourceHub;

/// One imagery layer's contribution to one terrain tile. Exactly one of
/// `loading_imagery` / `ready_imagery` drives rendering at a time; both are
/// set only during the hand-off from an ancestor's texture to the tile's own.
pub struct TileImagery {
    pub texture_coordinate_rectangle: Option<DVec4>,
    pub texture_translation_and_scale: Option<DVec4>,
    pub use_web_mercator_t: bool,
    pub loading_imagery: Option<ImageryKey>,
    pub ready_imagery: Option<ImageryKey>,
}

impl TileImagery {
    pub fn new(
        imagery_key: ImageryKey,
        texture_coordinate_rectangle: Option<DVec4>,
        use_web_mercator_t: bool,
    ) -> Self {
        Self {
            texture_coordinate_rectangle,
            texture_translation_and_scale: None,
            use_web_mercator_t,
            loading_imagery: Some(imagery_key),
            ready_imagery: None,
        }
    }

    pub fn free_resources(&mut self, imagery_storage: &mut ImageryStorage) {
        if let Some(loading) = self.loading_imagery.take() {
            imagery_storage.release_reference(&loading);
        }
        if let Some(ready) = self.ready_imagery.take() {
            imagery_storage.release_reference(&ready);
        }
    }

    /// Whether this entry can feed a draw command right now.
    pub fn has_ready_texture(&self, imagery_storage: &ImageryStorage) -> bool {
        return self
            .ready_imagery
            .as_ref()
            .and_then(|key| imagery_storage.get(key))
            .map_or(false, |imagery| imagery.texture.is_some());
    }

    /// Advances this entry toward READY. Returns true once nothing more will
    /// ever happen for it (done or permanently failed).
    pub fn process_state_machine(
        &mut self,
        tile_rectangle: &Rectangle,
        layer: &mut ImageryLayer,
        imagery_storage: &mut ImageryStorage,
        gpu: &mut GpuResourceHub,
        skip_loading: bool,
    ) -> bool {
        let loading_key = match self.loading_imagery {
            Some(key) => key,
            None => return true,
        };

        layer.process_imagery_state_machine(&loading_key, imagery_storage, gpu, skip_loading);

        let loading_state = imagery_storage
            .get(&loading_key)
            .map(|imagery| imagery.state);
        if loading_state == Some(ImageryState::READY) {
            if let Some(previous_ready) = self.ready_imagery.take() {
                imagery_storage.release_reference(&previous_ready);
            }
            self.ready_imagery = Some(loading_key);
            self.loading_imagery = None;
            let imagery_rectangle = imagery_storage.get(&loading_key).unwrap().rectangle;
            self.texture_translation_and_scale = Some(
                ImageryLayer::calculate_texture_translation_and_scale(
                    tile_rectangle,
                    &imagery_rectangle,
                ),
            );
            return true;
        }

        // Not ready yet: find the closest ready ancestor to stand in, and
        // remember the closest loadable one so a failed tile keeps trying up
        // the chain.
        let mut ancestor = imagery_storage
            .get(&loading_key)
            .and_then(|imagery| imagery.parent);
        let mut closest_ancestor_that_needs_loading: Option<ImageryKey> = None;
        while let Some(candidate_key) = ancestor {
            let candidate = match imagery_storage.get(&candidate_key) {
                Some(candidate) => candidate,
                None => break,
            };
            if candidate.state == ImageryState::READY && candidate.texture.is_some() {
                break;
            }
            if candidate.state != ImageryState::FAILED && candidate.state != ImageryState::INVALID
            {
                closest_ancestor_that_needs_loading =
                    closest_ancestor_that_needs_loading.or(Some(candidate_key));
            }
            ancestor = candidate.parent;
        }

        if self.ready_imagery != ancestor {
            if let Some(previous_ready) = self.ready_imagery.take() {
                imagery_storage.release_reference(&previous_ready);
            }
            self.ready_imagery = ancestor;
            if let Some(ancestor_key) = ancestor {
                imagery_storage.add_reference(&ancestor_key);
                let ancestor_rectangle = imagery_storage.get(&ancestor_key).unwrap().rectangle;
                self.texture_translation_and_scale = Some(
                    ImageryLayer::calculate_texture_translation_and_scale(
                        tile_rectangle,
                        &ancestor_rectangle,
                    ),
                );
            }
        }

        let loading_state = imagery_storage
            .get(&loading_key)
            .map(|imagery| imagery.state);
        if loading_state == Some(ImageryState::FAILED)
            || loading_state == Some(ImageryState::INVALID)
        {
            if let Some(fallback_key) = closest_ancestor_that_needs_loading {
                layer.process_imagery_state_machine(
                    &fallback_key,
                    imagery_storage,
                    gpu,
                    skip_loading,
                );
                return false;
            }
            // Nothing above can load either; this entry is finished.
            return true;
        }
        return false;
    }
}
