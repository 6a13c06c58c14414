use bevy::prelude::Resource;
use bevy::utils::HashMap;

use super::imagery_layer::{ImageryLayer, ImageryLayerId};

/// Callbacks the tile provider implements to keep per-tile imagery state in
/// sync with the layer collection. The collection invokes them synchronously,
/// in mutation order, from the same call that mutated it.
pub trait ImageryLayerObserver {
    fn layer_added(&mut self, layer_id: ImageryLayerId, index: usize);
    fn layer_removed(&mut self, layer_id: ImageryLayerId, index: usize);
    fn layer_moved(&mut self, layer_id: ImageryLayerId, new_index: usize, old_index: usize);
    fn layer_shown_or_hidden(&mut self, layer_id: ImageryLayerId, show: bool);
}

/// The ordered set of imagery layers. Index 0 renders bottom-most; the draw
/// compositor consumes layers in exactly this order.
#[derive(Resource, Default)]
pub struct ImageryLayerCollection {
    layers: HashMap<ImageryLayerId, ImageryLayer>,
    order: Vec<ImageryLayerId>,
    next_id: u32,
}

impl ImageryLayerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        return self.order.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.order.is_empty();
    }

    pub fn allocate_id(&mut self) -> ImageryLayerId {
        let id = ImageryLayerId(self.next_id);
        self.next_id += 1;
        return id;
    }

    pub fn get(&self, id: &ImageryLayerId) -> Option<&ImageryLayer> {
        return self.layers.get(id);
    }

    pub fn get_mut(&mut self, id: &ImageryLayerId) -> Option<&mut ImageryLayer> {
        return self.layers.get_mut(id);
    }

    /// Layers bottom-most first.
    pub fn ordered_ids(&self) -> &[ImageryLayerId] {
        return &self.order;
    }

    /// The z-order of a layer, or None if it is not in the collection.
    pub fn index_of(&self, id: &ImageryLayerId) -> Option<usize> {
        return self.order.iter().position(|other| other == id);
    }

    pub fn add(&mut self, mut layer: ImageryLayer, observer: &mut dyn ImageryLayerObserver) {
        // The bottom-most layer is the base layer; it stretches over gaps.
        if self.order.is_empty() {
            layer.is_base_layer = true;
        }
        let id = layer.id;
        self.layers.insert(id, layer);
        self.order.push(id);
        let index = self.order.len() - 1;
        bevy::log::info!("imagery layer {:?} added at index {}", id, index);
        observer.layer_added(id, index);
    }

    pub fn remove(
        &mut self,
        id: ImageryLayerId,
        observer: &mut dyn ImageryLayerObserver,
    ) -> Option<ImageryLayer> {
        let index = self.index_of(&id)?;
        self.order.remove(index);
        let removed = self.layers.remove(&id);
        if index == 0 {
            if let Some(new_base) = self.order.first().copied() {
                self.layers.get_mut(&new_base).unwrap().is_base_layer = true;
            }
        }
        bevy::log::info!("imagery layer {:?} removed from index {}", id, index);
        observer.layer_removed(id, index);
        return removed;
    }

    /// Moves a layer to a new z-order position.
    pub fn move_to(
        &mut self,
        id: ImageryLayerId,
        new_index: usize,
        observer: &mut dyn ImageryLayerObserver,
    ) {
        let Some(old_index) = self.index_of(&id) else {
            return;
        };
        let new_index = new_index.min(self.order.len() - 1);
        if new_index == old_index {
            return;
        }
        self.order.remove(old_index);
        self.order.insert(new_index, id);
        observer.layer_moved(id, new_index, old_index);
    }

    /// Swaps the z-order of two layers.
    pub fn swap(
        &mut self,
        a: ImageryLayerId,
        b: ImageryLayerId,
        observer: &mut dyn ImageryLayerObserver,
    ) {
        let (Some(index_a), Some(index_b)) = (self.index_of(&a), self.index_of(&b)) else {
            return;
        };
        if index_a == index_b {
            return;
        }
        self.order.swap(index_a, index_b);
        observer.layer_moved(a, index_b, index_a);
        observer.layer_moved(b, index_a, index_b);
    }

    pub fn set_show(
        &mut self,
        id: ImageryLayerId,
        show: bool,
        observer: &mut dyn ImageryLayerObserver,
    ) {
        if let Some(layer) = self.layers.get_mut(&id) {
            if layer.show != show {
                layer.show = show;
                observer.layer_shown_or_hidden(id, show);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadtree::imagery_layer::ConstantImageryProvider;

    #[derive(Default)]
    struct RecordingObserver {
        events: Vec<String>,
    }

    impl ImageryLayerObserver for RecordingObserver {
        fn layer_added(&mut self, layer_id: ImageryLayerId, index: usize) {
            self.events.push(format!("added {} at {}", layer_id.0, index));
        }
        fn layer_removed(&mut self, layer_id: ImageryLayerId, index: usize) {
            self.events
                .push(format!("removed {} from {}", layer_id.0, index));
        }
        fn layer_moved(&mut self, layer_id: ImageryLayerId, new_index: usize, old_index: usize) {
            self.events.push(format!(
                "moved {} {} -> {}",
                layer_id.0, old_index, new_index
            ));
        }
        fn layer_shown_or_hidden(&mut self, layer_id: ImageryLayerId, show: bool) {
            self.events.push(format!("show {} {}", layer_id.0, show));
        }
    }

    fn make_layer(collection: &mut ImageryLayerCollection) -> ImageryLayer {
        let id = collection.allocate_id();
        ImageryLayer::new(id, Box::new(ConstantImageryProvider::new()))
    }

    #[test]
    fn observer_sees_every_mutation_in_order() {
        let mut collection = ImageryLayerCollection::new();
        let mut observer = RecordingObserver::default();
        let layer0 = make_layer(&mut collection);
        let layer1 = make_layer(&mut collection);
        let id0 = layer0.id;
        let id1 = layer1.id;

        collection.add(layer0, &mut observer);
        collection.add(layer1, &mut observer);
        collection.swap(id0, id1, &mut observer);
        collection.set_show(id0, false, &mut observer);
        collection.remove(id1, &mut observer);

        assert_eq!(
            observer.events,
            vec![
                "added 0 at 0",
                "added 1 at 1",
                "moved 0 0 -> 1",
                "moved 1 1 -> 0",
                "show 0 false",
                "removed 1 from 0",
            ]
        );
    }

    #[test]
    fn first_layer_becomes_the_base_layer() {
        let mut collection = ImageryLayerCollection::new();
        let mut observer = RecordingObserver::default();
        let layer0 = make_layer(&mut collection);
        let layer1 = make_layer(&mut collection);
        let id0 = layer0.id;
        let id1 = layer1.id;
        collection.add(layer0, &mut observer);
        collection.add(layer1, &mut observer);
        assert!(collection.get(&id0).unwrap().is_base_layer);
        assert!(!collection.get(&id1).unwrap().is_base_layer);

        collection.remove(id0, &mut observer);
        assert!(collection.get(&id1).unwrap().is_base_layer);
    }

    #[test]
    fn move_to_reorders() {
        let mut collection = ImageryLayerCollection::new();
        let mut observer = RecordingObserver::default();
        let ids: Vec<ImageryLayerId> = (0..3)
            .map(|_| {
                let layer = make_layer(&mut collection);
                let id = layer.id;
                collection.add(layer, &mut observer);
                id
            })
            .collect();
        collection.move_to(ids[2], 0, &mut observer);
        assert_eq!(collection.ordered_ids(), &[ids[2], ids[0], ids[1]]);
    }
}
