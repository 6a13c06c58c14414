use bevy::math::{DVec3, DVec4};
use serde::{Deserialize, Serialize};
use tellus_scene::{
    Cartesian3, EllipsoidalOccluder, Rectangle, TerrainMesh, TerrainProvider, TerrainProviderError,
    TileBoundingRegion,
};

use super::imagery_layer_collection::ImageryLayerCollection;
use super::imagery_storage::{ImageryKey, ImageryStorage};
use super::quadtree_tile::QuadtreeTileLoadState;
use super::quadtree_tile_storage::QuadtreeTileStorage;
use super::terrain_fill_mesh::TerrainFillMesh;
use super::tile_imagery::TileImagery;
use super::tile_key::TileKey;
use super::vertex_array::{GpuResourceHub, TextureId, VertexArray};

#[allow(non_camel_case_types)]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TerrainState {
    FAILED = 0,
    #[default]
    UNLOADED = 1,
    RECEIVED = 2,
    READY = 3,
}

/// A cached height summary for a tile, available before any payload is:
/// either computed offline or remembered from an earlier load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightExtents {
    pub minimum_height: f64,
    pub maximum_height: f64,
}

/// The terrain-surface state attached to each quadtree tile: payload, real
/// and fill geometry, bounding data, and the per-layer imagery list.
#[derive(Default)]
pub struct GlobeSurfaceTile {
    pub terrain_state: TerrainState,
    pub terrain_data: Option<tellus_scene::HeightmapTerrainData>,
    pub fill: Option<TerrainFillMesh>,
    pub vertex_array: Option<VertexArray>,
    pub water_mask_texture: Option<TextureId>,

    pub tile_bounding_region: Option<TileBoundingRegion>,
    pub occludee_point_in_scaled_space: Option<DVec3>,
    pub bounding_volume_source_tile: Option<TileKey>,
    pub bounding_volume_is_from_mesh: bool,
    pub clipped_by_boundaries: bool,
    pub height_extents: Option<HeightExtents>,

    /// The rendered ancestor standing in for this tile, when it cannot draw
    /// itself. Never forms a chain: the target's own back-reference is unset.
    pub renderable_tile: Option<TileKey>,
    /// This tile's rectangle inside that ancestor's unit square, as
    /// (min_u, min_v, max_u, max_v).
    pub renderable_subset: Option<DVec4>,

    /// Ordered to match the global imagery layer order at all times.
    pub imagery: Vec<TileImagery>,
}

impl GlobeSurfaceTile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_imagery(
        &mut self,
        imagery_key: ImageryKey,
        texture_coordinate_rectangle: Option<DVec4>,
        use_web_mercator_t: bool,
    ) {
        self.imagery.push(TileImagery::new(
            imagery_key,
            texture_coordinate_rectangle,
            use_web_mercator_t,
        ));
    }

    pub fn has_mesh(&self) -> bool {
        return self
            .terrain_data
            .as_ref()
            .map_or(false, |data| data.has_mesh());
    }

    pub fn get_mesh(&self) -> Option<&TerrainMesh> {
        return self.terrain_data.as_ref().and_then(|data| data.get_mesh());
    }

    /// The geometry this tile would draw with right now: its own mesh, or
    /// its fill mesh.
    pub fn get_renderable_mesh(&self) -> Option<&TerrainMesh> {
        if let Some(mesh) = self.get_mesh() {
            return Some(mesh);
        }
        return self.fill.as_ref().and_then(|fill| fill.mesh.as_ref());
    }

    pub fn get_renderable_vertex_array(&self) -> Option<VertexArray> {
        if self.vertex_array.is_some() {
            return self.vertex_array;
        }
        return self.fill.as_ref().and_then(|fill| fill.vertex_array);
    }

    /// Number of imagery entries holding a ready texture.
    pub fn ready_texture_count(&self, imagery_storage: &ImageryStorage) -> usize {
        return self
            .imagery
            .iter()
            .filter(|tile_imagery| tile_imagery.has_ready_texture(imagery_storage))
            .count();
    }

    /// Re-establishes the invariant that `imagery` is ordered by global
    /// layer order; run after the collection is reordered.
    pub fn sort_imagery_by_layer_order(
        &mut self,
        layers: &ImageryLayerCollection,
        imagery_storage: &mut ImageryStorage,
    ) {
        // Entries whose layer is gone are dropped on the way.
        let mut removed = vec![];
        self.imagery.retain_mut(|tile_imagery| {
            let layer_id = tile_imagery
                .loading_imagery
                .or(tile_imagery.ready_imagery)
                .map(|key| key.layer_id);
            match layer_id {
                Some(layer_id) if layers.index_of(&layer_id).is_some() => true,
                _ => {
                    removed.push((
                        tile_imagery.loading_imagery.take(),
                        tile_imagery.ready_imagery.take(),
                    ));
                    false
                }
            }
        });
        for (loading, ready) in removed {
            if let Some(key) = loading {
                imagery_storage.release_reference(&key);
            }
            if let Some(key) = ready {
                imagery_storage.release_reference(&key);
            }
        }
        self.imagery.sort_by_key(|tile_imagery| {
            tile_imagery
                .loading_imagery
                .or(tile_imagery.ready_imagery)
                .and_then(|key| layers.index_of(&key.layer_id))
                .unwrap_or(usize::MAX)
        });
    }

    /// Releases everything this tile holds. Buffer destruction is deferred
    /// through the hub's queue.
    pub fn free_resources(
        &mut self,
        imagery_storage: &mut ImageryStorage,
        gpu: &mut GpuResourceHub,
    ) {
        for tile_imagery in self.imagery.iter_mut() {
            tile_imagery.free_resources(imagery_storage);
        }
        self.imagery.clear();
        if let Some(vertex_array) = self.vertex_array.take() {
            gpu.destroy_vertex_array(vertex_array);
        }
        if let Some(mut fill) = self.fill.take() {
            fill.destroy(gpu);
        }
        self.terrain_data = None;
        self.terrain_state = TerrainState::UNLOADED;
    }
}

/// Resolves the best-available height range for a tile, in preference order:
/// its own mesh, its raw payload's declared extents (scaled by the terrain
/// exaggeration), a cached height summary, then the same tests up the
/// ancestor chain. Returns the source tile actually used with the heights,
/// or None if nothing anywhere has resolved yet.
pub fn resolve_height_range(
    storage: &QuadtreeTileStorage,
    tile_key: &TileKey,
    exaggeration: f64,
) -> Option<(TileKey, f64, f64)> {
    let mut current = Some(*tile_key);
    while let Some(key) = current {
        let tile = match storage.get(&key) {
            Some(tile) => tile,
            None => return None,
        };
        let surface_tile = &tile.data;
        if let Some(mesh) = surface_tile.get_mesh() {
            // Mesh heights are already exaggerated.
            return Some((key, mesh.minimum_height, mesh.maximum_height));
        }
        if let Some(data) = surface_tile.terrain_data.as_ref() {
            let (minimum, maximum) = data.height_range();
            return Some((key, minimum * exaggeration, maximum * exaggeration));
        }
        if let Some(extents) = surface_tile.height_extents {
            return Some((
                key,
                extents.minimum_height * exaggeration,
                extents.maximum_height * exaggeration,
            ));
        }
        current = tile.parent;
    }
    return None;
}

/// Stores the resolved height range into the tile's bounding region and
/// refreshes the oriented bounding box and occludee point, but only when the
/// governing source tile (or its heights) changed since the last resolve.
pub fn update_tile_bounding_region(
    storage: &mut QuadtreeTileStorage,
    tile_key: &TileKey,
    occluder: &EllipsoidalOccluder,
    exaggeration: f64,
) {
    let resolved = resolve_height_range(storage, tile_key, exaggeration);

    let from_own_mesh = resolved.map_or(false, |(source, _, _)| source == *tile_key)
        && storage
            .get(tile_key)
            .map_or(false, |tile| tile.data.has_mesh());

    let own_mesh_volumes = if from_own_mesh {
        storage.get(tile_key).and_then(|tile| {
            tile.data.get_mesh().map(|mesh| {
                (
                    mesh.oriented_bounding_box,
                    mesh.bounding_sphere_3d,
                    mesh.occludee_point_in_scaled_space,
                )
            })
        })
    } else {
        None
    };

    let tile = match storage.get_mut(tile_key) {
        Some(tile) => tile,
        None => return,
    };
    let rectangle = tile.rectangle;
    let surface_tile = &mut tile.data;
    let region = surface_tile.tile_bounding_region.get_or_insert_with(|| {
        TileBoundingRegion::new(&rectangle, Some(0.0), Some(0.0), None, Some(false))
    });

    let Some((source_key, minimum_height, maximum_height)) = resolved else {
        surface_tile.bounding_volume_source_tile = None;
        surface_tile.bounding_volume_is_from_mesh = false;
        return;
    };
    debug_assert!(minimum_height <= maximum_height);

    let old_minimum_height = region.minimum_height;
    let old_maximum_height = region.maximum_height;
    region.minimum_height = minimum_height;
    region.maximum_height = maximum_height;

    let source_changed = surface_tile.bounding_volume_source_tile != Some(source_key);
    let heights_changed =
        minimum_height != old_minimum_height || maximum_height != old_maximum_height;

    if let Some((oriented_bounding_box, bounding_sphere, occludee_point)) = own_mesh_volumes {
        if source_changed || !surface_tile.bounding_volume_is_from_mesh {
            region.oriented_bounding_box = Some(oriented_bounding_box);
            region.bounding_sphere = Some(bounding_sphere);
            surface_tile.occludee_point_in_scaled_space = occludee_point.or_else(|| {
                compute_occludee_point(
                    occluder,
                    &oriented_bounding_box.center,
                    &rectangle,
                    minimum_height,
                    maximum_height,
                )
            });
        }
    } else if source_changed || heights_changed || region.oriented_bounding_box.is_none() {
        region.compute_bounding_volumes(&occluder.ellipsoid);
        let center = region.oriented_bounding_box.as_ref().unwrap().center;
        surface_tile.occludee_point_in_scaled_space = compute_occludee_point(
            occluder,
            &center,
            &rectangle,
            minimum_height,
            maximum_height,
        );
    }

    surface_tile.bounding_volume_source_tile = Some(source_key);
    surface_tile.bounding_volume_is_from_mesh = own_mesh_volumes.is_some();
}

/// The horizon-culling point for a tile's rectangle at its maximum height.
pub fn compute_occludee_point(
    occluder: &EllipsoidalOccluder,
    center: &DVec3,
    rectangle: &Rectangle,
    minimum_height: f64,
    maximum_height: f64,
) -> Option<DVec3> {
    let radii_squared = occluder.ellipsoid.radii_squared;
    let corner_positions = [
        DVec3::from_radians(
            rectangle.west,
            rectangle.south,
            Some(maximum_height),
            Some(radii_squared),
        ),
        DVec3::from_radians(
            rectangle.east,
            rectangle.south,
            Some(maximum_height),
            Some(radii_squared),
        ),
        DVec3::from_radians(
            rectangle.west,
            rectangle.north,
            Some(maximum_height),
            Some(radii_squared),
        ),
        DVec3::from_radians(
            rectangle.east,
            rectangle.north,
            Some(maximum_height),
            Some(radii_squared),
        ),
    ];
    return occluder.compute_horizon_culling_point_possibly_under_ellipsoid(
        *center,
        &corner_positions,
        minimum_height,
    );
}

/// Advances a tile's terrain and imagery loading as far as possible this
/// frame. With `terrain_only`, imagery is left untouched (used while the
/// tile's visibility is still unknown).
#[allow(clippy::too_many_arguments)]
pub fn process_state_machine(
    storage: &mut QuadtreeTileStorage,
    tile_key: &TileKey,
    terrain_provider: &dyn TerrainProvider,
    layers: &mut ImageryLayerCollection,
    imagery_storage: &mut ImageryStorage,
    gpu: &mut GpuResourceHub,
    exaggeration: f64,
    terrain_only: bool,
) {
    initialize(storage, tile_key, terrain_provider, layers, imagery_storage);

    let tile = storage.get_mut(tile_key).unwrap();
    if tile.state == QuadtreeTileLoadState::LOADING {
        process_terrain_state_machine(storage, tile_key, terrain_provider, gpu, exaggeration);
    }

    if terrain_only {
        return;
    }

    let tile = storage.get_mut(tile_key).unwrap();
    let was_already_renderable = tile.renderable;
    tile.renderable = tile.data.vertex_array.is_some();
    let is_terrain_done_loading = matches!(
        tile.data.terrain_state,
        TerrainState::READY | TerrainState::FAILED
    );
    tile.upsampled_from_parent = tile
        .data
        .terrain_data
        .as_ref()
        .map_or(false, |data| data.was_created_by_upsampling());

    let is_imagery_done_loading = process_imagery(storage, tile_key, layers, imagery_storage, gpu);

    let tile = storage.get_mut(tile_key).unwrap();
    if is_terrain_done_loading && is_imagery_done_loading {
        tile.state = QuadtreeTileLoadState::DONE;
    }
    // A tile that was renderable before stays renderable; flicker while
    // reloading imagery is worse than a frame of stale texture.
    if was_already_renderable {
        tile.renderable = true;
    }
}

fn initialize(
    storage: &mut QuadtreeTileStorage,
    tile_key: &TileKey,
    terrain_provider: &dyn TerrainProvider,
    layers: &mut ImageryLayerCollection,
    imagery_storage: &mut ImageryStorage,
) {
    let tile = storage.get_mut(tile_key).unwrap();
    if tile.state != QuadtreeTileLoadState::START {
        return;
    }
    let available = terrain_provider.get_tile_data_available(tile_key.x, tile_key.y, tile_key.level);
    if available == Some(false) {
        tile.data.terrain_state = TerrainState::FAILED;
    }
    for layer_id in layers.ordered_ids().to_vec() {
        let layer = layers.get_mut(&layer_id).unwrap();
        if layer.show {
            layer.create_tile_imagery_skeletons(tile, terrain_provider, imagery_storage);
        }
    }
    tile.state = QuadtreeTileLoadState::LOADING;
}

fn process_terrain_state_machine(
    storage: &mut QuadtreeTileStorage,
    tile_key: &TileKey,
    terrain_provider: &dyn TerrainProvider,
    gpu: &mut GpuResourceHub,
    exaggeration: f64,
) {
    let tile = storage.get_mut(tile_key).unwrap();

    if tile.data.terrain_state == TerrainState::UNLOADED {
        match terrain_provider.request_tile_geometry(tile_key.x, tile_key.y, tile_key.level) {
            Ok(terrain_data) => {
                tile.data.terrain_data = Some(terrain_data);
                tile.data.terrain_state = TerrainState::RECEIVED;
            }
            Err(TerrainProviderError::NotReady) => {
                // Stay UNLOADED; re-checked next frame.
            }
            Err(error) => {
                bevy::log::warn!("terrain payload for {:?} failed: {}", tile_key, error);
                tile.data.terrain_state = TerrainState::FAILED;
                tile.state = QuadtreeTileLoadState::FAILED;
            }
        }
    }

    let tile = storage.get_mut(tile_key).unwrap();
    if tile.data.terrain_state == TerrainState::RECEIVED {
        let tiling_scheme = storage.tiling_scheme.clone();
        let tile = storage.get_mut(tile_key).unwrap();
        let has_web_mercator_t = terrain_provider.has_web_mercator_t();
        let vertex_array = {
            let data = tile.data.terrain_data.as_mut().unwrap();
            let (width, height) = (data.width(), data.height());
            let mesh = data.create_mesh(
                &tiling_scheme,
                tile_key.x,
                tile_key.y,
                tile_key.level,
                exaggeration,
                has_web_mercator_t,
            );
            gpu.create_grid_vertex_array(mesh, width, height)
        };
        tile.data.vertex_array = Some(vertex_array);
        // Real geometry supersedes any fill.
        if let Some(mut fill) = tile.data.fill.take() {
            fill.destroy(gpu);
        }
        tile.data.terrain_state = TerrainState::READY;
    }
}

/// Drives every TileImagery entry on the tile; returns true once all of them
/// are done (ready or permanently failed).
pub fn process_imagery(
    storage: &mut QuadtreeTileStorage,
    tile_key: &TileKey,
    layers: &mut ImageryLayerCollection,
    imagery_storage: &mut ImageryStorage,
    gpu: &mut GpuResourceHub,
) -> bool {
    let tile = storage.get_mut(tile_key).unwrap();
    let tile_rectangle = tile.rectangle;
    let mut is_done_loading = true;
    for tile_imagery in tile.data.imagery.iter_mut() {
        let Some(layer_id) = tile_imagery
            .loading_imagery
            .or(tile_imagery.ready_imagery)
            .map(|key| key.layer_id)
        else {
            continue;
        };
        let Some(layer) = layers.get_mut(&layer_id) else {
            continue;
        };
        let this_one_done = tile_imagery.process_state_machine(
            &tile_rectangle,
            layer,
            imagery_storage,
            gpu,
            false,
        );
        is_done_loading = is_done_loading && this_one_done;
    }
    return is_done_loading;
}
