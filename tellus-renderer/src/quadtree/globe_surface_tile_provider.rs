use bevy::math::{DVec2, DVec4};
use bevy::prelude::Resource;
use tellus_scene::{
    Cartesian3, EllipsoidTerrainProvider, GeographicProjection, Intersect, Projection,
    TerrainProvider, WebMercatorProjection,
};

use super::clipping_plane_collection::ClippingPlaneCollection;
use super::debug::SurfaceDebugState;
use super::draw_command::{DrawCommand, DrawCommandPool, RenderPass, SurfaceShaderFlags};
use super::globe_surface_tile::{process_state_machine, update_tile_bounding_region};
use super::imagery_layer::{
    ImageryLayerId, SplitDirection, DEFAULT_BRIGHTNESS, DEFAULT_CONTRAST, DEFAULT_GAMMA,
    DEFAULT_HUE, DEFAULT_SATURATION,
};
use super::imagery_layer_collection::{ImageryLayerCollection, ImageryLayerObserver};
use super::imagery_storage::ImageryStorage;
use super::quadtree_tile::QuadtreeTileLoadState;
use super::quadtree_tile_storage::QuadtreeTileStorage;
use super::render_context::{FrameState, SceneMode};
use super::terrain_fill_mesh::update_fill;
use super::tile_key::TileKey;
use super::tile_selection_result::TileSelectionResult;
use super::vertex_array::GpuResourceHub;

/// Distance reported for a tile whose height range has never resolved: far
/// enough to deprioritize its load without ever blocking rendering.
pub const UNRESOLVED_DISTANCE_SENTINEL: f64 = 9999999999.0;

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileVisibility {
    NONE = -1,
    PARTIAL = 0,
    FULL = 1,
}

/// What to draw for a tile whose own geometry is not usable yet.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileFallbackMode {
    /// Draw nothing; holes are accepted.
    NONE,
    /// Reuse a sub-rectangle of the nearest renderable ancestor. Cheap, but
    /// the LOD mismatch shows as cracks along the boundary.
    ANCESTOR_SUBSET,
    /// Synthesize a fill mesh stitched to the rendered neighbors.
    #[default]
    FILL,
}

/// How a tile queued for display resolved this frame.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TileDisplayResolution {
    SELF,
    ANCESTOR_SUBSET(TileKey, DVec4),
    FILL,
}

/// Renders the surface of the globe: evaluates visibility and load priority
/// for the quadtree host, keeps per-tile surface state loaded, and turns the
/// set of tiles selected each frame into batched draw commands.
#[derive(Resource)]
pub struct GlobeSurfaceTileProvider {
    pub terrain_provider: Box<dyn TerrainProvider>,
    pub fallback_mode: TileFallbackMode,
    pub background_color: DVec4,
    /// Device texture-unit budget for one draw.
    pub max_textures_per_command: u32,
    pub has_water_mask: bool,
    pub show_reflective_ocean: bool,
    pub show_ocean_waves: bool,
    /// Global "stop loading" switch; checked before each tile's load
    /// continuation, which then no-ops rather than aborting anything.
    pub stop_loading: bool,
    pub clipping_planes: Option<ClippingPlaneCollection>,
    pub debug: SurfaceDebugState,

    tiles_to_render_by_texture_count: Vec<Vec<TileKey>>,
    command_pool: DrawCommandPool,
    layer_order_dirty: bool,
    pending_added_layers: Vec<ImageryLayerId>,
    pending_hidden_layers: Vec<ImageryLayerId>,
}

impl Default for GlobeSurfaceTileProvider {
    fn default() -> Self {
        Self::new(Box::new(EllipsoidTerrainProvider::new()))
    }
}

impl GlobeSurfaceTileProvider {
    pub fn new(terrain_provider: Box<dyn TerrainProvider>) -> Self {
        Self {
            terrain_provider,
            fallback_mode: TileFallbackMode::default(),
            background_color: DVec4::new(0.0, 0.0, 0.5, 1.0),
            max_textures_per_command: 31,
            has_water_mask: false,
            show_reflective_ocean: false,
            show_ocean_waves: false,
            stop_loading: false,
            clipping_planes: None,
            debug: SurfaceDebugState::default(),
            tiles_to_render_by_texture_count: vec![],
            command_pool: DrawCommandPool::default(),
            layer_order_dirty: false,
            pending_added_layers: vec![],
            pending_hidden_layers: vec![],
        }
    }

    pub fn get_ready(&self) -> bool {
        return self.terrain_provider.get_ready();
    }

    pub fn get_level_maximum_geometric_error(&self, level: u32) -> f64 {
        return self.terrain_provider.get_level_maximum_geometric_error(level);
    }

    /// Imagery bookkeeping run before anything else each frame: attach newly
    /// added or re-shown layers to existing tiles, strip hidden ones, and
    /// restore per-tile imagery order after a collection reorder.
    pub fn pre_update(
        &mut self,
        storage: &mut QuadtreeTileStorage,
        layers: &mut ImageryLayerCollection,
        imagery_storage: &mut ImageryStorage,
    ) {
        if !self.pending_added_layers.is_empty() || !self.pending_hidden_layers.is_empty() {
            let keys: Vec<TileKey> = storage.keys().copied().collect();
            for layer_id in std::mem::take(&mut self.pending_added_layers) {
                for key in &keys {
                    let tile = storage.get_mut(key).unwrap();
                    if tile.state == QuadtreeTileLoadState::START {
                        // initialize() will attach this layer anyway.
                        continue;
                    }
                    if let Some(layer) = layers.get_mut(&layer_id) {
                        if layer.show {
                            layer.create_tile_imagery_skeletons(
                                tile,
                                self.terrain_provider.as_ref(),
                                imagery_storage,
                            );
                        }
                    }
                }
                // Loading state must be revisited now that more imagery is
                // attached.
                for key in &keys {
                    let tile = storage.get_mut(key).unwrap();
                    if tile.state == QuadtreeTileLoadState::DONE {
                        tile.state = QuadtreeTileLoadState::LOADING;
                    }
                }
            }
            for layer_id in std::mem::take(&mut self.pending_hidden_layers) {
                for key in &keys {
                    let tile = storage.get_mut(key).unwrap();
                    let mut removed = vec![];
                    tile.data.imagery.retain_mut(|tile_imagery| {
                        let belongs = tile_imagery
                            .loading_imagery
                            .or(tile_imagery.ready_imagery)
                            .map_or(false, |imagery_key| imagery_key.layer_id == layer_id);
                        if belongs {
                            removed.push((
                                tile_imagery.loading_imagery.take(),
                                tile_imagery.ready_imagery.take(),
                            ));
                        }
                        !belongs
                    });
                    for (loading, ready) in removed {
                        if let Some(imagery_key) = loading {
                            imagery_storage.release_reference(&imagery_key);
                        }
                        if let Some(imagery_key) = ready {
                            imagery_storage.release_reference(&imagery_key);
                        }
                    }
                }
            }
        }

        if self.layer_order_dirty {
            let keys: Vec<TileKey> = storage.keys().copied().collect();
            for key in keys {
                let tile = storage.get_mut(&key).unwrap();
                tile.data.sort_imagery_by_layer_order(layers, imagery_storage);
            }
            self.layer_order_dirty = false;
        }
    }

    /// Start-of-frame hook: free buffers queued last frame, clear the render
    /// buckets, reset the command pool, advance clip-plane animation.
    pub fn begin_frame(&mut self, frame_state: &FrameState, gpu: &mut GpuResourceHub) {
        gpu.process_destroy_queue();
        let bucket_count = self.max_textures_per_command as usize + 1;
        self.tiles_to_render_by_texture_count
            .resize_with(bucket_count, Vec::new);
        for bucket in self.tiles_to_render_by_texture_count.iter_mut() {
            bucket.clear();
        }
        self.command_pool.begin_frame();
        self.debug.reset();
        if let Some(clipping_planes) = self.clipping_planes.as_mut() {
            clipping_planes.update(frame_state.frame_number);
        }
    }

    /// Incremental per-tile load continuation, called by the host for every
    /// tile in its load queues.
    #[allow(clippy::too_many_arguments)]
    pub fn load_tile(
        &mut self,
        storage: &mut QuadtreeTileStorage,
        layers: &mut ImageryLayerCollection,
        imagery_storage: &mut ImageryStorage,
        gpu: &mut GpuResourceHub,
        tile_key: &TileKey,
        frame_state: &FrameState,
    ) {
        if self.stop_loading {
            return;
        }
        let tile = match storage.get(tile_key) {
            Some(tile) => tile,
            None => return,
        };
        // While this tile's bounding volume still comes from an ancestor its
        // real visibility is unknown, so spend the frame budget on terrain
        // only; imagery starts once the tile is known to be visible.
        let mut terrain_only = tile.data.bounding_volume_source_tile != Some(*tile_key)
            || tile.last_selection_result == TileSelectionResult::CULLED_BUT_NEEDED;
        let terrain_state_before = tile.data.terrain_state;
        process_state_machine(
            storage,
            tile_key,
            self.terrain_provider.as_ref(),
            layers,
            imagery_storage,
            gpu,
            frame_state.terrain_exaggeration,
            terrain_only,
        );
        let tile = storage.get(tile_key).unwrap();
        if terrain_only && terrain_state_before != tile.data.terrain_state {
            if self.compute_tile_visibility(storage, tile_key, frame_state)
                != TileVisibility::NONE
                && storage.get(tile_key).unwrap().data.bounding_volume_source_tile
                    == Some(*tile_key)
            {
                terrain_only = false;
                process_state_machine(
                    storage,
                    tile_key,
                    self.terrain_provider.as_ref(),
                    layers,
                    imagery_storage,
                    gpu,
                    frame_state.terrain_exaggeration,
                    terrain_only,
                );
            }
        }
    }

    /// Classifies a tile against fog, clip planes, the frustum, and the
    /// horizon, in that order, short-circuiting as soon as the answer is
    /// known to be NONE.
    pub fn compute_tile_visibility(
        &mut self,
        storage: &mut QuadtreeTileStorage,
        tile_key: &TileKey,
        frame_state: &FrameState,
    ) -> TileVisibility {
        self.debug.tiles_visited += 1;
        let distance = compute_distance_to_tile(storage, tile_key, frame_state);

        // Fully fogged-out tiles are invisible no matter what the frustum
        // says.
        if frame_state.fog.opacity_at_distance(distance) >= 1.0 {
            self.debug.tiles_culled += 1;
            return TileVisibility::NONE;
        }

        let tile = storage.get_mut(tile_key).unwrap();
        let surface_tile = &mut tile.data;
        if surface_tile.bounding_volume_source_tile.is_none() {
            // Nothing has resolved a bounding volume yet; assume it might be
            // visible.
            return TileVisibility::PARTIAL;
        }
        let region = surface_tile
            .tile_bounding_region
            .as_ref()
            .expect("bounding region exists whenever a source tile is set");
        let minimum_height = region.minimum_height;

        surface_tile.clipped_by_boundaries = false;
        if let Some(clipping_planes) = self.clipping_planes.as_ref() {
            if clipping_planes.is_active() {
                let classification = match region.get_bounding_volume() {
                    Some(obb) => clipping_planes.classify(obb),
                    None => Intersect::INTERSECTING,
                };
                if classification == Intersect::OUTSIDE {
                    self.debug.tiles_culled += 1;
                    return TileVisibility::NONE;
                }
                surface_tile.clipped_by_boundaries = classification == Intersect::INTERSECTING;
            }
        }

        let intersection = if let Some(obb) = region.get_bounding_volume() {
            frame_state.culling_volume.compute_visibility(obb)
        } else if let Some(sphere) = region.get_bounding_sphere() {
            frame_state.culling_volume.compute_visibility(sphere)
        } else {
            return TileVisibility::PARTIAL;
        };
        let visibility = match intersection {
            Intersect::OUTSIDE => {
                self.debug.tiles_culled += 1;
                return TileVisibility::NONE;
            }
            Intersect::INTERSECTING => TileVisibility::PARTIAL,
            Intersect::INSIDE => TileVisibility::FULL,
        };

        // Horizon culling only makes sense under a perspective camera.
        if frame_state.camera_is_perspective {
            if let Some(occludee_point) = surface_tile.occludee_point_in_scaled_space {
                if !frame_state
                    .occluder
                    .is_scaled_space_point_visible_possibly_under_ellipsoid(
                        &occludee_point,
                        Some(minimum_height),
                    )
                {
                    self.debug.tiles_culled += 1;
                    return TileVisibility::NONE;
                }
            }
        }

        return visibility;
    }

    /// Load priority: prefer tiles near the center of view and near the
    /// camera. Lower is more urgent; tiles with no data or no bounding box
    /// yet are most urgent of all.
    pub fn compute_tile_load_priority(
        &self,
        storage: &QuadtreeTileStorage,
        tile_key: &TileKey,
        frame_state: &FrameState,
    ) -> f64 {
        let Some(tile) = storage.get(tile_key) else {
            return 0.0;
        };
        let surface_tile = &tile.data;
        if surface_tile.terrain_data.is_none() && surface_tile.fill.is_none() {
            return 0.0;
        }
        let Some(obb) = surface_tile
            .tile_bounding_region
            .as_ref()
            .and_then(|region| region.oriented_bounding_box.as_ref())
        else {
            return 0.0;
        };

        let camera_position = frame_state.camera_position_wc;
        let camera_direction = frame_state.camera_direction_wc;
        let mut tile_direction = obb.center - camera_position;
        let magnitude = tile_direction.magnitude();
        if magnitude < tellus_scene::math::EPSILON5 {
            return 0.0;
        }
        tile_direction = tile_direction / magnitude;
        return (1.0 - tile_direction.dot(camera_direction)) * tile.distance;
    }

    /// Queues a tile for drawing this frame, resolving what geometry will
    /// stand in for it if its own is not ready.
    pub fn show_tile_this_frame(
        &mut self,
        storage: &mut QuadtreeTileStorage,
        gpu: &mut GpuResourceHub,
        imagery_storage: &ImageryStorage,
        tile_key: &TileKey,
        frame_state: &FrameState,
    ) -> Option<TileDisplayResolution> {
        let resolution = self.resolve_for_display(storage, gpu, tile_key, frame_state)?;

        if self.tiles_to_render_by_texture_count.is_empty() {
            self.tiles_to_render_by_texture_count
                .resize_with(self.max_textures_per_command as usize + 1, Vec::new);
        }
        let tile = storage.get(tile_key).unwrap();
        let ready_textures = tile.data.ready_texture_count(imagery_storage);
        let bucket = ready_textures.min(self.tiles_to_render_by_texture_count.len() - 1);
        self.tiles_to_render_by_texture_count[bucket].push(*tile_key);
        self.debug.tiles_rendered += 1;
        self.debug.max_depth_visited = self.debug.max_depth_visited.max(tile_key.level);
        if let Some(region) = tile.data.tile_bounding_region.as_ref() {
            if let Some(obb) = region.oriented_bounding_box.as_ref() {
                self.debug.update_bounding_volume(*tile_key, obb);
            }
        }
        return Some(resolution);
    }

    /// Decides how a tile will be drawn: itself, an ancestor subset, or a
    /// fill mesh, per the configured fallback strategy.
    pub fn resolve_for_display(
        &mut self,
        storage: &mut QuadtreeTileStorage,
        gpu: &mut GpuResourceHub,
        tile_key: &TileKey,
        frame_state: &FrameState,
    ) -> Option<TileDisplayResolution> {
        let tile = storage.get(tile_key)?;
        if tile.data.vertex_array.is_some() {
            // Renderable again: reclaim this tile from any ancestor that was
            // substituting for it.
            let stale_ancestor = {
                let tile = storage.get_mut(tile_key).unwrap();
                tile.data.renderable_subset = None;
                tile.data.renderable_tile.take()
            };
            if let Some(ancestor_key) = stale_ancestor {
                if let Some(ancestor) = storage.get_mut(&ancestor_key) {
                    if ancestor.data.renderable_tile == Some(*tile_key) {
                        ancestor.data.renderable_tile = None;
                        ancestor.data.renderable_subset = None;
                    }
                }
            }
            return Some(TileDisplayResolution::SELF);
        }

        match self.fallback_mode {
            TileFallbackMode::NONE => return None,
            TileFallbackMode::ANCESTOR_SUBSET => {
                let mut ancestor_key = tile.parent;
                while let Some(key) = ancestor_key {
                    let ancestor = storage.get(&key)?;
                    if ancestor.data.vertex_array.is_some() {
                        break;
                    }
                    ancestor_key = ancestor.parent;
                }
                let ancestor_key = ancestor_key?;

                // The substitute must not itself be substituting: one hop
                // only, never chains.
                let ancestor = storage.get_mut(&ancestor_key).unwrap();
                ancestor.data.renderable_tile = None;
                ancestor.data.renderable_subset = None;
                let ancestor_rectangle = ancestor.rectangle;

                let tile = storage.get_mut(tile_key).unwrap();
                if tile.data.renderable_tile != Some(ancestor_key) {
                    // The substituting ancestor changed; remap our rectangle
                    // into its unit square.
                    let width = ancestor_rectangle.compute_width();
                    let height = ancestor_rectangle.compute_height();
                    let subset = DVec4::new(
                        ((tile.rectangle.west - ancestor_rectangle.west) / width)
                            .clamp(0.0, 1.0),
                        ((tile.rectangle.south - ancestor_rectangle.south) / height)
                            .clamp(0.0, 1.0),
                        ((tile.rectangle.east - ancestor_rectangle.west) / width)
                            .clamp(0.0, 1.0),
                        ((tile.rectangle.north - ancestor_rectangle.south) / height)
                            .clamp(0.0, 1.0),
                    );
                    tile.data.renderable_tile = Some(ancestor_key);
                    tile.data.renderable_subset = Some(subset);
                }
                return Some(TileDisplayResolution::ANCESTOR_SUBSET(
                    ancestor_key,
                    tile.data.renderable_subset.unwrap(),
                ));
            }
            TileFallbackMode::FILL => {
                let revision_before = tile
                    .data
                    .fill
                    .as_ref()
                    .map(|fill| fill.revision)
                    .unwrap_or(0);
                let has_web_mercator_t = self.terrain_provider.has_web_mercator_t();
                update_fill(storage, tile_key, frame_state, gpu, has_web_mercator_t);
                let tile = storage.get_mut(tile_key).unwrap();
                tile.data.renderable_tile = None;
                tile.data.renderable_subset = None;
                let revision_after = tile
                    .data
                    .fill
                    .as_ref()
                    .map(|fill| fill.revision)
                    .unwrap_or(0);
                if revision_after != revision_before {
                    self.debug.fills_built += 1;
                }
                return Some(TileDisplayResolution::FILL);
            }
        }
    }

    /// End-of-frame hook: assembles and returns the frame's draw commands,
    /// walking the texture-count buckets in ascending order so state changes
    /// between shader variants are minimized.
    pub fn end_frame(
        &mut self,
        storage: &QuadtreeTileStorage,
        layers: &ImageryLayerCollection,
        imagery_storage: &ImageryStorage,
        frame_state: &FrameState,
    ) -> &[DrawCommand] {
        let buckets = std::mem::take(&mut self.tiles_to_render_by_texture_count);
        for bucket in &buckets {
            for tile_key in bucket {
                self.add_draw_commands_for_tile(
                    storage,
                    layers,
                    imagery_storage,
                    frame_state,
                    tile_key,
                );
            }
        }
        self.tiles_to_render_by_texture_count = buckets;
        return self.command_pool.used_commands();
    }

    fn add_draw_commands_for_tile(
        &mut self,
        storage: &QuadtreeTileStorage,
        layers: &ImageryLayerCollection,
        imagery_storage: &ImageryStorage,
        frame_state: &FrameState,
        tile_key: &TileKey,
    ) {
        let Some(tile) = storage.get(tile_key) else {
            return;
        };
        let surface_tile = &tile.data;

        // Geometry: the tile's own mesh, an ancestor subset, or its fill.
        let mut texture_coordinate_subset = DVec4::new(0.0, 0.0, 1.0, 1.0);
        let (vertex_array, mesh) = if surface_tile.vertex_array.is_some() {
            (surface_tile.vertex_array, surface_tile.get_mesh())
        } else if let (Some(ancestor_key), Some(subset)) =
            (surface_tile.renderable_tile, surface_tile.renderable_subset)
        {
            texture_coordinate_subset = subset;
            match storage.get(&ancestor_key) {
                Some(ancestor) => (ancestor.data.vertex_array, ancestor.data.get_mesh()),
                None => (None, None),
            }
        } else {
            (
                surface_tile.get_renderable_vertex_array(),
                surface_tile.get_renderable_mesh(),
            )
        };
        let (Some(vertex_array), Some(mesh)) = (vertex_array, mesh) else {
            // A tile with no drawable geometry should never have been queued.
            bevy::log::warn!("tile {:?} queued for display with no geometry", tile_key);
            return;
        };

        let mut texture_budget = self.max_textures_per_command;
        let water_mask_active = self.has_water_mask && surface_tile.water_mask_texture.is_some();
        if water_mask_active && self.show_reflective_ocean {
            texture_budget = texture_budget.saturating_sub(1);
        }
        if self.show_ocean_waves {
            // The wave normal map occupies a unit of its own.
            texture_budget = texture_budget.saturating_sub(1);
        }
        let texture_budget = texture_budget.max(1) as usize;

        struct Slot {
            texture: super::vertex_array::TextureId,
            translation_and_scale: DVec4,
            tex_coords_rectangle: DVec4,
            use_web_mercator_t: bool,
            alpha: f64,
            brightness: f64,
            contrast: f64,
            hue: f64,
            saturation: f64,
            one_over_gamma: f64,
            split: f64,
        }

        let mut batches: Vec<Vec<Slot>> = vec![vec![]];
        for tile_imagery in &surface_tile.imagery {
            let Some(ready_key) = tile_imagery.ready_imagery else {
                continue;
            };
            let layer = match layers.get(&ready_key.layer_id) {
                Some(layer) => layer,
                None => continue,
            };
            if !layer.show || layer.alpha <= 0.0 {
                continue;
            }
            let imagery = imagery_storage
                .get(&ready_key)
                .unwrap_or_else(|| {
                    panic!(
                        "tile {:?} declares ready imagery {:?} that is not in storage; \
                         the imagery hand-off state machine is corrupt",
                        tile_key, ready_key
                    )
                });
            let texture = imagery.texture.unwrap_or_else(|| {
                panic!(
                    "tile {:?} declares ready imagery {:?} with no texture; \
                     the imagery hand-off state machine is corrupt",
                    tile_key, ready_key
                )
            });

            if batches.last().unwrap().len() == texture_budget {
                batches.push(vec![]);
            }
            batches.last_mut().unwrap().push(Slot {
                texture,
                translation_and_scale: tile_imagery
                    .texture_translation_and_scale
                    .unwrap_or(DVec4::new(0.0, 0.0, 1.0, 1.0)),
                tex_coords_rectangle: tile_imagery
                    .texture_coordinate_rectangle
                    .unwrap_or(DVec4::new(0.0, 0.0, 1.0, 1.0)),
                use_web_mercator_t: tile_imagery.use_web_mercator_t,
                alpha: layer.alpha,
                brightness: layer.brightness,
                contrast: layer.contrast,
                hue: layer.hue,
                saturation: layer.saturation,
                one_over_gamma: 1.0 / layer.gamma,
                split: layer.split.to_shader_value(),
            });
        }

        // Shared per-tile uniform values.
        let rectangle = tile.rectangle;
        let projected_rectangle = if frame_state.mode == SceneMode::SCENE3D {
            DVec4::ZERO
        } else {
            let projection = GeographicProjection::WGS84;
            let southwest = projection.project(&rectangle.southwest());
            let northeast = projection.project(&rectangle.northeast());
            DVec4::new(southwest.x, southwest.y, northeast.x, northeast.y)
        };
        let south_mercator =
            WebMercatorProjection::geodetic_latitude_to_mercator_angle(rectangle.south);
        let north_mercator =
            WebMercatorProjection::geodetic_latitude_to_mercator_angle(rectangle.north);
        let (edge_color, edge_width, apply_clipping_planes) = match &self.clipping_planes {
            Some(clipping_planes) if clipping_planes.is_active() => (
                clipping_planes.edge_color,
                clipping_planes.edge_width,
                true,
            ),
            _ => (DVec4::ZERO, 0.0, false),
        };

        for (batch_index, batch) in batches.into_iter().enumerate() {
            let is_first = batch_index == 0;
            debug_assert!(is_first || !batch.is_empty());
            let background_color = self.background_color;
            let command = self.command_pool.next_command();

            command.vertex_array = Some(vertex_array);
            command.pass = if is_first {
                RenderPass::GLOBE
            } else {
                RenderPass::TRANSLUCENT
            };
            command.bounding_volume = mesh.oriented_bounding_box;
            command.debug_show_bounding_volume = self.debug.show_bounding_volumes
                || self.debug.selected_tile == Some(*tile_key);

            let mut flags = SurfaceShaderFlags {
                texture_count: batch.len() as u32,
                show_reflective_ocean: water_mask_active && self.show_reflective_ocean,
                show_ocean_waves: self.show_ocean_waves,
                apply_clipping_planes,
                ..Default::default()
            };

            let uniforms = &mut command.uniform_values;
            uniforms.rtc_center = mesh.center;
            uniforms.tile_rectangle = projected_rectangle;
            uniforms.south_and_north_latitude = DVec2::new(rectangle.south, rectangle.north);
            uniforms.south_mercator_y_and_one_over_height = DVec2::new(
                south_mercator,
                1.0 / (north_mercator - south_mercator),
            );
            uniforms.minimum_maximum_height =
                DVec2::new(mesh.minimum_height, mesh.maximum_height);
            uniforms.scale_and_bias = mesh.encoding.matrix;
            uniforms.texture_coordinate_subset = texture_coordinate_subset;
            uniforms.initial_color = if is_first {
                background_color
            } else {
                DVec4::new(0.0, 0.0, 0.0, 0.0)
            };
            uniforms.water_mask = if water_mask_active {
                surface_tile.water_mask_texture
            } else {
                None
            };
            uniforms.water_mask_translation_and_scale = DVec4::new(0.0, 0.0, 1.0, 1.0);
            uniforms.clipping_planes_edge_color = edge_color;
            uniforms.clipping_planes_edge_width = edge_width;

            for slot in batch {
                flags.apply_alpha |= slot.alpha < 1.0;
                flags.apply_brightness |= slot.brightness != DEFAULT_BRIGHTNESS;
                flags.apply_contrast |= slot.contrast != DEFAULT_CONTRAST;
                flags.apply_hue |= slot.hue != DEFAULT_HUE;
                flags.apply_saturation |= slot.saturation != DEFAULT_SATURATION;
                flags.apply_gamma |= slot.one_over_gamma != 1.0 / DEFAULT_GAMMA;
                flags.apply_split |= slot.split != SplitDirection::NONE.to_shader_value();

                uniforms.day_textures.push(slot.texture);
                uniforms
                    .day_texture_translation_and_scale
                    .push(slot.translation_and_scale);
                uniforms
                    .day_texture_tex_coords_rectangle
                    .push(slot.tex_coords_rectangle);
                uniforms
                    .day_texture_use_web_mercator_t
                    .push(slot.use_web_mercator_t);
                uniforms.day_texture_alpha.push(slot.alpha);
                uniforms.day_texture_brightness.push(slot.brightness);
                uniforms.day_texture_contrast.push(slot.contrast);
                uniforms.day_texture_hue.push(slot.hue);
                uniforms.day_texture_saturation.push(slot.saturation);
                uniforms.day_texture_one_over_gamma.push(slot.one_over_gamma);
                uniforms.day_texture_split.push(slot.split);
            }
            command.shader_flags = flags;
        }
    }
}

impl ImageryLayerObserver for GlobeSurfaceTileProvider {
    fn layer_added(&mut self, layer_id: ImageryLayerId, _index: usize) {
        self.pending_added_layers.push(layer_id);
        self.layer_order_dirty = true;
    }

    fn layer_removed(&mut self, _layer_id: ImageryLayerId, _index: usize) {
        // Per-tile entries of the removed layer are dropped by the re-sort.
        self.layer_order_dirty = true;
    }

    fn layer_moved(&mut self, _layer_id: ImageryLayerId, _new_index: usize, _old_index: usize) {
        self.layer_order_dirty = true;
    }

    fn layer_shown_or_hidden(&mut self, layer_id: ImageryLayerId, show: bool) {
        if show {
            self.pending_added_layers.push(layer_id);
        } else {
            self.pending_hidden_layers.push(layer_id);
        }
    }
}

/// Conservative camera distance for a tile. An unresolved height range
/// reports the sentinel; a range inherited from an ancestor is collapsed to
/// whichever bound is farther from the camera's height first, so the result
/// can only over-estimate, never under-estimate.
pub fn compute_distance_to_tile(
    storage: &mut QuadtreeTileStorage,
    tile_key: &TileKey,
    frame_state: &FrameState,
) -> f64 {
    update_tile_bounding_region(
        storage,
        tile_key,
        &frame_state.occluder,
        frame_state.terrain_exaggeration,
    );

    let Some(tile) = storage.get_mut(tile_key) else {
        return UNRESOLVED_DISTANCE_SENTINEL;
    };
    let source_tile = tile.data.bounding_volume_source_tile;
    if source_tile.is_none() {
        tile.distance = UNRESOLVED_DISTANCE_SENTINEL;
        return UNRESOLVED_DISTANCE_SENTINEL;
    }

    let region = tile
        .data
        .tile_bounding_region
        .as_mut()
        .expect("bounding region exists whenever a source tile is set");
    let minimum_height = region.minimum_height;
    let maximum_height = region.maximum_height;

    if source_tile != Some(*tile_key) {
        let camera_height = frame_state.camera_position_cartographic.height;
        let distance_to_minimum = (camera_height - minimum_height).abs();
        let distance_to_maximum = (camera_height - maximum_height).abs();
        if distance_to_minimum > distance_to_maximum {
            region.minimum_height = minimum_height;
            region.maximum_height = minimum_height;
        } else {
            region.minimum_height = maximum_height;
            region.maximum_height = maximum_height;
        }
    }

    let distance = region.distance_to_camera_region(
        &frame_state.camera_position_wc,
        &frame_state.camera_position_cartographic,
        &GeographicProjection::WGS84,
    );

    region.minimum_height = minimum_height;
    region.maximum_height = maximum_height;
    tile.distance = distance;
    return distance;
}
