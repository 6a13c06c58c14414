use bevy::prelude::*;

pub mod clipping_plane_collection;
pub mod debug;
pub mod draw_command;
pub mod globe_surface_tile;
pub mod globe_surface_tile_provider;
pub mod imagery_layer;
pub mod imagery_layer_collection;
pub mod imagery_storage;
pub mod quadtree_tile;
pub mod quadtree_tile_storage;
pub mod render_context;
pub mod terrain_fill_mesh;
pub mod tile_imagery;
pub mod tile_key;
pub mod tile_selection_result;
pub mod vertex_array;

use globe_surface_tile_provider::GlobeSurfaceTileProvider;
use imagery_layer_collection::ImageryLayerCollection;
use imagery_storage::ImageryStorage;
use quadtree_tile_storage::QuadtreeTileStorage;
use vertex_array::GpuResourceHub;

/// Registers the surface-tile resources. The quadtree host drives the
/// per-frame hooks on `GlobeSurfaceTileProvider` from its own update loop.
pub struct Plugin;

impl bevy::prelude::Plugin for Plugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(QuadtreeTileStorage::default());
        app.insert_resource(ImageryLayerCollection::new());
        app.insert_resource(ImageryStorage::new());
        app.insert_resource(GpuResourceHub::new());
        app.insert_resource(GlobeSurfaceTileProvider::default());
        app.add_systems(Startup, setup);
    }
}

fn setup(mut storage: ResMut<QuadtreeTileStorage>) {
    storage.create_level_zero_tiles();
    bevy::log::info!("created {} level zero tiles", storage.root.len());
}
