use bevy::prelude::*;

pub use tellus_renderer::quadtree;
pub use tellus_scene as scene;

/// The whole surface stack in one plugin.
pub struct Plugin;

impl bevy::app::Plugin for Plugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(tellus_renderer::Plugin);
    }
}
