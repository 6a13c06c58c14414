use bevy::math::{DMat4, DVec2, DVec3, DVec4};
use tellus_scene::OrientedBoundingBox;

use super::vertex_array::{TextureId, VertexArray};

/// Which render pass a command is queued into. The first command per tile
/// draws opaque with depth writes; every later command for the same tile
/// blends on top.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderPass {
    #[default]
    GLOBE,
    TRANSLUCENT,
}

/// Selects the shader variant a command needs: how many texture slots are
/// live and which optional color-adjustment families are engaged anywhere in
/// them. A family left at its default across all slots compiles out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceShaderFlags {
    pub texture_count: u32,
    pub apply_alpha: bool,
    pub apply_brightness: bool,
    pub apply_contrast: bool,
    pub apply_hue: bool,
    pub apply_saturation: bool,
    pub apply_gamma: bool,
    pub apply_split: bool,
    pub show_reflective_ocean: bool,
    pub show_ocean_waves: bool,
    pub apply_clipping_planes: bool,
}

/// Per-draw uniform values, one slot entry per packed texture.
#[derive(Debug, Clone, Default)]
pub struct TileUniformValues {
    /// Relative-to-center basis: the mesh center in world space.
    pub rtc_center: DVec3,
    /// Tile rectangle in projected coordinates; only meaningful outside the
    /// 3D perspective mode.
    pub tile_rectangle: DVec4,
    /// Mercator south latitude and one-over-height, for the projected-V
    /// remap in 2D/Columbus view.
    pub south_and_north_latitude: DVec2,
    pub south_mercator_y_and_one_over_height: DVec2,
    pub minimum_maximum_height: DVec2,
    /// Undo matrix for quantized vertex attributes.
    pub scale_and_bias: DMat4,
    /// Sub-rectangle of texture coordinates when drawing an ancestor's
    /// geometry on a descendant's behalf; identity square otherwise.
    pub texture_coordinate_subset: DVec4,
    pub initial_color: DVec4,

    pub day_textures: Vec<TextureId>,
    pub day_texture_translation_and_scale: Vec<DVec4>,
    pub day_texture_tex_coords_rectangle: Vec<DVec4>,
    pub day_texture_use_web_mercator_t: Vec<bool>,
    pub day_texture_alpha: Vec<f64>,
    pub day_texture_brightness: Vec<f64>,
    pub day_texture_contrast: Vec<f64>,
    pub day_texture_hue: Vec<f64>,
    pub day_texture_saturation: Vec<f64>,
    pub day_texture_one_over_gamma: Vec<f64>,
    pub day_texture_split: Vec<f64>,

    pub water_mask: Option<TextureId>,
    pub water_mask_translation_and_scale: DVec4,
    pub clipping_planes_edge_color: DVec4,
    pub clipping_planes_edge_width: f64,
}

impl TileUniformValues {
    pub fn clear_textures(&mut self) {
        self.day_textures.clear();
        self.day_texture_translation_and_scale.clear();
        self.day_texture_tex_coords_rectangle.clear();
        self.day_texture_use_web_mercator_t.clear();
        self.day_texture_alpha.clear();
        self.day_texture_brightness.clear();
        self.day_texture_contrast.clear();
        self.day_texture_hue.clear();
        self.day_texture_saturation.clear();
        self.day_texture_one_over_gamma.clear();
        self.day_texture_split.clear();
    }
}

/// One batched submission: a tile's geometry with up to the texture budget
/// of composited imagery layers.
#[derive(Debug, Clone, Default)]
pub struct DrawCommand {
    pub vertex_array: Option<VertexArray>,
    pub pass: RenderPass,
    pub shader_flags: SurfaceShaderFlags,
    pub uniform_values: TileUniformValues,
    pub bounding_volume: OrientedBoundingBox,
    pub debug_show_bounding_volume: bool,
}

/// Commands are pooled per provider and reassigned each frame, never
/// reallocated, so a steady scene produces no per-frame allocation churn.
#[derive(Default)]
pub struct DrawCommandPool {
    commands: Vec<DrawCommand>,
    used: usize,
}

impl DrawCommandPool {
    pub fn begin_frame(&mut self) {
        self.used = 0;
    }

    /// Hands out the next reusable command, extending the pool on demand.
    pub fn next_command(&mut self) -> &mut DrawCommand {
        if self.used == self.commands.len() {
            self.commands.push(DrawCommand::default());
        }
        let command = &mut self.commands[self.used];
        self.used += 1;
        command.uniform_values.clear_textures();
        command.shader_flags = SurfaceShaderFlags::default();
        command.debug_show_bounding_volume = false;
        return command;
    }

    pub fn used_commands(&self) -> &[DrawCommand] {
        return &self.commands[..self.used];
    }

    pub fn capacity(&self) -> usize {
        return self.commands.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_reuses_command_objects_across_frames() {
        let mut pool = DrawCommandPool::default();
        pool.begin_frame();
        pool.next_command().shader_flags.texture_count = 4;
        pool.next_command();
        assert_eq!(pool.used_commands().len(), 2);
        assert_eq!(pool.capacity(), 2);

        pool.begin_frame();
        let first = pool.next_command();
        // Reassigned, not reallocated: per-frame state was reset.
        assert_eq!(first.shader_flags.texture_count, 0);
        assert_eq!(pool.capacity(), 2);
        assert_eq!(pool.used_commands().len(), 1);
    }
}
