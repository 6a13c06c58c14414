use bevy::math::DVec3;

use crate::{BoundingSphere, OrientedBoundingBox, TerrainEncoding};

/// A renderable tile mesh: packed vertices plus everything the per-frame
/// pipeline needs without touching the vertex data again (bounds, occlusion
/// point) and the four edge index runs neighboring tiles stitch from.
///
/// Edge runs are ordered the way a counter-clockwise walk around a
/// *neighboring* tile would consume them: a tile's east edge north-to-south
/// feeds its eastern neighbor's west edge, and so on.
#[derive(Default, Clone, Debug)]
pub struct TerrainMesh {
    pub center: DVec3,
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    pub minimum_height: f64,
    pub maximum_height: f64,
    pub bounding_sphere_3d: BoundingSphere,
    pub oriented_bounding_box: OrientedBoundingBox,
    pub occludee_point_in_scaled_space: Option<DVec3>,
    pub encoding: TerrainEncoding,
    pub west_indices_south_to_north: Vec<u32>,
    pub south_indices_east_to_west: Vec<u32>,
    pub east_indices_north_to_south: Vec<u32>,
    pub north_indices_west_to_east: Vec<u32>,
}

impl TerrainMesh {
    pub fn vertex_count(&self) -> usize {
        if self.encoding.stride == 0 {
            return 0;
        }
        return self.vertices.len() / self.encoding.stride as usize;
    }

    pub fn triangle_count(&self) -> usize {
        return self.indices.len() / 3;
    }

    /// The raw bytes a vertex buffer upload wants.
    pub fn vertex_bytes(&self) -> &[u8] {
        return bytemuck::cast_slice(&self.vertices);
    }

    pub fn index_bytes(&self) -> &[u8] {
        return bytemuck::cast_slice(&self.indices);
    }
}
