use bevy::prelude::Resource;
use bevy::utils::HashMap;
use tellus_scene::TerrainMesh;

/// Opaque handle to a device buffer owned by the render backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Opaque handle to a device texture owned by the render backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// A tile's uploaded geometry. Index buffers may be shared between many
/// vertex arrays (all full-grid tiles of one provider use the same index
/// layout), so they are reference counted in the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexArray {
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub index_count: u32,
}

/// Bookkeeping for device resources this core creates. Actual allocation and
/// upload happen in the render backend; here we only track identity,
/// sharing, and the deferred destruction queue.
///
/// Destruction is never immediate: a buffer released mid-frame may still be
/// referenced by an in-flight draw command, so it is queued and freed at the
/// start of the next frame's update, after the previous frame's commands
/// were submitted.
#[derive(Resource, Default)]
pub struct GpuResourceHub {
    next_id: u64,
    index_buffer_reference_counts: HashMap<BufferId, u32>,
    grid_index_buffers: HashMap<(u32, u32), BufferId>,
    destroy_queue: Vec<BufferId>,
    freed_buffer_count: u64,
}

impl GpuResourceHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        return self.next_id;
    }

    pub fn create_vertex_buffer(&mut self, _bytes: &[u8]) -> BufferId {
        let id = BufferId(self.allocate_id());
        return id;
    }

    pub fn create_index_buffer(&mut self, _bytes: &[u8]) -> BufferId {
        let id = BufferId(self.allocate_id());
        self.index_buffer_reference_counts.insert(id, 1);
        return id;
    }

    pub fn create_texture(&mut self) -> TextureId {
        return TextureId(self.allocate_id());
    }

    /// The shared index buffer for a regular `width` x `height` grid,
    /// creating it on first use. Each caller owns one reference.
    pub fn shared_grid_index_buffer(&mut self, width: u32, height: u32, bytes: &[u8]) -> BufferId {
        if let Some(id) = self.grid_index_buffers.get(&(width, height)).copied() {
            self.add_index_buffer_reference(id);
            return id;
        }
        let id = self.create_index_buffer(bytes);
        self.grid_index_buffers.insert((width, height), id);
        return id;
    }

    pub fn add_index_buffer_reference(&mut self, id: BufferId) {
        if let Some(count) = self.index_buffer_reference_counts.get_mut(&id) {
            *count += 1;
        }
    }

    pub fn index_buffer_reference_count(&self, id: BufferId) -> u32 {
        return self
            .index_buffer_reference_counts
            .get(&id)
            .copied()
            .unwrap_or(0);
    }

    /// Uploads a mesh whose index buffer is unique to it (fill meshes).
    pub fn create_vertex_array(&mut self, mesh: &TerrainMesh) -> VertexArray {
        let vertex_buffer = self.create_vertex_buffer(bytemuck::cast_slice(&mesh.vertices));
        let index_buffer = self.create_index_buffer(bytemuck::cast_slice(&mesh.indices));
        return VertexArray {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        };
    }

    /// Uploads a grid mesh, sharing the index buffer with every other grid
    /// of the same dimensions.
    pub fn create_grid_vertex_array(
        &mut self,
        mesh: &TerrainMesh,
        width: u32,
        height: u32,
    ) -> VertexArray {
        let vertex_buffer = self.create_vertex_buffer(bytemuck::cast_slice(&mesh.vertices));
        let index_buffer = self.shared_grid_index_buffer(
            width,
            height,
            bytemuck::cast_slice(&mesh.indices),
        );
        return VertexArray {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        };
    }

    /// Schedules a vertex array's buffers for destruction. The shared index
    /// buffer is only queued once its last reference is gone.
    pub fn destroy_vertex_array(&mut self, vertex_array: VertexArray) {
        self.destroy_queue.push(vertex_array.vertex_buffer);
        let remaining = {
            let count = self
                .index_buffer_reference_counts
                .get_mut(&vertex_array.index_buffer);
            match count {
                Some(count) => {
                    *count = count.saturating_sub(1);
                    *count
                }
                None => 0,
            }
        };
        if remaining == 0 {
            self.index_buffer_reference_counts
                .remove(&vertex_array.index_buffer);
            self.grid_index_buffers
                .retain(|_, id| *id != vertex_array.index_buffer);
            self.destroy_queue.push(vertex_array.index_buffer);
        }
    }

    /// Frees everything queued since the last call. Invoked at the start of
    /// each frame's update, before any new commands reference buffers.
    pub fn process_destroy_queue(&mut self) -> usize {
        let freed = self.destroy_queue.len();
        self.freed_buffer_count += freed as u64;
        self.destroy_queue.clear();
        return freed;
    }

    pub fn pending_destroy_count(&self) -> usize {
        return self.destroy_queue.len();
    }

    pub fn freed_buffer_count(&self) -> u64 {
        return self.freed_buffer_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tellus_scene::{GeographicTilingScheme, HeightmapTerrainData};

    fn grid_mesh() -> TerrainMesh {
        let mut data = HeightmapTerrainData::new(vec![0.0; 16], 4, 4, 0.0, 0.0, false);
        let scheme = GeographicTilingScheme::default();
        return data.create_mesh(&scheme, 0, 0, 1, 1.0, false).clone();
    }

    #[test]
    fn grid_index_buffers_are_shared_and_reference_counted() {
        let mut hub = GpuResourceHub::new();
        let mesh = grid_mesh();
        let a = hub.create_grid_vertex_array(&mesh, 4, 4);
        let b = hub.create_grid_vertex_array(&mesh, 4, 4);
        assert_eq!(a.index_buffer, b.index_buffer);
        assert_ne!(a.vertex_buffer, b.vertex_buffer);
        assert_eq!(hub.index_buffer_reference_count(a.index_buffer), 2);

        hub.destroy_vertex_array(a);
        // Shared index buffer survives the first destroy.
        assert_eq!(hub.pending_destroy_count(), 1);
        assert_eq!(hub.index_buffer_reference_count(b.index_buffer), 1);

        hub.destroy_vertex_array(b);
        assert_eq!(hub.pending_destroy_count(), 3);
        assert_eq!(hub.index_buffer_reference_count(b.index_buffer), 0);
    }

    #[test]
    fn destruction_is_deferred_until_the_queue_is_processed() {
        let mut hub = GpuResourceHub::new();
        let mesh = grid_mesh();
        let a = hub.create_vertex_array(&mesh);
        hub.destroy_vertex_array(a);
        assert_eq!(hub.pending_destroy_count(), 2);
        assert_eq!(hub.process_destroy_queue(), 2);
        assert_eq!(hub.pending_destroy_count(), 0);
        assert_eq!(hub.freed_buffer_count(), 2);
    }
}
