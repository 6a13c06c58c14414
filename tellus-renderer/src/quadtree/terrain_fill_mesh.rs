use bevy::math::{DVec2, DVec3};
use tellus_scene::{
    BoundingSphere, Cartographic, OrientedBoundingBox, Rectangle, TerrainEncoding, TerrainMesh,
    WebMercatorProjection,
};

use super::globe_surface_tile::compute_occludee_point;
use super::quadtree_tile_storage::{QuadtreeTileStorage, TileEdge};
use super::render_context::FrameState;
use super::tile_key::TileKey;
use super::tile_selection_result::TileSelectionResult;
use super::vertex_array::GpuResourceHub;

/// Two boundary vertices closer than this in local UV space collapse into
/// one; sub-pixel LOD mismatches otherwise produce zero-area fan triangles.
const VERTEX_MERGE_EPSILON: f64 = 1.0e-5;
/// How close to a corner a boundary vertex must be to serve as that corner.
const CORNER_EPSILON: f64 = 1.0e-4;

/// A synthesized placeholder mesh for a tile whose real geometry has not
/// arrived: a closed ring of boundary vertices stitched from whatever
/// neighbors are on screen, fanned around one center vertex. Cached until a
/// neighbor's render state changes.
#[derive(Default)]
pub struct TerrainFillMesh {
    pub mesh: Option<TerrainMesh>,
    pub vertex_array: Option<super::vertex_array::VertexArray>,
    pub last_updated_frame: Option<u32>,
    /// Rebuild counter, so fills stitched from this fill notice changes.
    pub revision: u32,
    /// What each edge was stitched from at the last build, with a content
    /// fingerprint per source.
    edge_sources: [Vec<(TileKey, u64)>; 4],
}

impl TerrainFillMesh {
    pub fn destroy(&mut self, gpu: &mut GpuResourceHub) {
        if let Some(vertex_array) = self.vertex_array.take() {
            gpu.destroy_vertex_array(vertex_array);
        }
        self.mesh = None;
    }
}

/// One boundary vertex collected while stitching an edge. Positions are
/// derived from the clamped UV and height, so the boundary lands exactly on
/// the tile's edge lines.
#[derive(Clone, Copy, Debug, PartialEq)]
struct FillVertex {
    uv: DVec2,
    height: f64,
    web_mercator_t: f64,
}

/// Transient per-edge vertex collection; cleared and reused across edges
/// within one build, never persisted.
#[derive(Default)]
struct EdgeDetails {
    vertices: Vec<FillVertex>,
}

/// Builds or refreshes the fill mesh for `tile_key`. No-op when the stitch
/// sources are unchanged since the last build.
pub fn update_fill(
    storage: &mut QuadtreeTileStorage,
    tile_key: &TileKey,
    frame_state: &FrameState,
    gpu: &mut GpuResourceHub,
    has_web_mercator_t: bool,
) {
    let frame_number = frame_state.frame_number;
    let mut sources: [Vec<(TileKey, u64)>; 4] = Default::default();
    for (i, edge) in TileEdge::ALL.iter().enumerate() {
        collect_edge_sources(storage, tile_key, *edge, frame_number, &mut sources[i]);
    }

    if let Some(fill) = storage.get(tile_key).and_then(|tile| tile.data.fill.as_ref()) {
        if fill.mesh.is_some() && fill.edge_sources == sources {
            return;
        }
    }

    let tile = storage.get(tile_key).unwrap();
    let rectangle = tile.rectangle;
    let known_region_heights = tile
        .data
        .tile_bounding_region
        .as_ref()
        .map(|region| (region.minimum_height, region.maximum_height))
        .unwrap_or((0.0, 0.0));

    // Gather the four edge runs in ring order: west north-to-south, south
    // west-to-east, east south-to-north, north east-to-west.
    let mut edge_details = EdgeDetails::default();
    let mut runs: [Vec<FillVertex>; 4] = Default::default();
    for (i, edge) in TileEdge::ALL.iter().enumerate() {
        edge_details.vertices.clear();
        for (source_key, _) in &sources[i] {
            append_edge_vertices(storage, &rectangle, *edge, source_key, &mut edge_details);
        }
        dedup_consecutive(&mut edge_details.vertices);
        runs[i] = std::mem::take(&mut edge_details.vertices);
    }

    let mesh = build_fan_mesh(
        &rectangle,
        &runs,
        known_region_heights,
        frame_state,
        has_web_mercator_t,
    );
    let vertex_array = gpu.create_vertex_array(&mesh);

    let tile = storage.get_mut(tile_key).unwrap();
    let fill = tile.data.fill.get_or_insert_with(TerrainFillMesh::default);
    if let Some(previous) = fill.vertex_array.take() {
        gpu.destroy_vertex_array(previous);
    }
    fill.mesh = Some(mesh);
    fill.vertex_array = Some(vertex_array);
    fill.last_updated_frame = Some(frame_number);
    fill.revision = fill.revision.wrapping_add(1);
    fill.edge_sources = sources;
}

/// Finds the tiles whose rendered geometry borders `edge` this frame, in
/// boundary-walk order. Iterative with an explicit work stack so the depth
/// of the neighbor subtree never grows the call stack.
fn collect_edge_sources(
    storage: &QuadtreeTileStorage,
    tile_key: &TileKey,
    edge: TileEdge,
    frame_number: u32,
    out: &mut Vec<(TileKey, u64)>,
) {
    let Some(start) = storage.neighbor_key(tile_key, edge) else {
        // No neighbor at all (pole); the edge contributes nothing.
        return;
    };

    // (key, may_climb): only the entry tile may substitute an ancestor; a
    // refined descendant that is not on screen just leaves a gap.
    let mut stack: Vec<(TileKey, bool)> = vec![(start, true)];
    while let Some((key, may_climb)) = stack.pop() {
        let state = storage.get(&key).and_then(|tile| {
            if tile.last_selection_result_frame == Some(frame_number) {
                Some(tile.last_selection_result)
            } else {
                None
            }
        });
        match state {
            Some(TileSelectionResult::RENDERED) => {
                out.push((key, source_fingerprint(storage, &key)));
            }
            Some(TileSelectionResult::REFINED) => {
                let children = edge_children_in_traversal_order(&key, edge);
                // Reverse push so the first child pops first.
                stack.push((children[1], false));
                stack.push((children[0], false));
            }
            _ => {
                // Not visited this frame, culled, or kicked.
                if may_climb {
                    let mut ancestor = key.parent();
                    while let Some(ancestor_key) = ancestor {
                        if let Some(tile) = storage.get(&ancestor_key) {
                            if tile.last_selection_result_frame == Some(frame_number)
                                && tile.last_selection_result == TileSelectionResult::RENDERED
                            {
                                out.push((
                                    ancestor_key,
                                    source_fingerprint(storage, &ancestor_key),
                                ));
                                break;
                            }
                        }
                        ancestor = ancestor_key.parent();
                    }
                }
            }
        }
    }
}

/// Content fingerprint of a source tile's renderable geometry: real meshes
/// are immutable once built, fills carry a revision counter.
fn source_fingerprint(storage: &QuadtreeTileStorage, key: &TileKey) -> u64 {
    let Some(tile) = storage.get(key) else {
        return 0;
    };
    if tile.data.has_mesh() {
        return 1;
    }
    if let Some(fill) = tile.data.fill.as_ref() {
        return (1 << 32) | fill.revision as u64;
    }
    return 0;
}

/// The two children of the neighbor across `edge` that touch our tile,
/// ordered along our boundary walk of that edge.
fn edge_children_in_traversal_order(neighbor: &TileKey, edge: TileEdge) -> [TileKey; 2] {
    match edge {
        // Our west edge runs north to south; the west neighbor touches us
        // with its eastern children.
        TileEdge::West => [neighbor.northeast(), neighbor.southeast()],
        // South edge runs west to east; its northern children touch us.
        TileEdge::South => [neighbor.northwest(), neighbor.northeast()],
        // East edge runs south to north; its western children touch us.
        TileEdge::East => [neighbor.southwest(), neighbor.northwest()],
        // North edge runs east to west; its southern children touch us.
        TileEdge::North => [neighbor.southeast(), neighbor.southwest()],
    }
}

/// Projects one source tile's far-edge vertices onto our edge's UV
/// parameterization and appends the ones that land on it.
fn append_edge_vertices(
    storage: &QuadtreeTileStorage,
    our_rectangle: &Rectangle,
    edge: TileEdge,
    source_key: &TileKey,
    details: &mut EdgeDetails,
) {
    let Some(source_tile) = storage.get(source_key) else {
        return;
    };
    let Some(mesh) = source_tile.data.get_renderable_mesh() else {
        return;
    };
    let source_rectangle = source_tile.rectangle;

    let edge_indices: &[u32] = match edge {
        TileEdge::West => &mesh.east_indices_north_to_south,
        TileEdge::South => &mesh.north_indices_west_to_east,
        TileEdge::East => &mesh.west_indices_south_to_north,
        TileEdge::North => &mesh.south_indices_east_to_west,
    };

    let our_width = our_rectangle.compute_width();
    let our_height = our_rectangle.compute_height();
    let source_width = source_rectangle.compute_width();
    let source_height = source_rectangle.compute_height();

    for index in edge_indices {
        let index = *index as usize;
        let source_uv = mesh.encoding.decode_texture_coordinates(&mesh.vertices, index);
        let height = mesh.encoding.decode_height(&mesh.vertices, index);

        // Only the along-edge coordinate survives projection; the across
        // coordinate pins to the edge line. Latitudes and longitudes agree
        // on both sides, so the mapping never crosses the antimeridian.
        let uv = match edge {
            TileEdge::West | TileEdge::East => {
                let latitude = source_rectangle.south + source_uv.y * source_height;
                let v = (latitude - our_rectangle.south) / our_height;
                DVec2::new(if edge == TileEdge::West { 0.0 } else { 1.0 }, v)
            }
            TileEdge::South | TileEdge::North => {
                let longitude = source_rectangle.west + source_uv.x * source_width;
                let u = (longitude - our_rectangle.west) / our_width;
                DVec2::new(u, if edge == TileEdge::South { 0.0 } else { 1.0 })
            }
        };

        let along = if matches!(edge, TileEdge::West | TileEdge::East) {
            uv.y
        } else {
            uv.x
        };
        if !(-CORNER_EPSILON..=1.0 + CORNER_EPSILON).contains(&along) {
            continue;
        }
        let uv = uv.clamp(DVec2::ZERO, DVec2::ONE);

        details.vertices.push(FillVertex {
            uv,
            height,
            web_mercator_t: 0.0,
        });
    }
}

fn dedup_consecutive(vertices: &mut Vec<FillVertex>) {
    vertices.dedup_by(|a, b| a.uv.distance_squared(b.uv) < VERTEX_MERGE_EPSILON * VERTEX_MERGE_EPSILON);
}

/// Assembles the closed boundary ring (reconciling corners), adds the center
/// vertex, fans, and encodes the result as a full terrain mesh.
fn build_fan_mesh(
    rectangle: &Rectangle,
    runs: &[Vec<FillVertex>; 4],
    known_region_heights: (f64, f64),
    frame_state: &FrameState,
    has_web_mercator_t: bool,
) -> TerrainMesh {
    let contributed: Vec<&FillVertex> = runs.iter().flatten().collect();
    let (minimum_height, maximum_height) = if contributed.is_empty() {
        known_region_heights
    } else {
        contributed.iter().fold(
            (f64::MAX, f64::MIN),
            |(minimum, maximum), vertex| (minimum.min(vertex.height), maximum.max(vertex.height)),
        )
    };
    let middle_height = (minimum_height + maximum_height) * 0.5;

    // Ring order west, south, east, north; each edge starts at its first
    // corner: NW, SW, SE, NE.
    let corners = [
        DVec2::new(0.0, 1.0),
        DVec2::new(0.0, 0.0),
        DVec2::new(1.0, 0.0),
        DVec2::new(1.0, 1.0),
    ];
    let mut ring: Vec<FillVertex> = vec![];
    for (run, corner) in runs.iter().zip(corners) {
        let run_starts_at_corner = run
            .first()
            .map_or(false, |vertex| vertex.uv.distance(corner) < CORNER_EPSILON);
        let previous_is_corner = ring
            .last()
            .map_or(false, |vertex| vertex.uv.distance(corner) < CORNER_EPSILON);
        if !run_starts_at_corner && !previous_is_corner {
            ring.push(FillVertex {
                uv: corner,
                height: middle_height,
                web_mercator_t: 0.0,
            });
        }
        for vertex in run {
            if let Some(previous) = ring.last() {
                if previous.uv.distance_squared(vertex.uv)
                    < VERTEX_MERGE_EPSILON * VERTEX_MERGE_EPSILON
                {
                    continue;
                }
            }
            ring.push(*vertex);
        }
    }
    // Close the loop: the north run may end back at the northwest corner.
    while ring.len() > 3 {
        let first = ring[0];
        let last = *ring.last().unwrap();
        if last.uv.distance_squared(first.uv) < VERTEX_MERGE_EPSILON * VERTEX_MERGE_EPSILON {
            ring.pop();
        } else {
            break;
        }
    }

    let center_vertex = FillVertex {
        uv: DVec2::new(0.5, 0.5),
        height: middle_height,
        web_mercator_t: 0.0,
    };

    let ellipsoid = &frame_state.occluder.ellipsoid;
    let south_mercator =
        WebMercatorProjection::geodetic_latitude_to_mercator_angle(rectangle.south);
    let north_mercator =
        WebMercatorProjection::geodetic_latitude_to_mercator_angle(rectangle.north);
    let one_over_mercator_height = 1.0 / (north_mercator - south_mercator);

    let width = rectangle.compute_width();
    let height = rectangle.compute_height();
    let position_of = |vertex: &FillVertex| -> DVec3 {
        let longitude = rectangle.west + vertex.uv.x * width;
        let latitude = rectangle.south + vertex.uv.y * height;
        return ellipsoid.cartographic_to_cartesian(&Cartographic::new(
            longitude,
            latitude,
            vertex.height,
        ));
    };
    let mercator_t_of = |vertex: &FillVertex| -> f64 {
        let latitude = rectangle.south + vertex.uv.y * height;
        return ((WebMercatorProjection::geodetic_latitude_to_mercator_angle(latitude)
            - south_mercator)
            * one_over_mercator_height)
            .clamp(0.0, 1.0);
    };

    let mut positions: Vec<DVec3> = ring.iter().map(&position_of).collect();
    positions.push(position_of(&center_vertex));

    let bounding_sphere = BoundingSphere::from_points(&positions);
    let encoding = TerrainEncoding::new(
        bounding_sphere.center,
        None,
        Some(minimum_height),
        Some(maximum_height),
        None,
        false,
        Some(has_web_mercator_t),
    );

    let mut vertices: Vec<f32> = Vec::with_capacity(positions.len() * encoding.stride as usize);
    for (vertex, position) in ring.iter().chain(std::iter::once(&center_vertex)).zip(&positions) {
        let web_mercator_t = if has_web_mercator_t {
            Some(mercator_t_of(vertex))
        } else {
            None
        };
        encoding.encode(
            &mut vertices,
            *position,
            vertex.uv,
            vertex.height,
            None,
            web_mercator_t,
        );
    }

    let ring_len = ring.len() as u32;
    let center_index = ring_len;
    let mut indices: Vec<u32> = Vec::with_capacity(ring.len() * 3);
    for i in 0..ring_len {
        indices.extend_from_slice(&[i, (i + 1) % ring_len, center_index]);
    }

    // Boundary index runs for whoever stitches from this fill later.
    let mut west: Vec<u32> = vec![];
    let mut south: Vec<u32> = vec![];
    let mut east: Vec<u32> = vec![];
    let mut north: Vec<u32> = vec![];
    for (i, vertex) in ring.iter().enumerate() {
        if vertex.uv.x < CORNER_EPSILON {
            west.push(i as u32);
        }
        if vertex.uv.x > 1.0 - CORNER_EPSILON {
            east.push(i as u32);
        }
        if vertex.uv.y < CORNER_EPSILON {
            south.push(i as u32);
        }
        if vertex.uv.y > 1.0 - CORNER_EPSILON {
            north.push(i as u32);
        }
    }
    let v_of = |i: &u32| ring[*i as usize].uv.y;
    let u_of = |i: &u32| ring[*i as usize].uv.x;
    west.sort_by(|a, b| v_of(a).total_cmp(&v_of(b)));
    east.sort_by(|a, b| v_of(b).total_cmp(&v_of(a)));
    south.sort_by(|a, b| u_of(b).total_cmp(&u_of(a)));
    north.sort_by(|a, b| u_of(a).total_cmp(&u_of(b)));

    let oriented_bounding_box = OrientedBoundingBox::from_rectangle(
        rectangle,
        Some(minimum_height),
        Some(maximum_height),
        Some(ellipsoid),
    );
    let occludee_point_in_scaled_space = compute_occludee_point(
        &frame_state.occluder,
        &oriented_bounding_box.center,
        rectangle,
        minimum_height,
        maximum_height,
    );

    return TerrainMesh {
        center: bounding_sphere.center,
        vertices,
        indices,
        minimum_height,
        maximum_height,
        bounding_sphere_3d: bounding_sphere,
        oriented_bounding_box,
        occludee_point_in_scaled_space,
        encoding,
        west_indices_south_to_north: west,
        south_indices_east_to_west: south,
        east_indices_north_to_south: east,
        north_indices_west_to_east: north,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadtree::globe_surface_tile::TerrainState;
    use crate::quadtree::quadtree_tile::{Quadrant, QuadtreeTile};
    use bevy::utils::HashSet;
    use tellus_scene::{EllipsoidTerrainProvider, TerrainProvider, TilingScheme};

    fn storage_with_roots() -> QuadtreeTileStorage {
        let mut storage = QuadtreeTileStorage::default();
        storage.create_level_zero_tiles();
        return storage;
    }

    fn materialize(storage: &mut QuadtreeTileStorage, key: TileKey) {
        if storage.contains(&key) {
            return;
        }
        if let Some(parent) = key.parent() {
            materialize(storage, parent);
            storage.subdivide(&parent);
        } else {
            let rectangle = storage.tiling_scheme.tile_x_y_to_rectangle(key.x, key.y, key.level);
            storage.add(QuadtreeTile::new(key, Quadrant::Root(0), None, rectangle));
        }
    }

    fn give_mesh(storage: &mut QuadtreeTileStorage, key: TileKey) {
        let provider = EllipsoidTerrainProvider::new();
        let mut data = provider
            .request_tile_geometry(key.x, key.y, key.level)
            .unwrap();
        let scheme = storage.tiling_scheme.clone();
        data.create_mesh(&scheme, key.x, key.y, key.level, 1.0, false);
        let tile = storage.get_mut(&key).unwrap();
        tile.data.terrain_data = Some(data);
        tile.data.terrain_state = TerrainState::READY;
    }

    fn mark_rendered(storage: &mut QuadtreeTileStorage, key: TileKey, frame: u32) {
        storage
            .get_mut(&key)
            .unwrap()
            .mark_selection_result(frame, TileSelectionResult::RENDERED);
    }

    fn mark_refined(storage: &mut QuadtreeTileStorage, key: TileKey, frame: u32) {
        storage
            .get_mut(&key)
            .unwrap()
            .mark_selection_result(frame, TileSelectionResult::REFINED);
    }

    fn fan_is_closed(mesh: &TerrainMesh) {
        let vertex_count = mesh.vertex_count() as u32;
        let ring_len = vertex_count - 1;
        assert_eq!(mesh.indices.len(), 3 * ring_len as usize);
        let center = ring_len;
        let mut boundary_edges: HashSet<(u32, u32)> = HashSet::default();
        for triangle in mesh.indices.chunks(3) {
            // The center vertex appears in every triangle.
            assert!(triangle.contains(&center));
            let boundary: Vec<u32> = triangle
                .iter()
                .copied()
                .filter(|i| *i != center)
                .collect();
            assert_eq!(boundary.len(), 2);
            // Every boundary edge appears exactly once.
            assert!(boundary_edges.insert((boundary[0], boundary[1])));
        }
        // And the boundary edges chain through every ring vertex.
        assert_eq!(boundary_edges.len(), ring_len as usize);
    }

    #[test]
    fn no_neighbors_degenerates_to_a_flat_quad() {
        let mut storage = storage_with_roots();
        let target = TileKey::new(1, 1, 2);
        materialize(&mut storage, target);
        let frame_state =
            FrameState::looking_down_at(&Cartographic::from_degrees(0.0, 0.0, 1.0e6), 10);
        let mut gpu = GpuResourceHub::new();
        update_fill(&mut storage, &target, &frame_state, &mut gpu, false);

        let tile = storage.get(&target).unwrap();
        let mesh = tile.data.fill.as_ref().unwrap().mesh.as_ref().unwrap();
        // Four synthesized corners plus the center.
        assert_eq!(mesh.vertex_count(), 5);
        fan_is_closed(mesh);
        assert_eq!(mesh.minimum_height, 0.0);
        assert_eq!(mesh.maximum_height, 0.0);
    }

    #[test]
    fn west_and_south_neighbors_contribute_their_edges() {
        // Scenario: a tile on the northern tiling boundary; its west neighbor
        // was rendered at a coarser level, its south neighbor at its own
        // level, and the east neighbor was never visited.
        let mut storage = storage_with_roots();
        let frame = 42;
        let target = TileKey::new(2, 0, 2);
        materialize(&mut storage, target);

        // West neighbor (1, 0, 2) is not on screen, but its parent is; the
        // parent's east edge coincides with the target's west edge.
        let west_parent = TileKey::new(0, 0, 1);
        materialize(&mut storage, west_parent);
        give_mesh(&mut storage, west_parent);
        mark_rendered(&mut storage, west_parent, frame);
        mark_refined(&mut storage, TileKey::new(0, 0, 0), frame);

        // South neighbor rendered at the same level.
        let south = TileKey::new(2, 1, 2);
        materialize(&mut storage, south);
        give_mesh(&mut storage, south);
        mark_rendered(&mut storage, south, frame);

        let frame_state =
            FrameState::looking_down_at(&Cartographic::from_degrees(0.0, 80.0, 1.0e6), frame);
        let mut gpu = GpuResourceHub::new();
        update_fill(&mut storage, &target, &frame_state, &mut gpu, false);

        let tile = storage.get(&target).unwrap();
        let mesh = tile.data.fill.as_ref().unwrap().mesh.as_ref().unwrap();
        fan_is_closed(mesh);

        // The west and south edges picked up real neighbor vertices; the
        // north (pole) and east (unvisited) edges got corners only.
        assert!(mesh.west_indices_south_to_north.len() > 2);
        assert!(mesh.south_indices_east_to_west.len() > 2);
        assert_eq!(mesh.north_indices_west_to_east.len(), 2);
        assert_eq!(mesh.east_indices_north_to_south.len(), 2);
    }

    #[test]
    fn refined_neighbors_contribute_their_rendered_children() {
        let mut storage = storage_with_roots();
        let frame = 7;
        let target = TileKey::new(2, 1, 2);
        materialize(&mut storage, target);

        // West neighbor refined; both of its eastern children rendered.
        let west = TileKey::new(1, 1, 2);
        materialize(&mut storage, west);
        storage.subdivide(&west);
        mark_refined(&mut storage, west, frame);
        for child in [west.northeast(), west.southeast()] {
            give_mesh(&mut storage, child);
            mark_rendered(&mut storage, child, frame);
        }

        let frame_state =
            FrameState::looking_down_at(&Cartographic::from_degrees(0.0, 20.0, 1.0e6), frame);
        let mut gpu = GpuResourceHub::new();
        update_fill(&mut storage, &target, &frame_state, &mut gpu, false);

        let tile = storage.get(&target).unwrap();
        let mesh = tile.data.fill.as_ref().unwrap().mesh.as_ref().unwrap();
        fan_is_closed(mesh);
        // Two 16-vertex child edges minus the shared corner vertex.
        assert!(mesh.west_indices_south_to_north.len() > 16);
    }

    #[test]
    fn kicked_neighbors_fall_back_to_a_rendered_ancestor() {
        let mut storage = storage_with_roots();
        let frame = 3;
        let target = TileKey::new(1, 1, 2);
        materialize(&mut storage, target);

        let west = TileKey::new(0, 1, 2);
        materialize(&mut storage, west);
        give_mesh(&mut storage, west);
        storage
            .get_mut(&west)
            .unwrap()
            .mark_selection_result(frame, TileSelectionResult::RENDERED_AND_KICKED);
        let west_parent = west.parent().unwrap();
        give_mesh(&mut storage, west_parent);
        mark_rendered(&mut storage, west_parent, frame);

        let mut sources = vec![];
        collect_edge_sources(&storage, &target, TileEdge::West, frame, &mut sources);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].0, west_parent);
    }

    #[test]
    fn collection_is_idempotent_for_unchanged_neighbor_state() {
        let mut storage = storage_with_roots();
        let frame = 11;
        let target = TileKey::new(1, 1, 2);
        materialize(&mut storage, target);
        let south = TileKey::new(1, 2, 2);
        materialize(&mut storage, south);
        give_mesh(&mut storage, south);
        mark_rendered(&mut storage, south, frame);

        let frame_state =
            FrameState::looking_down_at(&Cartographic::from_degrees(0.0, 10.0, 1.0e6), frame);
        let mut gpu = GpuResourceHub::new();
        update_fill(&mut storage, &target, &frame_state, &mut gpu, false);
        let first_vertices = {
            let tile = storage.get(&target).unwrap();
            let fill = tile.data.fill.as_ref().unwrap();
            (
                fill.revision,
                fill.mesh.as_ref().unwrap().vertices.clone(),
            )
        };

        // Same neighbor state: the cached fill must be reused untouched.
        update_fill(&mut storage, &target, &frame_state, &mut gpu, false);
        {
            let tile = storage.get(&target).unwrap();
            let fill = tile.data.fill.as_ref().unwrap();
            assert_eq!(fill.revision, first_vertices.0);
            assert_eq!(fill.mesh.as_ref().unwrap().vertices, first_vertices.1);
        }

        // Force a rebuild with identical inputs: the output is identical.
        storage.get_mut(&target).unwrap().data.fill = None;
        update_fill(&mut storage, &target, &frame_state, &mut gpu, false);
        let tile = storage.get(&target).unwrap();
        let fill = tile.data.fill.as_ref().unwrap();
        assert_eq!(fill.mesh.as_ref().unwrap().vertices, first_vertices.1);
    }
}
