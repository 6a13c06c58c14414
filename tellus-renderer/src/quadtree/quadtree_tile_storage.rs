use bevy::prelude::Resource;
use bevy::utils::HashMap;
use tellus_scene::{GeographicTilingScheme, TilingScheme};

use super::quadtree_tile::{Quadrant, QuadtreeTile};
use super::tile_key::TileKey;

/// A compass edge of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileEdge {
    West,
    South,
    East,
    North,
}

impl TileEdge {
    pub const ALL: [TileEdge; 4] = [
        TileEdge::West,
        TileEdge::South,
        TileEdge::East,
        TileEdge::North,
    ];

    pub fn opposite(&self) -> TileEdge {
        match self {
            TileEdge::West => TileEdge::East,
            TileEdge::South => TileEdge::North,
            TileEdge::East => TileEdge::West,
            TileEdge::North => TileEdge::South,
        }
    }
}

/// Owns every materialized tile, keyed by (x, y, level). Topology queries
/// (parent, children, compass neighbors) are key arithmetic plus map lookups,
/// so neighbors that were never materialized simply come back `None`.
#[derive(Resource)]
pub struct QuadtreeTileStorage {
    map: HashMap<TileKey, QuadtreeTile>,
    pub root: Vec<TileKey>,
    pub tiling_scheme: GeographicTilingScheme,
}

impl QuadtreeTileStorage {
    pub fn new(tiling_scheme: GeographicTilingScheme) -> Self {
        Self {
            map: HashMap::new(),
            root: vec![],
            tiling_scheme,
        }
    }

    pub fn len(&self) -> usize {
        return self.map.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.map.is_empty();
    }

    pub fn get(&self, key: &TileKey) -> Option<&QuadtreeTile> {
        return self.map.get(key);
    }

    pub fn get_mut(&mut self, key: &TileKey) -> Option<&mut QuadtreeTile> {
        return self.map.get_mut(key);
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        return self.map.contains_key(key);
    }

    pub fn keys(&self) -> impl Iterator<Item = &TileKey> {
        return self.map.keys();
    }

    pub fn add(&mut self, tile: QuadtreeTile) {
        if tile.parent.is_none() {
            self.root.push(tile.key);
        }
        self.map.insert(tile.key, tile);
    }

    pub fn remove(&mut self, key: &TileKey) -> Option<QuadtreeTile> {
        let removed = self.map.remove(key);
        if removed.is_some() {
            self.root.retain(|k| k != key);
        }
        return removed;
    }

    pub fn create_level_zero_tiles(&mut self) {
        let number_of_x = self.tiling_scheme.get_number_of_x_tiles_at_level(0);
        let number_of_y = self.tiling_scheme.get_number_of_y_tiles_at_level(0);
        for y in 0..number_of_y {
            for x in 0..number_of_x {
                let key = TileKey::new(x, y, 0);
                if self.contains(&key) {
                    continue;
                }
                let rectangle = self.tiling_scheme.tile_x_y_to_rectangle(x, y, 0);
                self.add(QuadtreeTile::new(
                    key,
                    Quadrant::Root(self.root.len()),
                    None,
                    rectangle,
                ));
            }
        }
    }

    /// Materializes the four children of `parent_key`.
    pub fn subdivide(&mut self, parent_key: &TileKey) {
        debug_assert!(self.contains(parent_key));
        for (child_key, location) in [
            (parent_key.northwest(), Quadrant::Northwest),
            (parent_key.northeast(), Quadrant::Northeast),
            (parent_key.southwest(), Quadrant::Southwest),
            (parent_key.southeast(), Quadrant::Southeast),
        ] {
            if self.contains(&child_key) {
                continue;
            }
            let rectangle = self.tiling_scheme.tile_x_y_to_rectangle(
                child_key.x,
                child_key.y,
                child_key.level,
            );
            self.add(QuadtreeTile::new(
                child_key,
                location,
                Some(*parent_key),
                rectangle,
            ));
        }
    }

    /// The same-level neighbor key across the given edge. East/west wrap
    /// around the antimeridian, including across level-zero root boundaries;
    /// north/south stop at the poles.
    pub fn neighbor_key(&self, key: &TileKey, edge: TileEdge) -> Option<TileKey> {
        let x_tiles = self.tiling_scheme.get_number_of_x_tiles_at_level(key.level);
        let y_tiles = self.tiling_scheme.get_number_of_y_tiles_at_level(key.level);
        match edge {
            TileEdge::West => {
                let x = if key.x == 0 { x_tiles - 1 } else { key.x - 1 };
                Some(TileKey::new(x, key.y, key.level))
            }
            TileEdge::East => {
                let x = if key.x + 1 == x_tiles { 0 } else { key.x + 1 };
                Some(TileKey::new(x, key.y, key.level))
            }
            TileEdge::North => {
                if key.y == 0 {
                    None
                } else {
                    Some(TileKey::new(key.x, key.y - 1, key.level))
                }
            }
            TileEdge::South => {
                if key.y + 1 == y_tiles {
                    None
                } else {
                    Some(TileKey::new(key.x, key.y + 1, key.level))
                }
            }
        }
    }

}

impl Default for QuadtreeTileStorage {
    fn default() -> Self {
        Self::new(GeographicTilingScheme::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_zero_creation_matches_the_scheme() {
        let mut storage = QuadtreeTileStorage::default();
        storage.create_level_zero_tiles();
        assert_eq!(storage.root.len(), 2);
        assert!(storage.contains(&TileKey::new(0, 0, 0)));
        assert!(storage.contains(&TileKey::new(1, 0, 0)));
    }

    #[test]
    fn east_west_neighbors_wrap_across_the_antimeridian() {
        let storage = QuadtreeTileStorage::default();
        let west_root = TileKey::new(0, 0, 0);
        let east_root = TileKey::new(1, 0, 0);
        assert_eq!(
            storage.neighbor_key(&west_root, TileEdge::West),
            Some(east_root)
        );
        assert_eq!(
            storage.neighbor_key(&east_root, TileEdge::East),
            Some(west_root)
        );

        // Also at deeper levels.
        let key = TileKey::new(0, 1, 2);
        assert_eq!(
            storage.neighbor_key(&key, TileEdge::West),
            Some(TileKey::new(7, 1, 2))
        );
    }

    #[test]
    fn poles_have_no_meridional_neighbors() {
        let storage = QuadtreeTileStorage::default();
        let north_edge_tile = TileKey::new(3, 0, 2);
        let south_edge_tile = TileKey::new(3, 3, 2);
        assert_eq!(storage.neighbor_key(&north_edge_tile, TileEdge::North), None);
        assert_eq!(storage.neighbor_key(&south_edge_tile, TileEdge::South), None);
        assert!(storage.neighbor_key(&north_edge_tile, TileEdge::South).is_some());
    }

    #[test]
    fn subdivision_links_children_to_their_parent() {
        let mut storage = QuadtreeTileStorage::default();
        storage.create_level_zero_tiles();
        let parent = TileKey::new(0, 0, 0);
        storage.subdivide(&parent);
        assert_eq!(storage.len(), 6);
        let child = storage.get(&parent.southeast()).unwrap();
        assert_eq!(child.parent, Some(parent));
        assert!(child.rectangle.east <= storage.get(&parent).unwrap().rectangle.east);
    }
}
