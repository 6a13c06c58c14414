/// Identifies one node of the surface quadtree.
#[derive(Default, Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TileKey {
    pub x: u32,
    pub y: u32,
    pub level: u32,
}

impl TileKey {
    pub fn new(x: u32, y: u32, level: u32) -> Self {
        Self { x, y, level }
    }

    pub fn southwest(&self) -> TileKey {
        TileKey::new(self.x * 2, self.y * 2 + 1, self.level + 1)
    }

    pub fn southeast(&self) -> TileKey {
        TileKey::new(self.x * 2 + 1, self.y * 2 + 1, self.level + 1)
    }

    pub fn northwest(&self) -> TileKey {
        TileKey::new(self.x * 2, self.y * 2, self.level + 1)
    }

    pub fn northeast(&self) -> TileKey {
        TileKey::new(self.x * 2 + 1, self.y * 2, self.level + 1)
    }

    pub fn parent(&self) -> Option<TileKey> {
        if self.level == 0 {
            return None;
        }
        return Some(TileKey::new(self.x / 2, self.y / 2, self.level - 1));
    }

    /// True when `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &TileKey) -> bool {
        if other.level <= self.level {
            return false;
        }
        let shift = other.level - self.level;
        return (other.x >> shift) == self.x && (other.y >> shift) == self.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_and_parent_are_inverse() {
        let key = TileKey::new(5, 3, 4);
        for child in [
            key.northwest(),
            key.northeast(),
            key.southwest(),
            key.southeast(),
        ] {
            assert_eq!(child.parent(), Some(key));
            assert!(key.is_ancestor_of(&child));
        }
        assert_eq!(TileKey::new(0, 0, 0).parent(), None);
    }

    #[test]
    fn ancestry_spans_multiple_levels() {
        let root = TileKey::new(1, 0, 0);
        let deep = TileKey::new(0b1_0110, 0b0_1001, 4);
        assert!(root.is_ancestor_of(&deep));
        assert!(!root.is_ancestor_of(&root));
        assert!(!TileKey::new(0, 0, 0).is_ancestor_of(&deep));
    }

    #[test]
    fn random_descent_paths_stay_in_the_ancestry() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(99);
        for _ in 0..100 {
            let root = TileKey::new(rng.gen_range(0..2), 0, 0);
            let mut key = root;
            for _ in 0..12 {
                key = match rng.gen_range(0..4) {
                    0 => key.northwest(),
                    1 => key.northeast(),
                    2 => key.southwest(),
                    _ => key.southeast(),
                };
                assert!(root.is_ancestor_of(&key));
            }
            let mut up = key;
            while let Some(parent) = up.parent() {
                up = parent;
            }
            assert_eq!(up, root);
        }
    }
}
