use bevy::math::DVec4;
use tellus_scene::{BoundingVolume, Intersect, Plane};

/// User-supplied clip planes applied to the whole surface. Geometry on the
/// positive side of a plane is kept. With `union_clipping_regions` unset the
/// kept region is the intersection of all half-spaces; set, their union.
#[derive(Clone, Debug)]
pub struct ClippingPlaneCollection {
    pub planes: Vec<Plane>,
    pub enabled: bool,
    pub union_clipping_regions: bool,
    pub edge_color: DVec4,
    pub edge_width: f64,
    /// Phase of the highlighted-edge animation, advanced once per frame.
    edge_animation_phase: f64,
}

impl Default for ClippingPlaneCollection {
    fn default() -> Self {
        Self {
            planes: vec![],
            enabled: true,
            union_clipping_regions: false,
            edge_color: DVec4::new(1.0, 1.0, 1.0, 1.0),
            edge_width: 0.0,
            edge_animation_phase: 0.0,
        }
    }
}

impl ClippingPlaneCollection {
    pub fn new(planes: Vec<Plane>) -> Self {
        Self {
            planes,
            ..Default::default()
        }
    }

    pub fn is_active(&self) -> bool {
        return self.enabled && !self.planes.is_empty();
    }

    /// Advances per-frame animation state. Called from the begin-frame hook.
    pub fn update(&mut self, _frame_number: u32) {
        self.edge_animation_phase = (self.edge_animation_phase + 0.01) % 1.0;
    }

    pub fn edge_animation_phase(&self) -> f64 {
        return self.edge_animation_phase;
    }

    /// Classifies a bounding volume against the kept region: OUTSIDE means
    /// entirely clipped away.
    pub fn classify(&self, volume: &dyn BoundingVolume) -> Intersect {
        if !self.is_active() {
            return Intersect::INSIDE;
        }
        let mut inside_count = 0;
        let mut outside_count = 0;
        for plane in &self.planes {
            match volume.intersect_plane(plane) {
                Intersect::INSIDE => inside_count += 1,
                Intersect::OUTSIDE => outside_count += 1,
                Intersect::INTERSECTING => {}
            }
        }
        let total = self.planes.len();
        if self.union_clipping_regions {
            // Kept if inside any half-space.
            if inside_count > 0 {
                return Intersect::INSIDE;
            }
            if outside_count == total {
                return Intersect::OUTSIDE;
            }
        } else {
            // Kept only inside all half-spaces.
            if outside_count > 0 {
                return Intersect::OUTSIDE;
            }
            if inside_count == total {
                return Intersect::INSIDE;
            }
        }
        return Intersect::INTERSECTING;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::DVec3;
    use tellus_scene::BoundingSphere;

    #[test]
    fn intersection_mode_clips_anything_outside_one_plane() {
        let collection = ClippingPlaneCollection::new(vec![
            Plane::from_point_normal(DVec3::ZERO, DVec3::Z),
            Plane::from_point_normal(DVec3::ZERO, DVec3::X),
        ]);
        let kept = BoundingSphere::new(DVec3::new(10.0, 0.0, 10.0), 1.0);
        let clipped = BoundingSphere::new(DVec3::new(10.0, 0.0, -10.0), 1.0);
        let straddling = BoundingSphere::new(DVec3::new(10.0, 0.0, 0.0), 1.0);
        assert_eq!(collection.classify(&kept), Intersect::INSIDE);
        assert_eq!(collection.classify(&clipped), Intersect::OUTSIDE);
        assert_eq!(collection.classify(&straddling), Intersect::INTERSECTING);
    }

    #[test]
    fn union_mode_keeps_anything_inside_one_plane() {
        let mut collection = ClippingPlaneCollection::new(vec![
            Plane::from_point_normal(DVec3::ZERO, DVec3::Z),
            Plane::from_point_normal(DVec3::ZERO, -DVec3::Z),
        ]);
        collection.union_clipping_regions = true;
        let above = BoundingSphere::new(DVec3::new(0.0, 0.0, 10.0), 1.0);
        assert_eq!(collection.classify(&above), Intersect::INSIDE);
    }

    #[test]
    fn disabled_collection_keeps_everything() {
        let mut collection = ClippingPlaneCollection::new(vec![Plane::from_point_normal(
            DVec3::ZERO,
            DVec3::Z,
        )]);
        collection.enabled = false;
        let below = BoundingSphere::new(DVec3::new(0.0, 0.0, -10.0), 1.0);
        assert_eq!(collection.classify(&below), Intersect::INSIDE);
    }
}
