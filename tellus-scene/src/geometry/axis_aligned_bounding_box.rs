use bevy::math::DVec3;

#[derive(Default, Clone, Copy, Debug)]
pub struct AxisAlignedBoundingBox {
    pub minimum: DVec3,
    pub maximum: DVec3,
    pub center: DVec3,
}

impl AxisAlignedBoundingBox {
    pub fn from_points(positions: &[DVec3]) -> Self {
        if positions.is_empty() {
            return Self::default();
        }
        let mut minimum = positions[0];
        let mut maximum = positions[0];
        for p in &positions[1..] {
            minimum = minimum.min(*p);
            maximum = maximum.max(*p);
        }
        return Self {
            minimum,
            maximum,
            center: (minimum + maximum) * 0.5,
        };
    }
}
