use std::f64::consts::PI;

use crate::math::{negative_pi_to_pi, Cartographic, EPSILON14, PI_OVER_TWO, TWO_PI};

/// A two dimensional region specified as longitude and latitude bounds, in radians.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rectangle {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Default for Rectangle {
    fn default() -> Self {
        Self {
            west: 0.0,
            south: 0.0,
            east: 0.0,
            north: 0.0,
        }
    }
}

impl Rectangle {
    pub const MAX_VALUE: Rectangle = Rectangle {
        west: -PI,
        south: -PI_OVER_TWO,
        east: PI,
        north: PI_OVER_TWO,
    };

    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    pub fn from_degrees(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self::new(
            west.to_radians(),
            south.to_radians(),
            east.to_radians(),
            north.to_radians(),
        )
    }

    pub fn compute_width(&self) -> f64 {
        let mut east = self.east;
        let west = self.west;
        if east < west {
            east += TWO_PI;
        }
        return east - west;
    }

    pub fn compute_height(&self) -> f64 {
        return self.north - self.south;
    }

    pub fn center(&self) -> Cartographic {
        let mut east = self.east;
        let west = self.west;
        if east < west {
            east += TWO_PI;
        }
        let longitude = negative_pi_to_pi((west + east) * 0.5);
        let latitude = (self.south + self.north) * 0.5;
        return Cartographic::new(longitude, latitude, 0.0);
    }

    pub fn southwest(&self) -> Cartographic {
        return Cartographic::new(self.west, self.south, 0.0);
    }

    pub fn northeast(&self) -> Cartographic {
        return Cartographic::new(self.east, self.north, 0.0);
    }

    pub fn northwest(&self) -> Cartographic {
        return Cartographic::new(self.west, self.north, 0.0);
    }

    pub fn southeast(&self) -> Cartographic {
        return Cartographic::new(self.east, self.south, 0.0);
    }

    pub fn contains(&self, cartographic: &Cartographic) -> bool {
        let mut longitude = cartographic.longitude;
        let latitude = cartographic.latitude;
        let west = self.west;
        let mut east = self.east;
        if east < west {
            east += TWO_PI;
            if longitude < 0.0 {
                longitude += TWO_PI;
            }
        }
        return (longitude > west || (longitude - west).abs() <= EPSILON14)
            && (longitude < east || (longitude - east).abs() <= EPSILON14)
            && latitude >= self.south
            && latitude <= self.north;
    }

    /// Intersection that ignores the antimeridian; adequate for tiles inside
    /// one tiling-scheme root, which never straddle it.
    pub fn simple_intersection(&self, other: &Rectangle) -> Option<Rectangle> {
        let west = self.west.max(other.west);
        let south = self.south.max(other.south);
        let east = self.east.min(other.east);
        let north = self.north.min(other.north);
        if south >= north || west >= east {
            return None;
        }
        return Some(Rectangle::new(west, south, east, north));
    }

    pub fn intersection(&self, other: &Rectangle) -> Option<Rectangle> {
        let mut rectangle_east = self.east;
        let mut rectangle_west = self.west;
        let mut other_east = other.east;
        let mut other_west = other.west;
        if rectangle_east < rectangle_west && other_east > 0.0 {
            rectangle_east += TWO_PI;
        } else if other_east < other_west && rectangle_east > 0.0 {
            other_east += TWO_PI;
        }
        if rectangle_east < rectangle_west && other_west < 0.0 {
            other_west += TWO_PI;
        } else if other_east < other_west && rectangle_west < 0.0 {
            rectangle_west += TWO_PI;
        }

        let west = negative_pi_to_pi(rectangle_west.max(other_west));
        let east = negative_pi_to_pi(rectangle_east.min(other_east));
        if (self.west < self.east || other.west < other.east) && east <= west {
            return None;
        }

        let south = self.south.max(other.south);
        let north = self.north.min(other.north);
        if south >= north {
            return None;
        }
        return Some(Rectangle::new(west, south, east, north));
    }

    pub fn equals_epsilon(&self, other: &Rectangle, epsilon: f64) -> bool {
        return (self.west - other.west).abs() <= epsilon
            && (self.south - other.south).abs() <= epsilon
            && (self.east - other.east).abs() <= epsilon
            && (self.north - other.north).abs() <= epsilon;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_honors_all_four_bounds() {
        let r = Rectangle::from_degrees(-10.0, -10.0, 10.0, 10.0);
        assert!(r.contains(&Cartographic::from_degrees(0.0, 0.0, 0.0)));
        assert!(r.contains(&Cartographic::from_degrees(-10.0, 10.0, 0.0)));
        assert!(!r.contains(&Cartographic::from_degrees(-11.0, 0.0, 0.0)));
        assert!(!r.contains(&Cartographic::from_degrees(0.0, 11.0, 0.0)));
    }

    #[test]
    fn simple_intersection_clips_and_rejects() {
        let a = Rectangle::from_degrees(0.0, 0.0, 20.0, 20.0);
        let b = Rectangle::from_degrees(10.0, 10.0, 30.0, 30.0);
        let i = a.simple_intersection(&b).unwrap();
        assert!(i.equals_epsilon(&Rectangle::from_degrees(10.0, 10.0, 20.0, 20.0), EPSILON14));
        let c = Rectangle::from_degrees(40.0, 40.0, 50.0, 50.0);
        assert!(a.simple_intersection(&c).is_none());
    }

    #[test]
    fn center_of_an_antimeridian_spanning_rectangle() {
        let r = Rectangle::from_degrees(170.0, -10.0, -170.0, 10.0);
        let c = r.center();
        assert!((c.longitude - PI).abs() < EPSILON14 || (c.longitude + PI).abs() < EPSILON14);
    }
}
