mod axis_aligned_bounding_box;
mod bounding_sphere;
mod oriented_bounding_box;
mod plane;

pub use axis_aligned_bounding_box::*;
pub use bounding_sphere::*;
pub use oriented_bounding_box::*;
pub use plane::*;
