pub mod math;

mod attribute_compression;
mod bounding_volume;
mod culling_volume;
mod ellipsoid;
mod ellipsoidal_occluder;
mod fog;
mod geographic_projection;
mod geographic_tiling_scheme;
pub mod geometry;
mod heightmap_terrain_data;
mod projection;
mod rectangle;
mod terrain_encoding;
mod terrain_mesh;
mod terrain_provider;
mod tile_bounding_region;
mod tiling_scheme;
mod web_mercator_projection;

pub use attribute_compression::*;
pub use bounding_volume::*;
pub use culling_volume::*;
pub use ellipsoid::*;
pub use ellipsoidal_occluder::*;
pub use fog::*;
pub use geographic_projection::*;
pub use geographic_tiling_scheme::*;
pub use geometry::*;
pub use heightmap_terrain_data::*;
pub use math::{Cartesian3, Cartographic};
pub use projection::*;
pub use rectangle::*;
pub use terrain_encoding::*;
pub use terrain_mesh::*;
pub use terrain_provider::*;
pub use tile_bounding_region::*;
pub use tiling_scheme::*;
pub use web_mercator_projection::*;
