use bevy::math::{DVec2, DVec3};

use crate::math::Cartographic;
use crate::{
    east_north_up_to_fixed_frame, AxisAlignedBoundingBox, BoundingSphere, EllipsoidalOccluder,
    GeographicTilingScheme, OrientedBoundingBox, TerrainEncoding, TerrainMesh, TilingScheme,
    WebMercatorProjection,
};

/// A raw terrain payload: a row-major grid of heights (row 0 along the
/// northern edge) with the provider's declared height extents. The mesh built
/// from it is cached here until the tile is unloaded.
#[derive(Default, Clone, Debug)]
pub struct HeightmapTerrainData {
    buffer: Vec<f32>,
    width: u32,
    height: u32,
    minimum_height: f64,
    maximum_height: f64,
    created_by_upsampling: bool,
    mesh: Option<TerrainMesh>,
}

impl HeightmapTerrainData {
    pub fn new(
        buffer: Vec<f32>,
        width: u32,
        height: u32,
        minimum_height: f64,
        maximum_height: f64,
        created_by_upsampling: bool,
    ) -> Self {
        debug_assert!(buffer.len() == (width * height) as usize);
        debug_assert!(minimum_height <= maximum_height);
        Self {
            buffer,
            width,
            height,
            minimum_height,
            maximum_height,
            created_by_upsampling,
            mesh: None,
        }
    }

    /// The provider-declared height range, before exaggeration.
    pub fn height_range(&self) -> (f64, f64) {
        return (self.minimum_height, self.maximum_height);
    }

    pub fn width(&self) -> u32 {
        return self.width;
    }

    pub fn height(&self) -> u32 {
        return self.height;
    }

    pub fn was_created_by_upsampling(&self) -> bool {
        return self.created_by_upsampling;
    }

    pub fn has_mesh(&self) -> bool {
        return self.mesh.is_some();
    }

    pub fn get_mesh(&self) -> Option<&TerrainMesh> {
        return self.mesh.as_ref();
    }

    /// Builds (or returns the cached) mesh for the given tile of the tiling
    /// scheme. Heights are scaled by `exaggeration` before positioning.
    pub fn create_mesh(
        &mut self,
        tiling_scheme: &GeographicTilingScheme,
        x: u32,
        y: u32,
        level: u32,
        exaggeration: f64,
        has_web_mercator_t: bool,
    ) -> &TerrainMesh {
        if self.mesh.is_some() {
            return self.mesh.as_ref().unwrap();
        }

        let rectangle = tiling_scheme.tile_x_y_to_rectangle(x, y, level);
        let ellipsoid = tiling_scheme.get_ellipsoid();
        let width = self.width as usize;
        let height = self.height as usize;

        let south_mercator =
            WebMercatorProjection::geodetic_latitude_to_mercator_angle(rectangle.south);
        let north_mercator =
            WebMercatorProjection::geodetic_latitude_to_mercator_angle(rectangle.north);
        let one_over_mercator_height = 1.0 / (north_mercator - south_mercator);

        let mut positions = Vec::with_capacity(width * height);
        let mut heights = Vec::with_capacity(width * height);
        let mut minimum_height = f64::MAX;
        let mut maximum_height = f64::MIN;
        for row in 0..height {
            let v = 1.0 - row as f64 / (height - 1) as f64;
            let latitude = rectangle.south + v * rectangle.compute_height();
            for col in 0..width {
                let u = col as f64 / (width - 1) as f64;
                let longitude = rectangle.west + u * rectangle.compute_width();
                let sample_height =
                    self.buffer[row * width + col] as f64 * exaggeration;
                minimum_height = minimum_height.min(sample_height);
                maximum_height = maximum_height.max(sample_height);
                heights.push(sample_height);
                positions.push(ellipsoid.cartographic_to_cartesian(&Cartographic::new(
                    longitude,
                    latitude,
                    sample_height,
                )));
            }
        }

        let bounding_sphere = BoundingSphere::from_points(&positions);
        let center = bounding_sphere.center;
        let from_enu = east_north_up_to_fixed_frame(center, ellipsoid);
        let to_enu = from_enu.inverse();
        let local: Vec<DVec3> = positions.iter().map(|p| to_enu.transform_point3(*p)).collect();
        let aabb = AxisAlignedBoundingBox::from_points(&local);
        let encoding = TerrainEncoding::new(
            center,
            Some(aabb),
            Some(minimum_height),
            Some(maximum_height),
            Some(from_enu),
            false,
            Some(has_web_mercator_t),
        );

        let mut vertices =
            Vec::with_capacity(width * height * encoding.stride as usize);
        for row in 0..height {
            let v = 1.0 - row as f64 / (height - 1) as f64;
            let latitude = rectangle.south + v * rectangle.compute_height();
            let web_mercator_t = if has_web_mercator_t {
                Some(
                    (WebMercatorProjection::geodetic_latitude_to_mercator_angle(latitude)
                        - south_mercator)
                        * one_over_mercator_height,
                )
            } else {
                None
            };
            for col in 0..width {
                let u = col as f64 / (width - 1) as f64;
                let i = row * width + col;
                encoding.encode(
                    &mut vertices,
                    positions[i],
                    DVec2::new(u, v),
                    heights[i],
                    None,
                    web_mercator_t,
                );
            }
        }

        let mut indices = Vec::with_capacity((width - 1) * (height - 1) * 6);
        for row in 0..height - 1 {
            for col in 0..width - 1 {
                let nw = (row * width + col) as u32;
                let ne = nw + 1;
                let sw = nw + width as u32;
                let se = sw + 1;
                indices.extend_from_slice(&[sw, se, nw, se, ne, nw]);
            }
        }

        let west_indices_south_to_north: Vec<u32> =
            (0..height).rev().map(|row| (row * width) as u32).collect();
        let south_indices_east_to_west: Vec<u32> = (0..width)
            .rev()
            .map(|col| ((height - 1) * width + col) as u32)
            .collect();
        let east_indices_north_to_south: Vec<u32> =
            (0..height).map(|row| (row * width + width - 1) as u32).collect();
        let north_indices_west_to_east: Vec<u32> = (0..width).map(|col| col as u32).collect();

        let oriented_bounding_box = OrientedBoundingBox::from_rectangle(
            &rectangle,
            Some(minimum_height),
            Some(maximum_height),
            Some(ellipsoid),
        );
        let occluder = EllipsoidalOccluder::new(ellipsoid);
        let occludee_point_in_scaled_space = occluder
            .compute_horizon_culling_point_possibly_under_ellipsoid(
                oriented_bounding_box.center,
                &positions,
                minimum_height,
            );

        self.mesh = Some(TerrainMesh {
            center,
            vertices,
            indices,
            minimum_height,
            maximum_height,
            bounding_sphere_3d: bounding_sphere,
            oriented_bounding_box,
            occludee_point_in_scaled_space,
            encoding,
            west_indices_south_to_north,
            south_indices_east_to_west,
            east_indices_north_to_south,
            north_indices_west_to_east,
        });
        return self.mesh.as_ref().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_data(width: u32, height: u32, value: f32) -> HeightmapTerrainData {
        HeightmapTerrainData::new(
            vec![value; (width * height) as usize],
            width,
            height,
            value as f64,
            value as f64,
            false,
        )
    }

    #[test]
    fn grid_mesh_has_expected_counts() {
        let mut data = flat_data(5, 5, 0.0);
        let scheme = GeographicTilingScheme::default();
        let mesh = data.create_mesh(&scheme, 0, 0, 0, 1.0, false);
        assert_eq!(mesh.vertex_count(), 25);
        assert_eq!(mesh.triangle_count(), 32);
        assert_eq!(mesh.west_indices_south_to_north.len(), 5);
        assert_eq!(mesh.north_indices_west_to_east.len(), 5);
    }

    #[test]
    fn edge_runs_traverse_in_documented_order() {
        let mut data = flat_data(4, 4, 0.0);
        let scheme = GeographicTilingScheme::default();
        let mesh = data.create_mesh(&scheme, 1, 0, 1, 1.0, false);
        // West edge south to north: v ascends.
        let vs: Vec<f64> = mesh
            .west_indices_south_to_north
            .iter()
            .map(|i| mesh.encoding.decode_texture_coordinates(&mesh.vertices, *i as usize).y)
            .collect();
        assert!(vs.windows(2).all(|w| w[0] < w[1]));
        // North edge west to east: u ascends at v == 1.
        for i in &mesh.north_indices_west_to_east {
            let uv = mesh.encoding.decode_texture_coordinates(&mesh.vertices, *i as usize);
            assert!((uv.y - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn exaggeration_scales_the_height_range() {
        let mut data = HeightmapTerrainData::new(
            vec![0.0, 100.0, 50.0, 25.0],
            2,
            2,
            0.0,
            100.0,
            false,
        );
        let scheme = GeographicTilingScheme::default();
        let mesh = data.create_mesh(&scheme, 0, 0, 3, 2.0, false);
        assert_eq!(mesh.minimum_height, 0.0);
        assert_eq!(mesh.maximum_height, 200.0);
    }

    #[test]
    fn mesh_is_cached_after_first_build() {
        let mut data = flat_data(3, 3, 10.0);
        let scheme = GeographicTilingScheme::default();
        data.create_mesh(&scheme, 0, 0, 2, 1.0, false);
        assert!(data.has_mesh());
        let first_center = data.get_mesh().unwrap().center;
        let again = data.create_mesh(&scheme, 0, 0, 2, 1.0, false);
        assert_eq!(again.center, first_center);
    }
}
