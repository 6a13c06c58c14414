use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{GeographicTilingScheme, HeightmapTerrainData, TilingScheme};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TerrainProviderError {
    #[error("terrain provider is not ready")]
    NotReady,
    #[error("tile ({x}, {y}) at level {level} is not available")]
    TileNotAvailable { x: u32, y: u32, level: u32 },
    #[error("terrain payload could not be decoded: {0}")]
    Decode(String),
}

/// Source of raw terrain payloads. Transport and decode run elsewhere; by the
/// time this trait is asked, the answer is immediate.
pub trait TerrainProvider: Send + Sync {
    fn get_ready(&self) -> bool;
    fn get_tiling_scheme(&self) -> &GeographicTilingScheme;
    fn get_level_maximum_geometric_error(&self, level: u32) -> f64;
    /// `None` means availability is unknown (e.g. no availability index);
    /// callers may consult an ancestor payload's child mask instead.
    fn get_tile_data_available(&self, x: u32, y: u32, level: u32) -> Option<bool>;
    fn request_tile_geometry(
        &self,
        x: u32,
        y: u32,
        level: u32,
    ) -> Result<HeightmapTerrainData, TerrainProviderError>;
    /// Whether meshes built from this provider carry the web-mercator-T
    /// vertex channel.
    fn has_web_mercator_t(&self) -> bool {
        return false;
    }
    /// Attribution to forward to the credit display; this crate never
    /// renders it.
    fn get_credit(&self) -> Option<&str> {
        return None;
    }
}

/// The subset of a terrain service's layer metadata document that matters
/// here: extent, zoom range, and attribution. Transport of the document is
/// the caller's problem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerrainLayerMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub attribution: String,
    #[serde(default)]
    pub minzoom: u32,
    #[serde(default)]
    pub maxzoom: u32,
    /// [west, south, east, north] in degrees.
    #[serde(default)]
    pub bounds: Option<[f64; 4]>,
}

impl TerrainLayerMetadata {
    pub fn from_json(text: &str) -> Result<Self, TerrainProviderError> {
        return serde_json::from_str(text)
            .map_err(|error| TerrainProviderError::Decode(error.to_string()));
    }
}

/// Level-zero geometric error for a heightmap pyramid, after the classic
/// quality heuristic.
pub fn estimated_level_zero_geometric_error(
    maximum_radius: f64,
    tile_image_width: u32,
    number_of_tiles_at_level_zero: u32,
) -> f64 {
    return maximum_radius * 2.0 * PI * 0.25
        / (tile_image_width as f64 * number_of_tiles_at_level_zero as f64);
}

/// A provider that serves the bare ellipsoid surface: every tile is a flat
/// grid of zero heights, always available. Keeps the globe hole-free before
/// real terrain arrives, and keeps tests deterministic.
pub struct EllipsoidTerrainProvider {
    tiling_scheme: GeographicTilingScheme,
    heightmap_width: u32,
    level_zero_maximum_geometric_error: f64,
}

impl EllipsoidTerrainProvider {
    pub fn new() -> Self {
        let tiling_scheme = GeographicTilingScheme::default();
        let heightmap_width = 16;
        let level_zero_maximum_geometric_error = estimated_level_zero_geometric_error(
            tiling_scheme.get_ellipsoid().maximum_radius,
            heightmap_width,
            tiling_scheme.get_number_of_x_tiles_at_level(0),
        );
        Self {
            tiling_scheme,
            heightmap_width,
            level_zero_maximum_geometric_error,
        }
    }
}

impl Default for EllipsoidTerrainProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TerrainProvider for EllipsoidTerrainProvider {
    fn get_ready(&self) -> bool {
        return true;
    }

    fn get_tiling_scheme(&self) -> &GeographicTilingScheme {
        return &self.tiling_scheme;
    }

    fn get_level_maximum_geometric_error(&self, level: u32) -> f64 {
        return self.level_zero_maximum_geometric_error / (1 << level) as f64;
    }

    fn get_tile_data_available(&self, _x: u32, _y: u32, _level: u32) -> Option<bool> {
        return Some(true);
    }

    fn request_tile_geometry(
        &self,
        _x: u32,
        _y: u32,
        _level: u32,
    ) -> Result<HeightmapTerrainData, TerrainProviderError> {
        let width = self.heightmap_width;
        return Ok(HeightmapTerrainData::new(
            vec![0.0; (width * width) as usize],
            width,
            width,
            0.0,
            0.0,
            false,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometric_error_halves_each_level() {
        let provider = EllipsoidTerrainProvider::new();
        let e0 = provider.get_level_maximum_geometric_error(0);
        let e1 = provider.get_level_maximum_geometric_error(1);
        let e5 = provider.get_level_maximum_geometric_error(5);
        assert!((e0 / e1 - 2.0).abs() < 1e-12);
        assert!((e0 / e5 - 32.0).abs() < 1e-9);
    }

    #[test]
    fn every_tile_is_available_and_flat() {
        let provider = EllipsoidTerrainProvider::new();
        assert_eq!(provider.get_tile_data_available(3, 1, 2), Some(true));
        let data = provider.request_tile_geometry(3, 1, 2).unwrap();
        assert_eq!(data.height_range(), (0.0, 0.0));
    }

    #[test]
    fn layer_metadata_parses_with_missing_fields() {
        let metadata = TerrainLayerMetadata::from_json(
            r#"{"name":"world","maxzoom":14,"bounds":[-180.0,-90.0,180.0,90.0]}"#,
        )
        .unwrap();
        assert_eq!(metadata.name, "world");
        assert_eq!(metadata.maxzoom, 14);
        assert_eq!(metadata.minzoom, 0);
        assert_eq!(metadata.bounds.unwrap()[2], 180.0);

        let error = TerrainLayerMetadata::from_json("not json").unwrap_err();
        assert!(matches!(error, TerrainProviderError::Decode(_)));
    }
}
