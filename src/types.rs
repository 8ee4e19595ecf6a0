use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Status value the metadata service returns when imagery exists.
pub const STATUS_OK: &str = "OK";

/// A sampled road location to acquire imagery for.
///
/// Produced by the road-network sampler; consumed read-only here.
/// `pano_id` is filled in by a coverage check and is required for the
/// high-resolution panorama path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    /// Unique location identifier, used in output filenames
    pub location_id: String,
    /// Latitude coordinate
    pub lat: f64,
    /// Longitude coordinate
    pub lon: f64,
    /// City label
    pub city: String,
    /// Panorama identifier from a prior coverage check
    #[serde(default)]
    pub pano_id: Option<String>,
    /// Source road-segment identifier
    #[serde(default)]
    pub segment_id: Option<String>,
    /// Road name from the mapping database
    #[serde(default)]
    pub osm_name: Option<String>,
    /// Road type from the mapping database
    #[serde(default)]
    pub osm_type: Option<String>,
}

/// Result of a coverage check for a single coordinate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageResult {
    /// Latitude that was queried
    pub lat: f64,
    /// Longitude that was queried
    pub lon: f64,
    /// True iff the service reported imagery at this coordinate
    pub has_coverage: bool,
    /// Identifier of the nearest panorama, when reported.
    /// Not guaranteed to be present even when `has_coverage` is true.
    pub pano_id: Option<String>,
    /// Capture date (YYYY-MM), when reported
    pub capture_date: Option<String>,
    /// Raw status from the service ("OK", "ZERO_RESULTS", ...)
    pub status: String,
}

/// Result of one image download attempt for a (location, heading) pair.
#[derive(Debug, Clone)]
pub struct ImageResult {
    /// Latitude of the imagery (the panorama's true position for hi-res)
    pub lat: f64,
    /// Longitude of the imagery
    pub lon: f64,
    /// Camera heading in degrees (0 = north, clockwise)
    pub heading: u16,
    /// Camera pitch in degrees (-90 to 90)
    pub pitch: i16,
    /// Whether the image was produced
    pub success: bool,
    /// Path of the written image file on success
    pub image_path: Option<PathBuf>,
    /// Failure reason on error
    pub error: Option<String>,
}

impl ImageResult {
    /// An attempt that produced an image file.
    pub fn success(lat: f64, lon: f64, heading: u16, pitch: i16, path: PathBuf) -> Self {
        Self {
            lat,
            lon,
            heading,
            pitch,
            success: true,
            image_path: Some(path),
            error: None,
        }
    }

    /// An attempt that failed with the given reason.
    pub fn failure(
        lat: f64,
        lon: f64,
        heading: u16,
        pitch: i16,
        error: impl Into<String>,
    ) -> Self {
        Self {
            lat,
            lon,
            heading,
            pitch,
            success: false,
            image_path: None,
            error: Some(error.into()),
        }
    }
}
