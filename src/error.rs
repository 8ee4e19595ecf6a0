use thiserror::Error;

/// Result type alias for roadview operations.
pub type Result<T> = std::result::Result<T, RoadviewError>;

/// Errors that can occur while acquiring street-level imagery.
#[derive(Error, Debug)]
pub enum RoadviewError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body had an unexpected content type (e.g. an HTML error page
    /// returned with a 200 status instead of image bytes)
    #[error("Unexpected content type: {0}")]
    ContentMismatch(String),

    /// Failed to parse a response
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Image processing error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Panorama identifier did not resolve to a panorama
    #[error("Panorama not found: {0}")]
    PanoramaNotFound(String),

    /// Location is missing a panorama identifier (required for the hi-res path)
    #[error("Location has no panorama id")]
    MissingPanoId,

    /// Zoom level outside the supported range
    #[error("Zoom level must be between 0 and 5, got {0}")]
    InvalidZoom(u8),

    /// View parameters outside the supported range
    #[error("Invalid view parameters: {0}")]
    InvalidView(String),

    /// Tile download failed after exhausting retries
    #[error("Failed to download tile after {attempts} retries: {last_error}")]
    TileDownloadFailed { attempts: u32, last_error: String },
}
