//! # roadview
//!
//! Street-level imagery acquisition for sampled road locations.
//!
//! This library provides:
//! - Coverage checks against the imagery metadata service
//! - Batch image downloads via the paid per-image API
//! - A keyless high-resolution path that fetches full panoramas tile by tile
//!   and crops perspective views from them
//! - Idempotent, resumable batch processing with per-item failure isolation
//!
//! ## Example
//!
//! ```no_run
//! use roadview::{check_coverage_batch, ClientConfig, StreetViewClient};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let locations = roadview::read_locations("data/samples/locations.csv")?;
//!
//!     let mut client = StreetViewClient::new(ClientConfig::new("API_KEY"))?;
//!     let records = check_coverage_batch(&mut client, &locations).await;
//!
//!     roadview::write_coverage("data/coverage/coverage.csv", &records)?;
//!     Ok(())
//! }
//! ```

mod batch;
mod coverage;
mod crop;
mod error;
mod fetch;
mod pano;
mod rate_limit;
mod report;
mod save;
mod types;

pub use batch::{
    check_coverage_batch, download_images_batch, image_filename, DownloadOptions, FetchHeadings,
    DEFAULT_HEADINGS,
};
pub use crop::crop_view;
pub use error::{Result, RoadviewError};
pub use fetch::DirectFetcher;
pub use pano::{PanoClient, PanoFetcher, PanoramaMeta, DEFAULT_ZOOM, MAX_ZOOM};
pub use rate_limit::RateLimiter;
pub use report::{
    annotation_records, coverage_by_city, covered_locations, read_coverage, read_downloads,
    read_locations, write_annotations, write_coverage, write_downloads, AnnotationRecord,
    CityCoverage, CoverageRecord, DownloadRecord,
};
pub use save::{save_jpeg, CROP_JPEG_QUALITY};
pub use types::{CoverageResult, ImageResult, Location, STATUS_OK};

use std::path::Path;
use std::time::Duration;

use reqwest::Client;

const DEFAULT_METADATA_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/streetview/metadata";
const DEFAULT_IMAGE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/streetview";

/// Configuration for a [`StreetViewClient`].
///
/// The API key is a required, explicit input: environment lookup belongs at
/// the application boundary, not in here.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key for the metadata and image endpoints
    pub api_key: String,
    /// Minimum spacing between API calls
    pub rate_limit: Duration,
    /// Request timeout
    pub timeout: Duration,
    /// Metadata endpoint override (proxies, tests)
    pub metadata_endpoint: String,
    /// Image endpoint override (proxies, tests)
    pub image_endpoint: String,
}

impl ClientConfig {
    /// Configuration with the default endpoints, a 100ms rate limit, and a
    /// 30s timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            rate_limit: Duration::from_millis(100),
            timeout: Duration::from_secs(30),
            metadata_endpoint: DEFAULT_METADATA_ENDPOINT.to_string(),
            image_endpoint: DEFAULT_IMAGE_ENDPOINT.to_string(),
        }
    }

    /// Set the minimum spacing between API calls.
    pub fn rate_limit(mut self, interval: Duration) -> Self {
        self.rate_limit = interval;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the metadata endpoint.
    pub fn metadata_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.metadata_endpoint = endpoint.into();
        self
    }

    /// Override the image endpoint.
    pub fn image_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.image_endpoint = endpoint.into();
        self
    }
}

/// Client for the imagery metadata and per-image endpoints.
///
/// Every call through one client instance shares the instance's rate limiter,
/// so sequential calls are spaced at least `rate_limit` apart. The client is
/// driven by one caller at a time; methods take `&mut self` because the
/// limiter records the last call start.
#[derive(Debug)]
pub struct StreetViewClient {
    client: Client,
    config: ClientConfig,
    limiter: RateLimiter,
}

impl StreetViewClient {
    /// Creates a client from explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RoadviewError::Http`] if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let limiter = RateLimiter::new(config.rate_limit);
        Ok(Self {
            client,
            config,
            limiter,
        })
    }

    /// Check whether imagery coverage exists at a coordinate.
    ///
    /// One rate-limited call against the free metadata endpoint. A status
    /// other than "OK" (e.g. "ZERO_RESULTS") is a normal result with
    /// `has_coverage = false`, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or an
    /// unparseable response. Retrying is the batch layer's concern.
    pub async fn check_coverage(&mut self, lat: f64, lon: f64) -> Result<CoverageResult> {
        self.limiter.wait().await;
        coverage::check_coverage(
            &self.client,
            &self.config.metadata_endpoint,
            &self.config.api_key,
            lat,
            lon,
        )
        .await
    }

    /// Download one perspective image from the paid endpoint to `output_path`.
    ///
    /// One rate-limited call. Failures (transport, non-image body) are
    /// captured in the returned [`ImageResult`], never raised.
    #[allow(clippy::too_many_arguments)]
    pub async fn fetch_image(
        &mut self,
        lat: f64,
        lon: f64,
        heading: u16,
        pitch: i16,
        fov: u16,
        size: (u32, u32),
        output_path: &Path,
    ) -> ImageResult {
        self.limiter.wait().await;
        fetch::fetch_image(
            &self.client,
            &self.config.image_endpoint,
            &self.config.api_key,
            lat,
            lon,
            heading,
            pitch,
            fov,
            size,
            output_path,
        )
        .await
    }
}
