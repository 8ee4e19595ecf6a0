use std::path::Path;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use image::{DynamicImage, GenericImage};
use reqwest::Client;
use serde::Deserialize;

use crate::batch::{image_filename, FetchHeadings};
use crate::crop::crop_view;
use crate::error::{Result, RoadviewError};
use crate::save::{save_jpeg, CROP_JPEG_QUALITY};
use crate::types::{ImageResult, Location};

const TILE_SIZE: u32 = 512;
const TILE_ENDPOINT: &str = "https://cbk0.google.com/cbk";
const MAX_TILE_RETRIES: u32 = 3;
const TILE_RETRY_DELAY: Duration = Duration::from_secs(2);
const CONCURRENT_TILES: usize = 8;

/// Highest supported panorama zoom level.
pub const MAX_ZOOM: u8 = 5;
/// Default zoom level, a ~4096px panorama.
pub const DEFAULT_ZOOM: u8 = 3;

/// Metadata for a panorama resolved from its identifier.
///
/// The coordinates are the panorama's true camera position, which can differ
/// slightly from the sampled location that led to it.
#[derive(Debug, Clone)]
pub struct PanoramaMeta {
    /// Panorama identifier
    pub pano_id: String,
    /// True latitude of the camera
    pub lat: f64,
    /// True longitude of the camera
    pub lon: f64,
}

/// The tile server reports coordinates as JSON strings.
#[derive(Debug, Deserialize)]
struct TileServerMeta {
    #[serde(rename = "Location")]
    location: TileServerLocation,
}

#[derive(Debug, Deserialize)]
struct TileServerLocation {
    #[serde(rename = "panoId")]
    pano_id: String,
    lat: String,
    lng: String,
}

/// Calculate the tile grid dimensions for a zoom level.
///
/// Returns (columns, rows). Each zoom step doubles the panorama width; the
/// equirectangular aspect ratio keeps rows at half the columns.
fn tile_grid(zoom: u8) -> (u32, u32) {
    let cols = 1u32 << zoom;
    let rows = (cols / 2).max(1);
    (cols, rows)
}

/// Client for the keyless tile-based panorama service.
///
/// Resolves panorama identifiers to metadata and downloads full
/// equirectangular panoramas tile by tile.
#[derive(Debug, Clone)]
pub struct PanoClient {
    client: Client,
    endpoint: String,
}

impl PanoClient {
    /// Creates a client against the default tile endpoint.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            endpoint: TILE_ENDPOINT.to_string(),
        }
    }

    /// Creates a client against a custom tile endpoint (proxies, tests).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Resolve a panorama identifier to its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`RoadviewError::PanoramaNotFound`] when the identifier does
    /// not resolve (the server answers 404 or an empty body), or
    /// [`RoadviewError::Parse`] when the response cannot be interpreted.
    pub async fn lookup_panorama(&self, pano_id: &str) -> Result<PanoramaMeta> {
        let url = format!("{}?output=json&panoid={pano_id}", self.endpoint);

        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RoadviewError::PanoramaNotFound(pano_id.to_string()));
        }
        let text = response.error_for_status()?.text().await?;
        if text.trim().is_empty() {
            return Err(RoadviewError::PanoramaNotFound(pano_id.to_string()));
        }

        let meta: TileServerMeta = serde_json::from_str(&text)
            .map_err(|e| RoadviewError::Parse(format!("panorama metadata: {e}")))?;

        let lat = meta
            .location
            .lat
            .parse::<f64>()
            .map_err(|_| RoadviewError::Parse(format!("bad latitude: {}", meta.location.lat)))?;
        let lon = meta
            .location
            .lng
            .parse::<f64>()
            .map_err(|_| RoadviewError::Parse(format!("bad longitude: {}", meta.location.lng)))?;

        Ok(PanoramaMeta {
            pano_id: meta.location.pano_id,
            lat,
            lon,
        })
    }

    /// Download a full equirectangular panorama at the given zoom level (0-5).
    ///
    /// Tiles are fetched with bounded concurrency and each tile is retried a
    /// few times before the whole download is reported as failed.
    pub async fn download_panorama(&self, pano_id: &str, zoom: u8) -> Result<DynamicImage> {
        if zoom > MAX_ZOOM {
            return Err(RoadviewError::InvalidZoom(zoom));
        }

        let (cols, rows) = tile_grid(zoom);
        let coords: Vec<(u32, u32)> = (0..rows)
            .flat_map(|y| (0..cols).map(move |x| (x, y)))
            .collect();

        let tiles: Vec<Result<(u32, u32, DynamicImage)>> = stream::iter(coords)
            .map(|(x, y)| {
                let url = self.tile_url(pano_id, zoom, x, y);
                async move {
                    let img = self.fetch_tile(&url).await?;
                    Ok((x, y, img))
                }
            })
            .buffer_unordered(CONCURRENT_TILES)
            .collect()
            .await;

        let mut panorama = DynamicImage::new_rgb8(cols * TILE_SIZE, rows * TILE_SIZE);
        for tile in tiles {
            let (x, y, img) = tile?;
            panorama.copy_from(&img, x * TILE_SIZE, y * TILE_SIZE)?;
        }

        Ok(panorama)
    }

    fn tile_url(&self, pano_id: &str, zoom: u8, x: u32, y: u32) -> String {
        format!(
            "{}?output=tile&panoid={pano_id}&zoom={zoom}&x={x}&y={y}",
            self.endpoint
        )
    }

    /// Fetch and decode one tile, retrying transient failures.
    async fn fetch_tile(&self, url: &str) -> Result<DynamicImage> {
        let mut attempt = 0u32;

        loop {
            let result: Result<DynamicImage> = async {
                let bytes = self
                    .client
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?
                    .bytes()
                    .await?;
                Ok(image::load_from_memory(&bytes)?)
            }
            .await;

            match result {
                Ok(img) => return Ok(img),
                Err(err) => {
                    if attempt >= MAX_TILE_RETRIES {
                        return Err(RoadviewError::TileDownloadFailed {
                            attempts: MAX_TILE_RETRIES,
                            last_error: err.to_string(),
                        });
                    }
                    tracing::warn!(attempt, error = %err, "tile download failed, retrying");
                    tokio::time::sleep(TILE_RETRY_DELAY).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for PanoClient {
    fn default() -> Self {
        Self::new()
    }
}

/// High-resolution fetch strategy: download the location's full panorama once,
/// then crop a view per heading.
///
/// Requires each location to carry a `pano_id` from a prior coverage check.
/// The panorama bitmap lives only for the duration of one location's headings
/// and is dropped before the next location is processed.
#[derive(Debug, Clone)]
pub struct PanoFetcher {
    client: PanoClient,
    zoom: u8,
    fov: u16,
}

impl PanoFetcher {
    /// Creates a fetcher with default zoom (3) and field of view (90).
    pub fn new(client: PanoClient) -> Self {
        Self {
            client,
            zoom: DEFAULT_ZOOM,
            fov: 90,
        }
    }

    /// Set the panorama zoom level (0-5). An out-of-range level fails the
    /// download with [`RoadviewError::InvalidZoom`] rather than degrading to
    /// a lower resolution.
    pub fn zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom;
        self
    }

    /// Set the field of view in degrees.
    pub fn fov(mut self, fov: u16) -> Self {
        self.fov = fov.clamp(1, 360);
        self
    }

    async fn resolve(&self, location: &Location) -> Result<(PanoramaMeta, DynamicImage)> {
        let pano_id = location
            .pano_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(RoadviewError::MissingPanoId)?;

        let meta = self.client.lookup_panorama(pano_id).await?;
        let panorama = self.client.download_panorama(pano_id, self.zoom).await?;
        Ok((meta, panorama))
    }
}

impl FetchHeadings for PanoFetcher {
    async fn fetch_headings(
        &mut self,
        location: &Location,
        output_dir: &Path,
        headings: &[u16],
        pitch: i16,
    ) -> Vec<ImageResult> {
        let (meta, panorama) = match self.resolve(location).await {
            Ok(resolved) => resolved,
            Err(err) => {
                // One root cause covers every heading of this location.
                let message = err.to_string();
                return headings
                    .iter()
                    .map(|&h| {
                        ImageResult::failure(location.lat, location.lon, h, pitch, message.clone())
                    })
                    .collect();
            }
        };

        let mut results = Vec::with_capacity(headings.len());
        for &heading in headings {
            let path = output_dir.join(image_filename(&location.location_id, heading, pitch));
            let written = crop_view(&panorama, heading, pitch, self.fov)
                .and_then(|view| save_jpeg(&view, &path, CROP_JPEG_QUALITY));
            results.push(match written {
                Ok(()) => ImageResult::success(meta.lat, meta.lon, heading, pitch, path),
                Err(err) => {
                    ImageResult::failure(meta.lat, meta.lon, heading, pitch, err.to_string())
                }
            });
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_grid_dimensions() {
        assert_eq!(tile_grid(0), (1, 1));
        assert_eq!(tile_grid(1), (2, 1));
        assert_eq!(tile_grid(2), (4, 2));
        assert_eq!(tile_grid(3), (8, 4));
        assert_eq!(tile_grid(5), (32, 16));
    }

    #[test]
    fn tile_url_format() {
        let client = PanoClient::new();
        let url = client.tile_url("abc_123", 3, 5, 2);
        assert!(url.contains("output=tile"));
        assert!(url.contains("panoid=abc_123"));
        assert!(url.contains("zoom=3"));
        assert!(url.contains("x=5"));
        assert!(url.contains("y=2"));
    }

    #[test]
    fn rejects_zoom_above_max() {
        let client = PanoClient::new();
        let err = futures::executor::block_on(client.download_panorama("abc", 6));
        assert!(matches!(err, Err(RoadviewError::InvalidZoom(6))));
    }

    #[test]
    fn parses_tile_server_metadata() {
        let text = r#"{"Location": {"panoId": "abc123", "lat": "19.076090", "lng": "72.877426"}}"#;
        let meta: TileServerMeta = serde_json::from_str(text).unwrap();
        assert_eq!(meta.location.pano_id, "abc123");
        assert_eq!(meta.location.lat, "19.076090");
    }
}
