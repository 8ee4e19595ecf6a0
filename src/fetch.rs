use std::fs;
use std::path::{Path, PathBuf};

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::batch::{image_filename, FetchHeadings};
use crate::error::{Result, RoadviewError};
use crate::types::{ImageResult, Location};
use crate::StreetViewClient;

/// Direct fetch strategy: one paid API call per (location, heading).
///
/// Wraps a [`StreetViewClient`], so every image request goes through the
/// client's rate limiter.
#[derive(Debug)]
pub struct DirectFetcher {
    client: StreetViewClient,
    fov: u16,
    size: (u32, u32),
}

impl DirectFetcher {
    /// Creates a fetcher with the default field of view (90) and image size
    /// (640x640, the endpoint's free-tier maximum).
    pub fn new(client: StreetViewClient) -> Self {
        Self {
            client,
            fov: 90,
            size: (640, 640),
        }
    }

    /// Set the field of view in degrees (10-120 accepted by the endpoint).
    pub fn fov(mut self, fov: u16) -> Self {
        self.fov = fov;
        self
    }

    /// Set the requested image dimensions.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }
}

impl FetchHeadings for DirectFetcher {
    async fn fetch_headings(
        &mut self,
        location: &Location,
        output_dir: &Path,
        headings: &[u16],
        pitch: i16,
    ) -> Vec<ImageResult> {
        let mut results = Vec::with_capacity(headings.len());
        for &heading in headings {
            let path = output_dir.join(image_filename(&location.location_id, heading, pitch));
            results.push(
                self.client
                    .fetch_image(
                        location.lat,
                        location.lon,
                        heading,
                        pitch,
                        self.fov,
                        self.size,
                        &path,
                    )
                    .await,
            );
        }
        results
    }
}

/// Download one pre-rendered perspective image from the paid endpoint and
/// write it to `output_path`.
///
/// Failures are captured in the returned [`ImageResult`] rather than raised:
/// a batch over thousands of locations must keep going past individual flaky
/// responses. Success requires both a 2xx response and an image content type,
/// since the endpoint is known to return error pages with a 200 status.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn fetch_image(
    client: &Client,
    endpoint: &str,
    api_key: &str,
    lat: f64,
    lon: f64,
    heading: u16,
    pitch: i16,
    fov: u16,
    size: (u32, u32),
    output_path: &Path,
) -> ImageResult {
    match try_fetch(
        client, endpoint, api_key, lat, lon, heading, pitch, fov, size, output_path,
    )
    .await
    {
        Ok(path) => ImageResult::success(lat, lon, heading, pitch, path),
        Err(e) => ImageResult::failure(lat, lon, heading, pitch, e.to_string()),
    }
}

#[allow(clippy::too_many_arguments)]
async fn try_fetch(
    client: &Client,
    endpoint: &str,
    api_key: &str,
    lat: f64,
    lon: f64,
    heading: u16,
    pitch: i16,
    fov: u16,
    (width, height): (u32, u32),
    output_path: &Path,
) -> Result<PathBuf> {
    let url = format!(
        "{endpoint}?location={lat},{lon}&heading={heading}&pitch={pitch}&fov={fov}&size={width}x{height}&key={api_key}"
    );

    let response = client.get(&url).send().await?.error_for_status()?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_owned();
    if !content_type.contains("image") {
        return Err(RoadviewError::ContentMismatch(content_type));
    }

    let bytes = response.bytes().await?;

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_path, &bytes)?;

    Ok(output_path.to_path_buf())
}
