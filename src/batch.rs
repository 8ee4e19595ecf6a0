use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::report::{CoverageRecord, DownloadRecord};
use crate::types::{ImageResult, Location};
use crate::StreetViewClient;

/// Default camera headings: the four cardinal directions.
pub const DEFAULT_HEADINGS: [u16; 4] = [0, 90, 180, 270];

/// Build the output filename for one (location, heading, pitch) image.
///
/// This exact format is the idempotency key for skip-existing: it must stay
/// stable across invocations or resumed batches will redo finished work.
pub fn image_filename(location_id: &str, heading: u16, pitch: i16) -> String {
    format!("{location_id}_h{heading:03}_p{pitch:+03}.jpg")
}

/// A strategy for producing one image file per requested heading of a
/// location.
///
/// Implemented by the direct (paid API) and panorama-crop (keyless) fetchers;
/// the orchestrator selects one via an explicit mode flag and drives it
/// identically. Implementations report per-heading failures inside the
/// returned results instead of erroring out.
pub trait FetchHeadings {
    /// Fetch one image per heading for `location`, writing files named by
    /// [`image_filename`] into `output_dir`.
    fn fetch_headings(
        &mut self,
        location: &Location,
        output_dir: &Path,
        headings: &[u16],
        pitch: i16,
    ) -> impl std::future::Future<Output = Vec<ImageResult>>;
}

/// Options for a download batch.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Directory the image files are written into
    pub output_dir: PathBuf,
    /// Camera headings per location
    pub headings: Vec<u16>,
    /// Camera pitch for all images
    pub pitch: i16,
    /// Reuse locations whose full set of output files already exists
    pub skip_existing: bool,
}

impl DownloadOptions {
    /// Options with the default headings (0/90/180/270), pitch 0, and
    /// skip-existing enabled.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            headings: DEFAULT_HEADINGS.to_vec(),
            pitch: 0,
            skip_existing: true,
        }
    }

    /// Set the camera headings.
    pub fn headings(mut self, headings: Vec<u16>) -> Self {
        self.headings = headings;
        self
    }

    /// Set the camera pitch.
    pub fn pitch(mut self, pitch: i16) -> Self {
        self.pitch = pitch;
        self
    }

    /// Enable or disable reuse of already-downloaded locations.
    pub fn skip_existing(mut self, skip: bool) -> Self {
        self.skip_existing = skip;
        self
    }
}

/// Check coverage for every location, in input order.
///
/// A transport error for one location marks only that record as failed
/// (`has_coverage = false`, status carrying the error message) and the batch
/// continues; the output always has one record per input location.
pub async fn check_coverage_batch(
    client: &mut StreetViewClient,
    locations: &[Location],
) -> Vec<CoverageRecord> {
    let mut records = Vec::with_capacity(locations.len());

    for location in locations {
        let record = match client.check_coverage(location.lat, location.lon).await {
            Ok(result) => CoverageRecord {
                location_id: location.location_id.clone(),
                city: location.city.clone(),
                lat: location.lat,
                lon: location.lon,
                has_coverage: result.has_coverage,
                pano_id: result.pano_id,
                capture_date: result.capture_date,
                status: result.status,
            },
            Err(err) => {
                tracing::warn!(
                    location_id = %location.location_id,
                    error = %err,
                    "coverage check failed"
                );
                CoverageRecord {
                    location_id: location.location_id.clone(),
                    city: location.city.clone(),
                    lat: location.lat,
                    lon: location.lon,
                    has_coverage: false,
                    pano_id: None,
                    capture_date: None,
                    status: format!("ERROR: {err}"),
                }
            }
        };
        records.push(record);
    }

    records
}

/// Download images for every location, in input order, one record per
/// (location, heading).
///
/// With skip-existing enabled, a location whose complete set of expected
/// files is already on disk is recorded as successful without any network
/// call. A partial file set (e.g. after a crash mid-location) does not count:
/// the location is refetched in full. Per-location failures are recorded and
/// the batch continues.
pub async fn download_images_batch<F: FetchHeadings>(
    fetcher: &mut F,
    locations: &[Location],
    options: &DownloadOptions,
) -> Result<Vec<DownloadRecord>> {
    fs::create_dir_all(&options.output_dir)?;

    let mut records = Vec::with_capacity(locations.len() * options.headings.len());

    for location in locations {
        if options.skip_existing {
            let expected: Vec<PathBuf> = options
                .headings
                .iter()
                .map(|&h| {
                    options
                        .output_dir
                        .join(image_filename(&location.location_id, h, options.pitch))
                })
                .collect();

            if expected.iter().all(|path| path.exists()) {
                tracing::debug!(location_id = %location.location_id, "all images present, skipping");
                for (&heading, path) in options.headings.iter().zip(&expected) {
                    records.push(DownloadRecord {
                        location_id: location.location_id.clone(),
                        city: location.city.clone(),
                        lat: location.lat,
                        lon: location.lon,
                        heading,
                        pitch: options.pitch,
                        image_path: Some(path.display().to_string()),
                        success: true,
                        error: None,
                    });
                }
                continue;
            }
        }

        let results = fetcher
            .fetch_headings(location, &options.output_dir, &options.headings, options.pitch)
            .await;

        for result in results {
            if let Some(error) = &result.error {
                tracing::warn!(
                    location_id = %location.location_id,
                    heading = result.heading,
                    error = %error,
                    "image download failed"
                );
            }
            records.push(DownloadRecord {
                location_id: location.location_id.clone(),
                city: location.city.clone(),
                lat: location.lat,
                lon: location.lon,
                heading: result.heading,
                pitch: result.pitch,
                image_path: result.image_path.map(|p| p.display().to_string()),
                success: result.success,
                error: result.error,
            });
        }
    }

    Ok(records)
}
