use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Location;

/// One row of a coverage-check report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageRecord {
    /// Location identifier
    pub location_id: String,
    /// City label
    pub city: String,
    /// Latitude that was checked
    pub lat: f64,
    /// Longitude that was checked
    pub lon: f64,
    /// Whether imagery exists at this location
    pub has_coverage: bool,
    /// Panorama identifier, when reported
    pub pano_id: Option<String>,
    /// Capture date, when reported
    pub capture_date: Option<String>,
    /// Service status, or "ERROR: ..." when the check itself failed
    pub status: String,
}

/// One row of a download report: a single (location, heading) attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// Location identifier
    pub location_id: String,
    /// City label
    pub city: String,
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lon: f64,
    /// Camera heading in degrees
    pub heading: u16,
    /// Camera pitch in degrees
    pub pitch: i16,
    /// Path of the written image on success
    pub image_path: Option<String>,
    /// Whether the image was produced
    pub success: bool,
    /// Failure reason on error
    pub error: Option<String>,
}

/// One row of an annotation manifest for an external labeling platform.
///
/// Derived from successful downloads only; the identifier is the row's
/// zero-padded position in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Annotation task identifier (`ann_000000`, `ann_000001`, ...)
    pub annotation_id: String,
    /// Location identifier
    pub location_id: String,
    /// City label
    pub city: String,
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lon: f64,
    /// Camera heading in degrees
    pub heading: u16,
    /// Camera pitch in degrees
    pub pitch: i16,
    /// Path of the downloaded image
    pub image_path: String,
}

/// Per-city coverage totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityCoverage {
    /// City label
    pub city: String,
    /// Locations checked
    pub total: usize,
    /// Locations with coverage
    pub covered: usize,
}

/// Read sampled locations from a CSV file.
pub fn read_locations(path: impl AsRef<Path>) -> Result<Vec<Location>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut locations = Vec::new();
    for row in reader.deserialize() {
        locations.push(row?);
    }
    Ok(locations)
}

/// Read a coverage report from a CSV file.
pub fn read_coverage(path: impl AsRef<Path>) -> Result<Vec<CoverageRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

/// Read a download report from a CSV file.
pub fn read_downloads(path: impl AsRef<Path>) -> Result<Vec<DownloadRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

/// Write a coverage report, creating parent directories as needed.
pub fn write_coverage(path: impl AsRef<Path>, records: &[CoverageRecord]) -> Result<()> {
    write_csv(path.as_ref(), records)
}

/// Write a download report, creating parent directories as needed.
pub fn write_downloads(path: impl AsRef<Path>, records: &[DownloadRecord]) -> Result<()> {
    write_csv(path.as_ref(), records)
}

/// Write an annotation manifest, creating parent directories as needed.
pub fn write_annotations(path: impl AsRef<Path>, records: &[AnnotationRecord]) -> Result<()> {
    write_csv(path.as_ref(), records)
}

fn write_csv<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Turn coverage records back into locations for the download phase,
/// keeping only those with coverage and carrying the panorama id forward.
pub fn covered_locations(records: &[CoverageRecord]) -> Vec<Location> {
    records
        .iter()
        .filter(|r| r.has_coverage)
        .map(|r| Location {
            location_id: r.location_id.clone(),
            lat: r.lat,
            lon: r.lon,
            city: r.city.clone(),
            pano_id: r.pano_id.clone(),
            segment_id: None,
            osm_name: None,
            osm_type: None,
        })
        .collect()
}

/// Build annotation rows from download results, keeping successful downloads
/// only and numbering them sequentially.
pub fn annotation_records(records: &[DownloadRecord]) -> Vec<AnnotationRecord> {
    records
        .iter()
        .filter(|r| r.success)
        .enumerate()
        .map(|(i, r)| AnnotationRecord {
            annotation_id: format!("ann_{i:06}"),
            location_id: r.location_id.clone(),
            city: r.city.clone(),
            lat: r.lat,
            lon: r.lon,
            heading: r.heading,
            pitch: r.pitch,
            image_path: r.image_path.clone().unwrap_or_default(),
        })
        .collect()
}

/// Summarize coverage per city, sorted by city name.
pub fn coverage_by_city(records: &[CoverageRecord]) -> Vec<CityCoverage> {
    let mut cities: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for record in records {
        let entry = cities.entry(record.city.as_str()).or_default();
        entry.0 += 1;
        if record.has_coverage {
            entry.1 += 1;
        }
    }
    cities
        .into_iter()
        .map(|(city, (total, covered))| CityCoverage {
            city: city.to_string(),
            total,
            covered,
        })
        .collect()
}
