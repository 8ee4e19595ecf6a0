use reqwest::Client;
use serde::Deserialize;

use crate::error::Result;
use crate::types::{CoverageResult, STATUS_OK};

/// Internal structure for parsing the metadata response.
///
/// `pano_id` and `date` are absent when the status is not "OK", and may be
/// absent even when it is.
#[derive(Debug, Deserialize)]
struct MetadataResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    pano_id: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

/// Check whether imagery coverage exists at a coordinate.
///
/// Uses the free metadata endpoint. A non-2xx response or transport failure
/// is a hard error; a well-formed response with any status is a normal
/// result, with `has_coverage` true only for status "OK".
pub(crate) async fn check_coverage(
    client: &Client,
    endpoint: &str,
    api_key: &str,
    lat: f64,
    lon: f64,
) -> Result<CoverageResult> {
    let url = format!("{endpoint}?location={lat},{lon}&key={api_key}");

    let response = client.get(&url).send().await?.error_for_status()?;
    let data: MetadataResponse = response.json().await?;

    let status = data.status.unwrap_or_else(|| "UNKNOWN".to_string());
    let has_coverage = status == STATUS_OK;

    Ok(CoverageResult {
        lat,
        lon,
        has_coverage,
        pano_id: data.pano_id,
        capture_date: data.date,
        status,
    })
}
