//! Coverage client and coverage batch behavior against a mocked metadata
//! endpoint.

use std::time::Duration;

use roadview::{check_coverage_batch, ClientConfig, Location, RoadviewError, StreetViewClient};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn location(id: &str, lat: f64, lon: f64) -> Location {
    Location {
        location_id: id.to_string(),
        lat,
        lon,
        city: "mumbai".to_string(),
        pano_id: None,
        segment_id: None,
        osm_name: None,
        osm_type: None,
    }
}

async fn client_for(server: &MockServer) -> StreetViewClient {
    let config = ClientConfig::new("test_key")
        .rate_limit(Duration::ZERO)
        .metadata_endpoint(format!("{}/metadata", server.uri()));
    StreetViewClient::new(config).unwrap()
}

#[tokio::test]
async fn ok_status_yields_coverage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metadata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "pano_id": "abc123",
            "date": "2021-04",
        })))
        .mount(&server)
        .await;

    let mut client = client_for(&server).await;
    let result = client.check_coverage(19.076, 72.877).await.unwrap();

    assert!(result.has_coverage);
    assert_eq!(result.pano_id.as_deref(), Some("abc123"));
    assert_eq!(result.capture_date.as_deref(), Some("2021-04"));
    assert_eq!(result.status, "OK");
}

#[tokio::test]
async fn zero_results_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metadata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ZERO_RESULTS",
        })))
        .mount(&server)
        .await;

    let mut client = client_for(&server).await;
    let result = client.check_coverage(19.076, 72.877).await.unwrap();

    assert!(!result.has_coverage);
    assert_eq!(result.pano_id, None);
    assert_eq!(result.status, "ZERO_RESULTS");
}

#[tokio::test]
async fn server_error_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metadata"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut client = client_for(&server).await;
    let err = client.check_coverage(19.076, 72.877).await.unwrap_err();
    assert!(matches!(err, RoadviewError::Http(_)));
}

#[tokio::test]
async fn batch_isolates_one_failing_location() {
    let server = MockServer::start().await;

    // The middle location's coordinate fails at the transport level.
    Mock::given(method("GET"))
        .and(path("/metadata"))
        .and(query_param("location", "11.5,21.5"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/metadata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "pano_id": "pano_ok",
        })))
        .mount(&server)
        .await;

    let locations = vec![
        location("loc_00001", 10.5, 20.5),
        location("loc_00002", 11.5, 21.5),
        location("loc_00003", 12.5, 22.5),
    ];

    let mut client = client_for(&server).await;
    let records = check_coverage_batch(&mut client, &locations).await;

    assert_eq!(records.len(), 3);
    assert!(records[0].has_coverage);
    assert!(records[2].has_coverage);

    let failed = &records[1];
    assert_eq!(failed.location_id, "loc_00002");
    assert!(!failed.has_coverage);
    assert!(failed.status.starts_with("ERROR:"), "status was {}", failed.status);
    assert_eq!(failed.pano_id, None);
}
