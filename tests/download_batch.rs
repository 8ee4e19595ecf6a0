//! Download batch behavior: idempotent skip-existing, content-type checks,
//! and per-item failure isolation with the direct fetcher.

use std::io::Cursor;
use std::time::Duration;

use image::{DynamicImage, RgbImage};
use roadview::{
    download_images_batch, image_filename, ClientConfig, DirectFetcher, DownloadOptions, Location,
    StreetViewClient,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn location(id: &str) -> Location {
    Location {
        location_id: id.to_string(),
        lat: 19.076,
        lon: 72.877,
        city: "mumbai".to_string(),
        pano_id: None,
        segment_id: None,
        osm_name: None,
        osm_type: None,
    }
}

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .unwrap();
    buf
}

fn fetcher_for(server: &MockServer) -> DirectFetcher {
    let config = ClientConfig::new("test_key")
        .rate_limit(Duration::ZERO)
        .image_endpoint(format!("{}/streetview", server.uri()));
    DirectFetcher::new(StreetViewClient::new(config).unwrap())
}

#[tokio::test]
async fn downloads_one_file_per_heading() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/streetview"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(jpeg_bytes(64, 64), "image/jpeg"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let options = DownloadOptions::new(dir.path());
    let locations = vec![location("loc_00001")];

    let mut fetcher = fetcher_for(&server);
    let records = download_images_batch(&mut fetcher, &locations, &options)
        .await
        .unwrap();

    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.success));
    for heading in [0u16, 90, 180, 270] {
        assert!(dir.path().join(image_filename("loc_00001", heading, 0)).exists());
    }
}

#[tokio::test]
async fn custom_size_reaches_the_endpoint() {
    let server = MockServer::start().await;
    // Only requests carrying the configured size are answered.
    Mock::given(method("GET"))
        .and(path("/streetview"))
        .and(query_param("size", "320x240"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(jpeg_bytes(64, 64), "image/jpeg"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let options = DownloadOptions::new(dir.path());
    let locations = vec![location("loc_00001")];

    let mut fetcher = fetcher_for(&server).size(320, 240);
    let records = download_images_batch(&mut fetcher, &locations, &options)
        .await
        .unwrap();

    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.success));
}

#[tokio::test]
async fn second_run_skips_existing_without_network_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/streetview"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(jpeg_bytes(64, 64), "image/jpeg"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let options = DownloadOptions::new(dir.path());
    let locations = vec![location("loc_00001"), location("loc_00002")];

    let mut fetcher = fetcher_for(&server);
    let first = download_images_batch(&mut fetcher, &locations, &options)
        .await
        .unwrap();

    // Re-run against a fresh server that expects no traffic at all.
    let silent = MockServer::start().await;
    let mut resumed = fetcher_for(&silent);
    let second = download_images_batch(&mut resumed, &locations, &options)
        .await
        .unwrap();

    assert!(silent.received_requests().await.unwrap().is_empty());
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.location_id, b.location_id);
        assert_eq!(a.heading, b.heading);
        assert_eq!(a.image_path, b.image_path);
        assert!(b.success);
    }
}

#[tokio::test]
async fn partial_file_set_is_refetched_in_full() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/streetview"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(jpeg_bytes(64, 64), "image/jpeg"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let options = DownloadOptions::new(dir.path());
    let locations = vec![location("loc_00001")];

    // Simulate a crash that left only one of the four heading files behind.
    std::fs::write(dir.path().join(image_filename("loc_00001", 0, 0)), b"partial").unwrap();

    let mut fetcher = fetcher_for(&server);
    let records = download_images_batch(&mut fetcher, &locations, &options)
        .await
        .unwrap();

    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.success));
    // All four headings hit the network, including the one that existed.
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn non_image_response_is_a_per_item_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/streetview"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("quota exceeded", "text/html"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let options = DownloadOptions::new(dir.path());
    let locations = vec![location("loc_00001")];

    let mut fetcher = fetcher_for(&server);
    let records = download_images_batch(&mut fetcher, &locations, &options)
        .await
        .unwrap();

    assert_eq!(records.len(), 4);
    for record in &records {
        assert!(!record.success);
        assert!(record.image_path.is_none());
        let error = record.error.as_deref().unwrap();
        assert!(error.contains("content type"), "error was: {error}");
    }
}

#[tokio::test]
async fn skip_existing_disabled_refetches_everything() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/streetview"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(jpeg_bytes(64, 64), "image/jpeg"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let options = DownloadOptions::new(dir.path()).skip_existing(false);
    let locations = vec![location("loc_00001")];

    let mut fetcher = fetcher_for(&server);
    download_images_batch(&mut fetcher, &locations, &options)
        .await
        .unwrap();
    download_images_batch(&mut fetcher, &locations, &options)
        .await
        .unwrap();

    assert_eq!(server.received_requests().await.unwrap().len(), 8);
}
