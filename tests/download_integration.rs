//! Integration tests for the retrieval pipeline.
//!
//! These tests verify the full retrieval flow against mock HTTP servers:
//! content sniffing, JPEG normalization, fallbacks and atomic publishing.

mod support;

use std::path::Path;
use std::time::Duration;

use idl_core::graphql::{Candidate, ImageVersions};
use idl_core::{MediaRecord, RetrieveError, Retriever, RetrieverOptions};
use support::socket_guard::start_mock_server_or_skip;
use support::{jpeg_bytes, transparent_png_bytes, webp_bytes};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn retriever() -> Retriever {
    Retriever::new(RetrieverOptions::default()).expect("retriever builds")
}

async fn serve(server: &MockServer, route: &str, body: Vec<u8>, content_type: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .insert_header("Content-Type", content_type),
        )
        .mount(server)
        .await;
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|read| {
            read.filter_map(Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn test_retrieve_streams_bytes_verbatim_with_headers() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let body = b"\x00\x00\x00\x18ftypmp42 not really a video".to_vec();
    Mock::given(method("GET"))
        .and(path("/v.mp4"))
        .and(header("Referer", "https://www.instagram.com/"))
        .and(header("Accept", "*/*"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("nested").join("clip.mp4");
    let saved = retriever()
        .retrieve(&format!("{}/v.mp4", server.uri()), &dest, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(saved, dest);
    assert_eq!(std::fs::read(&dest).unwrap(), body);
    assert_eq!(entries(&dir.path().join("nested")), ["clip.mp4"]);
}

#[tokio::test]
async fn test_retrieve_as_jpeg_keeps_jpeg_bytes() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let jpeg = jpeg_bytes();
    Mock::given(method("GET"))
        .and(path("/a.jpg"))
        .and(|request: &Request| {
            request
                .headers
                .get("accept")
                .is_some_and(|value| value.as_bytes() == b"image/jpeg,image/png,*/*;q=0.8")
        })
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(jpeg.clone())
                .insert_header("Content-Type", "image/jpeg"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("a.jpg");
    let saved = retriever()
        .retrieve_as_jpeg(&format!("{}/a.jpg", server.uri()), &dest, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(saved, dest);
    assert_eq!(std::fs::read(&dest).unwrap(), jpeg);
    assert_eq!(entries(dir.path()), ["a.jpg"]);
}

#[tokio::test]
async fn test_retrieve_as_jpeg_converts_transparent_png_onto_white() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    serve(&server, "/p.png", transparent_png_bytes(), "image/png").await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("p.jpg");
    let saved = retriever()
        .retrieve_as_jpeg(&format!("{}/p.png", server.uri()), &dest, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(saved, dest);

    let decoded = image::open(&dest).unwrap();
    assert_eq!(image::ImageFormat::from_path(&dest).unwrap(), image::ImageFormat::Jpeg);
    let pixel = decoded.to_rgb8().get_pixel(3, 3).0;
    assert!(pixel.iter().all(|&channel| channel >= 250), "got {pixel:?}");
    assert_eq!(entries(dir.path()), ["p.jpg"]);
}

#[tokio::test]
async fn test_retrieve_as_jpeg_sniffs_mislabeled_webp() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    serve(&server, "/w.jpg", webp_bytes(), "image/jpeg").await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("w.jpg");
    retriever()
        .retrieve_as_jpeg(&format!("{}/w.jpg", server.uri()), &dest, &CancellationToken::new())
        .await
        .unwrap();

    let bytes = std::fs::read(&dest).unwrap();
    assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF], "published file must be JPEG");
    assert_eq!(
        image::guess_format(&bytes).unwrap(),
        image::ImageFormat::Jpeg
    );
}

#[tokio::test]
async fn test_retrieve_as_jpeg_corrupt_png_keeps_original_extension() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let mut corrupt = transparent_png_bytes();
    corrupt.truncate(40);
    serve(&server, "/broken.png", corrupt.clone(), "image/png").await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("broken.jpg");
    let saved = retriever()
        .retrieve_as_jpeg(
            &format!("{}/broken.png", server.uri()),
            &dest,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(saved, dir.path().join("broken.png"));
    assert_eq!(std::fs::read(&saved).unwrap(), corrupt);
    assert!(!dest.exists());
    assert_eq!(entries(dir.path()), ["broken.png"]);
}

#[tokio::test]
async fn test_retrieve_as_jpeg_unsupported_payload_is_kept_as_bin() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    serve(
        &server,
        "/login",
        b"<html>please log in</html>".to_vec(),
        "text/html; charset=utf-8",
    )
    .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("x.jpg");
    let err = retriever()
        .retrieve_as_jpeg(&format!("{}/login", server.uri()), &dest, &CancellationToken::new())
        .await
        .unwrap_err();

    match &err {
        RetrieveError::UnsupportedImageType {
            content_type,
            preserved,
            ..
        } => {
            assert_eq!(content_type, "text/html");
            assert_eq!(preserved.as_deref(), Some(dir.path().join("x.bin").as_path()));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(entries(dir.path()), ["x.bin"]);
}

#[tokio::test]
async fn test_retrieve_non_success_status_writes_nothing() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("a.jpg");
    let err = retriever()
        .retrieve_as_jpeg(&format!("{}/a.jpg", server.uri()), &dest, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(
        matches!(err, RetrieveError::HttpStatus { status: 403, .. }),
        "got: {err}"
    );
    assert!(entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_retrieve_cancelled_mid_flight_leaves_no_file() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(jpeg_bytes())
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("slow.jpg");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = retriever()
        .retrieve_as_jpeg(&format!("{}/slow.jpg", server.uri()), &dest, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, RetrieveError::Cancelled), "got: {err}");
    assert!(!dest.exists());
    assert!(entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_retrieve_best_asset_falls_back_to_next_image_url() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/big.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    serve(&server, "/small.jpg", jpeg_bytes(), "image/jpeg").await;

    let record = MediaRecord {
        pk: "1".to_string(),
        media_type: 1,
        image_versions2: ImageVersions {
            candidates: vec![
                Candidate {
                    url: format!("{}/big.jpg", server.uri()),
                    width: 1080,
                    height: 1080,
                },
                Candidate {
                    url: format!("{}/small.jpg", server.uri()),
                    width: 320,
                    height: 320,
                },
            ],
        },
        ..MediaRecord::default()
    };

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("post.jpg");
    let saved = retriever()
        .retrieve_best_asset(&record, &dest, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(saved.as_deref(), Some(dest.as_path()));
    assert_eq!(std::fs::read(&dest).unwrap(), jpeg_bytes());
}

#[tokio::test]
async fn test_retrieve_best_asset_without_candidates_is_skipped() {
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("nothing.jpg");
    let saved = retriever()
        .retrieve_best_asset(&MediaRecord::default(), &dest, &CancellationToken::new())
        .await
        .unwrap();
    assert!(saved.is_none());
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_retrieve_best_asset_video_is_retrieved_verbatim() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/clip.mp4"))
        .and(header("Accept", "*/*"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video-bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let record = MediaRecord {
        pk: "9".to_string(),
        media_type: 2,
        video_versions: vec![Candidate {
            url: format!("{}/clip.mp4", server.uri()),
            width: 720,
            height: 1280,
        }],
        ..MediaRecord::default()
    };

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("clip.mp4");
    retriever()
        .retrieve_best_asset(&record, &dest, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"video-bytes");
}
