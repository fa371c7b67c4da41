//! Shared fixtures for integration tests.

#![allow(dead_code)]

pub mod socket_guard;

use std::io::Cursor;

use idl_core::{ClientOptions, CookieRecord, DocIds, GraphqlClient};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use wiremock::MockServer;

/// Bootstrap page embedding both session tokens the way the web root does.
pub const BOOTSTRAP_HTML: &str = r#"<html><head><script>
requireLazy(["ServerJS"],function(){["LSD",[],{"token":"lsd-token-1"}],
["DTSGInitialData",[],{"token":"AB"}]});
</script></head><body></body></html>"#;

/// Stable doc ids so tests can match on request bodies.
pub fn test_doc_ids() -> DocIds {
    DocIds {
        posts_first_page: "1001".to_string(),
        posts_pagination: "1002".to_string(),
        highlights_tray: "2001".to_string(),
        highlights_page: "2002".to_string(),
    }
}

/// Cookie for the plain-http mock host.
pub fn local_cookie(name: &str, value: &str) -> CookieRecord {
    CookieRecord::new("127.0.0.1", "/", false, true, None, name, value)
        .expect("valid test cookie")
}

/// A logged-in session for the mock server.
pub fn logged_in_cookies() -> Vec<CookieRecord> {
    vec![
        local_cookie("sessionid", "4242%3Aabc"),
        local_cookie("csrftoken", "csrf-1"),
        local_cookie("ds_user_id", "4242"),
    ]
}

pub fn client_for(server: &MockServer, cookies: &[CookieRecord]) -> GraphqlClient {
    GraphqlClient::new(
        cookies,
        ClientOptions {
            base_url: server.uri(),
            doc_ids: test_doc_ids(),
            ..ClientOptions::default()
        },
    )
    .expect("client builds")
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).expect("encode test image");
    out.into_inner()
}

/// 8x8 solid red JPEG.
pub fn jpeg_bytes() -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 0, 0])));
    encode(&image, ImageFormat::Jpeg)
}

/// 8x8 fully transparent PNG.
pub fn transparent_png_bytes() -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 0])));
    encode(&image, ImageFormat::Png)
}

/// 8x8 opaque green WebP (lossless).
pub fn webp_bytes() -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 160, 0, 255])));
    encode(&image, ImageFormat::WebP)
}
