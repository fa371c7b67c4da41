//! Best-candidate selection and CDN URL rewriting.

use std::cmp::Ordering;
use std::collections::HashSet;

use url::Url;

use crate::graphql::{Candidate, MediaRecord};

use super::dash::best_from_dash;

/// Upper bound on URLs emitted by [`best_image_urls`], before de-duplication.
const MAX_IMAGE_ATTEMPTS: usize = 10;

/// What kind of retrieval a resolved URL needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Still image; retrieved through JPEG normalization.
    Image,
    /// Video; retrieved verbatim.
    Video,
}

/// A URL chosen for retrieval plus the image URLs to try if it fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    /// First URL to try.
    pub url: String,
    /// Image or video.
    pub kind: AssetKind,
    /// Remaining image URLs in preference order; always empty for video.
    pub fallbacks: Vec<String>,
}

impl ResolvedAsset {
    /// All URLs in the order they should be tried.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.url.as_str()).chain(self.fallbacks.iter().map(String::as_str))
    }
}

/// Resolves a record to the URL(s) worth retrieving.
///
/// Videos (media type 2, or `clips` / `reels`) resolve through
/// [`best_video_url`]; a video with no usable URL falls back to its cover
/// image. Returns `None` when nothing usable exists. Carousel children are
/// not considered; resolve each one separately.
#[must_use]
pub fn resolve_asset(record: &MediaRecord) -> Option<ResolvedAsset> {
    if record.is_video()
        && let Some(url) = best_video_url(record)
    {
        return Some(ResolvedAsset {
            url,
            kind: AssetKind::Video,
            fallbacks: Vec::new(),
        });
    }

    let mut urls = best_image_urls(record).into_iter();
    let url = urls.next()?;
    Some(ResolvedAsset {
        url,
        kind: AssetKind::Image,
        fallbacks: urls.collect(),
    })
}

/// Highest `width * height` candidate; first wins on ties.
///
/// With no positive score, the first candidate is returned as-is.
#[must_use]
pub fn best_image_url(record: &MediaRecord) -> Option<String> {
    best_scored(record.image_candidates())
}

/// Highest-quality video URL, preferring the DASH manifest when it yields one.
#[must_use]
pub fn best_video_url(record: &MediaRecord) -> Option<String> {
    record
        .video_dash_manifest
        .as_deref()
        .map(str::trim)
        .filter(|manifest| !manifest.is_empty())
        .and_then(best_from_dash)
        .or_else(|| best_scored(&record.video_versions))
}

fn best_scored(candidates: &[Candidate]) -> Option<String> {
    let mut best: Option<&Candidate> = None;
    for candidate in candidates.iter().filter(|c| !c.url.is_empty()) {
        if candidate.score() > best.map_or(0, Candidate::score) {
            best = Some(candidate);
        }
    }
    best.or_else(|| candidates.first())
        .map(|candidate| candidate.url.trim().to_string())
        .filter(|url| !url.is_empty())
}

/// Image URLs to try in order, JPEG-normalized variants first.
///
/// Candidates are ranked by score (descending), then by whether they already
/// look like JPEG, then by URL. Each contributes its normalized form followed
/// by its raw form, capped at ten entries, then duplicates are dropped.
#[must_use]
pub fn best_image_urls(record: &MediaRecord) -> Vec<String> {
    struct Ranked<'a> {
        url: &'a str,
        score: u64,
        jpeg: bool,
    }

    let mut ranked: Vec<Ranked<'_>> = record
        .image_candidates()
        .iter()
        .map(|candidate| (candidate.url.trim(), candidate.score()))
        .filter(|(url, _)| !url.is_empty())
        .map(|(url, score)| Ranked {
            url,
            score,
            jpeg: looks_like_jpeg(url),
        })
        .collect();

    let fallback = if ranked.is_empty() {
        best_image_url(record)
    } else {
        None
    };
    if let Some(url) = &fallback {
        ranked.push(Ranked {
            url,
            score: 0,
            jpeg: looks_like_jpeg(url),
        });
    }

    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| match (a.jpeg, b.jpeg) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => Ordering::Equal,
            })
            .then_with(|| a.url.cmp(b.url))
    });

    let mut attempts = Vec::with_capacity(MAX_IMAGE_ATTEMPTS);
    for candidate in &ranked {
        if attempts.len() >= MAX_IMAGE_ATTEMPTS {
            break;
        }
        attempts.push(normalize_to_jpeg(candidate.url));
        if attempts.len() >= MAX_IMAGE_ATTEMPTS {
            break;
        }
        attempts.push(candidate.url.to_string());
    }

    let mut seen = HashSet::new();
    attempts
        .into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty() && seen.insert(url.clone()))
        .collect()
}

/// Rewrites a CDN image URL to request a JPEG encoding.
///
/// A `.webp` path extension becomes `.jpg`; `dst-webp` inside `stp` becomes
/// `dst-jpg`; `format=webp` becomes `format=jpg`. Every other query segment
/// is kept byte-for-byte. Unparseable or already-JPEG URLs come back
/// unchanged.
#[must_use]
pub fn normalize_to_jpeg(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };
    if url.cannot_be_a_base() {
        return raw.to_string();
    }

    let mut changed = false;

    let path = url.path();
    if path.to_ascii_lowercase().ends_with(".webp") {
        let stem = &path[..path.len() - ".webp".len()];
        let new_path = format!("{stem}.jpg");
        url.set_path(&new_path);
        changed = true;
    }

    if let Some(query) = url.query() {
        let rewritten = rewrite_query_for_jpeg(query);
        if rewritten != query {
            url.set_query(Some(&rewritten));
            changed = true;
        }
    }

    if changed {
        url.to_string()
    } else {
        raw.to_string()
    }
}

fn rewrite_query_for_jpeg(query: &str) -> String {
    query
        .split('&')
        .map(|segment| match segment.split_once('=') {
            Some(("stp", value)) if value.contains("dst-webp") => {
                format!("stp={}", value.replace("dst-webp", "dst-jpg"))
            }
            Some(("format", value)) if value.eq_ignore_ascii_case("webp") => {
                "format=jpg".to_string()
            }
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Whether a URL already points at a JPEG rendition.
#[must_use]
pub fn looks_like_jpeg(raw: &str) -> bool {
    if let Ok(url) = Url::parse(raw) {
        let path = url.path().trim().to_ascii_lowercase();
        if path.ends_with(".jpg") || path.ends_with(".jpeg") {
            return true;
        }
        let first = |key: &str| {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        };
        if first("stp").is_some_and(|stp| stp.to_ascii_lowercase().contains("dst-jpg")) {
            return true;
        }
        if first("format").is_some_and(|format| {
            format.eq_ignore_ascii_case("jpg") || format.eq_ignore_ascii_case("jpeg")
        }) {
            return true;
        }
    }
    let lower = raw.to_ascii_lowercase();
    lower.contains("dst-jpg") || lower.ends_with(".jpg") || lower.ends_with(".jpeg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::ImageVersions;

    fn candidate(url: &str, width: u32, height: u32) -> Candidate {
        Candidate {
            url: url.to_string(),
            width,
            height,
        }
    }

    fn image_record(candidates: Vec<Candidate>) -> MediaRecord {
        MediaRecord {
            media_type: 1,
            image_versions2: ImageVersions { candidates },
            ..MediaRecord::default()
        }
    }

    #[test]
    fn test_best_image_url_highest_score() {
        let record = image_record(vec![
            candidate("https://c/u1.jpg", 100, 100),
            candidate("https://c/u2.jpg", 50, 50),
        ]);
        assert_eq!(best_image_url(&record).as_deref(), Some("https://c/u1.jpg"));
    }

    #[test]
    fn test_best_image_url_zero_score_falls_back_to_first() {
        let record = image_record(vec![candidate("https://c/u1.jpg", 0, 0)]);
        assert_eq!(best_image_url(&record).as_deref(), Some("https://c/u1.jpg"));
    }

    #[test]
    fn test_best_image_url_first_wins_on_tie() {
        let record = image_record(vec![
            candidate("https://c/b.jpg", 10, 10),
            candidate("https://c/a.jpg", 10, 10),
        ]);
        assert_eq!(best_image_url(&record).as_deref(), Some("https://c/b.jpg"));
    }

    #[test]
    fn test_best_image_url_empty_list() {
        assert_eq!(best_image_url(&image_record(vec![])), None);
    }

    #[test]
    fn test_normalize_to_jpeg_rewrites_webp() {
        let out = normalize_to_jpeg("https://cdn/x/img.webp?stp=dst-webp_e35&y=2");
        let url = Url::parse(&out).unwrap();
        assert!(url.path().ends_with(".jpg"), "got {out}");
        assert!(out.contains("stp=dst-jpg_e35"), "got {out}");
        assert!(out.contains("y=2"), "got {out}");
        assert_eq!(out, "https://cdn/x/img.jpg?stp=dst-jpg_e35&y=2");
    }

    #[test]
    fn test_normalize_to_jpeg_keeps_jpeg_unchanged() {
        assert_eq!(
            normalize_to_jpeg("https://cdn/x/img.jpeg?x=1"),
            "https://cdn/x/img.jpeg?x=1"
        );
    }

    #[test]
    fn test_normalize_to_jpeg_rewrites_format_param() {
        assert_eq!(
            normalize_to_jpeg("https://cdn/x/img.jpg?format=WEBP&_nc_ht=a%2Fb"),
            "https://cdn/x/img.jpg?format=jpg&_nc_ht=a%2Fb"
        );
    }

    #[test]
    fn test_normalize_to_jpeg_unparseable_is_unchanged() {
        assert_eq!(normalize_to_jpeg("not a url"), "not a url");
        assert_eq!(normalize_to_jpeg("mailto:a@b"), "mailto:a@b");
    }

    #[test]
    fn test_looks_like_jpeg() {
        assert!(looks_like_jpeg("https://c/a.JPG"));
        assert!(looks_like_jpeg("https://c/a?stp=dst-jpg_s1080x1080"));
        assert!(looks_like_jpeg("https://c/a?format=jpeg"));
        assert!(!looks_like_jpeg("https://c/a.webp?stp=dst-webp"));
        assert!(!looks_like_jpeg("https://c/a.png"));
    }

    #[test]
    fn test_best_image_urls_order_and_dedupe() {
        let record = image_record(vec![
            candidate("https://c/small.webp?stp=dst-webp", 320, 320),
            candidate("https://c/big.webp?stp=dst-webp", 1080, 1080),
            candidate("https://c/big.jpg", 1080, 1080),
        ]);
        assert_eq!(
            best_image_urls(&record),
            vec![
                "https://c/big.jpg",
                "https://c/big.jpg?stp=dst-jpg",
                "https://c/big.webp?stp=dst-webp",
                "https://c/small.jpg?stp=dst-jpg",
                "https://c/small.webp?stp=dst-webp",
            ]
        );
    }

    #[test]
    fn test_best_image_urls_capped() {
        let record = image_record(
            (0..8)
                .map(|i| candidate(&format!("https://c/{i}.webp"), 10 + i, 10))
                .collect(),
        );
        let urls = best_image_urls(&record);
        assert_eq!(urls.len(), 10);
        assert_eq!(urls[0], "https://c/7.jpg");
        assert_eq!(urls[1], "https://c/7.webp");
    }

    #[test]
    fn test_best_video_url_prefers_dash_then_flat_list() {
        let manifest = r#"<MPD><Period><AdaptationSet contentType="video">
            <Representation width="1080" height="1920"><BaseURL>https://c/dash.mp4</BaseURL></Representation>
            </AdaptationSet></Period></MPD>"#;
        let mut record = MediaRecord {
            media_type: 2,
            video_versions: vec![candidate("https://c/flat.mp4", 720, 1280)],
            video_dash_manifest: Some(manifest.to_string()),
            ..MediaRecord::default()
        };
        assert_eq!(best_video_url(&record).as_deref(), Some("https://c/dash.mp4"));

        record.video_dash_manifest = Some("<broken".to_string());
        assert_eq!(best_video_url(&record).as_deref(), Some("https://c/flat.mp4"));
    }

    #[test]
    fn test_resolve_asset_video_falls_back_to_image() {
        let mut record = image_record(vec![candidate("https://c/cover.jpg", 10, 10)]);
        record.media_type = 2;
        let asset = resolve_asset(&record).unwrap();
        assert_eq!(asset.kind, AssetKind::Image);
        assert_eq!(asset.url, "https://c/cover.jpg");

        record.video_versions = vec![candidate("https://c/v.mp4", 10, 10)];
        let asset = resolve_asset(&record).unwrap();
        assert_eq!(asset.kind, AssetKind::Video);
        assert!(asset.fallbacks.is_empty());
    }

    #[test]
    fn test_resolve_asset_nothing_usable() {
        assert_eq!(resolve_asset(&MediaRecord::default()), None);
    }

    #[test]
    fn test_resolved_asset_urls_iterates_in_order() {
        let record = image_record(vec![candidate("https://c/a.webp", 10, 10)]);
        let asset = resolve_asset(&record).unwrap();
        assert_eq!(
            asset.urls().collect::<Vec<_>>(),
            vec!["https://c/a.jpg", "https://c/a.webp"]
        );
    }
}
