//! Output layout: directory segments and media file names.

use std::sync::LazyLock;

use chrono::DateTime;
use idl_core::{AssetKind, MediaRecord};
use regex::Regex;
use url::Url;

#[allow(clippy::expect_used)]
static UNSAFE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9._-]+").expect("static regex is valid"));

const MAX_EXTENSION_LEN: usize = 10;

/// Makes `raw` safe as a single path segment.
///
/// Runs of characters outside `[A-Za-z0-9._-]` become `_`, leading and
/// trailing `.`, `_` and `-` are trimmed, and an empty result is `unknown`.
pub(crate) fn sanitize_segment(raw: &str) -> String {
    let replaced = UNSAFE_RUN.replace_all(raw.trim(), "_");
    let trimmed = replaced.trim_matches(|c| matches!(c, '.' | '_' | '-'));
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Directory name for a highlight; untitled highlights share `highlight`.
pub(crate) fn highlight_dir_name(title: &str) -> String {
    if title.trim().is_empty() {
        "highlight".to_string()
    } else {
        sanitize_segment(title)
    }
}

/// `YYYYMMDD_HHMMSS` in UTC, or `unknown` for missing timestamps.
pub(crate) fn timestamp_label(taken_at: i64) -> String {
    if taken_at <= 0 {
        return "unknown".to_string();
    }
    DateTime::from_timestamp(taken_at, 0).map_or_else(
        || "unknown".to_string(),
        |moment| moment.format("%Y%m%d_%H%M%S").to_string(),
    )
}

/// Lowercased path extension of `raw` including the dot.
///
/// Returns `None` for unparseable URLs, extension-less paths and
/// extensions longer than ten characters.
pub(crate) fn ext_from_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let last = url.path().rsplit('/').next()?;
    let dot = last.rfind('.')?;
    let ext = &last[dot..];
    if ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// File name for one record: `<timestamp>_<id>[_NN]<ext>`.
///
/// `index` is the 1-based position for carousel children and highlight
/// items, zero for a standalone post. Images are always named `.jpg` because
/// the retriever normalizes them; videos keep their URL extension.
pub(crate) fn media_file_name(record: &MediaRecord, index: usize, kind: AssetKind, url: &str) -> String {
    let id = record.best_identifier().unwrap_or("media");
    let part = if index > 0 {
        format!("_{index:02}")
    } else {
        String::new()
    };
    let ext = match kind {
        AssetKind::Image => ".jpg".to_string(),
        AssetKind::Video => ext_from_url(url).unwrap_or_else(|| ".mp4".to_string()),
    };
    format!("{}_{id}{part}{ext}", timestamp_label(record.taken_at))
}
