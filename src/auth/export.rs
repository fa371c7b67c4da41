//! Session export loading and format detection.
//!
//! Supports the two formats browser extensions commonly produce:
//! - Netscape HTTP Cookie File format (`cookies.txt`)
//! - Cookie-Editor style JSON (bare array, `{ "cookies": [...] }`, or a single object)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::cookies::{CookieRecord, ParseResult, parse_netscape_cookies};

/// Errors that can occur while loading a session export.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file is missing or unreadable.
    #[error("failed to read session file {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file contains nothing but whitespace or a byte-order mark.
    #[error("session file {path} is empty")]
    EmptyFile {
        /// Path of the empty file.
        path: PathBuf,
    },

    /// The file looks like JSON but cannot be decoded as a cookie export.
    #[error("session file {path} is not a valid cookie-editor JSON export: {source}")]
    InvalidJson {
        /// Path of the malformed file.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

/// Session export format detected from the first significant byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Netscape HTTP Cookie File format.
    Netscape,
    /// JSON export format.
    Json,
}

/// Reads and parses a session export from disk.
///
/// Individual malformed lines or entries are logged and skipped. An empty
/// result is not an error here; the query client reports a missing
/// `sessionid` when it first needs one.
///
/// # Errors
///
/// Returns [`LoadError`] when the file is missing, unreadable, empty, or
/// malformed JSON.
#[instrument(level = "debug", fields(path = %path.display()))]
pub fn load_session_cookies(path: &Path) -> Result<Vec<CookieRecord>, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);

    let (format, result) = parse_session_export(&text, path)?;
    for (entry, reason) in &result.warnings {
        warn!(entry, reason = %reason, "skipped session cookie");
    }
    info!(
        ?format,
        cookies = result.cookies.len(),
        skipped = result.warnings.len(),
        "loaded session cookies"
    );
    Ok(result.cookies)
}

/// Parses session export text, auto-detecting its format.
///
/// Detection looks at the first byte after stripping a UTF-8 byte-order mark
/// and leading whitespace: `[` or `{` selects JSON, anything else Netscape.
/// `origin` is only used to label errors.
///
/// # Errors
///
/// Returns [`LoadError::EmptyFile`] for blank input and
/// [`LoadError::InvalidJson`] when JSON decoding fails.
pub fn parse_session_export(
    input: &str,
    origin: &Path,
) -> Result<(ExportFormat, ParseResult), LoadError> {
    let trimmed = input.trim_start_matches(|c: char| c == '\u{feff}' || c.is_ascii_whitespace());
    if trimmed.is_empty() {
        return Err(LoadError::EmptyFile {
            path: origin.to_path_buf(),
        });
    }

    if looks_like_json(trimmed) {
        let result = parse_json_cookies(trimmed).map_err(|source| LoadError::InvalidJson {
            path: origin.to_path_buf(),
            source,
        })?;
        Ok((ExportFormat::Json, result))
    } else {
        Ok((ExportFormat::Netscape, parse_netscape_cookies(trimmed)))
    }
}

fn looks_like_json(input: &str) -> bool {
    input.starts_with('[') || input.starts_with('{')
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct JsonCookieEntry {
    name: String,
    value: String,
    domain: String,
    path: String,
    secure: bool,
    http_only: bool,
    session: bool,
    expiration_date: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonCookieContainer {
    #[serde(default)]
    cookies: Vec<JsonCookieEntry>,
}

fn parse_json_cookies(input: &str) -> Result<ParseResult, serde_json::Error> {
    let entries: Vec<JsonCookieEntry> = if input.starts_with('[') {
        serde_json::from_str(input)?
    } else {
        match serde_json::from_str::<JsonCookieContainer>(input) {
            Ok(container) if !container.cookies.is_empty() => container.cookies,
            _ => vec![serde_json::from_str::<JsonCookieEntry>(input)?],
        }
    };

    let mut result = ParseResult::default();
    for (index, entry) in entries.into_iter().enumerate() {
        let expires = if entry.session {
            None
        } else {
            entry.expiration_date.as_ref().and_then(expiration_seconds)
        };
        match CookieRecord::new(
            &entry.domain,
            &entry.path,
            entry.secure,
            entry.http_only,
            expires,
            &entry.name,
            entry.value,
        ) {
            Some(cookie) => result.cookies.push(cookie),
            None => result
                .warnings
                .push((index + 1, "missing cookie domain or name".to_string())),
        }
    }
    Ok(result)
}

/// Reads `expirationDate` as integer or fractional seconds.
///
/// Non-positive, non-finite and out-of-range values mean "no expiry".
#[allow(clippy::cast_precision_loss)]
fn expiration_seconds(raw: &Value) -> Option<u64> {
    if let Some(seconds) = raw.as_u64() {
        return (seconds > 0).then_some(seconds);
    }
    let seconds = raw.as_f64()?;
    if !seconds.is_finite() || seconds <= 0.0 || seconds >= u64::MAX as f64 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(seconds.trunc() as u64)
}
