//! Error types for the download module.
//!
//! Retrieval errors are returned per item; the caller decides whether to try
//! another URL, skip, or abort.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while retrieving a media URL to disk.
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// The URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// Non-2xx response; nothing was written to the destination.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Network-level error (DNS resolution, connection refused, TLS, body read).
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// File system error (create directory, write, rename).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The payload is not a JPEG, PNG or WebP image.
    ///
    /// The bytes are kept under a `.bin` extension when possible.
    #[error("unsupported image content-type {content_type:?} from {url}{}", preserved_suffix(.preserved.as_ref()))]
    UnsupportedImageType {
        /// The URL that served the payload.
        url: String,
        /// Effective content type after sniffing.
        content_type: String,
        /// Where the original bytes were kept, if preserving succeeded.
        preserved: Option<PathBuf>,
    },

    /// Conversion to JPEG failed and the original bytes could not be kept either.
    #[error("failed to convert {format} to jpeg: {reason} (and failed to preserve original: {preserve_error})")]
    Conversion {
        /// Source encoding (`png` or `webp`).
        format: &'static str,
        /// Decode or encode failure.
        reason: String,
        /// Why the fallback rename failed.
        preserve_error: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// The caller's cancellation token fired before completion.
    #[error("retrieval cancelled")]
    Cancelled,
}

fn preserved_suffix(preserved: Option<&PathBuf>) -> String {
    preserved
        .map(|path| format!(" (kept as {})", path.display()))
        .unwrap_or_default()
}

impl RetrieveError {
    /// Maps a reqwest error, separating timeouts from other transport failures.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}
