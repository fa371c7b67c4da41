//! Constants for the download module (timeouts, headers, scratch naming).

use std::time::Duration;

/// Default HTTP connect timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default total timeout per retrieval.
pub const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Referer the CDN expects from web traffic.
pub const DEFAULT_REFERER: &str = "https://www.instagram.com/";

/// Accept header for verbatim retrieval.
pub(crate) const ACCEPT_ANY: &str = "*/*";

/// Accept header for image retrieval. WebP is left out on purpose so the CDN
/// is less likely to pick it.
pub(crate) const ACCEPT_JPEG_PREFERRED: &str = "image/jpeg,image/png,*/*;q=0.8";

pub(crate) const PLAIN_SCRATCH_SUFFIX: &str = ".tmp";
pub(crate) const DOWNLOAD_SCRATCH_SUFFIX: &str = ".download.tmp";
pub(crate) const CONVERT_SCRATCH_SUFFIX: &str = ".convert.tmp";

/// Extension for payloads that are not a recognized image.
pub(crate) const UNSUPPORTED_EXTENSION: &str = ".bin";

/// Fallback lower pacing bound when the caller passes zero.
pub(crate) const PACER_MIN_FLOOR: Duration = Duration::from_millis(150);
