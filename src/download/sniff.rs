//! Payload classification from magic bytes and the declared content type.
//!
//! CDNs mislabel image responses, so a recognized signature always wins over
//! the `Content-Type` header.

/// Bytes captured from the head of each image response.
pub(crate) const SNIFF_LEN: usize = 512;

/// Image encodings the retriever knows how to publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImageType {
    Jpeg,
    Png,
    Webp,
}

impl ImageType {
    fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Short lowercase name, used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    /// Extension used when the original bytes are kept as-is.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => ".jpg",
            Self::Png => ".png",
            Self::Webp => ".webp",
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::Webp => image::ImageFormat::WebP,
        }
    }
}

/// Outcome of classifying one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Classification {
    /// Effective content type, for error reporting.
    pub content_type: String,
    /// Recognized image encoding, if any.
    pub image: Option<ImageType>,
}

/// Lowercases and strips parameters: `Image/PNG; q=1` becomes `image/png`.
pub(crate) fn normalize_content_type(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    match lowered.split_once(';') {
        Some((mime, _)) => mime.trim().to_string(),
        None => lowered,
    }
}

/// Classifies a payload from its leading bytes and declared type.
///
/// Precedence: a sniffed JPEG/PNG/WebP signature, then the declared type,
/// then whatever else the signature says. Unknown payloads are reported as
/// `application/octet-stream`.
pub(crate) fn classify(prefix: &[u8], declared: Option<&str>) -> Classification {
    let declared = declared.map(normalize_content_type).unwrap_or_default();
    let sniffed = infer::get(prefix).map(|kind| kind.mime_type().to_string());

    let content_type = match sniffed {
        Some(sniffed) if ImageType::from_mime(&sniffed).is_some() => sniffed,
        Some(sniffed) if declared.is_empty() => sniffed,
        _ if !declared.is_empty() => declared,
        _ => "application/octet-stream".to_string(),
    };

    Classification {
        image: ImageType::from_mime(&content_type),
        content_type,
    }
}
