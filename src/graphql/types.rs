//! Typed shapes decoded from query responses.
//!
//! Unknown fields are ignored everywhere; missing and `null` fields decode to
//! their defaults so a partially populated record still resolves.

use serde::Deserialize;

use super::de::{null_default, string_or_number};
use super::error::QueryError;

/// One encoded variant of an image or video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Candidate {
    /// CDN URL.
    #[serde(deserialize_with = "null_default")]
    pub url: String,
    /// Reported width in pixels; zero when unknown.
    #[serde(deserialize_with = "null_default")]
    pub width: u32,
    /// Reported height in pixels; zero when unknown.
    #[serde(deserialize_with = "null_default")]
    pub height: u32,
}

impl Candidate {
    /// Quality score: `width * height`.
    #[must_use]
    pub fn score(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Container for image candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImageVersions {
    /// Image variants in server order.
    #[serde(deserialize_with = "null_default")]
    pub candidates: Vec<Candidate>,
}

/// Owner reference embedded in a media record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IgUser {
    /// Numeric user id.
    #[serde(deserialize_with = "string_or_number")]
    pub pk: String,
    /// Profile name.
    #[serde(deserialize_with = "null_default")]
    pub username: String,
}

/// One photo, video or carousel item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MediaRecord {
    /// Composite id (`<pk>_<owner>`).
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Primary key.
    #[serde(deserialize_with = "string_or_number")]
    pub pk: String,
    /// Shortcode used in permalinks.
    #[serde(deserialize_with = "null_default")]
    pub code: String,
    /// Capture time, unix seconds; zero when unknown.
    #[serde(deserialize_with = "null_default")]
    pub taken_at: i64,
    /// 1 = image, 2 = video, 8 = carousel.
    #[serde(deserialize_with = "null_default")]
    pub media_type: i64,
    /// `feed`, `clips`, `carousel_container`, `story`...
    #[serde(deserialize_with = "null_default")]
    pub product_type: String,
    /// Owner.
    #[serde(deserialize_with = "null_default")]
    pub user: IgUser,
    /// Image variants.
    #[serde(deserialize_with = "null_default")]
    pub image_versions2: ImageVersions,
    /// Flat list of progressive video variants.
    #[serde(deserialize_with = "null_default")]
    pub video_versions: Vec<Candidate>,
    /// MPEG-DASH manifest XML, when the server includes one.
    #[serde(deserialize_with = "null_default")]
    pub video_dash_manifest: Option<String>,
    /// Children of a carousel; each is resolved on its own.
    #[serde(deserialize_with = "null_default")]
    pub carousel_media: Vec<MediaRecord>,
}

impl MediaRecord {
    /// Image candidates in server order.
    #[must_use]
    pub fn image_candidates(&self) -> &[Candidate] {
        &self.image_versions2.candidates
    }

    /// Whether the record should be retrieved as a video.
    #[must_use]
    pub fn is_video(&self) -> bool {
        self.media_type == 2 || matches!(self.product_type.as_str(), "clips" | "reels")
    }

    /// Most specific identifier available, for file naming.
    #[must_use]
    pub fn best_identifier(&self) -> Option<&str> {
        [self.pk.as_str(), self.id.as_str()]
            .into_iter()
            .find(|id| !id.is_empty())
    }
}

/// Pagination position returned by every page operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageCursor {
    /// Opaque cursor; passed back verbatim.
    #[serde(deserialize_with = "null_default")]
    pub end_cursor: Option<String>,
    /// Whether another page exists.
    #[serde(deserialize_with = "null_default")]
    pub has_next_page: bool,
}

impl PageCursor {
    /// Cursor for the next request, or `None` when pagination is finished.
    ///
    /// A missing or empty cursor is terminal even when `has_next_page` is set.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        if !self.has_next_page {
            return None;
        }
        self.end_cursor.as_deref().filter(|cursor| !cursor.is_empty())
    }
}

/// One page of a profile's timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostsPage {
    /// Records in server order.
    pub records: Vec<MediaRecord>,
    /// Where the next page starts.
    pub cursor: PageCursor,
    /// Owner id from the first record that carries one.
    pub user_id: Option<String>,
}

/// A story highlight as listed in the profile tray.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Highlight {
    /// Reel id (`highlight:<n>`).
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// User-chosen title; may be empty.
    #[serde(deserialize_with = "null_default")]
    pub title: String,
}

/// A highlight reel with its items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HighlightReel {
    /// Reel id.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Story items in display order.
    #[serde(deserialize_with = "null_default")]
    pub items: Vec<MediaRecord>,
}

/// One page of highlight reels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightsPage {
    /// Reels in server order.
    pub reels: Vec<HighlightReel>,
    /// Where the next page starts.
    pub cursor: PageCursor,
}

// ---- Response envelopes ----

/// Top-level response: `{ "data": ..., "status": "ok" }`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<D> {
    #[serde(default)]
    pub data: Option<D>,
    #[serde(default, deserialize_with = "null_default")]
    pub errors: Vec<ApiErrorEntry>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ApiErrorEntry {
    #[serde(deserialize_with = "null_default")]
    pub message: String,
}

impl<D: Default> Envelope<D> {
    /// Unwraps `data`, surfacing server-reported errors when it is absent.
    pub fn into_data(self, operation: &str) -> Result<D, QueryError> {
        match self.data {
            Some(data) => Ok(data),
            None if !self.errors.is_empty() => {
                let message = self
                    .errors
                    .iter()
                    .map(|entry| entry.message.as_str())
                    .filter(|message| !message.is_empty())
                    .collect::<Vec<_>>()
                    .join("; ");
                Err(QueryError::api(operation, message))
            }
            None => {
                if self.status.as_deref().is_some_and(|status| status != "ok") {
                    return Err(QueryError::api(
                        operation,
                        format!("status {}", self.status.unwrap_or_default()),
                    ));
                }
                Ok(D::default())
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, bound(deserialize = "N: Deserialize<'de> + Default"))]
pub(crate) struct Connection<N> {
    #[serde(deserialize_with = "null_default")]
    pub edges: Vec<Edge<N>>,
    #[serde(deserialize_with = "null_default")]
    pub page_info: PageCursor,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, bound(deserialize = "N: Deserialize<'de> + Default"))]
pub(crate) struct Edge<N> {
    #[serde(deserialize_with = "null_default")]
    pub node: N,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct TimelineData {
    #[serde(
        rename = "xdt_api__v1__feed__user_timeline_graphql_connection",
        deserialize_with = "null_default"
    )]
    pub connection: Connection<MediaRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct HighlightsTrayData {
    #[serde(deserialize_with = "null_default")]
    pub highlights: Connection<Highlight>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ReelsMediaData {
    #[serde(
        rename = "xdt_api__v1__feed__reels_media__connection",
        deserialize_with = "null_default"
    )]
    pub connection: Connection<HighlightReel>,
}
