//! Per-operation query variables.
//!
//! Field order is alphabetical to match the byte layout the web client sends.
//! `None` fields serialize as `null`; the endpoint expects them present.

use serde::Serialize;

/// Timeline page size requested by the web client.
pub(crate) const TIMELINE_PAGE_SIZE: u32 = 12;

/// Highlight reels requested per page when the caller passes zero.
pub const DEFAULT_HIGHLIGHTS_PAGE_SIZE: u32 = 10;

#[derive(Debug, Serialize)]
pub(crate) struct TimelineFeedData {
    count: u32,
    include_reel_media_seen_timestamp: bool,
    include_relationship_info: bool,
    latest_besties_reel_media: bool,
    latest_reel_media: bool,
}

impl Default for TimelineFeedData {
    fn default() -> Self {
        Self {
            count: TIMELINE_PAGE_SIZE,
            include_reel_media_seen_timestamp: true,
            include_relationship_info: true,
            latest_besties_reel_media: true,
            latest_reel_media: true,
        }
    }
}

/// `PolarisProfilePostsQuery`.
#[derive(Debug, Serialize)]
pub(crate) struct PostsFirstPageVariables<'a> {
    pub data: TimelineFeedData,
    pub username: &'a str,
}

/// `PolarisProfilePostsTabContentQuery_connection`.
#[derive(Debug, Serialize)]
pub(crate) struct PostsPaginationVariables<'a> {
    pub after: &'a str,
    pub before: Option<&'a str>,
    pub data: TimelineFeedData,
    pub first: u32,
    pub last: Option<u32>,
    pub username: &'a str,
}

/// `PolarisProfileStoryHighlightsTrayContentQuery`.
#[derive(Debug, Serialize)]
pub(crate) struct HighlightsTrayVariables<'a> {
    pub user_id: &'a str,
}

/// `PolarisStoriesV3HighlightsPagePaginationQuery`.
#[derive(Debug, Serialize)]
pub(crate) struct HighlightsPageVariables<'a> {
    pub after: Option<&'a str>,
    pub before: Option<&'a str>,
    pub first: u32,
    pub initial_reel_id: &'a str,
    pub is_highlight: bool,
    pub last: Option<u32>,
    pub reel_ids: &'a [String],
}
