//! Authenticated query client and the page operations built on it.
//!
//! [`GraphqlClient`] bootstraps session tokens from the web root once, then
//! posts persisted queries. The page operations decode the responses into
//! [`MediaRecord`]s and [`PageCursor`]s for the caller to walk sequentially.

mod client;
mod de;
mod error;
mod highlights;
mod posts;
mod tokens;
mod types;
mod variables;

pub use client::{
    ClientOptions, DEFAULT_APP_ID, DEFAULT_ASBD_ID, DEFAULT_BASE_URL, DEFAULT_QUERY_PATH, DocIds,
    GraphqlClient,
};
pub use error::QueryError;
pub use posts::normalize_username;
pub use types::{
    Candidate, Highlight, HighlightReel, HighlightsPage, IgUser, ImageVersions, MediaRecord,
    PageCursor, PostsPage,
};
pub use variables::DEFAULT_HIGHLIGHTS_PAGE_SIZE;
