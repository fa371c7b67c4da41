//! Story highlights: the profile tray and paginated reel contents.

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::client::GraphqlClient;
use super::error::QueryError;
use super::posts::normalize_username;
use super::types::{Envelope, Highlight, HighlightsPage, HighlightsTrayData, ReelsMediaData};
use super::variables::{
    DEFAULT_HIGHLIGHTS_PAGE_SIZE, HighlightsPageVariables, HighlightsTrayVariables,
};

const HIGHLIGHTS_TRAY_QUERY: &str = "PolarisProfileStoryHighlightsTrayContentQuery";
const HIGHLIGHTS_PAGE_QUERY: &str = "PolarisStoriesV3HighlightsPagePaginationQuery";

impl GraphqlClient {
    /// Lists the highlights pinned to a profile.
    ///
    /// Entries without an id are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidArgument`] when `user_id` is empty, plus
    /// any error from [`GraphqlClient::query`].
    #[instrument(level = "debug", skip(self, cancel))]
    pub async fn fetch_highlights_tray(
        &self,
        username: &str,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Highlight>, QueryError> {
        if user_id.trim().is_empty() {
            return Err(QueryError::invalid_argument("profile id is empty"));
        }
        let referer = self.profile_referer(normalize_username(username));

        let envelope: Envelope<HighlightsTrayData> = self
            .query(
                &referer,
                HIGHLIGHTS_TRAY_QUERY,
                &self.doc_ids().highlights_tray,
                &HighlightsTrayVariables { user_id },
                cancel,
            )
            .await?;

        let highlights: Vec<Highlight> = envelope
            .into_data(HIGHLIGHTS_TRAY_QUERY)?
            .highlights
            .edges
            .into_iter()
            .map(|edge| edge.node)
            .filter(|highlight| !highlight.id.is_empty())
            .collect();
        debug!(count = highlights.len(), "highlights tray fetched");
        Ok(highlights)
    }

    /// Fetches the contents of up to `page_size` highlight reels.
    ///
    /// `reel_ids[0]` is sent as the initial reel. A `page_size` of zero uses
    /// the web client's default of 10.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidArgument`] when `reel_ids` is empty, plus
    /// any error from [`GraphqlClient::query`].
    #[instrument(level = "debug", skip(self, reel_ids, cancel), fields(reels = reel_ids.len()))]
    pub async fn fetch_highlights_page(
        &self,
        username: &str,
        reel_ids: &[String],
        after: Option<&str>,
        page_size: u32,
        cancel: &CancellationToken,
    ) -> Result<HighlightsPage, QueryError> {
        let Some(initial_reel_id) = reel_ids.first() else {
            return Err(QueryError::invalid_argument("no highlight reels requested"));
        };
        let referer = self.profile_referer(normalize_username(username));
        let first = if page_size == 0 {
            DEFAULT_HIGHLIGHTS_PAGE_SIZE
        } else {
            page_size
        };

        let variables = HighlightsPageVariables {
            after: after.filter(|cursor| !cursor.is_empty()),
            before: None,
            first,
            initial_reel_id,
            is_highlight: true,
            last: None,
            reel_ids,
        };
        let envelope: Envelope<ReelsMediaData> = self
            .query(
                &referer,
                HIGHLIGHTS_PAGE_QUERY,
                &self.doc_ids().highlights_page,
                &variables,
                cancel,
            )
            .await?;

        let connection = envelope.into_data(HIGHLIGHTS_PAGE_QUERY)?.connection;
        let reels = connection.edges.into_iter().map(|edge| edge.node).collect::<Vec<_>>();
        debug!(reels = reels.len(), "highlights page fetched");
        Ok(HighlightsPage {
            reels,
            cursor: connection.page_info,
        })
    }
}
