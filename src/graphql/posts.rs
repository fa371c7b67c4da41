//! Profile timeline pagination.

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::client::GraphqlClient;
use super::error::QueryError;
use super::types::{Envelope, PostsPage, TimelineData};
use super::variables::{
    PostsFirstPageVariables, PostsPaginationVariables, TIMELINE_PAGE_SIZE, TimelineFeedData,
};

const POSTS_FIRST_PAGE_QUERY: &str = "PolarisProfilePostsQuery";
const POSTS_PAGINATION_QUERY: &str = "PolarisProfilePostsTabContentQuery_connection";

/// Trims whitespace and a leading `@`.
#[must_use]
pub fn normalize_username(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed)
}

impl GraphqlClient {
    /// Fetches one page of a profile's timeline.
    ///
    /// `after` is the cursor from the previous page, `None` for the first.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidArgument`] for an empty username, plus
    /// any error from [`GraphqlClient::query`].
    #[instrument(level = "debug", skip(self, cancel))]
    pub async fn fetch_posts_page(
        &self,
        username: &str,
        after: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PostsPage, QueryError> {
        let username = normalize_username(username);
        if username.is_empty() {
            return Err(QueryError::invalid_argument("username is empty"));
        }
        let referer = self.profile_referer(username);
        let doc_ids = self.doc_ids();

        let (operation, envelope) =
            match after.filter(|cursor| !cursor.is_empty()) {
                None => {
                    let variables = PostsFirstPageVariables {
                        data: TimelineFeedData::default(),
                        username,
                    };
                    let envelope: Envelope<TimelineData> = self
                        .query(
                            &referer,
                            POSTS_FIRST_PAGE_QUERY,
                            &doc_ids.posts_first_page,
                            &variables,
                            cancel,
                        )
                        .await?;
                    (POSTS_FIRST_PAGE_QUERY, envelope)
                }
                Some(cursor) => {
                    let variables = PostsPaginationVariables {
                        after: cursor,
                        before: None,
                        data: TimelineFeedData::default(),
                        first: TIMELINE_PAGE_SIZE,
                        last: None,
                        username,
                    };
                    let envelope: Envelope<TimelineData> = self
                        .query(
                            &referer,
                            POSTS_PAGINATION_QUERY,
                            &doc_ids.posts_pagination,
                            &variables,
                            cancel,
                        )
                        .await?;
                    (POSTS_PAGINATION_QUERY, envelope)
                }
            };

        let connection = envelope.into_data(operation)?.connection;
        let records: Vec<_> = connection.edges.into_iter().map(|edge| edge.node).collect();
        let user_id = records
            .iter()
            .map(|record| record.user.pk.as_str())
            .find(|pk| !pk.is_empty())
            .map(str::to_string);

        debug!(
            records = records.len(),
            has_next = connection.page_info.has_next_page,
            "timeline page fetched"
        );
        Ok(PostsPage {
            records,
            cursor: connection.page_info,
            user_id,
        })
    }

    pub(crate) fn profile_referer(&self, username: &str) -> String {
        format!("{}/{username}/", self.base_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("  @someone "), "someone");
        assert_eq!(normalize_username("someone"), "someone");
        assert_eq!(normalize_username("@"), "");
        assert_eq!(normalize_username("   "), "");
        assert_eq!(normalize_username("@@x"), "@x");
    }
}
