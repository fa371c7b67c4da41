//! Cancellation plumbing shared by the query client and the retriever.

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Runs `operation` until it completes or `cancel` fires.
///
/// Returns `None` when the token fired first. The operation future is dropped
/// at that point, which aborts any in-flight request it owns.
pub(crate) async fn until_cancelled<F, T>(cancel: &CancellationToken, operation: F) -> Option<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        value = operation => Some(value),
    }
}
