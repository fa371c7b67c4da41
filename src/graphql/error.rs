//! Error types for the query client.

use thiserror::Error;

/// Errors that can occur while bootstrapping a session or running a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The session export carries no `sessionid` cookie.
    #[error(
        "not logged in: no sessionid cookie in the session export\n  Suggestion: export cookies from a browser tab where you are signed in"
    )]
    NotLoggedIn,

    /// The web root page did not embed the `lsd` and `fb_dtsg` tokens.
    #[error(
        "could not obtain session tokens (missing: {missing})\n  Suggestion: the session may have expired; re-export your cookies"
    )]
    TokensUnavailable {
        /// Which tokens were not found, comma-separated.
        missing: String,
    },

    /// Non-2xx HTTP response.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Transport failure (DNS, connect, TLS, body read).
    #[error("network error requesting {url}: {source}")]
    Network {
        /// Request URL.
        url: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete within the configured timeout.
    #[error("timeout requesting {url}")]
    Timeout {
        /// Request URL.
        url: String,
    },

    /// The response body did not match the expected shape.
    #[error("failed to decode {operation} response: {source}")]
    Decode {
        /// Friendly name of the query.
        operation: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The endpoint answered 2xx but reported a failure instead of data.
    #[error("{operation} failed: {message}")]
    Api {
        /// Friendly name of the query.
        operation: String,
        /// Server-supplied error text.
        message: String,
    },

    /// Query variables could not be serialized.
    #[error("failed to encode {operation} variables: {source}")]
    Serialize {
        /// Friendly name of the query.
        operation: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A caller-supplied argument is unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// The caller's cancellation token fired.
    #[error("query cancelled")]
    Cancelled,
}

impl QueryError {
    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Maps a reqwest error, separating timeouts from other transport failures.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates a decode error for the named operation.
    pub fn decode(operation: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            operation: operation.into(),
            source,
        }
    }

    /// Creates a server-reported failure.
    pub fn api(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Returns true for errors that no retry can fix without user action.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::NotLoggedIn | Self::ClientBuild(_))
    }
}
