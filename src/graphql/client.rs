//! Authenticated query client.
//!
//! Owns the cookie-bearing HTTP session, bootstraps the `lsd` / `fb_dtsg`
//! tokens once per run and posts persisted queries to the single query
//! endpoint.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use url::Url;

use crate::auth::{CookieRecord, load_cookies_into_jar};
use crate::cancel::until_cancelled;
use crate::config::DEFAULT_QUERY_TIMEOUT;
use crate::http_client::{HttpClientSettings, build_http_client};
use crate::user_agent::{self, DEFAULT_USER_AGENT};

use super::error::QueryError;
use super::tokens::{SessionTokens, extract_tokens, jazoest};

/// Production web root.
pub const DEFAULT_BASE_URL: &str = "https://www.instagram.com";

/// Path of the query endpoint under the web root.
pub const DEFAULT_QUERY_PATH: &str = "/api/graphql";

/// Web client application id sent as `X-IG-App-ID`.
pub const DEFAULT_APP_ID: &str = "936619743392459";

/// Value sent as `X-ASBD-ID`.
pub const DEFAULT_ASBD_ID: &str = "129477";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Persisted-query identifiers, one per operation.
///
/// These rotate on the platform side every few weeks. Each can be overridden
/// through an `IDL_DOC_ID_*` environment variable; see [`DocIds::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocIds {
    /// `PolarisProfilePostsQuery`.
    pub posts_first_page: String,
    /// `PolarisProfilePostsTabContentQuery_connection`.
    pub posts_pagination: String,
    /// `PolarisProfileStoryHighlightsTrayContentQuery`.
    pub highlights_tray: String,
    /// `PolarisStoriesV3HighlightsPagePaginationQuery`.
    pub highlights_page: String,
}

impl Default for DocIds {
    fn default() -> Self {
        Self {
            posts_first_page: "9750323098393567".to_string(),
            posts_pagination: "9926142507487500".to_string(),
            highlights_tray: "9814547265267853".to_string(),
            highlights_page: "9364629593598989".to_string(),
        }
    }
}

impl DocIds {
    /// Defaults with non-empty `IDL_DOC_ID_POSTS`, `IDL_DOC_ID_POSTS_PAGINATION`,
    /// `IDL_DOC_ID_HIGHLIGHTS_TRAY` and `IDL_DOC_ID_HIGHLIGHTS_PAGE` applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let slots = [
            ("IDL_DOC_ID_POSTS", &mut self.posts_first_page),
            ("IDL_DOC_ID_POSTS_PAGINATION", &mut self.posts_pagination),
            ("IDL_DOC_ID_HIGHLIGHTS_TRAY", &mut self.highlights_tray),
            ("IDL_DOC_ID_HIGHLIGHTS_PAGE", &mut self.highlights_page),
        ];
        for (name, slot) in slots {
            if let Some(value) = lookup(name).map(|v| v.trim().to_string())
                && !value.is_empty()
            {
                *slot = value;
            }
        }
        self
    }
}

/// Settings for [`GraphqlClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Web root without trailing slash; overridden in tests.
    pub base_url: String,
    /// Query endpoint path under `base_url`.
    pub query_path: String,
    /// User-Agent for bootstrap and queries; blank falls back to the default.
    pub user_agent: String,
    /// Total per-request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// `X-IG-App-ID` header value.
    pub app_id: String,
    /// `X-ASBD-ID` header value.
    pub asbd_id: String,
    /// Persisted-query identifiers.
    pub doc_ids: DocIds,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            query_path: DEFAULT_QUERY_PATH.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_QUERY_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            app_id: DEFAULT_APP_ID.to_string(),
            asbd_id: DEFAULT_ASBD_ID.to_string(),
            doc_ids: DocIds::default(),
        }
    }
}

/// Authenticated session against the private query endpoint.
///
/// Tokens are bootstrapped lazily on the first query and cached for the
/// lifetime of the client. Safe to share behind an `Arc`.
#[derive(Debug)]
pub struct GraphqlClient {
    http: Client,
    jar: Arc<Jar>,
    base_url: String,
    cookie_origin: Url,
    query_url: String,
    user_agent: String,
    app_id: String,
    asbd_id: String,
    doc_ids: DocIds,
    tokens: OnceCell<SessionTokens>,
    ds_user_id: Option<String>,
}

impl GraphqlClient {
    /// Creates a client whose cookie store holds `cookies`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidArgument`] for an unparseable base URL and
    /// [`QueryError::ClientBuild`] when the HTTP client cannot be built.
    pub fn new(cookies: &[CookieRecord], options: ClientOptions) -> Result<Self, QueryError> {
        let base_url = options.base_url.trim_end_matches('/').to_string();
        let cookie_origin = Url::parse(&format!("{base_url}/")).map_err(|e| {
            QueryError::invalid_argument(format!("base URL {base_url:?} is invalid: {e}"))
        })?;

        let jar = load_cookies_into_jar(cookies);
        let user_agent = user_agent::effective_user_agent(&options.user_agent).to_string();
        let http = build_http_client(
            "query",
            &HttpClientSettings {
                user_agent: user_agent.clone(),
                connect_timeout: options.connect_timeout,
                timeout: options.timeout,
                cookie_jar: Some(Arc::clone(&jar)),
            },
        )
        .map_err(QueryError::ClientBuild)?;

        let mut client = Self {
            http,
            jar,
            query_url: format!("{base_url}{}", options.query_path),
            base_url,
            cookie_origin,
            user_agent,
            app_id: options.app_id,
            asbd_id: options.asbd_id,
            doc_ids: options.doc_ids,
            tokens: OnceCell::new(),
            ds_user_id: None,
        };
        client.ds_user_id = client.cookie_value("ds_user_id");
        Ok(client)
    }

    /// Web root the client talks to, without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Persisted-query identifiers in use.
    #[must_use]
    pub fn doc_ids(&self) -> &DocIds {
        &self.doc_ids
    }

    /// Numeric id of the logged-in account, from the `ds_user_id` cookie.
    #[must_use]
    pub fn session_user_id(&self) -> Option<&str> {
        self.ds_user_id.as_deref()
    }

    /// Whether bootstrap has already succeeded.
    #[must_use]
    pub fn is_bootstrapped(&self) -> bool {
        self.tokens.initialized()
    }

    /// Looks up a cookie the store would send to the web root.
    #[must_use]
    pub fn cookie_value(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.cookie_origin)?;
        let header = header.to_str().ok()?;
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
            .filter(|value| !value.is_empty())
    }

    /// Fetches and caches the session tokens; a no-op once they are cached.
    ///
    /// # Errors
    ///
    /// - [`QueryError::NotLoggedIn`] when no `sessionid` cookie is present
    ///   (checked before any network I/O)
    /// - [`QueryError::TokensUnavailable`] when the page embeds neither
    ///   known token pattern
    /// - transport, status and cancellation errors from the GET
    pub async fn bootstrap(&self, cancel: &CancellationToken) -> Result<(), QueryError> {
        self.tokens(cancel).await.map(|_| ())
    }

    async fn tokens(&self, cancel: &CancellationToken) -> Result<&SessionTokens, QueryError> {
        self.tokens
            .get_or_try_init(|| self.fetch_tokens(cancel))
            .await
    }

    #[instrument(level = "debug", skip(self, cancel), fields(base = %self.base_url))]
    async fn fetch_tokens(&self, cancel: &CancellationToken) -> Result<SessionTokens, QueryError> {
        if self.cookie_value("sessionid").is_none() {
            return Err(QueryError::NotLoggedIn);
        }

        let url = format!("{}/", self.base_url);
        let request = self.with_common_headers(self.http.get(&url), &url);
        let body = self.send_for_bytes(request, &url, cancel).await?;
        let html = String::from_utf8_lossy(&body);

        match extract_tokens(&html) {
            Ok(tokens) => {
                info!("session tokens bootstrapped");
                Ok(tokens)
            }
            Err(missing) => Err(QueryError::TokensUnavailable {
                missing: missing.join(", "),
            }),
        }
    }

    /// Runs one persisted query and decodes the response into `T`.
    ///
    /// Bootstraps tokens first. `referer` defaults to the web root when blank.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] for bootstrap failures, non-2xx responses,
    /// transport failures, undecodable bodies and cancellation.
    #[instrument(level = "debug", skip(self, variables, cancel), fields(operation = friendly_name))]
    pub async fn query<V, T>(
        &self,
        referer: &str,
        friendly_name: &str,
        doc_id: &str,
        variables: &V,
        cancel: &CancellationToken,
    ) -> Result<T, QueryError>
    where
        V: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let tokens = self.tokens(cancel).await?;

        let variables = serde_json::to_string(variables).map_err(|source| QueryError::Serialize {
            operation: friendly_name.to_string(),
            source,
        })?;
        let body = self.form_body(tokens, friendly_name, doc_id, &variables);

        let referer = if referer.trim().is_empty() {
            format!("{}/", self.base_url)
        } else {
            referer.to_string()
        };

        let mut request = self
            .with_common_headers(self.http.post(&self.query_url), &referer)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("X-FB-LSD", &tokens.lsd)
            .header("X-IG-App-ID", &self.app_id)
            .header("X-ASBD-ID", &self.asbd_id);
        if let Some(csrf) = self.cookie_value("csrftoken") {
            request = request.header("X-CSRFToken", csrf);
        }

        let bytes = self
            .send_for_bytes(request.body(body), &self.query_url, cancel)
            .await?;
        debug!(bytes = bytes.len(), "query response received");

        serde_json::from_slice(&bytes).map_err(|source| QueryError::decode(friendly_name, source))
    }

    fn form_body(
        &self,
        tokens: &SessionTokens,
        friendly_name: &str,
        doc_id: &str,
        variables: &str,
    ) -> String {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        form.append_pair("fb_api_caller_class", "RelayModern")
            .append_pair("fb_api_req_friendly_name", friendly_name)
            .append_pair("server_timestamps", "true")
            .append_pair("doc_id", doc_id)
            .append_pair("variables", variables)
            .append_pair("lsd", &tokens.lsd)
            .append_pair("fb_dtsg", &tokens.fb_dtsg)
            .append_pair("jazoest", &jazoest(&tokens.fb_dtsg))
            .append_pair("__a", "1")
            .append_pair("__d", "www")
            .append_pair("__user", "0");
        if let Some(user_id) = &self.ds_user_id {
            form.append_pair("av", user_id);
        }
        form.finish()
    }

    fn with_common_headers(&self, request: RequestBuilder, referer: &str) -> RequestBuilder {
        request
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "*/*")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(ORIGIN, &self.base_url)
            .header(REFERER, referer)
    }

    async fn send_for_bytes(
        &self,
        request: RequestBuilder,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, QueryError> {
        let response = until_cancelled(cancel, request.send())
            .await
            .ok_or(QueryError::Cancelled)?
            .map_err(|e| QueryError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::http_status(url, status.as_u16()));
        }

        let bytes = until_cancelled(cancel, response.bytes())
            .await
            .ok_or(QueryError::Cancelled)?
            .map_err(|e| QueryError::from_reqwest(url, e))?;
        Ok(bytes.to_vec())
    }
}
