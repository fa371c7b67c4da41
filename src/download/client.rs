//! Media retrieval to disk.
//!
//! Two variants share one request path: [`Retriever::retrieve`] streams the
//! body verbatim, [`Retriever::retrieve_as_jpeg`] additionally classifies the
//! payload and converts PNG/WebP to JPEG. Both publish by renaming a sibling
//! scratch file, so a final path never holds partial data.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, CONTENT_TYPE, REFERER, USER_AGENT};
use reqwest::{Client, Response};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::cancel::until_cancelled;
use crate::graphql::MediaRecord;
use crate::http_client::{HttpClientSettings, build_http_client};
use crate::media::{AssetKind, ResolvedAsset, resolve_asset};
use crate::user_agent::{self, DEFAULT_USER_AGENT};

use super::constants::{
    ACCEPT_ANY, ACCEPT_JPEG_PREFERRED, CONNECT_TIMEOUT, CONVERT_SCRATCH_SUFFIX, DEFAULT_REFERER,
    DOWNLOAD_SCRATCH_SUFFIX, PLAIN_SCRATCH_SUFFIX, READ_TIMEOUT, UNSUPPORTED_EXTENSION,
};
use super::convert::convert_to_jpeg;
use super::error::RetrieveError;
use super::fs::{ensure_parent, remove_quietly, rename_replace, replace_ext, scratch_path};
use super::sniff::{ImageType, SNIFF_LEN, classify};

/// Settings for [`Retriever`].
#[derive(Debug, Clone)]
pub struct RetrieverOptions {
    /// User-Agent; blank falls back to the default.
    pub user_agent: String,
    /// Referer sent with every retrieval.
    pub referer: String,
    /// Total per-retrieval timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Optional cookie store; CDN URLs are pre-signed and do not need one.
    pub cookie_jar: Option<Arc<Jar>>,
}

impl Default for RetrieverOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            timeout: READ_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
            cookie_jar: None,
        }
    }
}

/// Downloads media URLs to caller-chosen paths.
///
/// Create once and reuse; the underlying client pools connections.
#[derive(Debug, Clone)]
pub struct Retriever {
    http: Client,
    user_agent: String,
    referer: String,
}

/// Body written to a scratch file plus its leading bytes.
struct Streamed {
    bytes: u64,
    prefix: Vec<u8>,
}

impl Retriever {
    /// Creates a retriever.
    ///
    /// # Errors
    ///
    /// Returns [`RetrieveError::ClientBuild`] when the HTTP client cannot be built.
    pub fn new(options: RetrieverOptions) -> Result<Self, RetrieveError> {
        let user_agent = user_agent::effective_user_agent(&options.user_agent).to_string();
        let http = build_http_client(
            "retrieval",
            &HttpClientSettings {
                user_agent: user_agent.clone(),
                connect_timeout: options.connect_timeout,
                timeout: options.timeout,
                cookie_jar: options.cookie_jar,
            },
        )
        .map_err(RetrieveError::ClientBuild)?;

        Ok(Self {
            http,
            user_agent,
            referer: options.referer,
        })
    }

    /// Streams `url` to `dest` verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`RetrieveError`] on invalid URLs, non-2xx responses, transport
    /// and file system failures, and cancellation. The destination is only
    /// written on success.
    #[instrument(level = "debug", skip(self, dest, cancel), fields(dest = %dest.display()))]
    pub async fn retrieve(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, RetrieveError> {
        ensure_parent(dest).await?;
        let response = self.send(url, ACCEPT_ANY, cancel).await?;

        let scratch = scratch_path(dest, PLAIN_SCRATCH_SUFFIX);
        let streamed = stream_to_scratch(response, url, &scratch, cancel).await?;

        if let Err(e) = rename_replace(&scratch, dest).await {
            remove_quietly(&scratch).await;
            return Err(RetrieveError::io(dest, e));
        }
        info!(path = %dest.display(), bytes = streamed.bytes, "retrieved");
        Ok(dest.to_path_buf())
    }

    /// Retrieves an image and publishes it as JPEG at `dest`.
    ///
    /// JPEG payloads are renamed into place. PNG and WebP payloads are
    /// flattened onto white and re-encoded; if that fails the original bytes
    /// are published under `.png` / `.webp` instead and that path is returned.
    ///
    /// # Errors
    ///
    /// Everything [`Retriever::retrieve`] returns, plus
    /// [`RetrieveError::UnsupportedImageType`] for non-image payloads (kept
    /// under `.bin`) and [`RetrieveError::Conversion`] when neither the
    /// converted nor the original bytes could be published.
    #[instrument(level = "debug", skip(self, dest, cancel), fields(dest = %dest.display()))]
    pub async fn retrieve_as_jpeg(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, RetrieveError> {
        ensure_parent(dest).await?;
        let response = self.send(url, ACCEPT_JPEG_PREFERRED, cancel).await?;
        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let scratch = scratch_path(dest, DOWNLOAD_SCRATCH_SUFFIX);
        let streamed = stream_to_scratch(response, url, &scratch, cancel).await?;
        let classification = classify(&streamed.prefix, declared.as_deref());
        debug!(
            declared = declared.as_deref().unwrap_or(""),
            effective = %classification.content_type,
            bytes = streamed.bytes,
            "classified payload"
        );

        match classification.image {
            Some(ImageType::Jpeg) => {
                if let Err(e) = rename_replace(&scratch, dest).await {
                    remove_quietly(&scratch).await;
                    return Err(RetrieveError::io(dest, e));
                }
                info!(path = %dest.display(), "retrieved jpeg");
                Ok(dest.to_path_buf())
            }
            Some(format) => convert_and_publish(&scratch, dest, format, cancel).await,
            None => {
                let preserved = replace_ext(dest, UNSUPPORTED_EXTENSION);
                let preserved = match rename_replace(&scratch, &preserved).await {
                    Ok(()) => Some(preserved),
                    Err(error) => {
                        debug!(%error, "could not keep unsupported payload");
                        remove_quietly(&scratch).await;
                        None
                    }
                };
                Err(RetrieveError::UnsupportedImageType {
                    url: url.to_string(),
                    content_type: classification.content_type,
                    preserved,
                })
            }
        }
    }

    /// Resolves `record` and retrieves the result to `dest`.
    ///
    /// Returns `Ok(None)` when the record has nothing to retrieve.
    ///
    /// # Errors
    ///
    /// See [`Retriever::retrieve_asset`].
    pub async fn retrieve_best_asset(
        &self,
        record: &MediaRecord,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<PathBuf>, RetrieveError> {
        match resolve_asset(record) {
            Some(asset) => self.retrieve_asset(&asset, dest, cancel).await.map(Some),
            None => {
                debug!(pk = %record.pk, "no usable media candidate");
                Ok(None)
            }
        }
    }

    /// Retrieves a resolved asset.
    ///
    /// Videos are retrieved verbatim. Images try each URL in preference order
    /// through [`Retriever::retrieve_as_jpeg`]; the first success wins.
    ///
    /// # Errors
    ///
    /// Returns [`RetrieveError::Cancelled`] as soon as cancellation is seen,
    /// otherwise the error from the last URL tried.
    pub async fn retrieve_asset(
        &self,
        asset: &ResolvedAsset,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, RetrieveError> {
        if asset.kind == AssetKind::Video {
            return self.retrieve(&asset.url, dest, cancel).await;
        }

        let mut last_error = None;
        for (attempt, url) in asset.urls().enumerate() {
            match self.retrieve_as_jpeg(url, dest, cancel).await {
                Ok(path) => return Ok(path),
                Err(RetrieveError::Cancelled) => return Err(RetrieveError::Cancelled),
                Err(error) => {
                    debug!(attempt, %error, "image candidate failed");
                    last_error = Some(error);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| RetrieveError::invalid_url(asset.url.clone())))
    }

    async fn send(
        &self,
        url: &str,
        accept: &str,
        cancel: &CancellationToken,
    ) -> Result<Response, RetrieveError> {
        Url::parse(url).map_err(|_| RetrieveError::invalid_url(url))?;

        let request = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(REFERER, &self.referer)
            .header(ACCEPT, accept);

        let response = until_cancelled(cancel, request.send())
            .await
            .ok_or(RetrieveError::Cancelled)?
            .map_err(|e| RetrieveError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrieveError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

/// Converts `scratch` to JPEG at `dest`, or keeps the original encoding
/// under its own extension when conversion fails.
async fn convert_and_publish(
    scratch: &Path,
    dest: &Path,
    format: ImageType,
    cancel: &CancellationToken,
) -> Result<PathBuf, RetrieveError> {
    let converted = scratch_path(dest, CONVERT_SCRATCH_SUFFIX);
    let (src, dst) = (scratch.to_path_buf(), converted.clone());
    let task = tokio::task::spawn_blocking(move || convert_to_jpeg(&src, &dst, format));

    let Some(joined) = until_cancelled(cancel, task).await else {
        remove_quietly(scratch).await;
        remove_quietly(&converted).await;
        return Err(RetrieveError::Cancelled);
    };
    let failure = match joined {
        Ok(Ok(())) => None,
        Ok(Err(error)) => Some(error.to_string()),
        Err(error) => Some(format!("conversion task failed: {error}")),
    };

    let Some(reason) = failure else {
        remove_quietly(scratch).await;
        if let Err(e) = rename_replace(&converted, dest).await {
            remove_quietly(&converted).await;
            return Err(RetrieveError::io(dest, e));
        }
        info!(path = %dest.display(), from = format.name(), "retrieved and converted to jpeg");
        return Ok(dest.to_path_buf());
    };

    remove_quietly(&converted).await;
    let fallback = replace_ext(dest, format.extension());
    match rename_replace(scratch, &fallback).await {
        Ok(()) => {
            warn!(
                path = %fallback.display(),
                from = format.name(),
                reason = %reason,
                "jpeg conversion failed; kept original encoding"
            );
            Ok(fallback)
        }
        Err(error) => {
            remove_quietly(scratch).await;
            Err(RetrieveError::Conversion {
                format: format.name(),
                reason,
                preserve_error: error.to_string(),
            })
        }
    }
}

/// Streams the body into `scratch`, capturing the first [`SNIFF_LEN`] bytes.
///
/// The scratch file is removed on any failure, including cancellation.
async fn stream_to_scratch(
    response: Response,
    url: &str,
    scratch: &Path,
    cancel: &CancellationToken,
) -> Result<Streamed, RetrieveError> {
    let outcome = until_cancelled(cancel, write_body(response, url, scratch)).await;
    match outcome {
        Some(Ok(streamed)) => Ok(streamed),
        Some(Err(error)) => {
            debug!(path = %scratch.display(), "cleaning up scratch file after error");
            remove_quietly(scratch).await;
            Err(error)
        }
        None => {
            remove_quietly(scratch).await;
            Err(RetrieveError::Cancelled)
        }
    }
}

async fn write_body(response: Response, url: &str, scratch: &Path) -> Result<Streamed, RetrieveError> {
    let file = File::create(scratch)
        .await
        .map_err(|e| RetrieveError::io(scratch, e))?;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut streamed = Streamed {
        bytes: 0,
        prefix: Vec::with_capacity(SNIFF_LEN),
    };

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| RetrieveError::from_reqwest(url, e))?;
        if streamed.prefix.len() < SNIFF_LEN {
            let take = (SNIFF_LEN - streamed.prefix.len()).min(chunk.len());
            streamed.prefix.extend_from_slice(&chunk[..take]);
        }
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| RetrieveError::io(scratch, e))?;
        streamed.bytes += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| RetrieveError::io(scratch, e))?;
    Ok(streamed)
}
