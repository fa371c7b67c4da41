//! Archive run: timeline pages, then highlights, strictly in sequence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use idl_core::download::PacerError;
use idl_core::graphql::{DEFAULT_HIGHLIGHTS_PAGE_SIZE, normalize_username};
use idl_core::{
    ClientOptions, Config, DocIds, GraphqlClient, MediaRecord, Pacer, RetrieveError, Retriever,
    RetrieverOptions, load_session_cookies, resolve_asset,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::naming::{highlight_dir_name, media_file_name, sanitize_segment};
use super::progress::SectionProgress;

/// Pause between pages when no pacer is configured.
const PAGE_GAP: Duration = Duration::from_millis(250);

const POSTS_DIR: &str = "posts";
const HIGHLIGHTS_DIR: &str = "highlights";

/// Everything one run shares.
struct Archive {
    client: GraphqlClient,
    retriever: Retriever,
    pacer: Option<Pacer>,
    cancel: CancellationToken,
    username: String,
    user_root: PathBuf,
    show_progress: bool,
}

/// Remembers the first failure of a batch while the batch keeps going.
#[derive(Default)]
struct FirstError(Option<anyhow::Error>);

impl FirstError {
    fn record(&mut self, error: anyhow::Error) {
        if self.0.is_none() {
            self.0 = Some(error);
        }
    }

    fn into_result(self) -> Result<()> {
        self.0.map_or(Ok(()), Err)
    }
}

/// Runs one archive of `config.username`.
///
/// Per-item failures do not stop the walk; the first one is returned once
/// both sections are done. Configuration problems and page failures end
/// the affected section immediately.
pub(crate) async fn run(config: &Config, cancel: CancellationToken, show_progress: bool) -> Result<()> {
    config.validate()?;

    let cookies = load_session_cookies(&config.cookies_path)
        .context("could not load session cookies; export them from a logged-in browser")?;

    let client = GraphqlClient::new(
        &cookies,
        ClientOptions {
            user_agent: config.user_agent.clone(),
            timeout: config.query_timeout,
            doc_ids: DocIds::from_env(),
            ..ClientOptions::default()
        },
    )?;
    let retriever = Retriever::new(RetrieverOptions {
        user_agent: config.user_agent.clone(),
        timeout: config.retrieval_timeout,
        ..RetrieverOptions::default()
    })?;

    let pacer = config.pacing_enabled().then(|| {
        let pacer = Pacer::new(config.pace_min, config.pace_max);
        pacer.start();
        pacer
    });

    let username = normalize_username(&config.username).to_string();
    let user_root = config.output_root.join(sanitize_segment(&username));
    tokio::fs::create_dir_all(&user_root)
        .await
        .with_context(|| format!("unable to create output directory {}", user_root.display()))?;

    // Surfaces a missing or expired session before any page is requested.
    client.bootstrap(&cancel).await?;
    info!(profile = %username, output = %user_root.display(), "archive starting");

    let archive = Archive {
        client,
        retriever,
        pacer,
        cancel,
        username,
        user_root,
        show_progress,
    };

    let mut first = FirstError::default();
    let (user_id, timeline) = archive.timeline().await;
    if let Err(error) = timeline {
        first.record(error);
    }
    archive.ensure_running()?;

    if config.skip_highlights {
        debug!("highlights skipped by request");
    } else if let Some(user_id) = user_id {
        if let Err(error) = archive.highlights(&user_id).await {
            first.record(error);
        }
    } else {
        first.record(anyhow!("failed to resolve profile id"));
    }

    if let Some(pacer) = &archive.pacer {
        pacer.stop();
    }
    first.into_result()
}

impl Archive {
    /// Walks every timeline page; returns the owner id seen on the way.
    async fn timeline(&self) -> (Option<String>, Result<()>) {
        let mut progress = SectionProgress::start("posts", self.show_progress);
        let mut user_id = None;
        let mut first = FirstError::default();

        let walked = self
            .walk_timeline(&mut user_id, &mut progress, &mut first)
            .await;
        progress.finish();
        (user_id, walked.and_then(|()| first.into_result()))
    }

    async fn walk_timeline(
        &self,
        user_id: &mut Option<String>,
        progress: &mut SectionProgress,
        first: &mut FirstError,
    ) -> Result<()> {
        let dir = self.user_root.join(POSTS_DIR);
        let mut after: Option<String> = None;
        loop {
            self.before_page(after.is_some()).await?;
            let page = self
                .client
                .fetch_posts_page(&self.username, after.as_deref(), &self.cancel)
                .await?;
            if user_id.is_none() {
                user_id.clone_from(&page.user_id);
            }

            for record in &page.records {
                self.archive_one(record, &dir, 0, progress, first).await?;
                for (position, child) in record.carousel_media.iter().enumerate() {
                    self.archive_one(child, &dir, position + 1, progress, first)
                        .await?;
                }
            }

            match page.cursor.next_cursor() {
                Some(cursor) => after = Some(cursor.to_string()),
                None => return Ok(()),
            }
        }
    }

    /// Walks the highlights tray and every page of reel contents.
    async fn highlights(&self, user_id: &str) -> Result<()> {
        self.pace().await?;
        let tray = self
            .client
            .fetch_highlights_tray(&self.username, user_id, &self.cancel)
            .await?;
        if tray.is_empty() {
            info!("no highlights");
            return Ok(());
        }

        let titles: HashMap<String, String> = tray
            .iter()
            .map(|highlight| (highlight.id.clone(), highlight_dir_name(&highlight.title)))
            .collect();
        let reel_ids: Vec<String> = tray.into_iter().map(|highlight| highlight.id).collect();

        let mut progress = SectionProgress::start("highlights", self.show_progress);
        let mut first = FirstError::default();
        let walked = self
            .walk_highlights(&reel_ids, &titles, &mut progress, &mut first)
            .await;
        progress.finish();
        walked.and_then(|()| first.into_result())
    }

    async fn walk_highlights(
        &self,
        reel_ids: &[String],
        titles: &HashMap<String, String>,
        progress: &mut SectionProgress,
        first: &mut FirstError,
    ) -> Result<()> {
        let mut after: Option<String> = None;
        loop {
            self.before_page(after.is_some()).await?;
            let page = self
                .client
                .fetch_highlights_page(
                    &self.username,
                    reel_ids,
                    after.as_deref(),
                    DEFAULT_HIGHLIGHTS_PAGE_SIZE,
                    &self.cancel,
                )
                .await?;

            for reel in &page.reels {
                let title = titles.get(&reel.id).map_or("highlight", String::as_str);
                let dir = self.user_root.join(HIGHLIGHTS_DIR).join(title);
                for (position, item) in reel.items.iter().enumerate() {
                    self.archive_one(item, &dir, position + 1, progress, first)
                        .await?;
                }
            }

            match page.cursor.next_cursor() {
                Some(cursor) => after = Some(cursor.to_string()),
                None => return Ok(()),
            }
        }
    }

    /// Retrieves one record into `dir`.
    ///
    /// Only cancellation is returned; any other failure is counted and
    /// remembered in `first`.
    async fn archive_one(
        &self,
        record: &MediaRecord,
        dir: &Path,
        index: usize,
        progress: &mut SectionProgress,
        first: &mut FirstError,
    ) -> Result<()> {
        let Some(asset) = resolve_asset(record) else {
            debug!(pk = %record.pk, "nothing to retrieve");
            return Ok(());
        };
        let name = media_file_name(record, index, asset.kind, &asset.url);
        let dest = dir.join(&name);

        self.pace().await?;
        match self.retriever.retrieve_asset(&asset, &dest, &self.cancel).await {
            Ok(path) => {
                debug!(path = %path.display(), "saved");
                progress.record_downloaded();
            }
            Err(RetrieveError::Cancelled) => bail!("cancelled"),
            Err(error) => {
                warn!(file = %name, %error, "retrieval failed");
                progress.record_failed();
                first.record(anyhow::Error::new(error).context(format!("failed to download {name}")));
            }
        }
        Ok(())
    }

    /// Gate before a page request: the pacer if enabled, else a short gap
    /// between consecutive pages.
    async fn before_page(&self, follows_previous: bool) -> Result<()> {
        if self.pacer.is_some() {
            return self.pace().await;
        }
        if follows_previous {
            tokio::select! {
                () = self.cancel.cancelled() => bail!("cancelled"),
                () = tokio::time::sleep(PAGE_GAP) => {}
            }
        }
        Ok(())
    }

    async fn pace(&self) -> Result<()> {
        let Some(pacer) = &self.pacer else {
            return self.ensure_running();
        };
        match pacer.wait(&self.cancel).await {
            Ok(()) => Ok(()),
            Err(PacerError::Cancelled) => bail!("cancelled"),
            Err(PacerError::Stopped) => bail!("pacer stopped"),
        }
    }

    fn ensure_running(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            bail!("cancelled");
        }
        Ok(())
    }
}
