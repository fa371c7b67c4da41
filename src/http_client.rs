//! Shared HTTP client construction for the query client and the retriever.
//!
//! Both sides share one policy on compression, proxy handling and cookie
//! support; only timeouts and the cookie jar differ.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

/// Per-client knobs.
#[derive(Debug, Clone)]
pub(crate) struct HttpClientSettings {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub cookie_jar: Option<Arc<Jar>>,
}

/// Builds a client, retrying without system proxy lookup if that panics.
///
/// `purpose` only labels log lines and error messages.
pub(crate) fn build_http_client(
    purpose: &str,
    settings: &HttpClientSettings,
) -> Result<Client, String> {
    match try_build_client(settings, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed macOS environments panic when reading system proxy settings.
            warn!(
                purpose,
                "HTTP client hit system proxy panic; using env-proxy fallback builder"
            );
            match try_build_client(settings, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(format!(
                    "{purpose} client construction panicked while initializing networking"
                )),
                Err(BuildClientFailure::Build(error)) => {
                    Err(format!("{purpose} client construction failed: {error}"))
                }
            }
        }
        Err(BuildClientFailure::Build(error)) => {
            Err(format!("{purpose} client construction failed: {error}"))
        }
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    settings: &HttpClientSettings,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    let settings = settings.clone();
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(settings);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(settings: HttpClientSettings) -> ClientBuilder {
    let mut builder = Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.timeout)
        .user_agent(settings.user_agent)
        .gzip(true);

    if let Some(jar) = settings.cookie_jar {
        builder = builder.cookie_provider(jar);
    }

    builder
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    let names: &[&str] = match scheme {
        "https" => &["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"],
        "http" => &["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"],
        _ => return None,
    };
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
