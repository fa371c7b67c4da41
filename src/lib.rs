//! Idl Core Library
//!
//! This library provides the session and content resolution engine behind the
//! `idl` tool, which archives a profile's posts, reels and story highlights
//! using a cookie session exported from a logged-in browser.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`auth`] - Session export loading (Netscape and JSON cookie files)
//! - [`graphql`] - Authenticated query client and page operations
//! - [`media`] - Best-quality image/video URL selection
//! - [`download`] - Retrieval pipeline with JPEG normalization and pacing
//! - [`config`] - Run configuration defaults and validation

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
mod cancel;
pub mod config;
pub mod download;
pub mod graphql;
mod http_client;
pub mod media;
pub mod user_agent;

// Re-export commonly used types
pub use auth::{CookieRecord, LoadError, load_cookies_into_jar, load_session_cookies};
pub use config::Config;
pub use download::{Pacer, PacerError, RetrieveError, Retriever, RetrieverOptions};
pub use graphql::{
    ClientOptions, DocIds, GraphqlClient, Highlight, HighlightReel, HighlightsPage, MediaRecord,
    PageCursor, PostsPage, QueryError,
};
pub use media::{AssetKind, ResolvedAsset, resolve_asset};
