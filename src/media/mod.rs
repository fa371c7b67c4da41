//! Media resolution: choosing the best image or video URL for a record.
//!
//! Everything here is pure; no I/O happens until the retriever is handed a
//! [`ResolvedAsset`].

mod dash;
mod select;

pub use select::{
    AssetKind, ResolvedAsset, best_image_url, best_image_urls, best_video_url, looks_like_jpeg,
    normalize_to_jpeg, resolve_asset,
};
