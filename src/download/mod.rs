//! Retrieval pipeline: streams media URLs to disk.
//!
//! Every retrieval writes to a sibling scratch file and renames it into place
//! only once the bytes are complete and, for images, JPEG-normalized. The
//! [`Pacer`] is independent of the retriever; callers opt in by awaiting
//! [`Pacer::wait`] before each request.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use idl_core::download::{Retriever, RetrieverOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let retriever = Retriever::new(RetrieverOptions::default())?;
//! let path = retriever
//!     .retrieve_as_jpeg(
//!         "https://cdn.example/photo.webp",
//!         Path::new("out/photo.jpg"),
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//! println!("saved {}", path.display());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod convert;
mod error;
mod fs;
mod pacer;
mod sniff;

pub use client::{Retriever, RetrieverOptions};
pub use error::RetrieveError;
pub use pacer::{Pacer, PacerError};
