//! Scratch-file naming and atomic publish helpers.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::RetrieveError;

/// Sibling scratch path: `<dest><suffix>`.
pub(crate) fn scratch_path(dest: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Replaces (or adds) the extension; `ext` may include the leading dot.
pub(crate) fn replace_ext(path: &Path, ext: &str) -> PathBuf {
    path.with_extension(ext.trim_start_matches('.'))
}

/// Creates the destination's parent directory if needed.
pub(crate) async fn ensure_parent(dest: &Path) -> Result<(), RetrieveError> {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| RetrieveError::io(parent, e)),
        _ => Ok(()),
    }
}

/// Renames `src` onto `dst`, removing `dst` first if the platform refuses to
/// rename over an existing file.
pub(crate) async fn rename_replace(src: &Path, dst: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(src, dst).await.is_ok() {
        return Ok(());
    }
    let _ = tokio::fs::remove_file(dst).await;
    tokio::fs::rename(src, dst).await
}

/// Best-effort removal of a scratch file.
pub(crate) async fn remove_quietly(path: &Path) {
    if let Err(error) = tokio::fs::remove_file(path).await
        && error.kind() != std::io::ErrorKind::NotFound
    {
        debug!(path = %path.display(), %error, "could not remove scratch file");
    }
}
