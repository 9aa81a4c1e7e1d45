use crate::error::AppResult;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name used when sanitizing strips the whole stem of a filename
const FALLBACK_STEM: &str = "upload";

/// Make a client-supplied filename safe to use as a single path component.
///
/// Only the last path segment is kept, whitespace runs become `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped and leading/trailing dots and
/// underscores are trimmed. Names written entirely in non-ASCII script
/// (`会議.pdf`) would otherwise lose their stem, so they become
/// `upload.<ext>` to keep the extension dispatchable.
///
/// Returns `None` when nothing usable remains.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();

    let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');

    let extension = Path::new(base)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) if !cleaned.contains('.') => Some(format!("{}.{}", FALLBACK_STEM, ext)),
        _ if cleaned.is_empty() => None,
        _ => Some(cleaned.to_string()),
    }
}

/// Write an uploaded file under `upload_dir`, replacing any file of the same name
pub async fn save_upload(upload_dir: &Path, filename: &str, data: &[u8]) -> AppResult<PathBuf> {
    tokio::fs::create_dir_all(upload_dir).await?;

    let path = upload_dir.join(filename);
    tokio::fs::write(&path, data).await?;

    info!("Saved upload {} ({} bytes)", path.display(), data.len());
    Ok(path)
}
