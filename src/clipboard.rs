//! Clipboard access behind a seam.

use async_trait::async_trait;

use crate::error::{SnipflowError, SnipflowResult};

/// Asynchronous clipboard read. Only ever invoked when a snippet body
/// actually references the clipboard token; callers substitute the empty
/// string on failure rather than surfacing an error.
#[async_trait]
pub trait ClipboardRead: Send + Sync {
    async fn read_text(&self) -> SnipflowResult<String>;
}

/// System clipboard via arboard. The underlying API is synchronous, so
/// the read runs on the blocking pool.
pub struct SystemClipboard;

#[async_trait]
impl ClipboardRead for SystemClipboard {
    async fn read_text(&self) -> SnipflowResult<String> {
        tokio::task::spawn_blocking(|| {
            let mut clipboard = arboard::Clipboard::new()
                .map_err(|e| SnipflowError::Clipboard(e.to_string()))?;
            clipboard
                .get_text()
                .map_err(|e| SnipflowError::Clipboard(e.to_string()))
        })
        .await
        .map_err(|e| SnipflowError::Clipboard(e.to_string()))?
    }
}
