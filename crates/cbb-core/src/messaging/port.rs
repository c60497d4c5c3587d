use async_trait::async_trait;

use crate::{domain::Destination, Result};

/// Cross-messenger port.
///
/// Telegram is the only implementation; the digest pipeline only needs to push
/// pre-rendered MarkdownV2 text to a destination.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send `text` (already MarkdownV2-escaped) with link previews disabled.
    ///
    /// One call is one attempt; implementations must not retry internally.
    async fn send_markdown(&self, dest: &Destination, text: &str) -> Result<()>;
}
