use async_trait::async_trait;

use crate::{domain::ChatId, media::BatchItem, Result};

/// Outbound transport port.
///
/// Every call is a single attempt. Implementations report a missing or
/// unreachable destination as `Error::RecipientUnreachable` and every other
/// failure as `Error::External`.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;

    async fn send_photo(&self, chat_id: ChatId, file_id: &str, caption: Option<&str>)
        -> Result<()>;
    async fn send_video(&self, chat_id: ChatId, file_id: &str, caption: Option<&str>)
        -> Result<()>;
    async fn send_document(
        &self,
        chat_id: ChatId,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<()>;
    async fn send_audio(&self, chat_id: ChatId, file_id: &str, caption: Option<&str>)
        -> Result<()>;

    /// Send an album. `items` keeps its order on the wire.
    async fn send_media_group(&self, chat_id: ChatId, items: &[BatchItem]) -> Result<()>;
}
