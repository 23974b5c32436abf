use teloxide::types::Message;

use mrb_core::{
    domain::Sender,
    media::{MediaItem, MediaKind},
    relay::Relayed,
};

use crate::router::AppState;

use super::reply_to;

pub(crate) const NO_TARGET_REPLY: &str =
    "⚠️ No recipient set yet. Use /settarget <chat id> to choose where your media goes.";
const LOOKUP_FAILED_REPLY: &str = "❌ Could not look up your recipient. Please try again.";

/// Reduce a Telegram message to the media the relay forwards.
pub fn media_item_from_message(msg: &Message) -> Option<MediaItem> {
    let item = if let Some(photos) = msg.photo() {
        // Sizes are ordered smallest to largest.
        MediaItem::new(MediaKind::Photo, photos.last()?.file.id.clone())
    } else if let Some(video) = msg.video() {
        MediaItem::new(MediaKind::Video, video.file.id.clone())
    } else if let Some(doc) = msg.document() {
        MediaItem::new(MediaKind::Document, doc.file.id.clone())
    } else if let Some(audio) = msg.audio() {
        MediaItem::new(MediaKind::Audio, audio.file.id.clone())
    } else {
        return None;
    };

    let item = match msg.caption() {
        Some(c) => item.with_caption(c),
        None => item,
    };
    Some(match msg.media_group_id() {
        Some(g) => item.in_group(g),
        None => item,
    })
}

pub(crate) async fn handle_media(state: &AppState, sender: Sender, item: MediaItem) {
    let recipient = match state.directory.find_target(sender.user_id).await {
        Ok(Some(r)) => r,
        Ok(None) => {
            reply_to(state, sender, NO_TARGET_REPLY).await;
            return;
        }
        Err(e) => {
            tracing::error!(user = sender.user_id.0, error = %e, "target lookup failed");
            reply_to(state, sender, LOOKUP_FAILED_REPLY).await;
            return;
        }
    };

    let kind = item.kind;
    match state.relay.relay(sender, recipient, item).await {
        Relayed::Buffered { items } => {
            tracing::debug!(user = sender.user_id.0, %kind, items, "buffered album item");
        }
        Relayed::Forwarded(outcome) => {
            tracing::debug!(user = sender.user_id.0, %kind, ?outcome, "single item handled");
        }
    }
}
