//! Telegram update handlers.
//!
//! Commands are answered directly; media is resolved against the user
//! directory and handed to the relay pipeline.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use mrb_core::domain::{ChatId, Sender, UserId};

use crate::router::AppState;

mod commands;
mod media;

pub use media::media_item_from_message;

const USAGE_HINT: &str =
    "Send me a photo, video, document or audio file and I'll forward it to your target. Try /help.";

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let sender = Sender::new(UserId(user.id.0 as i64), ChatId(msg.chat.id.0));
    let username = user.username.clone();

    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            let reply = commands::handle_command(&state, sender, username.as_deref(), text).await;
            reply_to(&state, sender, &reply).await;
            return Ok(());
        }
    }

    if let Some(item) = media_item_from_message(&msg) {
        media::handle_media(&state, sender, item).await;
        return Ok(());
    }

    reply_to(&state, sender, USAGE_HINT).await;
    Ok(())
}

pub(crate) async fn reply_to(state: &AppState, sender: Sender, text: &str) {
    if let Err(e) = state.messenger.send_text(sender.chat_id, text).await {
        tracing::warn!(user = sender.user_id.0, error = %e, "reply failed");
    }
}
