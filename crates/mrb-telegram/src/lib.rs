//! Telegram adapter (teloxide).
//!
//! This crate implements the `mrb-core` MessagingPort over Telegram Bot API
//! and routes incoming updates into the relay pipeline.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InputFile, InputMedia, InputMediaPhoto, InputMediaVideo},
    ApiError, RequestError,
};

pub mod handlers;
pub mod router;

#[cfg(test)]
pub(crate) mod testing;

use mrb_core::{
    domain::ChatId,
    errors::Error,
    media::{BatchItem, MediaKind},
    messaging::port::MessagingPort,
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    /// Single attempt: forwards are never retried, not even on `RetryAfter`.
    async fn send<T, Fut>(&self, req: Fut) -> Result<()>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
        Fut::IntoFuture: Send,
    {
        req.await.map(|_| ()).map_err(map_err)
    }
}

pub(crate) fn map_err(e: RequestError) -> Error {
    if is_recipient_unreachable(&e) {
        return Error::RecipientUnreachable(e.to_string());
    }
    Error::External(format!("telegram error: {e}"))
}

/// Telegram reports a chat the bot may not write to in a few different ways.
fn is_recipient_unreachable(e: &RequestError) -> bool {
    match e {
        RequestError::Api(ApiError::ChatNotFound | ApiError::UserNotFound) => true,
        RequestError::Api(api) => {
            let lower = api.to_string().to_lowercase();
            lower.contains("chat not found") || lower.contains("can't initiate conversation")
        }
        _ => false,
    }
}

fn input_media(item: &BatchItem) -> Option<InputMedia> {
    let file = InputFile::file_id(item.file_id.clone());
    let media = match item.kind {
        MediaKind::Photo => {
            let mut photo = InputMediaPhoto::new(file);
            if let Some(c) = &item.caption {
                photo = photo.caption(c.clone());
            }
            InputMedia::Photo(photo)
        }
        MediaKind::Video => {
            let mut video = InputMediaVideo::new(file);
            if let Some(c) = &item.caption {
                video = video.caption(c.clone());
            }
            InputMedia::Video(video)
        }
        MediaKind::Document | MediaKind::Audio => return None,
    };
    Some(media)
}

/// `sendMediaGroup` needs at least two items, so a lone survivor goes out on
/// its own.
enum AlbumSend<'a> {
    Single(&'a BatchItem),
    Group(Vec<InputMedia>),
}

fn plan_album(items: &[BatchItem]) -> Result<AlbumSend<'_>> {
    let sendable: Vec<&BatchItem> = items.iter().filter(|i| i.kind.is_groupable()).collect();
    match sendable.as_slice() {
        [] => Err(Error::External(
            "media group has no photo or video items".to_string(),
        )),
        [one] => Ok(AlbumSend::Single(*one)),
        _ => Ok(AlbumSend::Group(
            sendable.into_iter().filter_map(input_media).collect(),
        )),
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.send(self.bot.send_message(Self::tg_chat(chat_id), text.to_string()))
            .await
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<()> {
        let mut req = self
            .bot
            .send_photo(Self::tg_chat(chat_id), InputFile::file_id(file_id.to_string()));
        if let Some(c) = caption {
            req = req.caption(c.to_string());
        }
        self.send(req).await
    }

    async fn send_video(
        &self,
        chat_id: ChatId,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<()> {
        let mut req = self
            .bot
            .send_video(Self::tg_chat(chat_id), InputFile::file_id(file_id.to_string()));
        if let Some(c) = caption {
            req = req.caption(c.to_string());
        }
        self.send(req).await
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<()> {
        let mut req = self
            .bot
            .send_document(Self::tg_chat(chat_id), InputFile::file_id(file_id.to_string()));
        if let Some(c) = caption {
            req = req.caption(c.to_string());
        }
        self.send(req).await
    }

    async fn send_audio(
        &self,
        chat_id: ChatId,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<()> {
        let mut req = self
            .bot
            .send_audio(Self::tg_chat(chat_id), InputFile::file_id(file_id.to_string()));
        if let Some(c) = caption {
            req = req.caption(c.to_string());
        }
        self.send(req).await
    }

    async fn send_media_group(&self, chat_id: ChatId, items: &[BatchItem]) -> Result<()> {
        match plan_album(items)? {
            AlbumSend::Single(item) => {
                let caption = item.caption.as_deref();
                match item.kind {
                    MediaKind::Video => self.send_video(chat_id, &item.file_id, caption).await,
                    _ => self.send_photo(chat_id, &item.file_id, caption).await,
                }
            }
            AlbumSend::Group(media) => {
                self.send(self.bot.send_media_group(Self::tg_chat(chat_id), media))
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_not_found_maps_to_recipient_unreachable() {
        let err = map_err(RequestError::Api(ApiError::ChatNotFound));
        assert!(err.is_recipient_unreachable());

        let err = map_err(RequestError::Api(ApiError::UserNotFound));
        assert!(err.is_recipient_unreachable());

        let err = map_err(RequestError::Api(ApiError::Unknown(
            "Forbidden: bot can't initiate conversation with a user".to_string(),
        )));
        assert!(err.is_recipient_unreachable());
    }

    #[test]
    fn other_errors_map_to_external() {
        let err = map_err(RequestError::Api(ApiError::Unknown(
            "Bad Request: wrong file identifier/HTTP URL specified".to_string(),
        )));
        assert!(matches!(err, Error::External(ref s) if s.starts_with("telegram error:")));

        let err = map_err(RequestError::Api(ApiError::BotBlocked));
        assert!(!err.is_recipient_unreachable());
    }

    #[test]
    fn album_without_sendable_items_is_an_error() {
        let items = vec![BatchItem {
            kind: MediaKind::Audio,
            file_id: "a".to_string(),
            caption: None,
        }];
        assert!(matches!(plan_album(&items), Err(Error::External(_))));
        assert!(matches!(plan_album(&[]), Err(Error::External(_))));
    }

    #[test]
    fn album_with_one_item_is_sent_alone() {
        let items = vec![BatchItem {
            kind: MediaKind::Video,
            file_id: "v".to_string(),
            caption: Some("late".to_string()),
        }];
        match plan_album(&items) {
            Ok(AlbumSend::Single(item)) => assert_eq!(item.file_id, "v"),
            _ => panic!("expected a single send"),
        }
    }

    #[test]
    fn album_keeps_only_photo_and_video() {
        let items = vec![
            BatchItem {
                kind: MediaKind::Photo,
                file_id: "p".to_string(),
                caption: Some("first".to_string()),
            },
            BatchItem {
                kind: MediaKind::Document,
                file_id: "d".to_string(),
                caption: None,
            },
            BatchItem {
                kind: MediaKind::Video,
                file_id: "v".to_string(),
                caption: None,
            },
        ];
        let media: Vec<InputMedia> = items.iter().filter_map(input_media).collect();
        assert_eq!(media.len(), 2);
        assert!(matches!(media[0], InputMedia::Photo(ref p) if p.caption.as_deref() == Some("first")));
        assert!(matches!(media[1], InputMedia::Video(_)));
    }
}
