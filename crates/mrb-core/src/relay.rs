use std::{sync::Arc, time::Duration};

use crate::{
    audit::{truncate_text, AuditEvent, AuditLogger},
    domain::{ChatId, Sender},
    errors::Error,
    media::{BatchItem, MediaItem, MediaKind},
    media_group::{BoxFuture, FlushFn, FlushedGroup, MediaGroupBuffer},
    messaging::port::MessagingPort,
    pacing::SendPacer,
    Result,
};

/// Reply for a recipient that never opened a chat with the bot.
pub const RECIPIENT_UNREACHABLE_REPLY: &str = "❌ The recipient can't be reached yet. \
Ask them to open this bot and send /start, then try again.";

const MAX_ERROR_DETAIL: usize = 200;

/// What happened to a forward attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForwardOutcome {
    Sent,
    RecipientUnreachable,
    Failed,
}

/// What `RelayPipeline::relay` did with an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relayed {
    /// Held in an album buffer; the batched send happens on flush.
    Buffered { items: usize },
    Forwarded(ForwardOutcome),
}

/// Paced single-attempt sends with sender notification on failure.
pub struct Forwarder {
    messenger: Arc<dyn MessagingPort>,
    pacer: SendPacer,
    audit: Option<Arc<AuditLogger>>,
}

impl Forwarder {
    pub fn new(messenger: Arc<dyn MessagingPort>, pacer: SendPacer) -> Self {
        Self {
            messenger,
            pacer,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn pacer(&self) -> &SendPacer {
        &self.pacer
    }

    pub async fn send_single(
        &self,
        sender: Sender,
        recipient: ChatId,
        item: &MediaItem,
    ) -> ForwardOutcome {
        self.pacer.apply_delay(sender.user_id).await;

        let caption = item.caption.as_deref();
        let file_id = item.file_id.as_str();
        let res = match item.kind {
            MediaKind::Photo => self.messenger.send_photo(recipient, file_id, caption).await,
            MediaKind::Video => self.messenger.send_video(recipient, file_id, caption).await,
            MediaKind::Document => {
                self.messenger
                    .send_document(recipient, file_id, caption)
                    .await
            }
            MediaKind::Audio => self.messenger.send_audio(recipient, file_id, caption).await,
        };

        self.finish(sender, recipient, item.kind.as_str(), 1, res)
            .await
    }

    /// One pacing slot and one batched send for the whole album.
    pub async fn send_batch(
        &self,
        sender: Sender,
        recipient: ChatId,
        items: &[BatchItem],
    ) -> ForwardOutcome {
        self.pacer.apply_delay(sender.user_id).await;
        let res = self.messenger.send_media_group(recipient, items).await;
        self.finish(sender, recipient, "media_group", items.len(), res)
            .await
    }

    async fn finish(
        &self,
        sender: Sender,
        recipient: ChatId,
        kind: &str,
        items: usize,
        res: Result<()>,
    ) -> ForwardOutcome {
        let err = match res {
            Ok(()) => {
                tracing::info!(
                    user = sender.user_id.0,
                    recipient = recipient.0,
                    kind,
                    items,
                    "forwarded"
                );
                self.audit(AuditEvent::forward(sender, recipient, kind, items));
                return ForwardOutcome::Sent;
            }
            Err(e) => e,
        };

        tracing::warn!(
            user = sender.user_id.0,
            recipient = recipient.0,
            kind,
            items,
            error = %err,
            "forward failed"
        );
        self.audit(AuditEvent::forward_failed(
            sender,
            recipient,
            kind,
            items,
            &err.to_string(),
        ));

        let (reply, outcome) = if err.is_recipient_unreachable() {
            (
                RECIPIENT_UNREACHABLE_REPLY.to_string(),
                ForwardOutcome::RecipientUnreachable,
            )
        } else {
            (failure_reply(&err), ForwardOutcome::Failed)
        };

        if let Err(e) = self.messenger.send_text(sender.chat_id, &reply).await {
            tracing::warn!(user = sender.user_id.0, error = %e, "failed to notify sender");
        }
        outcome
    }

    fn audit(&self, event: AuditEvent) {
        let Some(audit) = &self.audit else {
            return;
        };
        if let Err(e) = audit.write(event) {
            tracing::warn!(error = %e, "failed to write audit event");
        }
    }
}

fn failure_reply(err: &Error) -> String {
    let detail = match err {
        Error::External(s) => s.clone(),
        other => other.to_string(),
    };
    format!(
        "❌ Failed to forward: {}",
        truncate_text(&detail, MAX_ERROR_DETAIL)
    )
}

/// Entry point for inbound media: albums are buffered, everything else is
/// forwarded right away.
pub struct RelayPipeline {
    forwarder: Arc<Forwarder>,
    groups: Arc<MediaGroupBuffer>,
}

impl RelayPipeline {
    pub fn new(forwarder: Arc<Forwarder>, media_group_timeout: Duration) -> Self {
        let fw = Arc::clone(&forwarder);
        let process: FlushFn = Arc::new(move |group: FlushedGroup| {
            let fw = Arc::clone(&fw);
            let fut: BoxFuture = Box::pin(async move {
                let _ = fw
                    .send_batch(group.sender, group.recipient, &group.items)
                    .await;
            });
            fut
        });

        Self {
            forwarder,
            groups: MediaGroupBuffer::new(media_group_timeout, process),
        }
    }

    pub fn forwarder(&self) -> &Arc<Forwarder> {
        &self.forwarder
    }

    pub fn groups(&self) -> &Arc<MediaGroupBuffer> {
        &self.groups
    }

    /// Route one item from `sender` to an already resolved `recipient`.
    pub async fn relay(&self, sender: Sender, recipient: ChatId, item: MediaItem) -> Relayed {
        match item.group_key().map(str::to_string) {
            Some(key) => {
                let items = self
                    .groups
                    .add_to_group(key, sender, recipient, item)
                    .await;
                Relayed::Buffered { items }
            }
            None => Relayed::Forwarded(
                self.forwarder
                    .send_single(sender, recipient, &item)
                    .await,
            ),
        }
    }
}
