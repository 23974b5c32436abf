use std::{
    collections::{hash_map::Entry, HashMap},
    future::Future,
    pin::Pin,
    sync::Arc,
    time::Duration,
};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{ChatId, Sender},
    media::{BatchItem, MediaItem},
};

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
pub type FlushFn = Arc<dyn Fn(FlushedGroup) -> BoxFuture + Send + Sync>;

/// A completed album, ready for a batched send.
#[derive(Clone, Debug)]
pub struct FlushedGroup {
    pub media_group_id: String,
    pub sender: Sender,
    pub recipient: ChatId,
    /// Items in arrival order.
    pub items: Vec<BatchItem>,
}

struct PendingGroup {
    items: Vec<MediaItem>,
    sender: Sender,
    recipient: ChatId,
    cancel: CancellationToken,
}

/// Buffers album items until no new item arrived for `timeout`.
///
/// Telegram delivers every album item as its own update and never marks the
/// last one, so the quiet-period timer is the only completion signal.
pub struct MediaGroupBuffer {
    timeout: Duration,
    process: FlushFn,
    pending: Mutex<HashMap<String, PendingGroup>>,
}

impl MediaGroupBuffer {
    pub fn new(timeout: Duration, process: FlushFn) -> Arc<Self> {
        Arc::new(Self {
            timeout,
            process,
            pending: Mutex::new(HashMap::new()),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of albums still collecting items.
    pub async fn pending_groups(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Append `item` to its album and restart the album's quiet-period timer.
    ///
    /// The first item of an unseen key binds the album to `sender` and
    /// `recipient`. Returns the number of items buffered so far.
    pub async fn add_to_group(
        self: &Arc<Self>,
        media_group_id: String,
        sender: Sender,
        recipient: ChatId,
        item: MediaItem,
    ) -> usize {
        let cancel = CancellationToken::new();

        let mut map = self.pending.lock().await;
        let group = match map.entry(media_group_id.clone()) {
            Entry::Occupied(e) => {
                let group = e.into_mut();
                group.cancel.cancel();
                group.cancel = cancel.clone();
                group
            }
            Entry::Vacant(e) => {
                tracing::debug!(
                    media_group_id = %media_group_id,
                    user = sender.user_id.0,
                    "new media group"
                );
                e.insert(PendingGroup {
                    items: Vec::new(),
                    sender,
                    recipient,
                    cancel: cancel.clone(),
                })
            }
        };
        group.items.push(item);
        let count = group.items.len();
        drop(map);

        self.spawn_timer(media_group_id, cancel);
        count
    }

    /// Flush an album now. A no-op if it was already flushed or never existed.
    pub async fn flush(&self, media_group_id: &str) {
        let group = {
            let mut map = self.pending.lock().await;
            take(&mut map, media_group_id)
        };

        if let Some(group) = group {
            self.dispatch(media_group_id, group).await;
        }
    }

    fn spawn_timer(self: &Arc<Self>, media_group_id: String, cancel: CancellationToken) {
        let buffer = Arc::clone(self);
        let timeout = self.timeout;
        tokio::spawn(async move {
            tokio::select! {
              _ = cancel.cancelled() => {}
              _ = tokio::time::sleep(timeout) => {
                buffer.flush_armed(&media_group_id, &cancel).await;
              }
            }
        });
    }

    /// Timer path: only the timer armed by the latest item may flush.
    async fn flush_armed(&self, media_group_id: &str, cancel: &CancellationToken) {
        let group = {
            let mut map = self.pending.lock().await;
            // Every superseded or flushed timer has its token cancelled under this lock.
            if cancel.is_cancelled() {
                return;
            }
            take(&mut map, media_group_id)
        };

        if let Some(group) = group {
            self.dispatch(media_group_id, group).await;
        }
    }

    async fn dispatch(&self, media_group_id: &str, group: PendingGroup) {
        let items: Vec<BatchItem> = group
            .items
            .iter()
            .filter_map(MediaItem::to_batch_item)
            .collect();
        if items.is_empty() {
            tracing::debug!(media_group_id = %media_group_id, "media group has nothing to send");
            return;
        }

        tracing::info!(
            media_group_id = %media_group_id,
            user = group.sender.user_id.0,
            items = items.len(),
            "flushing media group"
        );
        (self.process)(FlushedGroup {
            media_group_id: media_group_id.to_string(),
            sender: group.sender,
            recipient: group.recipient,
            items,
        })
        .await;
    }
}

fn take(map: &mut HashMap<String, PendingGroup>, media_group_id: &str) -> Option<PendingGroup> {
    let group = map.remove(media_group_id)?;
    group.cancel.cancel();
    Some(group)
}
