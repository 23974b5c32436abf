use std::fmt;

/// Kinds of media the relay forwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Photo,
    Video,
    Document,
    Audio,
}

impl MediaKind {
    /// Only photos and videos can travel inside an album.
    pub fn is_groupable(self) -> bool {
        matches!(self, MediaKind::Photo | MediaKind::Video)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
            MediaKind::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound media message, reduced to what the relay needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaItem {
    pub kind: MediaKind,
    /// Transport-assigned content reference (Telegram `file_id`).
    pub file_id: String,
    pub caption: Option<String>,
    /// Album key; only ever set for photos and videos.
    pub media_group_id: Option<String>,
}

impl MediaItem {
    pub fn new(kind: MediaKind, file_id: impl Into<String>) -> Self {
        Self {
            kind,
            file_id: file_id.into(),
            caption: None,
            media_group_id: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn in_group(mut self, media_group_id: impl Into<String>) -> Self {
        if self.kind.is_groupable() {
            self.media_group_id = Some(media_group_id.into());
        }
        self
    }

    /// Album key, ignoring keys on kinds that cannot be grouped.
    pub fn group_key(&self) -> Option<&str> {
        if !self.kind.is_groupable() {
            return None;
        }
        self.media_group_id.as_deref()
    }

    /// Projection used for a batched send; `None` for non-album kinds.
    pub fn to_batch_item(&self) -> Option<BatchItem> {
        if !self.kind.is_groupable() {
            return None;
        }
        Some(BatchItem {
            kind: self.kind,
            file_id: self.file_id.clone(),
            caption: self.caption.clone(),
        })
    }
}

/// One entry of an outgoing album.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchItem {
    pub kind: MediaKind,
    pub file_id: String,
    pub caption: Option<String>,
}
