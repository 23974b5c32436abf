/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// The user a media item came from, plus the chat replies go to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Sender {
    pub user_id: UserId,
    pub chat_id: ChatId,
}

impl Sender {
    pub fn new(user_id: UserId, chat_id: ChatId) -> Self {
        Self { user_id, chat_id }
    }
}
