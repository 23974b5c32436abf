//! In-memory fakes shared by handler tests.

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;

use mrb_core::{
    config::Config,
    directory::UserDirectory,
    domain::{ChatId, UserId},
    errors::Error,
    media::BatchItem,
    messaging::port::MessagingPort,
    Result,
};

use crate::router::AppState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sent {
    Text(ChatId, String),
    Media(ChatId, String),
    Album(ChatId, Vec<String>),
}

#[derive(Default)]
pub struct FakeMessenger {
    sent: Mutex<Vec<Sent>>,
    unreachable: Mutex<HashSet<i64>>,
}

impl FakeMessenger {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_to(&self, chat: ChatId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text(c, t) if c == chat => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn make_unreachable(&self, chat: ChatId) {
        self.unreachable.lock().unwrap().insert(chat.0);
    }

    fn record(&self, chat: ChatId, sent: Sent) -> Result<()> {
        if self.unreachable.lock().unwrap().contains(&chat.0) {
            return Err(Error::RecipientUnreachable(
                "Bad Request: chat not found".to_string(),
            ));
        }
        self.sent.lock().unwrap().push(sent);
        Ok(())
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.record(chat_id, Sent::Text(chat_id, text.to_string()))
    }

    async fn send_photo(&self, chat_id: ChatId, file_id: &str, _c: Option<&str>) -> Result<()> {
        self.record(chat_id, Sent::Media(chat_id, file_id.to_string()))
    }

    async fn send_video(&self, chat_id: ChatId, file_id: &str, _c: Option<&str>) -> Result<()> {
        self.record(chat_id, Sent::Media(chat_id, file_id.to_string()))
    }

    async fn send_document(&self, chat_id: ChatId, file_id: &str, _c: Option<&str>) -> Result<()> {
        self.record(chat_id, Sent::Media(chat_id, file_id.to_string()))
    }

    async fn send_audio(&self, chat_id: ChatId, file_id: &str, _c: Option<&str>) -> Result<()> {
        self.record(chat_id, Sent::Media(chat_id, file_id.to_string()))
    }

    async fn send_media_group(&self, chat_id: ChatId, items: &[BatchItem]) -> Result<()> {
        let ids = items.iter().map(|i| i.file_id.clone()).collect();
        self.record(chat_id, Sent::Album(chat_id, ids))
    }
}

#[derive(Default)]
pub struct MemoryDirectory {
    users: Mutex<BTreeMap<i64, Option<i64>>>,
}

impl MemoryDirectory {
    pub fn set(&self, user: UserId, target: ChatId) {
        self.users.lock().unwrap().insert(user.0, Some(target.0));
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_target(&self, user: UserId) -> Result<Option<ChatId>> {
        let users = self.users.lock().unwrap();
        Ok(users.get(&user.0).copied().flatten().map(ChatId))
    }

    async fn set_target(&self, user: UserId, recipient: ChatId) -> Result<()> {
        self.set(user, recipient);
        Ok(())
    }

    async fn list_all_user_ids(&self) -> Result<BTreeSet<UserId>> {
        Ok(self.users.lock().unwrap().keys().copied().map(UserId).collect())
    }

    async fn register(&self, user: UserId, _username: Option<&str>) -> Result<()> {
        self.users.lock().unwrap().entry(user.0).or_insert(None);
        Ok(())
    }
}

pub fn test_config(admins: &[i64]) -> Config {
    Config {
        telegram_bot_token: "x".to_string(),
        admin_users: admins.to_vec(),
        send_interval: Duration::from_millis(500),
        users_file: "/tmp/mrb-users.json".into(),
        audit_log_path: None,
    }
}

pub fn test_state(admins: &[i64]) -> (AppState, Arc<FakeMessenger>, Arc<MemoryDirectory>) {
    let api = Arc::new(FakeMessenger::default());
    let dir = Arc::new(MemoryDirectory::default());
    let state = AppState::new(Arc::new(test_config(admins)), api.clone(), dir.clone());
    (state, api, dir)
}
