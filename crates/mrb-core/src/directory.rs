use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    audit::iso_timestamp_utc,
    domain::{ChatId, UserId},
    Result,
};

/// Per-user settings: who their media goes to.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_target(&self, user: UserId) -> Result<Option<ChatId>>;
    async fn set_target(&self, user: UserId, recipient: ChatId) -> Result<()>;
    async fn list_all_user_ids(&self) -> Result<BTreeSet<UserId>>;

    /// Record that `user` talked to the bot. Keeps any existing target.
    async fn register(&self, user: UserId, username: Option<&str>) -> Result<()>;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub updated_at: String,
}

/// Directory stored as one JSON object keyed by user id.
///
/// The whole file is read at open and rewritten after every change.
pub struct JsonFileDirectory {
    path: PathBuf,
    users: Mutex<BTreeMap<i64, UserRecord>>,
}

impl JsonFileDirectory {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let users = load_users(&path).await?;
        tracing::info!(path = %path.display(), users = users.len(), "user directory loaded");
        Ok(Self {
            path,
            users: Mutex::new(users),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `f` to a copy, persist it, then commit. A failed save leaves the
    /// cached directory unchanged.
    async fn update(&self, user: UserId, f: impl FnOnce(&mut UserRecord)) -> Result<()> {
        let mut users = self.users.lock().await;
        let mut record = users.get(&user.0).cloned().unwrap_or_default();
        f(&mut record);
        record.updated_at = iso_timestamp_utc();

        let mut next = users.clone();
        next.insert(user.0, record);
        save_users(&self.path, &next).await?;
        *users = next;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for JsonFileDirectory {
    async fn find_target(&self, user: UserId) -> Result<Option<ChatId>> {
        let users = self.users.lock().await;
        Ok(users.get(&user.0).and_then(|r| r.target).map(ChatId))
    }

    async fn set_target(&self, user: UserId, recipient: ChatId) -> Result<()> {
        self.update(user, |r| r.target = Some(recipient.0)).await
    }

    async fn list_all_user_ids(&self) -> Result<BTreeSet<UserId>> {
        let users = self.users.lock().await;
        Ok(users.keys().copied().map(UserId).collect())
    }

    async fn register(&self, user: UserId, username: Option<&str>) -> Result<()> {
        let username = username.map(|s| s.to_string());
        self.update(user, |r| {
            if username.is_some() {
                r.username = username;
            }
        })
        .await
    }
}

async fn load_users(path: &Path) -> Result<BTreeMap<i64, UserRecord>> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(BTreeMap::new());
    }
    let txt = tokio::fs::read_to_string(path).await?;
    if txt.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_str(&txt)?)
}

async fn save_users(path: &Path, users: &BTreeMap<i64, UserRecord>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let txt = serde_json::to_string_pretty(users)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, txt).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
