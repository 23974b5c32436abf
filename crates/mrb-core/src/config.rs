use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Extra time added on top of the send interval before an album is flushed.
pub const MEDIA_GROUP_MARGIN: Duration = Duration::from_millis(500);
/// Shortest quiet period an album waits for further items.
pub const MEDIA_GROUP_FLOOR: Duration = Duration::from_millis(1000);

/// Typed configuration, read from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    pub admin_users: Vec<i64>,

    /// Minimum spacing between two forwards of the same sender.
    pub send_interval: Duration,

    pub users_file: PathBuf,
    pub audit_log_path: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let admin_users = parse_csv_i64(env_str("ADMIN_USERS"));
        let send_interval = Duration::from_millis(env_u64("SEND_INTERVAL_MS").unwrap_or(1000));
        let users_file = env_str("USERS_FILE")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/users.json"));
        let audit_log_path = env_str("AUDIT_LOG_PATH")
            .and_then(non_empty)
            .map(PathBuf::from);

        Ok(Self {
            telegram_bot_token,
            admin_users,
            send_interval,
            users_file,
            audit_log_path,
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_users.contains(&user_id)
    }

    /// Quiet period an album waits before it is flushed.
    pub fn media_group_timeout(&self) -> Duration {
        media_group_timeout(self.send_interval)
    }
}

/// Flush delay for albums: always longer than a pending rate-limit wait.
pub fn media_group_timeout(send_interval: Duration) -> Duration {
    (send_interval + MEDIA_GROUP_MARGIN).max(MEDIA_GROUP_FLOOR)
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
