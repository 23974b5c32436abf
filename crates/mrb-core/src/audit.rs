use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::{domain::ChatId, domain::Sender, Result};

const AUDIT_MAX_TEXT: usize = 500;

/// RFC3339 timestamp in UTC (for logs/telemetry).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

/// One line of the forward audit log.
#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,
    pub user_id: i64,
    pub recipient: i64,
    /// Media kind, or `media_group` for albums.
    pub kind: String,
    pub items: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn forward(sender: Sender, recipient: ChatId, kind: &str, items: usize) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: "forward".to_string(),
            user_id: sender.user_id.0,
            recipient: recipient.0,
            kind: kind.to_string(),
            items,
            error: None,
        }
    }

    pub fn forward_failed(
        sender: Sender,
        recipient: ChatId,
        kind: &str,
        items: usize,
        error: &str,
    ) -> Self {
        Self {
            error: Some(error.to_string()),
            event: "forward_failed".to_string(),
            ..Self::forward(sender, recipient, kind, items)
        }
    }
}

/// Append-only JSON-lines audit log.
#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        if let Some(s) = &event.error {
            event.error = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let line = serde_json::to_string(&event)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}
