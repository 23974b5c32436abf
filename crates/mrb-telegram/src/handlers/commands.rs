use mrb_core::domain::{ChatId, Sender};

use crate::router::AppState;

const HELP: &str = "📦 Media relay\n\n\
Anything you send me (photos, videos, albums, documents, audio) is forwarded to your target chat.\n\n\
/settarget <chat id> - choose the recipient\n\
/target - show the current recipient\n\
/status - pacing and pending albums\n\
/help - this message\n\n\
The recipient has to /start this bot once before it can receive anything.";

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

/// Run a slash command and return the reply for the sender.
pub(crate) async fn handle_command(
    state: &AppState,
    sender: Sender,
    username: Option<&str>,
    text: &str,
) -> String {
    let (cmd, args) = parse_command(text);
    tracing::info!(user = sender.user_id.0, command = %cmd, "command");

    match cmd.as_str() {
        "start" => cmd_start(state, sender, username).await,
        "help" => HELP.to_string(),
        "settarget" => cmd_set_target(state, sender, &args).await,
        "target" => cmd_target(state, sender).await,
        "status" => cmd_status(state).await,
        "broadcast" => cmd_broadcast(state, sender, &args).await,
        _ => "Unknown command. Try /help.".to_string(),
    }
}

async fn cmd_start(state: &AppState, sender: Sender, username: Option<&str>) -> String {
    if let Err(e) = state.directory.register(sender.user_id, username).await {
        tracing::error!(user = sender.user_id.0, error = %e, "register failed");
    }
    format!(
        "👋 Hi! Your chat id is {}.\n\nShare it with anyone who should forward media to you, \
or use /settarget <chat id> to pick where your own media goes.",
        sender.chat_id.0
    )
}

async fn cmd_set_target(state: &AppState, sender: Sender, args: &str) -> String {
    let Ok(target) = args.trim().parse::<i64>() else {
        return "Usage: /settarget <chat id>".to_string();
    };

    match state
        .directory
        .set_target(sender.user_id, ChatId(target))
        .await
    {
        Ok(()) => format!("✅ Target set to {target}."),
        Err(e) => {
            tracing::error!(user = sender.user_id.0, error = %e, "set_target failed");
            "❌ Could not save your target. Please try again.".to_string()
        }
    }
}

async fn cmd_target(state: &AppState, sender: Sender) -> String {
    match state.directory.find_target(sender.user_id).await {
        Ok(Some(t)) => format!("🎯 Current target: {}", t.0),
        Ok(None) => "No target set. Use /settarget <chat id>.".to_string(),
        Err(e) => {
            tracing::error!(user = sender.user_id.0, error = %e, "find_target failed");
            "❌ Could not look up your target. Please try again.".to_string()
        }
    }
}

async fn cmd_status(state: &AppState) -> String {
    let pending = state.relay.groups().pending_groups().await;
    format!(
        "⏱ Send interval: {} ms\n📚 Albums pending: {pending}",
        state.relay.forwarder().pacer().interval().as_millis()
    )
}

async fn cmd_broadcast(state: &AppState, sender: Sender, text: &str) -> String {
    if !state.cfg.is_admin(sender.user_id.0) {
        return "⛔ You are not allowed to broadcast.".to_string();
    }
    if text.is_empty() {
        return "Usage: /broadcast <text>".to_string();
    }

    let users = match state.directory.list_all_user_ids().await {
        Ok(u) => u,
        Err(e) => {
            tracing::error!(error = %e, "list_all_user_ids failed");
            return "❌ Could not load users.".to_string();
        }
    };

    let mut delivered = 0usize;
    let mut failed = 0usize;
    for user in users {
        state.broadcast_pacer.apply_delay(sender.user_id).await;
        match state.messenger.send_text(ChatId(user.0), text).await {
            Ok(()) => delivered += 1,
            Err(e) => {
                tracing::warn!(user = user.0, error = %e, "broadcast delivery failed");
                failed += 1;
            }
        }
    }

    format!("📣 Broadcast sent: {delivered} delivered, {failed} failed.")
}
