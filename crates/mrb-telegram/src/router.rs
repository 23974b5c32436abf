use std::{sync::Arc, time::Duration};

use anyhow::Context;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use mrb_core::{
    audit::AuditLogger,
    config::Config,
    directory::UserDirectory,
    messaging::port::MessagingPort,
    pacing::SendPacer,
    relay::{Forwarder, RelayPipeline},
};

use crate::handlers;
use crate::TelegramMessenger;

/// Spacing between broadcast deliveries, under Telegram's ~30 messages/s cap.
pub const BROADCAST_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub messenger: Arc<dyn MessagingPort>,
    pub directory: Arc<dyn UserDirectory>,
    pub relay: Arc<RelayPipeline>,
    pub broadcast_pacer: Arc<SendPacer>,
}

impl AppState {
    pub fn new(
        cfg: Arc<Config>,
        messenger: Arc<dyn MessagingPort>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        let mut forwarder =
            Forwarder::new(messenger.clone(), SendPacer::new(cfg.send_interval));
        if let Some(path) = &cfg.audit_log_path {
            forwarder = forwarder.with_audit(Arc::new(AuditLogger::new(path.clone())));
        }
        let relay = RelayPipeline::new(Arc::new(forwarder), cfg.media_group_timeout());

        Self {
            cfg,
            messenger,
            directory,
            relay: Arc::new(relay),
            broadcast_pacer: Arc::new(SendPacer::new(BROADCAST_INTERVAL)),
        }
    }
}

pub async fn run_polling(
    cfg: Arc<Config>,
    directory: Arc<dyn UserDirectory>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let me = bot
        .get_me()
        .await
        .context("telegram get_me failed (check TELEGRAM_BOT_TOKEN)")?;
    tracing::info!(username = %me.username(), "mrb started");
    tracing::info!(
        send_interval_ms = cfg.send_interval.as_millis() as u64,
        media_group_timeout_ms = cfg.media_group_timeout().as_millis() as u64,
        users_file = %cfg.users_file.display(),
        admins = cfg.admin_users.len(),
        "relay configured"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let state = Arc::new(AppState::new(cfg, messenger, directory));

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
