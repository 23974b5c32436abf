use std::sync::Arc;

use mrb_core::{config::Config, directory::JsonFileDirectory};

#[tokio::main]
async fn main() -> Result<(), mrb_core::Error> {
    mrb_core::logging::init("mrb")?;

    let cfg = Arc::new(Config::load()?);
    let directory = Arc::new(JsonFileDirectory::open(cfg.users_file.clone()).await?);

    mrb_telegram::router::run_polling(cfg, directory)
        .await
        .map_err(|e| mrb_core::Error::External(format!("telegram bot failed: {e}")))?;

    tracing::info!("mrb stopped");
    Ok(())
}
