use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info};
use tracing_subscriber::EnvFilter;

use pedidos_bot::appsheet::AppSheetClient;
use pedidos_bot::bot;
use pedidos_bot::config::{Channel, Config};
use pedidos_bot::flow::AppContext;
use pedidos_bot::session::InMemorySessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; log-crate records are forwarded into tracing.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting Pedidos Bot");

    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = Config::from_env()?;

    if config.appsheet.is_none() {
        error!(
            "APPSHEET_APP_ID / APPSHEET_ACCESS_KEY are not set; \
             product search, FAQ lookup and order persistence are disabled"
        );
    }

    let ctx = Arc::new(AppContext {
        sessions: Box::new(InMemorySessionStore::new()),
        backend: Box::new(AppSheetClient::new(config.appsheet.clone())),
        advisor_contact: config.advisor_contact.clone(),
    });

    match config.channel {
        Channel::WhatsApp => {
            info!("Serving WhatsApp webhook on port {}", config.port);
            bot::webhook::serve(ctx, config.port).await?;
        }
        Channel::Telegram => {
            let token = config
                .telegram_token
                .clone()
                .context("TELEGRAM_BOT_TOKEN must be set")?;
            bot::telegram::run(token, ctx).await;
        }
    }

    Ok(())
}
