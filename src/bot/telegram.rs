//! Telegram channel adapter.
//!
//! Runs a teloxide long-polling dispatcher and forwards every text message
//! through the conversation flow, using the chat id as the conversation id.

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, info};

use crate::flow::{self, AppContext};

/// Start the dispatcher and block until it shuts down.
pub async fn run(token: String, ctx: Arc<AppContext>) {
    let bot = Bot::new(token);

    info!("Telegram bot initialized, starting dispatcher");

    let handler = dptree::entry().branch(Update::filter_message().endpoint({
        let ctx = Arc::clone(&ctx);
        move |bot: Bot, msg: Message| {
            let ctx = Arc::clone(&ctx);
            async move { message_handler(bot, msg, ctx).await }
        }
    }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

/// Handle one incoming message: ignore bots and non-text updates, run the
/// turn, send the reply back to the chat.
pub async fn message_handler(bot: Bot, msg: Message, ctx: Arc<AppContext>) -> Result<()> {
    if msg.from.as_ref().map(|user| user.is_bot).unwrap_or(false) {
        return Ok(());
    }

    let Some(text) = msg.text() else {
        debug!(chat_id = %msg.chat.id, "Ignoring non-text message");
        return Ok(());
    };

    let conversation_id = msg.chat.id.to_string();
    let reply = flow::process_message(&ctx, &conversation_id, text).await;

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}
