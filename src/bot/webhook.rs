//! WhatsApp channel adapter.
//!
//! One Twilio-style webhook endpoint: form-encoded `From`/`Body` in, TwiML
//! XML out. The conversation id is the `From` value
//! (`whatsapp:+57300…`).

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Form, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;
use tracing::{debug, info};

use crate::flow::{self, AppContext};

/// Inbound webhook payload as Twilio posts it.
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body")]
    pub body: String,
}

/// Build the webhook router.
pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/whatsapp", post(whatsapp_webhook))
        .with_state(ctx)
}

/// Bind and serve until the process is stopped.
pub async fn serve(ctx: Arc<AppContext>, port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Webhook listening on {addr}");
    axum::serve(listener, router(ctx))
        .await
        .context("webhook server failed")?;
    Ok(())
}

async fn whatsapp_webhook(
    State(ctx): State<Arc<AppContext>>,
    Form(inbound): Form<InboundMessage>,
) -> impl IntoResponse {
    debug!(from = %inbound.from, "Inbound webhook message");

    let reply = flow::process_message(&ctx, &inbound.from, &inbound.body).await;

    (
        [(header::CONTENT_TYPE, "text/xml")],
        render_twiml(&reply),
    )
}

/// Render the reply as the TwiML document Twilio expects.
pub fn render_twiml(text: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message><Body>{}</Body></Message></Response>",
        escape_xml(text)
    )
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
