//! Environment-driven configuration, loaded once at startup.

use std::env;

use anyhow::{bail, Context, Result};
use log::warn;

use crate::appsheet::AppSheetCredentials;

/// Which messaging channel this instance serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Twilio WhatsApp webhook (HTTP in, TwiML out). The default.
    WhatsApp,
    /// Telegram long polling via teloxide.
    Telegram,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub channel: Channel,
    /// Webhook listen port (WhatsApp channel only).
    pub port: u16,
    /// Backend credentials. `None` disables every remote call: searches
    /// come back empty and order writes fail.
    pub appsheet: Option<AppSheetCredentials>,
    /// Required for the Telegram channel, unused otherwise.
    pub telegram_token: Option<String>,
    /// Contact handle for the "talk to a human" branch. `None` turns that
    /// branch into an apology.
    pub advisor_contact: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let channel = match env::var("CHANNEL").ok().as_deref() {
            None | Some("whatsapp") => Channel::WhatsApp,
            Some("telegram") => Channel::Telegram,
            Some(other) => bail!("CHANNEL must be \"whatsapp\" or \"telegram\", got \"{other}\""),
        };

        let port = match env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().context("PORT must be a port number")?,
            Err(_) => 3000,
        };

        let appsheet = match (env::var("APPSHEET_APP_ID"), env::var("APPSHEET_ACCESS_KEY")) {
            (Ok(app_id), Ok(access_key)) => Some(AppSheetCredentials { app_id, access_key }),
            _ => None,
        };

        let advisor_contact = env::var("ADVISOR_CONTACT").ok().filter(|v| !v.is_empty());
        if advisor_contact.is_none() {
            warn!("ADVISOR_CONTACT is not set; the advisor branch will apologize instead");
        }

        Ok(Self {
            channel,
            port,
            appsheet,
            telegram_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            advisor_contact,
        })
    }
}
