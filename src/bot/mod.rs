//! Channel adapters translating between the messaging providers and the
//! channel-agnostic conversation flow.
//!
//! - `webhook`: Twilio WhatsApp webhook (form fields in, TwiML out)
//! - `telegram`: teloxide long-polling dispatcher

pub mod telegram;
pub mod webhook;
