//! Campus info bot - keyword-driven FAQ responder for messaging webhooks.
//!
//! Inbound messages (Twilio/WhatsApp or Telegram) are matched against a small
//! set of fixed commands, then a substring search over the notices list, and
//! finally an optional Gemini call for free-form questions.

pub mod config;
pub mod gemini;
pub mod merge;
pub mod resolver;
pub mod server;
pub mod store;
pub mod telegram;
pub mod twilio;
