#![deny(missing_docs)]
//! Магистр organization Telegram bot.
//!
//! Conversational bot handling membership applications with admin approval,
//! event organization and browsing backed by a Google spreadsheet, and
//! broadcast relay to the organization's audience chats.

/// Telegram bot implementation
pub mod bot;
/// Configuration management
pub mod config;
/// Step-table dialog engine and the concrete dialogs
pub mod dialog;
/// Google Sheets client
pub mod sheets;
/// Messaging transport seam
pub mod transport;
pub mod utils;
