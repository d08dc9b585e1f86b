//! Configuration and settings management
//!
//! Loads settings from environment variables and defines the fixed
//! organization surface (worksheet names, invitation links).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Telegram user ID of the administrator (always an approved member)
    pub admin_id: i64,

    /// Chat ID of the methodist audience channel
    pub methodist_chat_id: i64,

    /// Chat ID of the whole-center audience channel
    pub camp_chat_id: i64,

    /// Google spreadsheet ID backing members and events
    pub spreadsheet_id: String,

    /// Path to the Google service-account JSON key file
    pub google_credentials_path: String,
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use magistr_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or a required value is unset.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(File::with_name("config/default").required(false))
            // Add in the current environment file
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of APP)
            // Eg.. `APP_DEBUG=1 ./target/app` would set the `debug` key
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Also add settings from environment variables directly (without prefix)
            // Note: Environment::default() auto-converts UPPER_SNAKE_CASE to snake_case
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let settings: Self = s.try_deserialize()?;

        if settings.telegram_token.is_empty() || settings.admin_id == 0 {
            return Err(ConfigError::Message(
                "telegram_token and admin_id must be set".to_string(),
            ));
        }

        Ok(settings)
    }
}


// Google Sheets worksheet titles
/// Worksheet receiving approved methodist applications
pub const WS_METHODISTS: &str = "Методисты";
/// Worksheet receiving approved magistr applications
pub const WS_MAGISTRS: &str = "Магистры";
/// Worksheet holding official events
pub const WS_EVENTS_OFFICIAL: &str = "Мероприятия официальные";
/// Worksheet holding unofficial events
pub const WS_EVENTS_UNOFFICIAL: &str = "Мероприятия неофициальные";

// Invitation links sent to approved applicants
/// Chats every approved member is invited to
pub const INVITE_LINKS_BASE: [&str; 2] = [
    "https://t.me/+_nrCKWdshN8wNzRi",
    "https://t.me/+P1S3QOP5LP40NjE6",
];
/// Extra chats prepended for methodist-track approvals
pub const INVITE_LINKS_METHODIST: [&str; 2] = [
    "https://t.me/+TEBK6X4Zvos1YzEy",
    "https://t.me/+bTsWQjpu3JoxMmZi",
];
