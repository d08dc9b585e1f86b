use anyhow::Context;
use dotenvy::dotenv;
use magistr_bot::bot::router::Router;
use magistr_bot::bot::telegram::{self, Command, TelegramTransport};
use magistr_bot::config::Settings;
use magistr_bot::sheets::GoogleSheets;
use magistr_bot::transport::{ChatRef, Inbound};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenv().ok();

    init_logging();

    info!("Starting Magistr bot...");

    // Load settings
    let settings = init_settings();

    // Initialize the spreadsheet client
    let sheets = init_sheets(&settings);

    // Initialize Bot
    let bot = Bot::new(settings.telegram_token.clone());
    bot.set_my_commands(Command::bot_commands())
        .await
        .context("Failed to register bot commands")?;

    let transport = Arc::new(TelegramTransport::new(bot.clone()));
    let router = Arc::new(Router::new(transport.clone(), sheets, settings));

    // Setup handlers
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router, transport])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_sheets(settings: &Settings) -> Arc<GoogleSheets> {
    match GoogleSheets::from_file(
        &settings.google_credentials_path,
        settings.spreadsheet_id.clone(),
    ) {
        Ok(s) => {
            info!("Google Sheets client initialized.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to initialize Google Sheets client: {}", e);
            std::process::exit(1);
        }
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(dptree::endpoint(handle_message)),
        )
}

async fn handle_callback(
    q: CallbackQuery,
    router: Arc<Router>,
    transport: Arc<TelegramTransport>,
) -> Result<(), teloxide::RequestError> {
    // Stop the client-side button spinner before any routing work.
    transport.answer(&q).await;

    let Some(payload) = q.data.clone() else {
        return respond(());
    };
    let user = telegram::user_of_query(&q);
    let origin = telegram::origin_of_query(&q);
    let chat = origin.map_or(ChatRef(user.id), |m| m.chat);

    if let Err(e) = router
        .dispatch(&user, chat, Inbound::Button { payload, origin })
        .await
    {
        error!("Failed to handle callback from {}: {}", user.id, e);
    }
    respond(())
}

async fn handle_command(
    msg: Message,
    cmd: Command,
    router: Arc<Router>,
) -> Result<(), teloxide::RequestError> {
    let user = telegram::user_of_message(&msg);
    if user.id == 0 {
        return respond(());
    }
    let chat = ChatRef(msg.chat.id.0);

    let outcome = match cmd {
        Command::Start => router.command_start(&user, chat).await,
        Command::Admin => router.command_admin(&user, chat).await,
        Command::Help => router.command_help(chat).await,
    };
    if let Err(e) = outcome {
        error!("Failed to handle command from {}: {}", user.id, e);
    }
    respond(())
}

async fn handle_message(msg: Message, router: Arc<Router>) -> Result<(), teloxide::RequestError> {
    let user = telegram::user_of_message(&msg);
    if user.id == 0 {
        return respond(());
    }
    let chat = ChatRef(msg.chat.id.0);
    let inbound = telegram::classify_message(&msg);

    if let Err(e) = router.dispatch(&user, chat, inbound).await {
        error!("Failed to handle message from {}: {}", user.id, e);
    }
    respond(())
}
