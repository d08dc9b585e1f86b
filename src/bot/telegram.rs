//! Telegram adapter
//!
//! Binds the [`Transport`] seam to the Telegram Bot API via teloxide and
//! classifies raw updates into [`Inbound`] interactions for the router.

use crate::transport::{
    ChatRef, Inbound, Markup, MediaRef, MessageRef, Parse, Transport, TransportError, UserRef,
};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, KeyboardButton,
    KeyboardMarkup, KeyboardRemove, MessageId, ParseMode, ReplyMarkup,
};
use teloxide::utils::command::BotCommands;
use tracing::warn;

/// Commands registered in the Telegram command menu
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    /// Reset to the main menu
    #[command(description = "📝 Подать заявку")]
    Start,
    /// Switch an administrator to the management keyboard
    #[command(description = "👨‍💼 Руководитель")]
    Admin,
    /// Show the reference text
    #[command(description = "ℹ️ Полезная информация")]
    Help,
}

/// Telegram rejects message texts longer than 4096 characters
const MESSAGE_TEXT_LIMIT: usize = 4000;

/// [`Transport`] backed by the Telegram Bot API
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Wrap a configured bot handle
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Acknowledge a callback query so the client stops the button spinner
    pub async fn answer(&self, q: &CallbackQuery) {
        if let Err(e) = self.bot.answer_callback_query(q.id.clone()).await {
            warn!("Failed to answer callback query: {}", e);
        }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_message(
        &self,
        chat: ChatRef,
        text: &str,
        markup: Option<Markup>,
        parse: Parse,
    ) -> Result<MessageRef, TransportError> {
        let mut req = self.bot.send_message(ChatId(chat.0), clamp_text(text));
        if parse == Parse::Html {
            req = req.parse_mode(ParseMode::Html);
        }
        if let Some(markup) = markup {
            req = req.reply_markup(reply_markup_of(markup));
        }
        let sent = req.await?;
        Ok(MessageRef {
            chat,
            id: sent.id.0,
        })
    }

    async fn edit_message(
        &self,
        msg: MessageRef,
        text: &str,
        markup: Option<Markup>,
        parse: Parse,
    ) -> Result<(), TransportError> {
        let mut req =
            self.bot
                .edit_message_text(ChatId(msg.chat.0), MessageId(msg.id), clamp_text(text));
        if parse == Parse::Html {
            req = req.parse_mode(ParseMode::Html);
        }
        // editMessageText only carries inline keyboards; omitting the markup
        // clears whatever inline keyboard the message had.
        if let Some(Markup::Inline(rows)) = markup {
            req = req.reply_markup(inline_markup_of(rows));
        }
        req.await?;
        Ok(())
    }

    async fn strip_markup(&self, msg: MessageRef) -> Result<(), TransportError> {
        self.bot
            .edit_message_reply_markup(ChatId(msg.chat.0), MessageId(msg.id))
            .await?;
        Ok(())
    }

    async fn send_media<'a>(
        &self,
        chat: ChatRef,
        media: &MediaRef,
        caption: Option<&'a str>,
    ) -> Result<(), TransportError> {
        let chat = ChatId(chat.0);
        match media {
            MediaRef::Photo(id) => {
                let mut req = self.bot.send_photo(chat, file_by_id(id));
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                req.await?;
            }
            MediaRef::Video(id) => {
                let mut req = self.bot.send_video(chat, file_by_id(id));
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                req.await?;
            }
            MediaRef::Document(id) => {
                let mut req = self.bot.send_document(chat, file_by_id(id));
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                req.await?;
            }
        }
        Ok(())
    }
}

/// Classify a raw Telegram message into a transport-neutral [`Inbound`]
#[must_use]
pub fn classify_message(msg: &Message) -> Inbound {
    if let Some(text) = msg.text() {
        return Inbound::Text(text.to_string());
    }
    let caption = msg.caption().map(ToString::to_string);
    // Telegram lists photo renditions smallest first; relay the largest.
    if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        return Inbound::Media {
            media: MediaRef::Photo(photo.file.id.0.clone()),
            caption,
        };
    }
    if let Some(video) = msg.video() {
        return Inbound::Media {
            media: MediaRef::Video(video.file.id.0.clone()),
            caption,
        };
    }
    if let Some(document) = msg.document() {
        return Inbound::Media {
            media: MediaRef::Document(document.file.id.0.clone()),
            caption,
        };
    }
    Inbound::Unsupported
}

/// Identify the sender of a message
///
/// Channel posts and other service updates carry no sender; those map to the
/// anonymous id 0, which never matches a registered user.
#[must_use]
pub fn user_of_message(msg: &Message) -> UserRef {
    msg.from.as_ref().map_or(
        UserRef {
            id: 0,
            username: None,
        },
        |u| UserRef {
            id: u.id.0.cast_signed(),
            username: u.username.clone(),
        },
    )
}

/// Identify the sender of a callback query
#[must_use]
pub fn user_of_query(q: &CallbackQuery) -> UserRef {
    UserRef {
        id: q.from.id.0.cast_signed(),
        username: q.from.username.clone(),
    }
}

/// Locate the message a pressed button was attached to, when still accessible
#[must_use]
pub fn origin_of_query(q: &CallbackQuery) -> Option<MessageRef> {
    q.message.as_ref().map(|m| MessageRef {
        chat: ChatRef(m.chat().id.0),
        id: m.id().0,
    })
}

fn clamp_text(text: &str) -> String {
    if text.chars().count() <= MESSAGE_TEXT_LIMIT {
        return text.to_string();
    }
    let mut clamped = crate::utils::truncate_str(text, MESSAGE_TEXT_LIMIT);
    clamped.push('…');
    clamped
}

fn reply_markup_of(markup: Markup) -> ReplyMarkup {
    match markup {
        Markup::Reply(rows) => {
            let rows = rows
                .into_iter()
                .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>());
            ReplyMarkup::Keyboard(KeyboardMarkup::new(rows).resize_keyboard())
        }
        Markup::Inline(rows) => ReplyMarkup::InlineKeyboard(inline_markup_of(rows)),
        Markup::RemoveKeyboard => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
    }
}

fn inline_markup_of(rows: Vec<Vec<(String, String)>>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.into_iter().map(|row| {
        row.into_iter()
            .map(|(label, payload)| InlineKeyboardButton::callback(label, payload))
            .collect::<Vec<_>>()
    }))
}

fn file_by_id(id: &str) -> InputFile {
    InputFile::file_id(FileId(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    #[test]
    fn test_commands_parse_lowercase() {
        let cmd = Command::parse("/start", "magistr_bot").expect("command should parse");
        assert!(matches!(cmd, Command::Start));
        let cmd = Command::parse("/admin", "magistr_bot").expect("command should parse");
        assert!(matches!(cmd, Command::Admin));
    }

    #[test]
    fn test_reply_markup_resizes_keyboard() {
        let markup = reply_markup_of(Markup::Reply(vec![
            vec!["📅 Организовать мероприятие".to_string()],
            vec!["📋 Узнать мероприятия".to_string()],
        ]));
        let ReplyMarkup::Keyboard(kb) = markup else {
            panic!("expected a reply keyboard");
        };
        assert!(kb.resize_keyboard);
        assert_eq!(kb.keyboard.len(), 2);
        assert_eq!(kb.keyboard[0][0].text, "📅 Организовать мероприятие");
    }

    #[test]
    fn test_inline_markup_carries_payloads() {
        let markup =
            inline_markup_of(vec![vec![("✅ Да".to_string(), "confirm_yes".to_string())]]);
        let button = &markup.inline_keyboard[0][0];
        assert_eq!(button.text, "✅ Да");
        assert!(matches!(
            &button.kind,
            InlineKeyboardButtonKind::CallbackData(payload) if payload == "confirm_yes"
        ));
    }

    #[test]
    fn test_remove_keyboard_variant() {
        let markup = reply_markup_of(Markup::RemoveKeyboard);
        assert!(matches!(markup, ReplyMarkup::KeyboardRemove(_)));
    }

    #[test]
    fn test_clamp_text_leaves_short_text_alone() {
        assert_eq!(clamp_text("Привет"), "Привет");
    }

    #[test]
    fn test_clamp_text_caps_long_text() {
        let long = "я".repeat(5000);
        let clamped = clamp_text(&long);
        assert_eq!(clamped.chars().count(), MESSAGE_TEXT_LIMIT + 1);
        assert!(clamped.ends_with('…'));
    }
}
