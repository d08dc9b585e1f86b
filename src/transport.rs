//! Messaging transport seam
//!
//! Domain code talks to the messenger through the [`Transport`] trait and the
//! small wire types here; the concrete Telegram adapter lives in
//! `bot::telegram`. Tests substitute the trait with mocks or recording fakes.

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a transport adapter
#[derive(Error, Debug)]
pub enum TransportError {
    /// Messenger API rejected or failed the call
    #[error("telegram api error: {0}")]
    Api(#[from] teloxide::RequestError),
    /// Delivery failed for a reason the adapter could only describe
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// A chat the bot can write to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatRef(pub i64);

/// A concrete message the bot previously sent or received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    /// Chat the message lives in
    pub chat: ChatRef,
    /// Messenger-assigned message identifier
    pub id: i32,
}

/// The interacting user as seen by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    /// Stable user identifier
    pub id: i64,
    /// Public username, if the user has one
    pub username: Option<String>,
}

/// Text rendering mode for outgoing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parse {
    /// Verbatim text, no markup interpretation
    Plain,
    /// Telegram-flavored HTML
    Html,
}

/// Keyboard attached to an outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    /// Persistent reply keyboard; rows of button labels
    Reply(Vec<Vec<String>>),
    /// Inline keyboard; rows of `(label, callback payload)` pairs
    Inline(Vec<Vec<(String, String)>>),
    /// Remove any persistent reply keyboard
    RemoveKeyboard,
}

/// Media relayed by opaque transport file reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRef {
    /// Photo by file id (largest available rendition)
    Photo(String),
    /// Video by file id
    Video(String),
    /// Document by file id
    Document(String),
}

/// A classified inbound interaction
///
/// Commands are recognized by the transport layer's command filter before
/// classification and never appear here.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// Plain text message
    Text(String),
    /// Inline button press
    Button {
        /// Callback payload carried by the button
        payload: String,
        /// Message the pressed button was attached to, when still accessible
        origin: Option<MessageRef>,
    },
    /// Photo, video, or document, with an optional caption
    Media {
        /// The media reference
        media: MediaRef,
        /// Caption attached to the media
        caption: Option<String>,
    },
    /// Anything the bot does not handle (stickers, voice, locations, ...)
    Unsupported,
}

/// Outbound messaging operations the domain layer needs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a message, returning a reference to it for later edits
    async fn send_message(
        &self,
        chat: ChatRef,
        text: &str,
        markup: Option<Markup>,
        parse: Parse,
    ) -> Result<MessageRef, TransportError>;

    /// Replace the text of an existing message
    ///
    /// Only inline markup can ride an edit; other variants are dropped by the
    /// adapter, which also clears any inline keyboard when `markup` is `None`.
    async fn edit_message(
        &self,
        msg: MessageRef,
        text: &str,
        markup: Option<Markup>,
        parse: Parse,
    ) -> Result<(), TransportError>;

    /// Remove the inline keyboard from an existing message, keeping its text
    async fn strip_markup(&self, msg: MessageRef) -> Result<(), TransportError>;

    /// Send media by transport file reference
    async fn send_media<'a>(
        &self,
        chat: ChatRef,
        media: &MediaRef,
        caption: Option<&'a str>,
    ) -> Result<(), TransportError>;
}
