//! Broadcast relay
//!
//! The admin arms a target channel from the menu; the next message they send
//! is relayed verbatim to that channel, media included. One message per
//! arming. Recovery from a failed relay is arming again, never an automatic
//! retry.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::bot::views;
use crate::config::Settings;
use crate::transport::{ChatRef, Inbound, Markup, Parse, Transport, TransportError};

/// Audience channel a composed message is bound for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastTarget {
    /// The methodist channel
    Methodists,
    /// The whole-center channel
    WholeCenter,
}

impl BroadcastTarget {
    /// Chat id of the bound channel
    #[must_use]
    pub const fn channel_id(self, settings: &Settings) -> i64 {
        match self {
            Self::Methodists => settings.methodist_chat_id,
            Self::WholeCenter => settings.camp_chat_id,
        }
    }
}

/// Per-admin composing flags
#[derive(Default)]
pub struct BroadcastStore {
    targets: RwLock<HashMap<i64, BroadcastTarget>>,
}

impl BroadcastStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The user's armed target, if any
    pub async fn current(&self, user_id: i64) -> Option<BroadcastTarget> {
        let targets = self.targets.read().await;
        targets.get(&user_id).copied()
    }

    /// Arms a target for the user, replacing any previous one
    pub async fn arm(&self, user_id: i64, target: BroadcastTarget) {
        let mut targets = self.targets.write().await;
        targets.insert(user_id, target);
    }

    /// Drops whatever the user was composing
    pub async fn disarm(&self, user_id: i64) {
        let mut targets = self.targets.write().await;
        targets.remove(&user_id);
    }
}

/// Arms a composing target and prompts for the message
pub async fn arm(
    transport: &dyn Transport,
    store: &BroadcastStore,
    user_id: i64,
    chat: ChatRef,
    target: BroadcastTarget,
) -> Result<(), TransportError> {
    store.arm(user_id, target).await;
    info!(user_id, ?target, "broadcast composing armed");
    transport
        .send_message(
            chat,
            views::broadcast_prompt(target),
            Some(views::broadcast_cancel_keyboard()),
            Parse::Plain,
        )
        .await
        .map(|_| ())
}

/// Relays one composed message to the armed `channel`
///
/// Consumes the composing mode on every outcome except a message kind the
/// relay cannot forward; for those the admin is told and stays composing.
pub async fn relay(
    transport: &dyn Transport,
    store: &BroadcastStore,
    user_id: i64,
    chat: ChatRef,
    channel: ChatRef,
    inbound: &Inbound,
) -> Result<(), TransportError> {
    let delivered = match inbound {
        Inbound::Text(text) => transport
            .send_message(channel, text, None, Parse::Plain)
            .await
            .map(|_| ()),
        Inbound::Media { media, caption } => {
            transport.send_media(channel, media, caption.as_deref()).await
        }
        Inbound::Button { .. } | Inbound::Unsupported => {
            warn!(user_id, "unsupported message kind while composing");
            transport
                .send_message(chat, views::broadcast_unprocessable(), None, Parse::Plain)
                .await?;
            return Ok(());
        }
    };

    store.disarm(user_id).await;
    match delivered {
        Ok(()) => {
            info!(user_id, channel = channel.0, "broadcast delivered");
            transport
                .send_message(chat, views::broadcast_sent(), None, Parse::Plain)
                .await?;
        }
        Err(error) => {
            error!(%error, channel = channel.0, "failed to relay broadcast");
            transport
                .send_message(chat, views::broadcast_failed(), None, Parse::Plain)
                .await?;
        }
    }
    Ok(())
}

/// Handles the cancel control on a composing prompt
///
/// The prompt itself is left untouched; the confirmation and the menu go out
/// as fresh messages.
pub async fn cancel(
    transport: &dyn Transport,
    store: &BroadcastStore,
    user_id: i64,
    chat: ChatRef,
    menu: Markup,
) -> Result<(), TransportError> {
    store.disarm(user_id).await;
    info!(user_id, "broadcast composing cancelled");
    transport
        .send_message(chat, views::broadcast_cancelled(), None, Parse::Plain)
        .await?;
    transport
        .send_message(chat, views::returning_to_menu(), Some(menu), Parse::Plain)
        .await
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MediaRef, MessageRef, MockTransport};

    const ADMIN_CHAT: ChatRef = ChatRef(1);
    const CHANNEL: ChatRef = ChatRef(-100);

    fn settings() -> Settings {
        Settings {
            telegram_token: "token".to_string(),
            admin_id: 1,
            methodist_chat_id: -100,
            camp_chat_id: -200,
            spreadsheet_id: "sheet".to_string(),
            google_credentials_path: "credentials.json".to_string(),
        }
    }

    fn ok_send(chat: ChatRef) -> Result<MessageRef, TransportError> {
        Ok(MessageRef { chat, id: 10 })
    }

    #[test]
    fn test_targets_map_to_settings_channels() {
        let settings = settings();
        assert_eq!(BroadcastTarget::Methodists.channel_id(&settings), -100);
        assert_eq!(BroadcastTarget::WholeCenter.channel_id(&settings), -200);
    }

    #[tokio::test]
    async fn test_store_arm_current_disarm() {
        let store = BroadcastStore::new();
        assert_eq!(store.current(1).await, None);

        store.arm(1, BroadcastTarget::Methodists).await;
        assert_eq!(store.current(1).await, Some(BroadcastTarget::Methodists));
        assert_eq!(store.current(2).await, None);

        store.arm(1, BroadcastTarget::WholeCenter).await;
        assert_eq!(store.current(1).await, Some(BroadcastTarget::WholeCenter));

        store.disarm(1).await;
        assert_eq!(store.current(1).await, None);
    }

    #[tokio::test]
    async fn test_arm_prompts_with_cancel_control() {
        let mut transport = MockTransport::new();
        transport
            .expect_send_message()
            .withf(|chat, text, markup, _| {
                *chat == ADMIN_CHAT
                    && text == "Введите сообщение для методистов:"
                    && matches!(markup, Some(Markup::Inline(_)))
            })
            .once()
            .returning(|chat, _, _, _| ok_send(chat));
        let store = BroadcastStore::new();

        arm(&transport, &store, 1, ADMIN_CHAT, BroadcastTarget::Methodists)
            .await
            .expect("arm");
        assert_eq!(store.current(1).await, Some(BroadcastTarget::Methodists));
    }

    #[tokio::test]
    async fn test_relay_text_delivers_and_disarms() {
        let mut transport = MockTransport::new();
        transport
            .expect_send_message()
            .withf(|chat, text, _, _| *chat == CHANNEL && text == "Собрание в 10:00")
            .once()
            .returning(|chat, _, _, _| ok_send(chat));
        transport
            .expect_send_message()
            .withf(|chat, text, _, _| *chat == ADMIN_CHAT && text == views::broadcast_sent())
            .once()
            .returning(|chat, _, _, _| ok_send(chat));
        let store = BroadcastStore::new();
        store.arm(1, BroadcastTarget::Methodists).await;

        let inbound = Inbound::Text("Собрание в 10:00".to_string());
        relay(&transport, &store, 1, ADMIN_CHAT, CHANNEL, &inbound)
            .await
            .expect("relay");
        assert_eq!(store.current(1).await, None);
    }

    #[tokio::test]
    async fn test_relay_failure_reports_and_disarms() {
        let mut transport = MockTransport::new();
        transport
            .expect_send_message()
            .withf(|chat, _, _, _| *chat == CHANNEL)
            .once()
            .returning(|_, _, _, _| Err(TransportError::Delivery("kicked".to_string())));
        transport
            .expect_send_message()
            .withf(|chat, text, _, _| *chat == ADMIN_CHAT && text == views::broadcast_failed())
            .once()
            .returning(|chat, _, _, _| ok_send(chat));
        let store = BroadcastStore::new();
        store.arm(1, BroadcastTarget::Methodists).await;

        let inbound = Inbound::Text("Собрание".to_string());
        relay(&transport, &store, 1, ADMIN_CHAT, CHANNEL, &inbound)
            .await
            .expect("relay");
        assert_eq!(store.current(1).await, None);
    }

    #[tokio::test]
    async fn test_relay_media_keeps_caption() {
        let mut transport = MockTransport::new();
        transport
            .expect_send_media()
            .withf(|chat, media, caption| {
                *chat == CHANNEL
                    && matches!(media, MediaRef::Photo(id) if id == "file-1")
                    && *caption == Some("Афиша")
            })
            .once()
            .returning(|_, _, _| Ok(()));
        transport
            .expect_send_message()
            .withf(|_, text, _, _| text == views::broadcast_sent())
            .once()
            .returning(|chat, _, _, _| ok_send(chat));
        let store = BroadcastStore::new();
        store.arm(1, BroadcastTarget::WholeCenter).await;

        let inbound = Inbound::Media {
            media: MediaRef::Photo("file-1".to_string()),
            caption: Some("Афиша".to_string()),
        };
        relay(&transport, &store, 1, ADMIN_CHAT, CHANNEL, &inbound)
            .await
            .expect("relay");
        assert_eq!(store.current(1).await, None);
    }

    #[tokio::test]
    async fn test_relay_unsupported_kind_stays_composing() {
        let mut transport = MockTransport::new();
        transport
            .expect_send_message()
            .withf(|chat, text, _, _| {
                *chat == ADMIN_CHAT && text == views::broadcast_unprocessable()
            })
            .once()
            .returning(|chat, _, _, _| ok_send(chat));
        let store = BroadcastStore::new();
        store.arm(1, BroadcastTarget::Methodists).await;

        relay(&transport, &store, 1, ADMIN_CHAT, CHANNEL, &Inbound::Unsupported)
            .await
            .expect("relay");
        assert_eq!(store.current(1).await, Some(BroadcastTarget::Methodists));
    }

    #[tokio::test]
    async fn test_cancel_sends_two_messages_and_disarms() {
        let mut transport = MockTransport::new();
        transport
            .expect_send_message()
            .withf(|_, text, _, _| text == views::broadcast_cancelled())
            .once()
            .returning(|chat, _, _, _| ok_send(chat));
        transport
            .expect_send_message()
            .withf(|_, text, markup, _| {
                text == views::returning_to_menu() && matches!(markup, Some(Markup::Reply(_)))
            })
            .once()
            .returning(|chat, _, _, _| ok_send(chat));
        let store = BroadcastStore::new();
        store.arm(1, BroadcastTarget::WholeCenter).await;

        cancel(&transport, &store, 1, ADMIN_CHAT, views::main_menu(true, true))
            .await
            .expect("cancel");
        assert_eq!(store.current(1).await, None);
    }
}
