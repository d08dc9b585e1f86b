//! Update routing
//!
//! One [`Router`] owns every in-memory store and decides, per classified
//! interaction, whether it belongs to a composing broadcast, an active
//! dialog, an approval decision, or the menus. Buttons resolve in a fixed
//! order: admin decisions, the broadcast cancel, the active session, then
//! orphaned controls from dialogs that no longer exist.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::bot::approval;
use crate::bot::broadcast::{self, BroadcastStore, BroadcastTarget};
use crate::bot::registry::MembershipRegistry;
use crate::bot::sessions::SessionStore;
use crate::bot::state::{DialogKind, DialogPos, EventKind, Gender, Role, Session};
use crate::bot::views;
use crate::config::Settings;
use crate::dialog::{self, events, Advance, DialogCx, StepInput, Terminal};
use crate::sheets::SheetsClient;
use crate::transport::{
    ChatRef, Inbound, Markup, MessageRef, Parse, Transport, TransportError, UserRef,
};

/// Central dispatcher for classified updates
pub struct Router {
    transport: Arc<dyn Transport>,
    sheets: Arc<dyn SheetsClient>,
    settings: Arc<Settings>,
    sessions: SessionStore,
    members: MembershipRegistry,
    broadcasts: BroadcastStore,
}

impl Router {
    /// Builds a router; the configured admin starts out approved
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        sheets: Arc<dyn SheetsClient>,
        settings: Arc<Settings>,
    ) -> Self {
        let members = MembershipRegistry::new(settings.admin_id);
        Self {
            transport,
            sheets,
            settings,
            sessions: SessionStore::new(),
            members,
            broadcasts: BroadcastStore::new(),
        }
    }

    /// The membership registry
    #[must_use]
    pub fn members(&self) -> &MembershipRegistry {
        &self.members
    }

    /// The dialog session store
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    fn is_admin(&self, user_id: i64) -> bool {
        user_id == self.settings.admin_id
    }

    /// `/start`: drops any in-flight activity and shows the status menu
    pub async fn command_start(&self, user: &UserRef, chat: ChatRef) -> Result<(), TransportError> {
        self.members.note_username(user).await;
        self.sessions.clear(user.id).await;
        self.broadcasts.disarm(user.id).await;
        info!(user_id = user.id, "start command");
        self.send_menu(user.id, chat, views::greeting()).await
    }

    /// `/admin` and the "👨‍💼 Руководитель" button; silent for everyone else
    pub async fn command_admin(&self, user: &UserRef, chat: ChatRef) -> Result<(), TransportError> {
        if !self.is_admin(user.id) {
            warn!(user_id = user.id, "unauthorized admin mode attempt");
            return Ok(());
        }
        info!(user_id = user.id, "admin mode");
        self.transport
            .send_message(chat, views::admin_mode_active(), None, Parse::Plain)
            .await?;
        self.send_menu(user.id, chat, views::greeting()).await
    }

    /// `/help` and the "ℹ️ Полезная информация" button
    pub async fn command_help(&self, chat: ChatRef) -> Result<(), TransportError> {
        self.transport
            .send_message(chat, views::help_text(), None, Parse::Html)
            .await
            .map(|_| ())
    }

    /// Routes one classified non-command interaction
    pub async fn dispatch(
        &self,
        user: &UserRef,
        chat: ChatRef,
        inbound: Inbound,
    ) -> Result<(), TransportError> {
        self.members.note_username(user).await;
        let interaction = match &inbound {
            Inbound::Text(_) => "text",
            Inbound::Button { .. } => "button",
            Inbound::Media { .. } => "media",
            Inbound::Unsupported => "unsupported",
        };
        debug!(user_id = user.id, interaction, "dispatching");
        match inbound {
            Inbound::Text(ref text) => self.dispatch_text(user, chat, text, &inbound).await,
            Inbound::Button { ref payload, origin } => {
                self.dispatch_button(user, chat, payload, origin).await
            }
            Inbound::Media { .. } | Inbound::Unsupported => {
                self.dispatch_media(user, chat, &inbound).await
            }
        }
    }

    async fn dispatch_text(
        &self,
        user: &UserRef,
        chat: ChatRef,
        text: &str,
        inbound: &Inbound,
    ) -> Result<(), TransportError> {
        if let Some(target) = self.broadcasts.current(user.id).await {
            let channel = ChatRef(target.channel_id(&self.settings));
            return broadcast::relay(
                self.transport.as_ref(),
                &self.broadcasts,
                user.id,
                chat,
                channel,
                inbound,
            )
            .await;
        }
        if let Some(mut session) = self.sessions.get(user.id).await {
            if matches!(session.pos, DialogPos::Collecting(_)) {
                return self
                    .drive_dialog(user, chat, &mut session, StepInput::Text(text), None)
                    .await;
            }
            // confirming and browsing sessions ignore text; the menu may
            // take over and replace them through a dialog entry
        }
        self.menu_text(user, chat, text).await
    }

    async fn menu_text(&self, user: &UserRef, chat: ChatRef, text: &str) -> Result<(), TransportError> {
        let approved = self.members.is_approved(user.id).await;
        let admin = self.is_admin(user.id);
        match text {
            views::BTN_APPLY if !approved => {
                self.enter_dialog(user, chat, DialogKind::Registration).await
            }
            views::BTN_ORGANIZE if approved => {
                self.enter_dialog(user, chat, DialogKind::OrganizeEvent).await
            }
            views::BTN_BROWSE if approved => {
                self.enter_dialog(user, chat, DialogKind::BrowseEvents).await
            }
            views::BTN_ADMIN => self.command_admin(user, chat).await,
            views::BTN_CAST_METHODISTS if admin => {
                self.arm_broadcast(user, chat, BroadcastTarget::Methodists).await
            }
            views::BTN_CAST_CENTER if admin => {
                self.arm_broadcast(user, chat, BroadcastTarget::WholeCenter).await
            }
            views::BTN_FAREWELL if admin => {
                self.transport
                    .send_message(chat, views::farewell_in_development(), None, Parse::Plain)
                    .await
                    .map(|_| ())
            }
            views::BTN_INFO => self.command_help(chat).await,
            _ => {
                self.transport
                    .send_message(chat, views::unrecognized(), None, Parse::Plain)
                    .await
                    .map(|_| ())
            }
        }
    }

    async fn dispatch_button(
        &self,
        user: &UserRef,
        chat: ChatRef,
        payload: &str,
        origin: Option<MessageRef>,
    ) -> Result<(), TransportError> {
        if approval::parse_decision(payload).is_some() && self.is_admin(user.id) {
            return approval::handle_decision(
                self.transport.as_ref(),
                self.sheets.as_ref(),
                &self.members,
                payload,
                origin,
                chat,
            )
            .await;
        }
        if payload == views::CANCEL_ACTION {
            let menu = self.menu_for(user.id).await;
            return broadcast::cancel(
                self.transport.as_ref(),
                &self.broadcasts,
                user.id,
                chat,
                menu,
            )
            .await;
        }
        if let Some(mut session) = self.sessions.get(user.id).await {
            return self
                .session_button(user, chat, payload, origin, &mut session)
                .await;
        }
        self.orphan_button(user, chat, payload, origin).await
    }

    async fn session_button(
        &self,
        user: &UserRef,
        chat: ChatRef,
        payload: &str,
        origin: Option<MessageRef>,
        session: &mut Session,
    ) -> Result<(), TransportError> {
        match &session.pos {
            DialogPos::Collecting(_) => {
                self.drive_dialog(user, chat, session, StepInput::Button { payload }, origin)
                    .await
            }
            DialogPos::Confirming => {
                if payload == views::CANCEL_TO_MENU {
                    return self.cancel_to_menu(user, chat, origin).await;
                }
                let cx = self.cx(user, chat, origin);
                match events::handle_confirm(&cx, &session.fields, payload).await? {
                    events::ConfirmOutcome::Registered => {
                        self.sessions.clear(user.id).await;
                        Ok(())
                    }
                    events::ConfirmOutcome::Declined => {
                        self.sessions.clear(user.id).await;
                        self.send_menu(user.id, chat, views::greeting()).await
                    }
                    events::ConfirmOutcome::Pending => Ok(()),
                }
            }
            DialogPos::Browsing(listed) => {
                if payload == views::CANCEL_TO_MENU {
                    return self.cancel_to_menu(user, chat, origin).await;
                }
                let cx = self.cx(user, chat, origin);
                events::handle_detail(&cx, listed, payload).await
            }
        }
    }

    async fn orphan_button(
        &self,
        user: &UserRef,
        chat: ChatRef,
        payload: &str,
        origin: Option<MessageRef>,
    ) -> Result<(), TransportError> {
        if payload == views::CANCEL_TO_MENU {
            // honored even without a dialog
            return self.cancel_to_menu(user, chat, origin).await;
        }
        if payload.starts_with(views::EVENT_DETAIL_PREFIX) {
            self.transport
                .send_message(chat, views::event_not_found(), None, Parse::Plain)
                .await?;
            return Ok(());
        }
        if is_stale_control(payload) {
            self.transport
                .send_message(chat, views::stale_control(), None, Parse::Plain)
                .await?;
            return Ok(());
        }
        warn!(user_id = user.id, payload, "unhandled callback payload");
        Ok(())
    }

    async fn dispatch_media(
        &self,
        user: &UserRef,
        chat: ChatRef,
        inbound: &Inbound,
    ) -> Result<(), TransportError> {
        if let Some(target) = self.broadcasts.current(user.id).await {
            let channel = ChatRef(target.channel_id(&self.settings));
            return broadcast::relay(
                self.transport.as_ref(),
                &self.broadcasts,
                user.id,
                chat,
                channel,
                inbound,
            )
            .await;
        }
        if let Some(mut session) = self.sessions.get(user.id).await {
            if matches!(session.pos, DialogPos::Collecting(_)) {
                return self
                    .drive_dialog(user, chat, &mut session, StepInput::Other, None)
                    .await;
            }
        }
        self.transport
            .send_message(chat, views::unrecognized(), None, Parse::Plain)
            .await
            .map(|_| ())
    }

    async fn drive_dialog(
        &self,
        user: &UserRef,
        chat: ChatRef,
        session: &mut Session,
        input: StepInput<'_>,
        origin: Option<MessageRef>,
    ) -> Result<(), TransportError> {
        let dialog = dialog::dialog_for(session.kind);
        let cx = self.cx(user, chat, origin);
        match dialog::advance(dialog, &cx, session, input).await? {
            Advance::Prompted => {
                self.sessions.set(session.clone()).await;
                Ok(())
            }
            Advance::Rejected => Ok(()),
            Advance::Cancelled => self.cancel_to_menu(user, chat, origin).await,
            Advance::Finished(Terminal::Close) => {
                self.sessions.clear(user.id).await;
                Ok(())
            }
            Advance::Finished(Terminal::Continue(_)) => {
                self.sessions.set(session.clone()).await;
                Ok(())
            }
        }
    }

    async fn enter_dialog(
        &self,
        user: &UserRef,
        chat: ChatRef,
        kind: DialogKind,
    ) -> Result<(), TransportError> {
        let dialog = dialog::dialog_for(kind);
        let cx = self.cx(user, chat, None);
        let session = dialog::start(dialog, &cx).await?;
        self.sessions.set(session).await;
        info!(user_id = user.id, ?kind, "dialog started");
        Ok(())
    }

    async fn arm_broadcast(
        &self,
        user: &UserRef,
        chat: ChatRef,
        target: BroadcastTarget,
    ) -> Result<(), TransportError> {
        broadcast::arm(self.transport.as_ref(), &self.broadcasts, user.id, chat, target).await
    }

    /// Drops the user's dialog, retires the pressed control, reshows the menu
    async fn cancel_to_menu(
        &self,
        user: &UserRef,
        chat: ChatRef,
        origin: Option<MessageRef>,
    ) -> Result<(), TransportError> {
        self.sessions.clear(user.id).await;
        if let Some(origin) = origin {
            if let Err(error) = self
                .transport
                .edit_message(origin, views::returned_to_menu(), None, Parse::Plain)
                .await
            {
                warn!(%error, "failed to edit the cancelled control");
            }
        }
        self.send_menu(user.id, chat, views::greeting()).await
    }

    async fn send_menu(&self, user_id: i64, chat: ChatRef, text: &str) -> Result<(), TransportError> {
        let menu = self.menu_for(user_id).await;
        self.transport
            .send_message(chat, text, Some(menu), Parse::Plain)
            .await
            .map(|_| ())
    }

    async fn menu_for(&self, user_id: i64) -> Markup {
        views::main_menu(
            self.members.is_approved(user_id).await,
            self.is_admin(user_id),
        )
    }

    fn cx<'a>(
        &'a self,
        user: &'a UserRef,
        chat: ChatRef,
        origin: Option<MessageRef>,
    ) -> DialogCx<'a> {
        DialogCx {
            transport: self.transport.as_ref(),
            sheets: self.sheets.as_ref(),
            members: &self.members,
            settings: self.settings.as_ref(),
            user,
            chat,
            origin,
        }
    }
}

/// Payloads whose dialogs are gone but whose controls may linger in chats
fn is_stale_control(payload: &str) -> bool {
    payload == views::CONFIRM_YES
        || payload == views::CONFIRM_NO
        || payload == views::SKIP_STEP
        || Gender::from_payload(payload).is_some()
        || Role::from_payload(payload).is_some()
        || EventKind::from_payload(payload).is_some()
}
