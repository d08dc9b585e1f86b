//! Step-table dialog engine
//!
//! Each conversation is declared as a static table of [`Step`]s naming the
//! field collected, the prompt, and the controls offered. The engine walks
//! the table, records answers into the [`Session`], and hands the finished
//! field map to the dialog's terminal logic. Dialog definitions stay
//! declarative; delivery rules live here in one place.
//!
//! Prompts after a button press edit the pressed message in place; prompts
//! after typed text go out as fresh messages.

pub mod events;
pub mod registration;

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::warn;

use crate::bot::registry::MembershipRegistry;
use crate::bot::state::{DialogKind, DialogPos, Session};
use crate::bot::views;
use crate::config::Settings;
use crate::sheets::SheetsClient;
use crate::transport::{ChatRef, Markup, MessageRef, Parse, Transport, TransportError, UserRef};

/// One selectable control on a choice step
#[derive(Debug)]
pub struct ChoiceOption {
    /// Button label shown to the user
    pub label: &'static str,
    /// Callback payload, stored verbatim as the field value
    pub payload: &'static str,
}

/// Controls offered with a step prompt
#[derive(Debug, Clone, Copy)]
pub enum Buttons {
    /// No markup at all
    None,
    /// Drop any persistent reply keyboard
    RemoveKeyboard,
    /// A lone return-to-menu control
    Cancel,
    /// Return-to-menu plus skip controls
    CancelSkip,
    /// Inline options; rows of selectable payloads
    Choice(&'static [&'static [ChoiceOption]]),
}

/// One entry of a dialog's step table
#[derive(Debug)]
pub struct Step {
    /// Session field the collected value is stored under
    pub field: &'static str,
    /// Prompt text, rendered as HTML
    pub prompt: &'static str,
    /// Controls offered with the prompt
    pub buttons: Buttons,
    /// Whether the skip control may bypass this step
    pub skippable: bool,
}

/// Shared services and addressing a dialog needs while running
pub struct DialogCx<'a> {
    /// Outbound messaging
    pub transport: &'a dyn Transport,
    /// Spreadsheet backend
    pub sheets: &'a dyn SheetsClient,
    /// Membership registry
    pub members: &'a MembershipRegistry,
    /// Runtime settings
    pub settings: &'a Settings,
    /// The user driving the dialog
    pub user: &'a UserRef,
    /// Chat the dialog runs in
    pub chat: ChatRef,
    /// Message carrying the control the user pressed, when the input was one
    pub origin: Option<MessageRef>,
}

/// What a completed collection phase leaves behind
#[derive(Debug, PartialEq)]
pub enum Terminal {
    /// The dialog is over; its session should be dropped
    Close,
    /// The dialog continues at the given position
    Continue(DialogPos),
}

/// Outcome of feeding one input to the engine
#[derive(Debug, PartialEq)]
pub enum Advance {
    /// Input accepted; the next prompt went out and the session moved
    Prompted,
    /// Input rejected with a corrective nudge; the session is unchanged
    Rejected,
    /// The user pressed the return-to-menu control
    Cancelled,
    /// The last step completed and the dialog's terminal logic ran
    Finished(Terminal),
}

/// A conversation definition the engine can drive
#[async_trait]
pub trait Dialog: Send + Sync {
    /// Which dialog this definition implements
    fn kind(&self) -> DialogKind;

    /// The step table driving the collection phase
    fn steps(&self) -> &'static [Step];

    /// Runs once the last step is answered, with every collected field
    async fn finish(
        &self,
        cx: &DialogCx<'_>,
        fields: &HashMap<&'static str, String>,
    ) -> Result<Terminal, TransportError>;
}

/// User input fed to an active collection step
#[derive(Debug)]
pub enum StepInput<'a> {
    /// Plain message text
    Text(&'a str),
    /// Inline button press
    Button {
        /// Callback payload
        payload: &'a str,
    },
    /// Anything else the transport classified (media, stickers)
    Other,
}

/// Looks up the definition behind a session's dialog kind
#[must_use]
pub fn dialog_for(kind: DialogKind) -> &'static dyn Dialog {
    match kind {
        DialogKind::Registration => &registration::Registration,
        DialogKind::OrganizeEvent => &events::OrganizeEvent,
        DialogKind::BrowseEvents => &events::BrowseEvents,
    }
}

/// Opens a dialog: sends the first prompt and returns the fresh session
pub async fn start(
    dialog: &dyn Dialog,
    cx: &DialogCx<'_>,
) -> Result<Session, TransportError> {
    let session = Session::begin(cx.user.id, dialog.kind());
    if let Some(step) = dialog.steps().first() {
        cx.transport
            .send_message(cx.chat, step.prompt, step_markup(step), Parse::Html)
            .await?;
    }
    Ok(session)
}

/// Feeds one input to the session's current collection step
pub async fn advance(
    dialog: &dyn Dialog,
    cx: &DialogCx<'_>,
    session: &mut Session,
    input: StepInput<'_>,
) -> Result<Advance, TransportError> {
    let DialogPos::Collecting(index) = session.pos else {
        warn!(user_id = cx.user.id, "advance called outside the collection phase");
        return Ok(Advance::Rejected);
    };
    let Some(step) = dialog.steps().get(index) else {
        warn!(user_id = cx.user.id, index, "session position past the step table");
        return Ok(Advance::Rejected);
    };

    match input {
        StepInput::Text(text) => text_input(dialog, cx, session, index, step, text).await,
        StepInput::Button { payload } => {
            button_input(dialog, cx, session, index, step, payload).await
        }
        StepInput::Other => {
            send_corrective(cx, views::text_input_expected()).await?;
            Ok(Advance::Rejected)
        }
    }
}

async fn text_input(
    dialog: &dyn Dialog,
    cx: &DialogCx<'_>,
    session: &mut Session,
    index: usize,
    step: &'static Step,
    text: &str,
) -> Result<Advance, TransportError> {
    if let Buttons::Choice(_) = step.buttons {
        send_corrective(cx, views::select_keyboard_option()).await?;
        return Ok(Advance::Rejected);
    }
    let text = text.trim();
    if text.is_empty() {
        send_corrective(cx, views::text_input_expected()).await?;
        return Ok(Advance::Rejected);
    }
    session.fields.insert(step.field, text.to_string());
    proceed(dialog, cx, session, index).await
}

async fn button_input(
    dialog: &dyn Dialog,
    cx: &DialogCx<'_>,
    session: &mut Session,
    index: usize,
    step: &'static Step,
    payload: &str,
) -> Result<Advance, TransportError> {
    if payload == views::CANCEL_TO_MENU {
        return Ok(Advance::Cancelled);
    }
    if payload == views::SKIP_STEP {
        if !step.skippable {
            send_corrective(cx, views::stale_control()).await?;
            return Ok(Advance::Rejected);
        }
        session.fields.insert(step.field, String::new());
        acknowledge_skip(cx).await;
        return proceed(dialog, cx, session, index).await;
    }
    let Buttons::Choice(rows) = step.buttons else {
        send_corrective(cx, views::text_input_expected()).await?;
        return Ok(Advance::Rejected);
    };
    let listed = rows
        .iter()
        .flat_map(|row| row.iter())
        .find(|option| option.payload == payload);
    let Some(option) = listed else {
        send_corrective(cx, views::invalid_choice()).await?;
        return Ok(Advance::Rejected);
    };
    session.fields.insert(step.field, option.payload.to_string());
    proceed(dialog, cx, session, index).await
}

/// Advances past an answered step: prompts the next one or runs the terminal
async fn proceed(
    dialog: &dyn Dialog,
    cx: &DialogCx<'_>,
    session: &mut Session,
    index: usize,
) -> Result<Advance, TransportError> {
    let next = index + 1;
    if let Some(step) = dialog.steps().get(next) {
        session.pos = DialogPos::Collecting(next);
        prompt_step(cx, step).await?;
        return Ok(Advance::Prompted);
    }
    let terminal = dialog.finish(cx, &session.fields).await?;
    if let Terminal::Continue(pos) = &terminal {
        session.pos = pos.clone();
    }
    Ok(Advance::Finished(terminal))
}

async fn prompt_step(cx: &DialogCx<'_>, step: &Step) -> Result<(), TransportError> {
    let markup = step_markup(step);
    match cx.origin {
        Some(origin) => {
            cx.transport
                .edit_message(origin, step.prompt, markup, Parse::Html)
                .await
        }
        None => cx
            .transport
            .send_message(cx.chat, step.prompt, markup, Parse::Html)
            .await
            .map(|_| ()),
    }
}

/// Edits the pressed skip control into its acknowledgment; never fatal
async fn acknowledge_skip(cx: &DialogCx<'_>) {
    let Some(origin) = cx.origin else {
        return;
    };
    if let Err(error) = cx
        .transport
        .edit_message(origin, views::extra_info_skipped(), None, Parse::Plain)
        .await
    {
        warn!(%error, "failed to acknowledge a skipped step");
    }
}

async fn send_corrective(cx: &DialogCx<'_>, text: &str) -> Result<(), TransportError> {
    cx.transport
        .send_message(cx.chat, text, None, Parse::Plain)
        .await
        .map(|_| ())
}

fn step_markup(step: &Step) -> Option<Markup> {
    match step.buttons {
        Buttons::None => None,
        Buttons::RemoveKeyboard => Some(Markup::RemoveKeyboard),
        Buttons::Cancel => Some(views::cancel_keyboard()),
        Buttons::CancelSkip => Some(views::cancel_or_skip_keyboard()),
        Buttons::Choice(rows) => Some(choice_markup(rows)),
    }
}

fn choice_markup(rows: &[&[ChoiceOption]]) -> Markup {
    Markup::Inline(
        rows.iter()
            .map(|row| {
                row.iter()
                    .map(|option| (option.label.to_string(), option.payload.to_string()))
                    .collect()
            })
            .collect(),
    )
}
