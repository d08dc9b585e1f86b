//! Event dialogs
//!
//! [`OrganizeEvent`] collects an event over six steps and appends it to the
//! chosen track's worksheet after an explicit confirmation. [`BrowseEvents`]
//! asks for a track, sends that worksheet's events as summary cards, and
//! serves detail views from the snapshot kept in the session, so concurrent
//! browsers never see each other's lists.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::{Buttons, ChoiceOption, Dialog, DialogCx, Step, Terminal};
use crate::bot::state::{DialogKind, DialogPos, EventKind, EventRecord};
use crate::bot::views;
use crate::sheets::SheetsError;
use crate::transport::{Parse, TransportError};

const EVENT_TYPE: &str = "event_type";
const EVENT_NAME: &str = "event_name";
const EVENT_DATE: &str = "event_date";
const EVENT_PLACE: &str = "event_place";
const EVENT_DESCRIPTION: &str = "event_description";
const EVENT_EXTRA_INFO: &str = "event_extra_info";
const VIEW_KIND: &str = "view_kind";

static ORGANIZE_STEPS: &[Step] = &[
    Step {
        field: EVENT_TYPE,
        prompt: "Выберите тип мероприятия:",
        buttons: Buttons::Choice(&[&[
            ChoiceOption {
                label: "Официальное мероприятие",
                payload: "event_type_official",
            },
            ChoiceOption {
                label: "Неофициальное мероприятие",
                payload: "event_type_unofficial",
            },
        ]]),
        skippable: false,
    },
    Step {
        field: EVENT_NAME,
        prompt: "Введите название мероприятия:",
        buttons: Buttons::None,
        skippable: false,
    },
    Step {
        field: EVENT_DATE,
        prompt: "Введите дату и время мероприятия:",
        buttons: Buttons::Cancel,
        skippable: false,
    },
    Step {
        field: EVENT_PLACE,
        prompt: "Введите место проведения мероприятия:",
        buttons: Buttons::Cancel,
        skippable: false,
    },
    Step {
        field: EVENT_DESCRIPTION,
        prompt: "Введите краткое описание мероприятия:",
        buttons: Buttons::Cancel,
        skippable: false,
    },
    Step {
        field: EVENT_EXTRA_INFO,
        prompt: "Введите дополнительную информацию о мероприятии (по желанию):",
        buttons: Buttons::CancelSkip,
        skippable: true,
    },
];

static BROWSE_STEPS: &[Step] = &[Step {
    field: VIEW_KIND,
    prompt: "Выберите тип мероприятий:",
    buttons: Buttons::Choice(&[
        &[ChoiceOption {
            label: "Узнать про официальные мероприятия",
            payload: "view_official_events",
        }],
        &[ChoiceOption {
            label: "Узнать про неофициальные мероприятия",
            payload: "view_unofficial_events",
        }],
        &[ChoiceOption {
            label: "Назад",
            payload: views::CANCEL_TO_MENU,
        }],
    ]),
    skippable: false,
}];

/// The six-step event registration, ending in a confirmation
pub struct OrganizeEvent;

#[async_trait]
impl Dialog for OrganizeEvent {
    fn kind(&self) -> DialogKind {
        DialogKind::OrganizeEvent
    }

    fn steps(&self) -> &'static [Step] {
        ORGANIZE_STEPS
    }

    async fn finish(
        &self,
        cx: &DialogCx<'_>,
        fields: &HashMap<&'static str, String>,
    ) -> Result<Terminal, TransportError> {
        let field = |name: &str| fields.get(name).map_or("", String::as_str);
        let summary = views::event_confirmation(
            field(EVENT_NAME),
            field(EVENT_DATE),
            field(EVENT_PLACE),
            field(EVENT_DESCRIPTION),
            field(EVENT_EXTRA_INFO),
        );
        match cx.origin {
            Some(origin) => {
                cx.transport
                    .edit_message(origin, &summary, Some(views::confirm_keyboard()), Parse::Plain)
                    .await?;
            }
            None => {
                cx.transport
                    .send_message(cx.chat, &summary, Some(views::confirm_keyboard()), Parse::Plain)
                    .await?;
            }
        }
        Ok(Terminal::Continue(DialogPos::Confirming))
    }
}

/// What the confirmation controls decided
#[derive(Debug, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The event row was appended; the session should be dropped
    Registered,
    /// The user declined; drop the session and reshow the menu
    Declined,
    /// Nothing decided yet; the session stays at the confirmation
    Pending,
}

/// Handles a button press while an organized event awaits confirmation
pub async fn handle_confirm(
    cx: &DialogCx<'_>,
    fields: &HashMap<&'static str, String>,
    payload: &str,
) -> Result<ConfirmOutcome, TransportError> {
    match payload {
        views::CONFIRM_YES => append_confirmed(cx, fields).await,
        views::CONFIRM_NO => {
            respond(cx, views::event_declined(), Parse::Plain).await?;
            Ok(ConfirmOutcome::Declined)
        }
        _ => {
            cx.transport
                .send_message(cx.chat, views::select_keyboard_option(), None, Parse::Plain)
                .await?;
            Ok(ConfirmOutcome::Pending)
        }
    }
}

async fn append_confirmed(
    cx: &DialogCx<'_>,
    fields: &HashMap<&'static str, String>,
) -> Result<ConfirmOutcome, TransportError> {
    let field = |name: &str| fields.get(name).map_or("", String::as_str);
    // Anything but a recorded official choice lands on the unofficial track
    let kind =
        EventKind::from_payload(field(EVENT_TYPE)).unwrap_or(EventKind::Unofficial);
    let username = cx
        .user
        .username
        .clone()
        .unwrap_or_else(|| "без username".to_string());
    let row = vec![
        field(EVENT_NAME).to_string(),
        field(EVENT_DATE).to_string(),
        field(EVENT_PLACE).to_string(),
        field(EVENT_DESCRIPTION).to_string(),
        field(EVENT_EXTRA_INFO).to_string(),
        username,
    ];

    if let Err(error) = cx.sheets.append_row(kind.worksheet(), &row).await {
        error!(%error, worksheet = kind.worksheet(), "failed to append event row");
        cx.transport
            .send_message(cx.chat, views::event_save_failed(), None, Parse::Plain)
            .await?;
        return Ok(ConfirmOutcome::Pending);
    }

    info!(user_id = cx.user.id, worksheet = kind.worksheet(), "event registered");
    respond(cx, views::event_registered(), Parse::Plain).await?;
    Ok(ConfirmOutcome::Registered)
}

/// The one-step event browser
pub struct BrowseEvents;

#[async_trait]
impl Dialog for BrowseEvents {
    fn kind(&self) -> DialogKind {
        DialogKind::BrowseEvents
    }

    fn steps(&self) -> &'static [Step] {
        BROWSE_STEPS
    }

    async fn finish(
        &self,
        cx: &DialogCx<'_>,
        fields: &HashMap<&'static str, String>,
    ) -> Result<Terminal, TransportError> {
        let choice = fields.get(VIEW_KIND).map_or("", String::as_str);
        let Some(kind) = EventKind::from_payload(choice) else {
            warn!(choice, "browse finished without a recognized track");
            return Ok(Terminal::Close);
        };

        let events = match fetch_events(cx, kind).await {
            Ok(events) => events,
            Err(error) => {
                error!(%error, worksheet = kind.worksheet(), "failed to fetch events");
                report_browse_failure(cx).await;
                return Ok(Terminal::Close);
            }
        };
        if events.is_empty() {
            info!(worksheet = kind.worksheet(), "no events to list");
            respond(cx, views::no_events(), Parse::Plain).await?;
            return Ok(Terminal::Close);
        }

        if let Err(error) = send_summaries(cx, &events).await {
            error!(%error, "failed to send event summaries");
            report_browse_failure(cx).await;
            return Ok(Terminal::Close);
        }
        Ok(Terminal::Continue(DialogPos::Browsing(events)))
    }
}

/// Serves a detail press against the session's browse snapshot
pub async fn handle_detail(
    cx: &DialogCx<'_>,
    events: &[EventRecord],
    payload: &str,
) -> Result<(), TransportError> {
    let shown = payload
        .strip_prefix(views::EVENT_DETAIL_PREFIX)
        .and_then(|raw| raw.parse::<usize>().ok())
        .and_then(|index| events.get(index));
    let Some(event) = shown else {
        warn!(payload, "event detail request out of range");
        cx.transport
            .send_message(cx.chat, views::event_not_found(), None, Parse::Plain)
            .await?;
        return Ok(());
    };
    // The edit drops the detail button along with the summary text
    respond(cx, &views::event_detail(event), Parse::Html).await
}

async fn fetch_events(
    cx: &DialogCx<'_>,
    kind: EventKind,
) -> Result<Vec<EventRecord>, SheetsError> {
    let rows = cx.sheets.read_all_rows(kind.worksheet()).await?;
    let events = rows
        .iter()
        .skip(1) // header row
        .enumerate()
        .filter_map(|(index, row)| {
            let record = EventRecord::from_row(row);
            if record.is_none() {
                warn!(index, "skipping event row with insufficient columns");
            }
            record
        })
        .collect();
    Ok(events)
}

async fn send_summaries(cx: &DialogCx<'_>, events: &[EventRecord]) -> Result<(), TransportError> {
    for (index, event) in events.iter().enumerate() {
        cx.transport
            .send_message(
                cx.chat,
                &views::event_summary(event),
                Some(views::detail_keyboard(index)),
                Parse::Html,
            )
            .await?;
    }
    respond(cx, views::events_listed(), Parse::Plain).await
}

async fn report_browse_failure(cx: &DialogCx<'_>) {
    if let Err(error) = respond(cx, views::events_failed(), Parse::Plain).await {
        warn!(%error, "failed to report the browse failure");
    }
}

/// Edits the pressed control when there is one, sends a message otherwise
async fn respond(cx: &DialogCx<'_>, text: &str, parse: Parse) -> Result<(), TransportError> {
    match cx.origin {
        Some(origin) => cx.transport.edit_message(origin, text, None, parse).await,
        None => cx
            .transport
            .send_message(cx.chat, text, None, parse)
            .await
            .map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::registry::MembershipRegistry;
    use crate::config::Settings;
    use crate::sheets::MockSheetsClient;
    use crate::transport::{ChatRef, MessageRef, MockTransport, UserRef};

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

    fn user() -> UserRef {
        UserRef {
            id: 5,
            username: Some("anna".to_string()),
        }
    }

    fn origin() -> Option<MessageRef> {
        Some(MessageRef { chat: ChatRef(5), id: 77 })
    }

    fn cx<'a>(
        transport: &'a MockTransport,
        sheets: &'a MockSheetsClient,
        members: &'a MembershipRegistry,
        settings: &'a Settings,
        user: &'a UserRef,
        origin: Option<MessageRef>,
    ) -> DialogCx<'a> {
        DialogCx {
            transport,
            sheets,
            members,
            settings,
            user,
            chat: ChatRef(5),
            origin,
        }
    }

    fn organize_fields() -> HashMap<&'static str, String> {
        HashMap::from([
            (EVENT_TYPE, "event_type_official".to_string()),
            (EVENT_NAME, "Квест".to_string()),
            (EVENT_DATE, "10.10.2025 18:00".to_string()),
            (EVENT_PLACE, "Двор".to_string()),
            (EVENT_DESCRIPTION, "Игра по станциям".to_string()),
            (EVENT_EXTRA_INFO, String::new()),
        ])
    }

    fn event_row(name: &str) -> Vec<String> {
        vec![
            name.to_string(),
            "10.10.2025 18:00".to_string(),
            "Двор".to_string(),
            "Игра".to_string(),
            String::new(),
            "anna".to_string(),
        ]
    }

    #[test]
    fn test_step_tables_parse_back() {
        assert_eq!(ORGANIZE_STEPS.len(), 6);
        assert!(ORGANIZE_STEPS[5].skippable);
        let Buttons::Choice(rows) = ORGANIZE_STEPS[0].buttons else {
            panic!("event type step must offer choices");
        };
        for option in rows.iter().flat_map(|row| row.iter()) {
            assert!(EventKind::from_payload(option.payload).is_some());
        }

        assert_eq!(BROWSE_STEPS.len(), 1);
        let Buttons::Choice(rows) = BROWSE_STEPS[0].buttons else {
            panic!("browse step must offer choices");
        };
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2][0].payload, views::CANCEL_TO_MENU);
    }

    #[tokio::test]
    async fn test_organize_finish_edits_into_confirmation() {
        let mut transport = MockTransport::new();
        transport
            .expect_edit_message()
            .withf(|msg, text, markup, _| {
                msg.id == 77
                    && text.contains("🔹 Название: Квест")
                    && text.contains("ℹ️ Доп. информация: —")
                    && text.ends_with("Подтвердить мероприятие?")
                    && markup.is_some()
            })
            .once()
            .returning(|_, _, _, _| Ok(()));
        let sheets = MockSheetsClient::new();
        let members = MembershipRegistry::new(1);
        let settings = settings();
        let user = user();
        let cx = cx(&transport, &sheets, &members, &settings, &user, origin());

        let terminal = OrganizeEvent
            .finish(&cx, &organize_fields())
            .await
            .expect("finish");
        assert_eq!(terminal, Terminal::Continue(DialogPos::Confirming));
    }

    #[tokio::test]
    async fn test_confirm_yes_appends_and_closes() {
        let mut transport = MockTransport::new();
        transport
            .expect_edit_message()
            .withf(|_, text, _, _| text == views::event_registered())
            .once()
            .returning(|_, _, _, _| Ok(()));
        let mut sheets = MockSheetsClient::new();
        sheets
            .expect_append_row()
            .withf(|worksheet, row| {
                worksheet == "Мероприятия официальные"
                    && row.len() == 6
                    && row[0] == "Квест"
                    && row[4].is_empty()
                    && row[5] == "anna"
            })
            .once()
            .returning(|_, _| Ok(()));
        let members = MembershipRegistry::new(1);
        let settings = settings();
        let user = user();
        let cx = cx(&transport, &sheets, &members, &settings, &user, origin());

        let outcome = handle_confirm(&cx, &organize_fields(), views::CONFIRM_YES)
            .await
            .expect("confirm");
        assert_eq!(outcome, ConfirmOutcome::Registered);
    }

    #[tokio::test]
    async fn test_confirm_yes_without_username_writes_placeholder() {
        let mut transport = MockTransport::new();
        transport
            .expect_edit_message()
            .once()
            .returning(|_, _, _, _| Ok(()));
        let mut sheets = MockSheetsClient::new();
        sheets
            .expect_append_row()
            .withf(|_, row| row[5] == "без username")
            .once()
            .returning(|_, _| Ok(()));
        let members = MembershipRegistry::new(1);
        let settings = settings();
        let user = UserRef { id: 5, username: None };
        let cx = cx(&transport, &sheets, &members, &settings, &user, origin());

        let outcome = handle_confirm(&cx, &organize_fields(), views::CONFIRM_YES)
            .await
            .expect("confirm");
        assert_eq!(outcome, ConfirmOutcome::Registered);
    }

    #[tokio::test]
    async fn test_confirm_yes_append_failure_keeps_confirmation() {
        let mut transport = MockTransport::new();
        transport
            .expect_send_message()
            .withf(|_, text, _, _| text == views::event_save_failed())
            .once()
            .returning(|chat, _, _, _| Ok(MessageRef { chat, id: 10 }));
        let mut sheets = MockSheetsClient::new();
        sheets
            .expect_append_row()
            .once()
            .returning(|_, _| Err(SheetsError::Token("boom".to_string())));
        let members = MembershipRegistry::new(1);
        let settings = settings();
        let user = user();
        let cx = cx(&transport, &sheets, &members, &settings, &user, origin());

        let outcome = handle_confirm(&cx, &organize_fields(), views::CONFIRM_YES)
            .await
            .expect("confirm");
        assert_eq!(outcome, ConfirmOutcome::Pending);
    }

    #[tokio::test]
    async fn test_confirm_no_declines() {
        let mut transport = MockTransport::new();
        transport
            .expect_edit_message()
            .withf(|_, text, _, _| text == views::event_declined())
            .once()
            .returning(|_, _, _, _| Ok(()));
        let sheets = MockSheetsClient::new();
        let members = MembershipRegistry::new(1);
        let settings = settings();
        let user = user();
        let cx = cx(&transport, &sheets, &members, &settings, &user, origin());

        let outcome = handle_confirm(&cx, &organize_fields(), views::CONFIRM_NO)
            .await
            .expect("confirm");
        assert_eq!(outcome, ConfirmOutcome::Declined);
    }

    #[tokio::test]
    async fn test_confirm_stray_payload_stays_pending() {
        let mut transport = MockTransport::new();
        transport
            .expect_send_message()
            .withf(|_, text, _, _| text == views::select_keyboard_option())
            .once()
            .returning(|chat, _, _, _| Ok(MessageRef { chat, id: 10 }));
        let sheets = MockSheetsClient::new();
        let members = MembershipRegistry::new(1);
        let settings = settings();
        let user = user();
        let cx = cx(&transport, &sheets, &members, &settings, &user, origin());

        let outcome = handle_confirm(&cx, &organize_fields(), "male")
            .await
            .expect("confirm");
        assert_eq!(outcome, ConfirmOutcome::Pending);
    }

    #[tokio::test]
    async fn test_browse_lists_events_and_snapshots_them() {
        let mut transport = MockTransport::new();
        transport
            .expect_send_message()
            .withf(|_, text, markup, parse| {
                text.starts_with("<b>") && markup.is_some() && *parse == Parse::Html
            })
            .times(2)
            .returning(|chat, _, _, _| Ok(MessageRef { chat, id: 10 }));
        transport
            .expect_edit_message()
            .withf(|_, text, _, _| text == views::events_listed())
            .once()
            .returning(|_, _, _, _| Ok(()));
        let mut sheets = MockSheetsClient::new();
        sheets
            .expect_read_all_rows()
            .withf(|worksheet| worksheet == "Мероприятия неофициальные")
            .once()
            .returning(|_| {
                Ok(vec![
                    vec!["Название".to_string(), "Дата".to_string()],
                    event_row("Квест"),
                    vec!["обрезанная".to_string()],
                    event_row("Поход"),
                ])
            });
        let members = MembershipRegistry::new(1);
        let settings = settings();
        let user = user();
        let cx = cx(&transport, &sheets, &members, &settings, &user, origin());

        let fields = HashMap::from([(VIEW_KIND, "view_unofficial_events".to_string())]);
        let terminal = BrowseEvents.finish(&cx, &fields).await.expect("finish");
        let Terminal::Continue(DialogPos::Browsing(events)) = terminal else {
            panic!("browse must snapshot the listed events");
        };
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "Квест");
        assert_eq!(events[1].name, "Поход");
    }

    #[tokio::test]
    async fn test_browse_fetch_failure_reports_and_closes() {
        let mut transport = MockTransport::new();
        transport
            .expect_edit_message()
            .withf(|_, text, _, _| text == views::events_failed())
            .once()
            .returning(|_, _, _, _| Ok(()));
        let mut sheets = MockSheetsClient::new();
        sheets
            .expect_read_all_rows()
            .once()
            .returning(|_| Err(SheetsError::Token("expired".to_string())));
        let members = MembershipRegistry::new(1);
        let settings = settings();
        let user = user();
        let cx = cx(&transport, &sheets, &members, &settings, &user, origin());

        let fields = HashMap::from([(VIEW_KIND, "view_official_events".to_string())]);
        let terminal = BrowseEvents.finish(&cx, &fields).await.expect("finish");
        assert_eq!(terminal, Terminal::Close);
    }

    #[tokio::test]
    async fn test_browse_empty_worksheet_reports_no_events() {
        let mut transport = MockTransport::new();
        transport
            .expect_edit_message()
            .withf(|_, text, _, _| text == views::no_events())
            .once()
            .returning(|_, _, _, _| Ok(()));
        let mut sheets = MockSheetsClient::new();
        sheets
            .expect_read_all_rows()
            .once()
            .returning(|_| Ok(vec![vec!["Название".to_string()]]));
        let members = MembershipRegistry::new(1);
        let settings = settings();
        let user = user();
        let cx = cx(&transport, &sheets, &members, &settings, &user, origin());

        let fields = HashMap::from([(VIEW_KIND, "view_official_events".to_string())]);
        let terminal = BrowseEvents.finish(&cx, &fields).await.expect("finish");
        assert_eq!(terminal, Terminal::Close);
    }

    #[tokio::test]
    async fn test_detail_edits_summary_into_detail() {
        let mut transport = MockTransport::new();
        transport
            .expect_edit_message()
            .withf(|msg, text, markup, parse| {
                msg.id == 77
                    && text.contains("<b>Организатор:</b> @anna")
                    && markup.is_none()
                    && *parse == Parse::Html
            })
            .once()
            .returning(|_, _, _, _| Ok(()));
        let sheets = MockSheetsClient::new();
        let members = MembershipRegistry::new(1);
        let settings = settings();
        let user = user();
        let cx = cx(&transport, &sheets, &members, &settings, &user, origin());

        let events: Vec<EventRecord> = [event_row("Квест"), event_row("Поход")]
            .iter()
            .filter_map(|row| EventRecord::from_row(row))
            .collect();
        handle_detail(&cx, &events, "event_detail_1")
            .await
            .expect("detail");
    }

    #[tokio::test]
    async fn test_detail_out_of_range_reports_not_found() {
        let mut transport = MockTransport::new();
        transport
            .expect_send_message()
            .withf(|_, text, _, _| text == views::event_not_found())
            .once()
            .returning(|chat, _, _, _| Ok(MessageRef { chat, id: 10 }));
        let sheets = MockSheetsClient::new();
        let members = MembershipRegistry::new(1);
        let settings = settings();
        let user = user();
        let cx = cx(&transport, &sheets, &members, &settings, &user, origin());

        let events: Vec<EventRecord> = [event_row("Квест")]
            .iter()
            .filter_map(|row| EventRecord::from_row(row))
            .collect();
        handle_detail(&cx, &events, "event_detail_9")
            .await
            .expect("detail");
    }
}
