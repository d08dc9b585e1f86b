//! Bot UI components
//!
//! Contains menu keyboards, user-facing texts, and message formatters.
//! Everything the user reads lives here; handlers stay free of literals.

use crate::bot::broadcast::BroadcastTarget;
use crate::bot::registry::PendingApplication;
use crate::bot::state::{EventRecord, Role};
use crate::config::{INVITE_LINKS_BASE, INVITE_LINKS_METHODIST};
use crate::transport::Markup;

// ─────────────────────────────────────────────────────────────────────────────
// Callback constants
// ─────────────────────────────────────────────────────────────────────────────

/// Callback data discarding the active dialog and returning to the menu
pub const CANCEL_TO_MENU: &str = "cancel_to_menu";
/// Callback data abandoning a broadcast composition
pub const CANCEL_ACTION: &str = "cancel_action";
/// Callback data skipping the optional dialog step
pub const SKIP_STEP: &str = "skip_step";
/// Callback data confirming an organized event
pub const CONFIRM_YES: &str = "confirm_yes";
/// Callback data declining an organized event
pub const CONFIRM_NO: &str = "confirm_no";
/// Callback prefix approving an application, followed by the user id
pub const APPROVE_PREFIX: &str = "approve:";
/// Callback prefix rejecting an application, followed by the user id
pub const REJECT_PREFIX: &str = "reject:";
/// Callback prefix opening an event detail, followed by the list index
pub const EVENT_DETAIL_PREFIX: &str = "event_detail_";

// ─────────────────────────────────────────────────────────────────────────────
// Menu button labels
// ─────────────────────────────────────────────────────────────────────────────

/// Unapproved menu: start an application
pub const BTN_APPLY: &str = "📝 Подать заявку";
/// Unapproved menu: admin mode
pub const BTN_ADMIN: &str = "👨‍💼 Руководитель";
/// Unapproved menu: help
pub const BTN_INFO: &str = "ℹ️ Полезная информация";
/// Member menu: organize an event
pub const BTN_ORGANIZE: &str = "📅 Организовать мероприятие";
/// Member menu: browse events
pub const BTN_BROWSE: &str = "📋 Узнать мероприятия";
/// Member menu: shift (reserved, unrecognized for now)
pub const BTN_SHIFT: &str = "🎯 Смена";
/// Admin menu: broadcast to methodists
pub const BTN_CAST_METHODISTS: &str = "📢 Написать методистам";
/// Admin menu: broadcast to the whole center
pub const BTN_CAST_CENTER: &str = "📢 Написать всему центру";
/// Admin menu: member removal (in development)
pub const BTN_FAREWELL: &str = "🛑 Распрощаться с человеком";

// ─────────────────────────────────────────────────────────────────────────────
// Texts
// ─────────────────────────────────────────────────────────────────────────────

/// Greeting shown with every main menu
#[must_use]
pub fn greeting() -> &'static str {
    "Привет! Выберите действие ниже:"
}

/// Edit applied to the pressed control on a dialog cancel
#[must_use]
pub fn returned_to_menu() -> &'static str {
    "Вы вернулись в главное меню."
}

/// Nudge for text or media the router does not recognize
#[must_use]
pub fn unrecognized() -> &'static str {
    "Пожалуйста, выберите одну из доступных команд."
}

/// Nudge for typed text at a choice step
#[must_use]
pub fn select_keyboard_option() -> &'static str {
    "Пожалуйста, выберите вариант на клавиатуре."
}

/// Nudge for a wrong button payload at a choice step
#[must_use]
pub fn invalid_choice() -> &'static str {
    "Неверный выбор."
}

/// Nudge for media or buttons at a free-text step
#[must_use]
pub fn text_input_expected() -> &'static str {
    "Пожалуйста, отправьте текстовое сообщение."
}

/// Reply to a button press whose dialog is long gone
#[must_use]
pub fn stale_control() -> &'static str {
    "Это действие уже неактуально."
}

/// Admin mode banner
#[must_use]
pub fn admin_mode_active() -> &'static str {
    "Режим руководителя активен. Используйте команды с клавиатуры ниже."
}

/// Placeholder for the member-removal workflow
#[must_use]
pub fn farewell_in_development() -> &'static str {
    "Эта функция в разработке 👷"
}

/// Static help text (HTML)
#[must_use]
pub fn help_text() -> &'static str {
    "ℹ️ <b>Полезная информация:</b>\n\n\
     — Подать заявку: нажмите «Подать заявку» в меню или введите /start\n\
     — Руководитель: доступно только администратору\n\
     — Отменить действия: /cancel\n\n\
     Если что-то не работает — напишите нам!"
}

/// Applicant acknowledgment after submission
#[must_use]
pub fn application_sent() -> &'static str {
    "Ваша заявка отправлена на рассмотрение."
}

/// Applicant report when the admin notification could not be delivered
#[must_use]
pub fn application_failed() -> &'static str {
    "Не удалось отправить заявку. Пожалуйста, попробуйте снова."
}

/// Admin report when a decision finds no pending application
#[must_use]
pub fn application_not_found() -> &'static str {
    "Ошибка: заявка не найдена."
}

/// Admin report when the membership row could not be written
#[must_use]
pub fn approval_save_failed() -> &'static str {
    "Не удалось сохранить данные. Пожалуйста, попробуйте снова."
}

/// Admin confirmation after approving
#[must_use]
pub fn application_approved_ack() -> &'static str {
    "Заявка одобрена ✅"
}

/// Admin confirmation after rejecting
#[must_use]
pub fn application_rejected_ack() -> &'static str {
    "Заявка отклонена ❌"
}

/// Applicant notification on rejection
#[must_use]
pub fn applicant_rejected() -> &'static str {
    "Ваша заявка отклонена."
}

/// Sent to a fresh member together with their menu
#[must_use]
pub fn member_welcome() -> &'static str {
    "Вы теперь участник! Вот ваше меню:"
}

/// Confirmation edit after a successful event append
#[must_use]
pub fn event_registered() -> &'static str {
    "✅ Мероприятие успешно зарегистрировано!"
}

/// Confirmation edit after the user declined the event
#[must_use]
pub fn event_declined() -> &'static str {
    "❌ Регистрация мероприятия отменена."
}

/// Report when the event row could not be written
#[must_use]
pub fn event_save_failed() -> &'static str {
    "Не удалось сохранить мероприятие. Пожалуйста, попробуйте снова."
}

/// Edit applied to the pressed skip control
#[must_use]
pub fn extra_info_skipped() -> &'static str {
    "Дополнительная информация пропущена."
}

/// Browse result when the worksheet holds no events
#[must_use]
pub fn no_events() -> &'static str {
    "Пока нет мероприятий."
}

/// Closing line after all event summaries were sent
#[must_use]
pub fn events_listed() -> &'static str {
    "Вот список мероприятий 👇"
}

/// Browse report when fetching or sending the list failed
#[must_use]
pub fn events_failed() -> &'static str {
    "Произошла ошибка при отправке мероприятий. Пожалуйста, попробуйте снова."
}

/// Report for a detail press that matches no fetched event
#[must_use]
pub fn event_not_found() -> &'static str {
    "Ошибка: мероприятие не найдено."
}

/// Prompt shown when a broadcast target is armed
#[must_use]
pub fn broadcast_prompt(target: BroadcastTarget) -> &'static str {
    match target {
        BroadcastTarget::Methodists => "Введите сообщение для методистов:",
        BroadcastTarget::WholeCenter => "Введите сообщение для всего центра:",
    }
}

/// Acknowledgment after a successful relay
#[must_use]
pub fn broadcast_sent() -> &'static str {
    "Сообщение отправлено."
}

/// Report after a failed relay
#[must_use]
pub fn broadcast_failed() -> &'static str {
    "Не удалось отправить сообщение. Пожалуйста, попробуйте снова."
}

/// Report for a message kind the relay cannot forward
#[must_use]
pub fn broadcast_unprocessable() -> &'static str {
    "Не удалось обработать это сообщение."
}

/// First message after a broadcast cancel press
#[must_use]
pub fn broadcast_cancelled() -> &'static str {
    "Ожидание сообщения отменено."
}

/// Second message after a broadcast cancel press, carries the menu
#[must_use]
pub fn returning_to_menu() -> &'static str {
    "Возвращаюсь в главное меню."
}

// ─────────────────────────────────────────────────────────────────────────────
// Formatters
// ─────────────────────────────────────────────────────────────────────────────

/// Admin notification for a new application
///
/// Gender and role appear as the stored choice payloads.
#[must_use]
pub fn application_notification(application: &PendingApplication) -> String {
    format!(
        "📋 Новая заявка:\n\
         👤 ФИО: {}\n\
         🎂 Дата рождения: {}\n\
         📞 Телефон: {}\n\
         🚻 Пол: {}\n\
         💼 Должность: {}\n\
         🆔 Telegram: @{}",
        application.full_name,
        application.birthday,
        application.phone,
        application.gender.payload(),
        application.role.payload(),
        application.username
    )
}

/// Invitation message for an approved applicant
///
/// Methodist-track approvals get the methodist chats ahead of the base ones.
#[must_use]
pub fn invite_message(role: Role) -> String {
    let mut links: Vec<&str> = Vec::new();
    if role == Role::Methodist {
        links.extend(INVITE_LINKS_METHODIST);
    }
    links.extend(INVITE_LINKS_BASE);
    format!(
        "Ваша заявка одобрена! 🎉\nПрисоединяйтесь к чатам:\n{}",
        links.join("\n")
    )
}

/// Pre-append confirmation summary for an organized event (plain text)
#[must_use]
pub fn event_confirmation(
    name: &str,
    datetime: &str,
    place: &str,
    description: &str,
    extra_info: &str,
) -> String {
    let extra = if extra_info.is_empty() { "—" } else { extra_info };
    format!(
        "🔹 Название: {name}\n\
         📅 Дата и время: {datetime}\n\
         📍 Место: {place}\n\
         📝 Описание: {description}\n\
         ℹ️ Доп. информация: {extra}\n\n\
         Подтвердить мероприятие?"
    )
}

/// One-event summary for the browse list (HTML, user values escaped)
#[must_use]
pub fn event_summary(event: &EventRecord) -> String {
    format!(
        "<b>{}</b>\n🕒 {}\n📍 {}\n📝 {}",
        html_escape::encode_text(&event.name),
        html_escape::encode_text(&event.datetime),
        html_escape::encode_text(&event.place),
        html_escape::encode_text(&event.description)
    )
}

/// Full event detail the summary is edited into (HTML, user values escaped)
#[must_use]
pub fn event_detail(event: &EventRecord) -> String {
    format!(
        "<b>{}</b>\n\n\
         <b>Дата и время:</b> {}\n\
         <b>Место:</b> {}\n\
         <b>Описание:</b> {}\n\
         <b>Доп. информация:</b> {}\n\
         <b>Организатор:</b> @{}",
        html_escape::encode_text(&event.name),
        html_escape::encode_text(&event.datetime),
        html_escape::encode_text(&event.place),
        html_escape::encode_text(&event.description),
        html_escape::encode_text(&event.extra_info),
        html_escape::encode_text(&event.organizer)
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyboards
// ─────────────────────────────────────────────────────────────────────────────

fn reply_rows(rows: &[&[&str]]) -> Markup {
    Markup::Reply(
        rows.iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect(),
    )
}

fn inline_rows(rows: &[&[(&str, &str)]]) -> Markup {
    Markup::Inline(
        rows.iter()
            .map(|row| {
                row.iter()
                    .map(|(label, payload)| ((*label).to_string(), (*payload).to_string()))
                    .collect()
            })
            .collect(),
    )
}

/// The main reply menu appropriate to the user's status
#[must_use]
pub fn main_menu(approved: bool, admin: bool) -> Markup {
    let rows: &[&[&str]] = if admin {
        &[
            &[BTN_ORGANIZE, BTN_BROWSE],
            &[BTN_SHIFT],
            &[BTN_CAST_METHODISTS, BTN_CAST_CENTER],
            &[BTN_FAREWELL],
        ]
    } else if approved {
        &[&[BTN_ORGANIZE, BTN_BROWSE], &[BTN_SHIFT]]
    } else {
        &[&[BTN_APPLY, BTN_ADMIN], &[BTN_INFO]]
    };
    reply_rows(rows)
}

/// Approve/reject controls attached to an application notification
#[must_use]
pub fn decision_keyboard(user_id: i64) -> Markup {
    Markup::Inline(vec![vec![
        (
            "✅ Одобрить".to_string(),
            format!("{APPROVE_PREFIX}{user_id}"),
        ),
        (
            "❌ Отклонить".to_string(),
            format!("{REJECT_PREFIX}{user_id}"),
        ),
    ]])
}

/// Yes/No controls attached to the event confirmation summary
#[must_use]
pub fn confirm_keyboard() -> Markup {
    inline_rows(&[&[("✅ Да", CONFIRM_YES)], &[("❌ Нет", CONFIRM_NO)]])
}

/// Detail control attached to one browse summary
#[must_use]
pub fn detail_keyboard(index: usize) -> Markup {
    Markup::Inline(vec![vec![(
        "Подробнее".to_string(),
        format!("{EVENT_DETAIL_PREFIX}{index}"),
    )]])
}

/// Cancel control attached to a broadcast prompt
#[must_use]
pub fn broadcast_cancel_keyboard() -> Markup {
    inline_rows(&[&[("❌ Отменить", CANCEL_ACTION)]])
}

/// Return-to-menu control attached to mid-dialog prompts
#[must_use]
pub fn cancel_keyboard() -> Markup {
    inline_rows(&[&[("❌ Вернуться в главное меню", CANCEL_TO_MENU)]])
}

/// Return-to-menu and skip controls for the optional step
#[must_use]
pub fn cancel_or_skip_keyboard() -> Markup {
    inline_rows(&[
        &[("↩️ Вернуться в главное меню", CANCEL_TO_MENU)],
        &[("⏭ Пропустить", SKIP_STEP)],
    ])
}
