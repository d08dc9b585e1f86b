//! Membership application dialog
//!
//! Collects the applicant's personal details over five steps, files the
//! application with the registry, and notifies the admin with approve and
//! reject controls attached.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::{Buttons, ChoiceOption, Dialog, DialogCx, Step, Terminal};
use crate::bot::registry::PendingApplication;
use crate::bot::state::{DialogKind, Gender, Role};
use crate::bot::views;
use crate::transport::{ChatRef, Markup, Parse, TransportError};

const FULL_NAME: &str = "full_name";
const BIRTHDAY: &str = "birthday";
const PHONE: &str = "phone";
const GENDER: &str = "gender";
const ROLE: &str = "role";

static STEPS: &[Step] = &[
    Step {
        field: FULL_NAME,
        prompt: "Начнем регистрацию. Введите ваше <b>ФИО</b>:",
        buttons: Buttons::RemoveKeyboard,
        skippable: false,
    },
    Step {
        field: BIRTHDAY,
        prompt: "Введите дату рождения (например, 01.01.2000):",
        buttons: Buttons::None,
        skippable: false,
    },
    Step {
        field: PHONE,
        prompt: "Введите номер телефона:",
        buttons: Buttons::None,
        skippable: false,
    },
    Step {
        field: GENDER,
        prompt: "Выберите пол:",
        buttons: Buttons::Choice(&[&[
            ChoiceOption { label: "Мужской", payload: "male" },
            ChoiceOption { label: "Женский", payload: "female" },
        ]]),
        skippable: false,
    },
    Step {
        field: ROLE,
        prompt: "Выберите должность:",
        buttons: Buttons::Choice(&[&[
            ChoiceOption { label: "Методист", payload: "methodist" },
            ChoiceOption { label: "Магистр", payload: "magistr" },
        ]]),
        skippable: false,
    },
];

/// The five-step membership application
pub struct Registration;

#[async_trait]
impl Dialog for Registration {
    fn kind(&self) -> DialogKind {
        DialogKind::Registration
    }

    fn steps(&self) -> &'static [Step] {
        STEPS
    }

    async fn finish(
        &self,
        cx: &DialogCx<'_>,
        fields: &HashMap<&'static str, String>,
    ) -> Result<Terminal, TransportError> {
        let field = |name: &str| fields.get(name).cloned().unwrap_or_default();

        let Some(gender) = Gender::from_payload(&field(GENDER)) else {
            warn!(user_id = cx.user.id, "application finished without a valid gender");
            return Ok(Terminal::Close);
        };
        let Some(role) = Role::from_payload(&field(ROLE)) else {
            warn!(user_id = cx.user.id, "application finished without a valid role");
            return Ok(Terminal::Close);
        };

        let username = cx
            .user
            .username
            .clone()
            .unwrap_or_else(|| "нет username".to_string());
        let application = PendingApplication {
            user_id: cx.user.id,
            username,
            full_name: field(FULL_NAME),
            birthday: field(BIRTHDAY),
            phone: field(PHONE),
            gender,
            role,
        };

        info!(
            user_id = cx.user.id,
            username = %application.username,
            "sending new application to admin"
        );
        let notification = views::application_notification(&application);
        cx.members.submit(application).await;

        let delivered = cx
            .transport
            .send_message(
                ChatRef(cx.settings.admin_id),
                &notification,
                Some(views::decision_keyboard(cx.user.id)),
                Parse::Plain,
            )
            .await;

        match delivered {
            Ok(_) => {
                cx.transport
                    .send_message(
                        cx.chat,
                        views::application_sent(),
                        Some(Markup::RemoveKeyboard),
                        Parse::Plain,
                    )
                    .await?;
            }
            Err(error) => {
                error!(%error, user_id = cx.user.id, "failed to deliver application to admin");
                cx.transport
                    .send_message(cx.chat, views::application_failed(), None, Parse::Plain)
                    .await?;
            }
        }

        Ok(Terminal::Close)
    }
}
