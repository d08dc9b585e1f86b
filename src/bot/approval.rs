//! Application approval workflow
//!
//! Admin decisions arrive as `approve:<user_id>` / `reject:<user_id>`
//! payloads on the notification message. Approval writes the membership row,
//! sends the invite links, and unlocks the member menu; rejection notifies
//! the applicant. Either way the admin gets an acknowledgment and the
//! pressed controls are stripped. A failed membership write restores the
//! pending application so the decision can be retried.

use tracing::{error, info, warn};

use crate::bot::registry::{MembershipRegistry, PendingApplication};
use crate::bot::views;
use crate::sheets::SheetsClient;
use crate::transport::{ChatRef, MessageRef, Parse, Transport, TransportError};

/// A parsed admin decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Accept the application
    Approve,
    /// Turn the application down
    Reject,
}

#[derive(PartialEq, Eq)]
enum Resolution {
    Done,
    Retry,
}

/// Splits an `approve:`/`reject:` payload into the decision and its subject
#[must_use]
pub fn parse_decision(payload: &str) -> Option<(Decision, i64)> {
    let (action, raw_id) = payload.split_once(':')?;
    let decision = match action {
        "approve" => Decision::Approve,
        "reject" => Decision::Reject,
        _ => return None,
    };
    let user_id = raw_id.parse().ok()?;
    Some((decision, user_id))
}

/// Applies an admin decision payload pressed in `admin_chat`
pub async fn handle_decision(
    transport: &dyn Transport,
    sheets: &dyn SheetsClient,
    members: &MembershipRegistry,
    payload: &str,
    origin: Option<MessageRef>,
    admin_chat: ChatRef,
) -> Result<(), TransportError> {
    let Some((decision, user_id)) = parse_decision(payload) else {
        warn!(payload, "malformed decision payload");
        return Ok(());
    };
    let Some(application) = members.take_pending(user_id).await else {
        warn!(user_id, "no pending application for this decision");
        transport
            .send_message(admin_chat, views::application_not_found(), None, Parse::Plain)
            .await?;
        return Ok(());
    };

    match decision {
        Decision::Approve => {
            let resolution =
                approve(transport, sheets, members, application, admin_chat).await?;
            if resolution == Resolution::Retry {
                return Ok(());
            }
        }
        Decision::Reject => reject(transport, application.user_id, admin_chat).await?,
    }

    strip_controls(transport, origin).await;
    Ok(())
}

async fn approve(
    transport: &dyn Transport,
    sheets: &dyn SheetsClient,
    members: &MembershipRegistry,
    application: PendingApplication,
    admin_chat: ChatRef,
) -> Result<Resolution, TransportError> {
    let row = vec![
        application.full_name.clone(),
        application.birthday.clone(),
        application.phone.clone(),
        application.gender.payload().to_string(),
        format!("@{}", application.username),
    ];
    let worksheet = application.role.worksheet();
    if let Err(error) = sheets.append_row(worksheet, &row).await {
        error!(%error, worksheet, user_id = application.user_id, "failed to write membership row");
        // back into the queue so the admin can press approve again
        members.submit(application).await;
        transport
            .send_message(admin_chat, views::approval_save_failed(), None, Parse::Plain)
            .await?;
        return Ok(Resolution::Retry);
    }

    members.insert_approved(application.user_id).await;
    info!(user_id = application.user_id, worksheet, "application approved");

    let member_chat = ChatRef(application.user_id);
    if let Err(error) = transport
        .send_message(
            member_chat,
            &views::invite_message(application.role),
            None,
            Parse::Plain,
        )
        .await
    {
        warn!(%error, user_id = application.user_id, "failed to deliver invite links");
    }
    if let Err(error) = transport
        .send_message(
            member_chat,
            views::member_welcome(),
            Some(views::main_menu(true, false)),
            Parse::Plain,
        )
        .await
    {
        warn!(%error, user_id = application.user_id, "failed to deliver the member menu");
    }

    transport
        .send_message(admin_chat, views::application_approved_ack(), None, Parse::Plain)
        .await?;
    Ok(Resolution::Done)
}

async fn reject(
    transport: &dyn Transport,
    user_id: i64,
    admin_chat: ChatRef,
) -> Result<(), TransportError> {
    if let Err(error) = transport
        .send_message(ChatRef(user_id), views::applicant_rejected(), None, Parse::Plain)
        .await
    {
        warn!(%error, user_id, "failed to notify the rejected applicant");
    }
    info!(user_id, "application rejected");
    transport
        .send_message(admin_chat, views::application_rejected_ack(), None, Parse::Plain)
        .await?;
    Ok(())
}

async fn strip_controls(transport: &dyn Transport, origin: Option<MessageRef>) {
    let Some(origin) = origin else {
        return;
    };
    if let Err(error) = transport.strip_markup(origin).await {
        warn!(%error, "failed to strip decision controls");
    }
}
