//! Call logging and the donor email-link confirmation path.
//!
//! The second coordinator feeding the monthly tracker. A call's receiver
//! gets a one-shot yes/no link by email; visiting `yes` counts one
//! confirmed call for the *caller* (the requester). When the call is tied
//! to a donation request the idempotency claim is taken on the request —
//! shared with the dual in-app path — otherwise on the call log itself, so
//! revisiting the link or confirming in-app later can never double-count.

use chrono::{DateTime, Utc};

use lifeline_db::db::connection::DbConnection;
use lifeline_db::db::enums::{CallOutcome, DonorReply};
use lifeline_db::db::query;
use lifeline_db::model::call_log::{CallLog, NewCallLog};
use lifeline_db::model::user::User;

use crate::error::{ServiceError, ServiceResult};
use crate::notify::{Notifier, templates};
use crate::requests::derive_status;
use crate::tracker::TrackerEngine;

/// ## Summary
/// Records a call between a requester and a donor.
///
/// ## Errors
/// Returns an error if persistence fails.
#[tracing::instrument(skip(conn, notes))]
pub async fn log_call(
    conn: &mut DbConnection<'_>,
    caller_id: uuid::Uuid,
    receiver_id: uuid::Uuid,
    donation_request_id: Option<uuid::Uuid>,
    duration_seconds: i32,
    outcome: CallOutcome,
    notes: Option<&str>,
) -> ServiceResult<CallLog> {
    let call = query::call_log::insert(
        conn,
        &NewCallLog {
            id: uuid::Uuid::now_v7(),
            caller_id,
            receiver_id,
            donation_request_id,
            duration_seconds,
            outcome,
            notes,
        },
    )
    .await?;

    tracing::info!(call_id = %call.id, "Call logged");

    Ok(call)
}

/// ## Summary
/// Emails the call's receiver the yes/no confirmation links, optionally
/// recording a provisional reply taken down during the call itself.
///
/// ## Errors
/// `NotFound` for an unknown call log; notification errors propagate (the
/// caller asked for exactly this email to be sent).
#[tracing::instrument(skip(conn, notifier, origin))]
pub async fn send_confirmation_email(
    conn: &mut DbConnection<'_>,
    notifier: &dyn Notifier,
    origin: &str,
    now: DateTime<Utc>,
    call_log_id: uuid::Uuid,
    provisional_reply: Option<DonorReply>,
) -> ServiceResult<()> {
    let call = query::call_log::find(conn, call_log_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("call log {call_log_id}")))?;

    if let Some(reply) = provisional_reply {
        query::call_log::set_donor_reply(conn, call.id, reply, now).await?;
    }

    let receiver = query::user::find_by_id(conn, call.receiver_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("call receiver".to_string()))?;
    let caller = query::user::find_by_id(conn, call.caller_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("call caller".to_string()))?;

    let yes_url = confirmation_url(origin, call.id, DonorReply::Yes);
    let no_url = confirmation_url(origin, call.id, DonorReply::No);

    notifier
        .send(templates::donor_confirmation(
            &receiver,
            &caller.name,
            &yes_url,
            &no_url,
        ))
        .await?;

    query::call_log::mark_confirmation_sent(conn, call.id, now).await?;

    tracing::info!(call_id = %call.id, receiver = %receiver.email, "Confirmation email sent");

    Ok(())
}

fn confirmation_url(origin: &str, call_log_id: uuid::Uuid, reply: DonorReply) -> String {
    format!(
        "{origin}/api/calls/confirm?call_log_id={call_log_id}&response={}",
        reply.as_str()
    )
}

/// What visiting the confirmation link did.
#[derive(Debug, Clone)]
pub struct EmailConfirmOutcome {
    pub call: CallLog,
    pub reply: DonorReply,
    pub receiver: User,
    /// True when this visit completed a confirmed call for the caller's
    /// monthly tracker.
    pub count_completed: bool,
    pub goal_just_completed: bool,
    pub blocked: bool,
}

/// ## Summary
/// Handles a donor's yes/no visit to the emailed confirmation link.
///
/// A `yes` takes the idempotency claim (on the linked donation request when
/// there is one, otherwise on the call log), and only the claim winner
/// counts a confirmed call for the caller and applies the goal block. Any
/// linked request additionally gets its donor response back-filled so the
/// in-app state agrees with the email decision.
///
/// ## Errors
/// `NotFound` for an unknown call log, or any persistence error.
#[tracing::instrument(skip(conn, engine))]
pub async fn confirm_call_by_email(
    conn: &mut DbConnection<'_>,
    engine: &TrackerEngine,
    now: DateTime<Utc>,
    call_log_id: uuid::Uuid,
    reply: DonorReply,
) -> ServiceResult<EmailConfirmOutcome> {
    let call = query::call_log::set_donor_reply(conn, call_log_id, reply, now)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("call log {call_log_id}")))?;

    let receiver = query::user::find_by_id(conn, call.receiver_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("call receiver".to_string()))?;

    let mut outcome = EmailConfirmOutcome {
        call: call.clone(),
        reply,
        receiver,
        count_completed: false,
        goal_just_completed: false,
        blocked: false,
    };

    if !reply.agreed() {
        tracing::info!(call_id = %call.id, "Donor declined via email link");
        return Ok(outcome);
    }

    let claimed = match call.donation_request_id {
        Some(request_id) => query::donation_request::claim_count(conn, request_id, now).await?,
        None => query::call_log::claim_count(conn, call.id, now).await?,
    };

    if claimed {
        let count = engine.record_confirmed_call(call.caller_id).await?;
        outcome.count_completed = true;
        outcome.goal_just_completed = count.goal_just_completed;

        if count.goal_just_completed {
            outcome.blocked = engine.block_for_goal(call.caller_id).await?;
        }

        tracing::info!(
            call_id = %call.id,
            caller_id = %call.caller_id,
            count = count.tracker.completed_calls_count,
            "Count incremented for requester via email confirmation"
        );
    } else {
        tracing::info!(call_id = %call.id, "Confirmation already counted, ignoring repeat");
    }

    backfill_request_state(conn, &call, now).await;

    Ok(outcome)
}

/// Brings the linked (or most recent open) donation request in line with
/// the donor's emailed yes. Best-effort bookkeeping: failures are logged,
/// the count already stands.
async fn backfill_request_state(conn: &mut DbConnection<'_>, call: &CallLog, now: DateTime<Utc>) {
    let request = match call.donation_request_id {
        Some(request_id) => query::donation_request::find(conn, request_id).await,
        None => {
            query::donation_request::find_open_for_pair(conn, call.caller_id, call.receiver_id)
                .await
        }
    };

    let request = match request {
        Ok(Some(request)) => request,
        Ok(None) => {
            tracing::debug!(call_id = %call.id, "No donation request to back-fill");
            return;
        }
        Err(e) => {
            tracing::warn!(call_id = %call.id, error = %e, "Could not load donation request for back-fill");
            return;
        }
    };

    if request.donor_confirmed == Some(true) {
        return;
    }

    let status = derive_status(request.requester_confirmed, Some(true));
    if let Err(e) =
        query::donation_request::set_donor_response(conn, request.id, true, status, now).await
    {
        tracing::warn!(request_id = %request.id, error = %e, "Donation request back-fill failed");
    }
}
