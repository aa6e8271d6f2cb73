//! Call log endpoints and the donor email-link confirmation.

use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::Deserialize;

use lifeline_db::db::enums::{CallOutcome, DonorReply};
use lifeline_db::db::query;
use lifeline_service::error::ServiceError;
use lifeline_service::{accounts, calls};

use lifeline_core::clock::Clock;
use super::{ErrorResponse, get_conn_or_return, parse_json_or_return, render_service_error};
use crate::config::get_config_from_depot;
use crate::context::{engine_from_depot, get_clock_from_depot, get_notifier_from_depot};

#[derive(Debug, Deserialize)]
struct CreateCallBody {
    caller_email: String,
    receiver_email: String,
    #[serde(default)]
    donation_request_id: Option<uuid::Uuid>,
    #[serde(default)]
    duration_seconds: i32,
    #[serde(default)]
    outcome: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendConfirmationBody {
    /// Provisional yes/no taken down in-app before the email goes out.
    #[serde(default)]
    donor_agreed: Option<bool>,
}

fn parse_outcome(input: Option<&str>) -> Option<CallOutcome> {
    match input {
        None => Some(CallOutcome::Completed),
        Some("completed") => Some(CallOutcome::Completed),
        Some("no_answer") => Some(CallOutcome::NoAnswer),
        Some("busy") => Some(CallOutcome::Busy),
        Some("failed") => Some(CallOutcome::Failed),
        Some("declined") => Some(CallOutcome::Declined),
        Some(_) => None,
    }
}

/// ## Summary
/// POST /api/calls - Record a call between a requester and a donor.
///
/// ## Errors
/// Returns HTTP 400 for invalid input, 404 for unknown participants.
#[handler]
async fn create_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let body = parse_json_or_return!(req, res, CreateCallBody);
    get_conn_or_return!(depot, res, _db, conn);

    let Some(outcome) = parse_outcome(body.outcome.as_deref()) else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse::new(
            "validation_error",
            format!("unknown outcome '{}'", body.outcome.unwrap_or_default()),
        )));
        return;
    };

    let caller_email = accounts::normalize_email(&body.caller_email);
    let receiver_email = accounts::normalize_email(&body.receiver_email);

    let caller = match query::user::find_by_email(&mut conn, &caller_email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            render_service_error(res, &ServiceError::NotFound(format!("user '{caller_email}'")));
            return;
        }
        Err(e) => {
            render_service_error(res, &e.into());
            return;
        }
    };
    let receiver = match query::user::find_by_email(&mut conn, &receiver_email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            render_service_error(res, &ServiceError::NotFound(format!("user '{receiver_email}'")));
            return;
        }
        Err(e) => {
            render_service_error(res, &e.into());
            return;
        }
    };

    match calls::log_call(
        &mut conn,
        caller.id,
        receiver.id,
        body.donation_request_id,
        body.duration_seconds,
        outcome,
        body.notes.as_deref(),
    )
    .await
    {
        Ok(call) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(serde_json::json!({
                "message": "Call log created successfully",
                "call_id": call.id.to_string(),
            })));
        }
        Err(e) => render_service_error(res, &e),
    }
}

/// ## Summary
/// POST /api/calls/{id}/send-confirmation - Email the receiver the yes/no
/// confirmation links.
///
/// ## Errors
/// Returns HTTP 404 for an unknown call log, 500 when the email fails.
#[handler]
async fn send_confirmation_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(call_log_id) = req.param::<uuid::Uuid>("id") else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse::new("validation_error", "invalid call log id")));
        return;
    };

    let body = parse_json_or_return!(req, res, SendConfirmationBody);
    get_conn_or_return!(depot, res, _db, conn);

    let (config, notifier, clock) = match (
        get_config_from_depot(depot),
        get_notifier_from_depot(depot),
        get_clock_from_depot(depot),
    ) {
        (Ok(config), Ok(notifier), Ok(clock)) => (config, notifier, clock),
        _ => {
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse::new("internal_error", "Internal server error")));
            return;
        }
    };

    let provisional_reply = body.donor_agreed.map(|agreed| {
        if agreed {
            DonorReply::Yes
        } else {
            DonorReply::No
        }
    });

    match calls::send_confirmation_email(
        &mut conn,
        notifier.as_ref(),
        &config.server.origin(),
        clock.now(),
        call_log_id,
        provisional_reply,
    )
    .await
    {
        Ok(()) => {
            res.render(Json(serde_json::json!({
                "message": "Confirmation email sent successfully",
            })));
        }
        Err(e) => render_service_error(res, &e),
    }
}

/// ## Summary
/// GET /api/calls/confirm?call_log_id=..&response=yes|no - Donor email-link
/// confirmation. A `yes` counts one confirmed call for the caller.
///
/// ## Errors
/// Returns HTTP 400 for missing/invalid parameters, 404 for an unknown
/// call log.
#[handler]
async fn confirm_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let call_log_id = req.query::<uuid::Uuid>("call_log_id");
    let response = req.query::<String>("response");

    let (Some(call_log_id), Some(response)) = (call_log_id, response) else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse::new(
            "validation_error",
            "Missing call_log_id or response parameter",
        )));
        return;
    };

    let reply = match response.as_str() {
        "yes" => DonorReply::Yes,
        "no" => DonorReply::No,
        _ => {
            res.status_code(StatusCode::BAD_REQUEST);
            res.render(Json(ErrorResponse::new(
                "validation_error",
                "Invalid response. Must be 'yes' or 'no'",
            )));
            return;
        }
    };

    get_conn_or_return!(depot, res, _db, conn);

    let (engine, clock) = match (engine_from_depot(depot), get_clock_from_depot(depot)) {
        (Ok(engine), Ok(clock)) => (engine, clock),
        _ => {
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse::new("internal_error", "Internal server error")));
            return;
        }
    };

    match calls::confirm_call_by_email(&mut conn, &engine, clock.now(), call_log_id, reply).await {
        Ok(outcome) => {
            let message = if outcome.reply.agreed() {
                format!(
                    "Dear {}, your agreement to donate blood has been recorded{}. Thank you for \
                     being a life saver! We will contact you soon with donation details.",
                    outcome.receiver.name,
                    if outcome.count_completed {
                        " and one count has been completed for the requester"
                    } else {
                        ""
                    }
                )
            } else {
                format!(
                    "Thank you {} for your response. We understand you cannot donate at this time.",
                    outcome.receiver.name
                )
            };

            res.render(Json(serde_json::json!({
                "message": message,
                "response": outcome.reply.as_str(),
                "count_completed": outcome.count_completed,
                "donor_name": outcome.receiver.name,
                "call_id": outcome.call.id.to_string(),
            })));
        }
        Err(e) => render_service_error(res, &e),
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("calls")
        .post(create_handler)
        .push(Router::with_path("confirm").get(confirm_handler))
        .push(Router::with_path("{id}/send-confirmation").post(send_confirmation_handler))
}
