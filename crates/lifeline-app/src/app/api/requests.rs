//! Donation request endpoints: create, list, in-app yes/no, and the donor
//! one-shot response link.

use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::{Deserialize, Serialize};

use lifeline_db::db::enums::DonorReply;
use lifeline_db::db::query;
use lifeline_db::model::donation_request::DonationRequest;
use lifeline_service::error::ServiceError;
use lifeline_service::{accounts, requests};

use lifeline_core::clock::Clock;
use super::{ErrorResponse, get_conn_or_return, parse_json_or_return, render_service_error};
use crate::context::{engine_from_depot, get_clock_from_depot, get_notifier_from_depot};

#[derive(Debug, Deserialize)]
struct CreateRequestBody {
    requester_email: String,
    donor_email: String,
    blood_group: String,
    #[serde(default)]
    urgency: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RespondBody {
    responder_email: String,
    response: bool,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Serialize)]
struct RequestView {
    id: String,
    requester_id: String,
    donor_id: String,
    blood_group: String,
    urgency: String,
    notes: Option<String>,
    requester_confirmed: Option<bool>,
    donor_confirmed: Option<bool>,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&DonationRequest> for RequestView {
    fn from(request: &DonationRequest) -> Self {
        Self {
            id: request.id.to_string(),
            requester_id: request.requester_id.to_string(),
            donor_id: request.donor_id.to_string(),
            blood_group: request.blood_group.to_string(),
            urgency: request.urgency.to_string(),
            notes: request.notes.clone(),
            requester_confirmed: request.requester_confirmed,
            donor_confirmed: request.donor_confirmed,
            status: request.status.to_string(),
            created_at: request.created_at,
        }
    }
}

fn parse_urgency(input: Option<&str>) -> Option<lifeline_db::db::enums::Urgency> {
    use lifeline_db::db::enums::Urgency;
    match input {
        None => Some(Urgency::Medium),
        Some("low") => Some(Urgency::Low),
        Some("medium") => Some(Urgency::Medium),
        Some("high") => Some(Urgency::High),
        Some(_) => None,
    }
}

/// ## Summary
/// POST /api/requests - Create a donation request and alert the donor.
///
/// ## Errors
/// Returns HTTP 400 for invalid input, 404 for unknown participants.
#[handler]
async fn create_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let body = parse_json_or_return!(req, res, CreateRequestBody);
    get_conn_or_return!(depot, res, _db, conn);

    let blood_group = match lifeline_core::types::BloodGroup::parse(&body.blood_group) {
        Ok(group) => lifeline_db::db::enums::BloodGroup::from(group),
        Err(e) => {
            res.status_code(StatusCode::BAD_REQUEST);
            res.render(Json(ErrorResponse::new("validation_error", e.to_string())));
            return;
        }
    };

    let Some(urgency) = parse_urgency(body.urgency.as_deref()) else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse::new(
            "validation_error",
            format!("unknown urgency '{}'", body.urgency.unwrap_or_default()),
        )));
        return;
    };

    let requester_email = accounts::normalize_email(&body.requester_email);
    let donor_email = accounts::normalize_email(&body.donor_email);

    let requester = match query::user::find_by_email(&mut conn, &requester_email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            render_service_error(res, &ServiceError::NotFound(format!("user '{requester_email}'")));
            return;
        }
        Err(e) => {
            render_service_error(res, &e.into());
            return;
        }
    };
    let donor = match query::user::find_by_email(&mut conn, &donor_email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            render_service_error(res, &ServiceError::NotFound(format!("user '{donor_email}'")));
            return;
        }
        Err(e) => {
            render_service_error(res, &e.into());
            return;
        }
    };

    let notifier = match get_notifier_from_depot(depot) {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = ?e, "Failed to get notifier");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse::new("internal_error", "Internal server error")));
            return;
        }
    };

    match requests::create_request(
        &mut conn,
        notifier.as_ref(),
        &requester,
        &donor,
        blood_group,
        urgency,
        body.notes.as_deref(),
    )
    .await
    {
        Ok(request) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(serde_json::json!({
                "message": "Donation request created and notification sent",
                "request": RequestView::from(&request),
            })));
        }
        Err(e) => render_service_error(res, &e),
    }
}

/// ## Summary
/// GET /api/requests?user_email=.. - Requests the user made and received.
///
/// ## Errors
/// Returns HTTP 400 for a missing email, 404 for an unknown user.
#[handler]
async fn list_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(email) = req.query::<String>("user_email") else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse::new("validation_error", "user_email is required")));
        return;
    };

    get_conn_or_return!(depot, res, _db, conn);
    let email = accounts::normalize_email(&email);

    let user = match query::user::find_by_email(&mut conn, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            render_service_error(res, &ServiceError::NotFound(format!("user '{email}'")));
            return;
        }
        Err(e) => {
            render_service_error(res, &e.into());
            return;
        }
    };

    let made = match query::donation_request::list_made_by(&mut conn, user.id).await {
        Ok(requests) => requests,
        Err(e) => {
            render_service_error(res, &e.into());
            return;
        }
    };
    let received = match query::donation_request::list_received_by(&mut conn, user.id).await {
        Ok(requests) => requests,
        Err(e) => {
            render_service_error(res, &e.into());
            return;
        }
    };

    res.render(Json(serde_json::json!({
        "requests_made": made.iter().map(RequestView::from).collect::<Vec<_>>(),
        "requests_received": received.iter().map(RequestView::from).collect::<Vec<_>>(),
    })));
}

/// ## Summary
/// POST /api/requests/{id}/respond - Record a party's yes/no (the dual
/// in-app confirmation path).
///
/// ## Errors
/// Returns HTTP 404 for an unknown request or responder, 403 when the
/// responder is not a participant.
#[handler]
async fn respond_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(request_id) = req.param::<uuid::Uuid>("id") else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse::new("validation_error", "invalid request id")));
        return;
    };

    let body = parse_json_or_return!(req, res, RespondBody);
    get_conn_or_return!(depot, res, _db, conn);

    let email = accounts::normalize_email(&body.responder_email);
    let responder = match query::user::find_by_email(&mut conn, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            render_service_error(res, &ServiceError::NotFound(format!("user '{email}'")));
            return;
        }
        Err(e) => {
            render_service_error(res, &e.into());
            return;
        }
    };

    let (engine, notifier, clock) = match (
        engine_from_depot(depot),
        get_notifier_from_depot(depot),
        get_clock_from_depot(depot),
    ) {
        (Ok(engine), Ok(notifier), Ok(clock)) => (engine, notifier, clock),
        _ => {
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse::new("internal_error", "Internal server error")));
            return;
        }
    };

    match requests::respond_to_request(
        &mut conn,
        &engine,
        notifier.as_ref(),
        clock.now(),
        request_id,
        &responder,
        body.response,
        body.notes.as_deref(),
    )
    .await
    {
        Ok(outcome) => {
            res.render(Json(serde_json::json!({
                "message": "Response recorded and notification sent",
                "status": outcome.request.status.to_string(),
                "count_completed": outcome.count_completed,
                "account_blocked": outcome.blocked,
            })));
        }
        Err(e) => render_service_error(res, &e),
    }
}

/// ## Summary
/// GET /api/requests/{id}/response/{reply} - Donor one-shot yes/no link.
///
/// A `yes` from the donor, combined with the requester's standing yes,
/// completes the dual confirmation exactly as the in-app path does.
///
/// ## Errors
/// Returns HTTP 400 for a reply other than yes/no, 404 for an unknown
/// request.
#[handler]
async fn link_response_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(request_id) = req.param::<uuid::Uuid>("id") else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse::new("validation_error", "invalid request id")));
        return;
    };
    let reply = match req.param::<String>("reply").as_deref() {
        Some("yes") => DonorReply::Yes,
        Some("no") => DonorReply::No,
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

    let request = match query::donation_request::find(&mut conn, request_id).await {
        Ok(Some(request)) => request,
        Ok(None) => {
            render_service_error(
                res,
                &ServiceError::NotFound(format!("donation request {request_id}")),
            );
            return;
        }
        Err(e) => {
            render_service_error(res, &e.into());
            return;
        }
    };

    let donor = match query::user::find_by_id(&mut conn, request.donor_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            render_service_error(res, &ServiceError::NotFound("donor".to_string()));
            return;
        }
        Err(e) => {
            render_service_error(res, &e.into());
            return;
        }
    };

    let (engine, notifier, clock) = match (
        engine_from_depot(depot),
        get_notifier_from_depot(depot),
        get_clock_from_depot(depot),
    ) {
        (Ok(engine), Ok(notifier), Ok(clock)) => (engine, notifier, clock),
        _ => {
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse::new("internal_error", "Internal server error")));
            return;
        }
    };

    match requests::respond_to_request(
        &mut conn,
        &engine,
        notifier.as_ref(),
        clock.now(),
        request_id,
        &donor,
        reply.agreed(),
        None,
    )
    .await
    {
        Ok(outcome) => {
            let requester_name = if outcome.count_completed {
                query::user::find_by_id(&mut conn, outcome.request.requester_id)
                    .await
                    .ok()
                    .flatten()
                    .map(|u| u.name)
            } else {
                None
            };

            let message = if outcome.count_completed {
                format!(
                    "Count completed! Both you and {} have agreed. One count has been completed \
                     for the requester. Please coordinate immediately for the blood donation \
                     process.",
                    requester_name.as_deref().unwrap_or("the requester")
                )
            } else {
                format!(
                    "Response recorded. You have responded '{}' to the blood donation request. \
                     The requester has been notified.",
                    reply.as_str().to_uppercase()
                )
            };

            res.render(Json(serde_json::json!({
                "message": message,
                "response": reply.as_str(),
                "count_completed": outcome.count_completed,
                "requester_name": requester_name,
            })));
        }
        Err(e) => render_service_error(res, &e),
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("requests")
        .post(create_handler)
        .get(list_handler)
        .push(Router::with_path("{id}/respond").post(respond_handler))
        .push(Router::with_path("{id}/response/{reply}").get(link_response_handler))
}
