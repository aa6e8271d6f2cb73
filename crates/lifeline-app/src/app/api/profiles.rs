//! Profile upsert and lookup.

use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::Deserialize;

use lifeline_db::db::query;
use lifeline_db::model::profile::{NewProfile, ProfileUpdate};
use lifeline_service::accounts;
use lifeline_service::error::ServiceError;

use lifeline_core::clock::Clock;
use super::{ErrorResponse, get_conn_or_return, parse_json_or_return, render_service_error};
use crate::context::get_clock_from_depot;

#[derive(Debug, Deserialize)]
struct UpsertProfileRequest {
    email: String,
    blood_group: String,
    city: String,
    contact_number: Option<String>,
    role: String,
}

fn parse_role(input: &str) -> Option<lifeline_db::db::enums::DonorRole> {
    use lifeline_db::db::enums::DonorRole;
    match input {
        "donor" => Some(DonorRole::Donor),
        "recipient" => Some(DonorRole::Recipient),
        "both" => Some(DonorRole::Both),
        _ => None,
    }
}

/// ## Summary
/// POST /api/profiles - Create or update the user's profile.
///
/// ## Errors
/// Returns HTTP 400 for invalid input, 404 for an unknown user.
#[handler]
async fn upsert_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let body = parse_json_or_return!(req, res, UpsertProfileRequest);
    get_conn_or_return!(depot, res, _db, conn);

    let blood_group = match lifeline_core::types::BloodGroup::parse(&body.blood_group) {
        Ok(group) => lifeline_db::db::enums::BloodGroup::from(group),
        Err(e) => {
            res.status_code(StatusCode::BAD_REQUEST);
            res.render(Json(ErrorResponse::new("validation_error", e.to_string())));
            return;
        }
    };

    let Some(role) = parse_role(&body.role) else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse::new(
            "validation_error",
            format!("unknown role '{}'", body.role),
        )));
        return;
    };

    if body.city.trim().is_empty() {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse::new("validation_error", "city is required")));
        return;
    }

    let email = accounts::normalize_email(&body.email);
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

    let now = match get_clock_from_depot(depot) {
        Ok(clock) => clock.now(),
        Err(e) => {
            tracing::error!(error = ?e, "Failed to get clock");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse::new("internal_error", "Internal server error")));
            return;
        }
    };

    let new_profile = NewProfile {
        id: uuid::Uuid::now_v7(),
        user_id: user.id,
        blood_group,
        city: body.city.trim(),
        contact_number: body.contact_number.as_deref(),
        role,
    };
    let update = ProfileUpdate {
        blood_group,
        city: body.city.trim(),
        contact_number: body.contact_number.as_deref(),
        role,
        updated_at: now,
    };

    match query::profile::upsert(&mut conn, &new_profile, &update).await {
        Ok((profile, created)) => {
            res.status_code(if created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            });
            res.render(Json(serde_json::json!({
                "message": if created { "Profile created successfully" } else { "Profile updated successfully" },
                "profile": profile,
            })));
        }
        Err(e) => render_service_error(res, &e.into()),
    }
}

/// ## Summary
/// GET /api/profiles/{email} - Fetch a profile by account email.
///
/// ## Errors
/// Returns HTTP 404 when the user or profile does not exist.
#[handler]
async fn get_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(email) = req.param::<String>("email") else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse::new("validation_error", "email parameter is required")));
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

    match query::profile::find_by_user(&mut conn, user.id).await {
        Ok(Some(profile)) => {
            res.render(Json(serde_json::json!({ "profile": profile })));
        }
        Ok(None) => {
            render_service_error(res, &ServiceError::NotFound("profile".to_string()));
        }
        Err(e) => render_service_error(res, &e.into()),
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("profiles")
        .post(upsert_handler)
        .push(Router::with_path("{email}").get(get_handler))
}
