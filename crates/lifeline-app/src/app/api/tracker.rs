//! Monthly tracker read endpoint.

use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};

use lifeline_core::constants::MONTHLY_CALL_GOAL;
use lifeline_core::month::month_label;
use lifeline_db::db::query;
use lifeline_service::error::ServiceError;
use lifeline_service::accounts;

use super::{ErrorResponse, get_conn_or_return, render_service_error};
use crate::context::engine_from_depot;

/// ## Summary
/// GET /api/monthly-tracker?user_email=.. - The user's current-month
/// donation progress.
///
/// Resolving the tracker lazily self-heals month rollover: if the user is
/// still blocked from a previous month, this read unblocks them.
///
/// ## Errors
/// Returns HTTP 400 for a missing or malformed email (including the
/// literal strings clients sometimes send for an absent value), 404 for an
/// unknown user.
#[handler]
async fn get_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let user_email = req.query::<String>("user_email");

    let Some(user_email) = user_email else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse::new(
            "validation_error",
            "user_email is required as a query parameter",
        )));
        return;
    };

    let trimmed = user_email.trim();
    if trimmed.is_empty() || trimmed == "undefined" || trimmed == "null" {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse::new(
            "validation_error",
            "user_email cannot be empty",
        )));
        return;
    }

    let email = accounts::normalize_email(trimmed);
    if let Err(e) = accounts::validate_email(&email) {
        render_service_error(res, &e);
        return;
    }

    get_conn_or_return!(depot, res, _db, conn);

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

    let engine = match engine_from_depot(depot) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = ?e, "Failed to assemble tracker engine");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse::new("internal_error", "Internal server error")));
            return;
        }
    };

    match engine.resolve_current(user.id).await {
        Ok(tracker) => {
            res.render(Json(serde_json::json!({
                "user_email": user.email,
                "month": month_label(tracker.month),
                "completed_calls_count": tracker.completed_calls_count,
                "monthly_goal_completed": tracker.monthly_goal_completed,
                "goal_completed_at": tracker.goal_completed_at,
                "progress": format!("{}/{MONTHLY_CALL_GOAL}", tracker.completed_calls_count),
            })));
        }
        Err(e) => render_service_error(res, &e),
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("monthly-tracker").get(get_handler)
}
