//! Admin surface: login, user management, blocked-profile history, and the
//! manual tracker reset.

use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::Deserialize;

use lifeline_core::constants::{MIN_PASSWORD_LENGTH, MONTHLY_CALL_GOAL};
use lifeline_core::month::{month_label, month_start, parse_month};
use lifeline_db::db::query;
use lifeline_db::model::admin::NewAdminAccount;
use lifeline_service::auth::password;
use lifeline_service::error::ServiceError;
use lifeline_service::accounts;

use lifeline_core::clock::Clock;
use super::{ErrorResponse, get_conn_or_return, parse_json_or_return, render_service_error};
use crate::context::{engine_from_depot, get_clock_from_depot};

#[derive(Debug, Deserialize)]
struct AdminLoginBody {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct CreateAdminBody {
    name: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct BlockToggleBody {
    /// Whether the change should suppress the automatic block/unblock
    /// cycle for this user from now on. Defaults to true: an explicit
    /// admin decision wins over automation.
    #[serde(default = "default_true")]
    manual_override: bool,
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct TrackerResetBody {
    user_email: String,
    /// `YYYY-MM`; defaults to the current month.
    #[serde(default)]
    month: Option<String>,
}

/// ## Summary
/// POST /api/admin/login - Check admin credentials.
///
/// ## Errors
/// Returns HTTP 401 for bad credentials.
#[handler]
async fn login_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let body = parse_json_or_return!(req, res, AdminLoginBody);
    get_conn_or_return!(depot, res, _db, conn);

    let clock = match get_clock_from_depot(depot) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = ?e, "Failed to get clock");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse::new("internal_error", "Internal server error")));
            return;
        }
    };

    match accounts::admin_login(&mut conn, clock.now(), &body.email, &body.password).await {
        Ok(admin) => {
            res.render(Json(serde_json::json!({
                "message": "Admin logged in successfully",
                "admin": {
                    "id": admin.id.to_string(),
                    "name": admin.name,
                    "email": admin.email,
                    "is_superuser": admin.is_superuser,
                },
            })));
        }
        Err(e) => render_service_error(res, &e),
    }
}

/// ## Summary
/// POST /api/admin/accounts - Create another admin account.
///
/// ## Errors
/// Returns HTTP 400 for invalid input, 409 for a duplicate email.
#[handler]
async fn create_admin_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let body = parse_json_or_return!(req, res, CreateAdminBody);
    get_conn_or_return!(depot, res, _db, conn);

    if body.name.trim().is_empty() || body.email.trim().is_empty() {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse::new(
            "validation_error",
            "Name, email, and password are required",
        )));
        return;
    }
    if body.password.len() < MIN_PASSWORD_LENGTH {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse::new(
            "validation_error",
            format!("password must be at least {MIN_PASSWORD_LENGTH} characters"),
        )));
        return;
    }

    let email = accounts::normalize_email(&body.email);
    match query::admin::find_active_by_email(&mut conn, &email).await {
        Ok(Some(_)) => {
            res.status_code(StatusCode::CONFLICT);
            res.render(Json(ErrorResponse::new(
                "conflict",
                "Admin with this email already exists",
            )));
            return;
        }
        Ok(None) => {}
        Err(e) => {
            render_service_error(res, &e.into());
            return;
        }
    }

    let password_hash = match password::hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => {
            render_service_error(res, &e);
            return;
        }
    };

    let new_admin = NewAdminAccount {
        id: uuid::Uuid::now_v7(),
        name: body.name.trim(),
        email: &email,
        password_hash: &password_hash,
        is_superuser: false,
    };

    match query::admin::insert(&mut conn, &new_admin).await {
        Ok(admin) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(serde_json::json!({
                "message": "Admin created successfully",
                "admin": {
                    "id": admin.id.to_string(),
                    "name": admin.name,
                    "email": admin.email,
                },
            })));
        }
        Err(e) => render_service_error(res, &e.into()),
    }
}

/// ## Summary
/// GET /api/admin/users - All accounts, newest first.
#[handler]
async fn list_users_handler(_req: &mut Request, depot: &mut Depot, res: &mut Response) {
    get_conn_or_return!(depot, res, _db, conn);

    match query::user::list_all(&mut conn).await {
        Ok(users) => {
            let users: Vec<_> = users
                .iter()
                .map(|user| {
                    serde_json::json!({
                        "id": user.id.to_string(),
                        "name": user.name,
                        "email": user.email,
                        "is_active": user.is_active,
                        "is_verified": user.is_verified,
                        "manual_block_override": user.manual_block_override,
                        "created_at": user.created_at,
                    })
                })
                .collect();
            res.render(Json(serde_json::json!({ "users": users })));
        }
        Err(e) => render_service_error(res, &e.into()),
    }
}

/// ## Summary
/// DELETE /api/admin/users/{id} - Delete an account (trackers, profile,
/// requests, and call logs cascade).
///
/// ## Errors
/// Returns HTTP 404 for an unknown user.
#[handler]
async fn delete_user_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(user_id) = req.param::<uuid::Uuid>("id") else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse::new("validation_error", "invalid user id")));
        return;
    };

    get_conn_or_return!(depot, res, _db, conn);

    match query::user::delete(&mut conn, user_id).await {
        Ok(true) => {
            res.render(Json(serde_json::json!({ "message": "User deleted successfully" })));
        }
        Ok(false) => {
            render_service_error(res, &ServiceError::NotFound(format!("user {user_id}")));
        }
        Err(e) => render_service_error(res, &e.into()),
    }
}

/// ## Summary
/// POST /api/admin/users/{id}/block-toggle - Manually block or unblock.
///
/// By default the change also sets the manual override, so the automatic
/// monthly cycle will not undo an explicit admin decision.
///
/// ## Errors
/// Returns HTTP 404 for an unknown user.
#[handler]
async fn block_toggle_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(user_id) = req.param::<uuid::Uuid>("id") else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse::new("validation_error", "invalid user id")));
        return;
    };

    let manual_override = match req.parse_json::<BlockToggleBody>().await {
        Ok(body) => body.manual_override,
        // An empty body means the default: admin decisions stick.
        Err(_) => true,
    };

    get_conn_or_return!(depot, res, _db, conn);

    let user = match query::user::find_by_id(&mut conn, user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            render_service_error(res, &ServiceError::NotFound(format!("user {user_id}")));
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

    match query::user::set_active(&mut conn, user_id, !user.is_active, manual_override, now).await {
        Ok(Some(updated)) => {
            let status = if updated.is_active { "unblocked" } else { "blocked" };
            tracing::info!(user_id = %user_id, status, manual_override, "Admin toggled account");
            res.render(Json(serde_json::json!({
                "message": format!("User {status} successfully"),
                "is_active": updated.is_active,
                "manual_block_override": updated.manual_block_override,
            })));
        }
        Ok(None) => {
            render_service_error(res, &ServiceError::NotFound(format!("user {user_id}")));
        }
        Err(e) => render_service_error(res, &e.into()),
    }
}

/// ## Summary
/// GET /api/admin/blocked - Users blocked by the monthly cycle, current and
/// past, from the tracker audit trail.
#[handler]
async fn blocked_profiles_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    get_conn_or_return!(depot, res, _db, conn);

    let current_month = match get_clock_from_depot(depot) {
        Ok(clock) => month_start(clock.now()),
        Err(e) => {
            tracing::error!(error = ?e, "Failed to get clock");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse::new("internal_error", "Internal server error")));
            return;
        }
    };

    match query::tracker::goal_history_with_users(&mut conn, MONTHLY_CALL_GOAL).await {
        Ok(rows) => {
            let profiles: Vec<_> = rows
                .iter()
                .map(|(tracker, user)| {
                    let currently_blocked = !user.is_active;
                    serde_json::json!({
                        "id": user.id.to_string(),
                        "email": user.email,
                        "name": user.name,
                        "is_active": user.is_active,
                        "blocked_month": month_label(tracker.month),
                        "completed_calls_count": tracker.completed_calls_count,
                        "goal_completed_at": tracker.goal_completed_at,
                        "blocking_status": if currently_blocked {
                            "Currently Blocked"
                        } else {
                            "Previously Blocked (Unblocked)"
                        },
                        "is_current_month": tracker.month == current_month,
                    })
                })
                .collect();

            res.render(Json(serde_json::json!({
                "blocked_profiles": profiles,
                "total_count": profiles.len(),
            })));
        }
        Err(e) => render_service_error(res, &e.into()),
    }
}

/// ## Summary
/// POST /api/admin/trackers/reset - Reset a user's tracker for the given
/// (default: current) month; unblocks and notifies like the scheduled job.
///
/// ## Errors
/// Returns HTTP 400 for a malformed month, 404 for an unknown user.
#[handler]
async fn tracker_reset_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let body = parse_json_or_return!(req, res, TrackerResetBody);
    get_conn_or_return!(depot, res, _db, conn);

    let email = accounts::normalize_email(&body.user_email);
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

    let (engine, clock) = match (engine_from_depot(depot), get_clock_from_depot(depot)) {
        (Ok(engine), Ok(clock)) => (engine, clock),
        _ => {
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse::new("internal_error", "Internal server error")));
            return;
        }
    };

    let month = match &body.month {
        Some(input) => match parse_month(input) {
            Ok(month) => month,
            Err(e) => {
                render_service_error(res, &e.into());
                return;
            }
        },
        None => month_start(clock.now()),
    };

    match engine.reset_for_new_month(user.id, month).await {
        Ok(effect) => {
            res.render(Json(serde_json::json!({
                "message": format!("Tracker reset for {}", month_label(month)),
                "reset": effect.tracker.is_some(),
                "unblocked": effect.unblocked,
                "notified": effect.notified,
            })));
        }
        Err(e) => render_service_error(res, &e),
    }
}

/// Routes reachable without admin credentials.
#[must_use]
pub fn public_routes() -> Router {
    Router::with_path("login").post(login_handler)
}

/// Routes behind the admin Basic-auth middleware.
#[must_use]
pub fn routes() -> Router {
    Router::new()
        .push(Router::with_path("accounts").post(create_admin_handler))
        .push(
            Router::with_path("users")
                .get(list_users_handler)
                .push(
                    Router::with_path("{id}")
                        .delete(delete_user_handler)
                        .push(Router::with_path("block-toggle").post(block_toggle_handler)),
                ),
        )
        .push(Router::with_path("blocked").get(blocked_profiles_handler))
        .push(Router::with_path("trackers/reset").post(tracker_reset_handler))
}
