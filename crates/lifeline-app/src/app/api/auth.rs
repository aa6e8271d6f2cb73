//! Registration, verification-code, and login endpoints.

use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::{Deserialize, Serialize};
use tracing::error;

use lifeline_db::model::user::User;
use lifeline_service::accounts;

use lifeline_core::clock::Clock;
use super::{ErrorResponse, get_conn_or_return, parse_json_or_return, render_service_error};
use crate::context::{get_clock_from_depot, get_notifier_from_depot};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// ## Summary
/// User payload returned by the auth endpoints.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_verified: bool,
    pub is_active: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            is_verified: user.is_verified,
            is_active: user.is_active,
        }
    }
}

/// ## Summary
/// POST /api/auth/register - Create an account and email its verification
/// code.
///
/// ## Errors
/// Returns HTTP 400 for invalid input, 409 when the email is taken, 500
/// when the verification email cannot be sent.
#[handler]
async fn register_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let body = parse_json_or_return!(req, res, RegisterRequest);
    get_conn_or_return!(depot, res, _db, conn);

    let (notifier, clock) = match (get_notifier_from_depot(depot), get_clock_from_depot(depot)) {
        (Ok(n), Ok(c)) => (n, c),
        _ => {
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse::new("internal_error", "Internal server error")));
            return;
        }
    };

    let input = accounts::RegisterInput {
        name: &body.name,
        email: &body.email,
        password: &body.password,
        confirm_password: &body.confirm_password,
    };

    match accounts::register(&mut conn, notifier.as_ref(), clock.now(), input).await {
        Ok(user) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(serde_json::json!({
                "message": "Registration successful. Check email for the verification code.",
                "user": UserResponse::from(&user),
                "next_step": "verify-otp",
            })));
        }
        Err(e) => render_service_error(res, &e),
    }
}

/// ## Summary
/// POST /api/auth/send-otp - Reissue the verification code.
///
/// ## Errors
/// Returns HTTP 404 for an unknown email, 500 when the email fails.
#[handler]
async fn send_otp_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let body = parse_json_or_return!(req, res, EmailRequest);
    get_conn_or_return!(depot, res, _db, conn);

    let (notifier, clock) = match (get_notifier_from_depot(depot), get_clock_from_depot(depot)) {
        (Ok(n), Ok(c)) => (n, c),
        _ => {
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse::new("internal_error", "Internal server error")));
            return;
        }
    };

    match accounts::send_verification_code(&mut conn, notifier.as_ref(), clock.now(), &body.email)
        .await
    {
        Ok(_user) => {
            res.render(Json(serde_json::json!({
                "message": "Verification code sent",
                "next_step": "verify-otp",
            })));
        }
        Err(e) => render_service_error(res, &e),
    }
}

/// ## Summary
/// POST /api/auth/verify-otp - Verify the emailed code.
///
/// ## Errors
/// Returns HTTP 404 for an unknown email, 400 for a missing, wrong, or
/// expired code.
#[handler]
async fn verify_otp_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let body = parse_json_or_return!(req, res, VerifyCodeRequest);
    get_conn_or_return!(depot, res, _db, conn);

    let clock = match get_clock_from_depot(depot) {
        Ok(c) => c,
        Err(e) => {
            error!(error = ?e, "Failed to get clock");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse::new("internal_error", "Internal server error")));
            return;
        }
    };

    match accounts::verify_code(&mut conn, clock.now(), &body.email, &body.otp).await {
        Ok(user) => {
            res.render(Json(serde_json::json!({
                "message": "Email verified successfully!",
                "user": UserResponse::from(&user),
                "next_step": "dashboard",
            })));
        }
        Err(e) => render_service_error(res, &e),
    }
}

/// ## Summary
/// POST /api/auth/login - Check credentials.
///
/// ## Errors
/// Returns HTTP 401 for bad credentials, 403 for unverified or blocked
/// accounts.
#[handler]
async fn login_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let body = parse_json_or_return!(req, res, LoginRequest);
    get_conn_or_return!(depot, res, _db, conn);

    match accounts::login(&mut conn, &body.email, &body.password).await {
        Ok(user) => {
            res.render(Json(serde_json::json!({
                "message": "Login successful",
                "user": UserResponse::from(&user),
                "next_step": "dashboard",
            })));
        }
        Err(e) => render_service_error(res, &e),
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("auth")
        .push(Router::with_path("register").post(register_handler))
        .push(Router::with_path("send-otp").post(send_otp_handler))
        .push(Router::with_path("verify-otp").post(verify_otp_handler))
        .push(Router::with_path("login").post(login_handler))
}
