mod admin;
mod auth;
mod calls;
mod donors;
mod healthcheck;
mod profiles;
mod requests;
mod tracker;

use salvo::Router;
use salvo::http::StatusCode;
use salvo::writing::Json;
use serde::Serialize;

use lifeline_core::constants::API_ROUTE_COMPONENT;
use lifeline_service::error::ServiceError;

use crate::middleware::auth::AdminAuthMiddleware;

/// ## Summary
/// Error response payload with a stable machine-readable code.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(code: &str, error: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            error: error.into(),
        }
    }
}

/// ## Summary
/// Maps a service error onto an HTTP status and error body.
///
/// 4xx responses carry the error detail; 5xx responses carry a generic
/// message and the detail stays in the logs.
pub(crate) fn render_service_error(res: &mut salvo::Response, err: &ServiceError) {
    use lifeline_core::error::CoreError;

    let (status, code) = match err {
        ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        ServiceError::ValidationError(_)
        | ServiceError::CoreError(CoreError::ValidationError(_) | CoreError::InvalidInput(_)) => {
            (StatusCode::BAD_REQUEST, "validation_error")
        }
        ServiceError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        ServiceError::NotAuthenticated => (StatusCode::UNAUTHORIZED, "not_authenticated"),
        ServiceError::AccountNotVerified => (StatusCode::FORBIDDEN, "account_not_verified"),
        ServiceError::AccountBlocked => (StatusCode::FORBIDDEN, "account_blocked"),
        ServiceError::AuthorizationError(_) => (StatusCode::FORBIDDEN, "forbidden"),
        ServiceError::NotificationError(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "notification_failed")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };

    if status.is_server_error() {
        tracing::error!(error = ?err, "Request failed");
        res.status_code(status);
        res.render(Json(ErrorResponse::new(code, "Internal server error")));
    } else {
        tracing::debug!(error = ?err, "Request rejected");
        res.status_code(status);
        res.render(Json(ErrorResponse::new(code, err.to_string())));
    }
}

/// Binds the depot's database provider and a pooled connection into the
/// handler's scope (the connection borrows the provider, so both names are
/// caller-supplied), rendering the appropriate error response and
/// returning from the handler on failure.
macro_rules! get_conn_or_return {
    ($depot:expr, $res:expr, $provider:ident, $conn:ident) => {
        let $provider = match crate::db_handler::get_db_from_depot($depot) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = ?e, "Failed to get database provider");
                $res.status_code(salvo::http::StatusCode::INTERNAL_SERVER_ERROR);
                $res.render(salvo::writing::Json($crate::app::api::ErrorResponse::new(
                    "internal_error",
                    "Internal server error",
                )));
                return;
            }
        };
        let mut $conn = match $provider.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = ?e, "Failed to get database connection");
                $res.status_code(salvo::http::StatusCode::SERVICE_UNAVAILABLE);
                $res.render(salvo::writing::Json($crate::app::api::ErrorResponse::new(
                    "unavailable",
                    "Database unavailable",
                )));
                return;
            }
        };
    };
}

/// Parses the JSON request body, rendering a 400 and returning from the
/// handler on failure.
macro_rules! parse_json_or_return {
    ($req:expr, $res:expr, $ty:ty) => {
        match $req.parse_json::<$ty>().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = ?e, "Failed to parse request body");
                $res.status_code(salvo::http::StatusCode::BAD_REQUEST);
                $res.render(salvo::writing::Json($crate::app::api::ErrorResponse::new(
                    "validation_error",
                    "Invalid request body",
                )));
                return;
            }
        }
    };
}

pub(crate) use {get_conn_or_return, parse_json_or_return};

/// ## Summary
/// Constructs the main API router.
#[must_use]
pub fn routes() -> Router {
    Router::with_path(API_ROUTE_COMPONENT)
        .push(healthcheck::routes())
        .push(auth::routes())
        .push(donors::routes())
        .push(profiles::routes())
        .push(requests::routes())
        .push(calls::routes())
        .push(tracker::routes())
        .push(
            Router::with_path("admin")
                .push(admin::public_routes())
                .push(admin::routes().hoop(AdminAuthMiddleware)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_assembles() {
        // Route construction panics on malformed path patterns; building
        // the full tree is the check.
        let _router = routes();
    }
}
