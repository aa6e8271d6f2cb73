//! Admin authentication middleware.
//!
//! Admin routes require HTTP Basic credentials belonging to an active
//! admin account. The authenticated account is stored in the depot for
//! handlers that care who acted.

use std::sync::Arc;

use base64::Engine as _;
use salvo::Depot;
use salvo::http::StatusCode;
use salvo::writing::Json;
use tracing::error;

use lifeline_db::model::admin::AdminAccount;
use lifeline_service::accounts;

use crate::app::api::ErrorResponse;
use crate::db_handler::get_db_from_depot;

pub struct AdminAuthMiddleware;

fn parse_basic_credentials(req: &salvo::Request) -> Option<(String, String)> {
    let header = req
        .headers()
        .get(salvo::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (email, password) = decoded.split_once(':')?;
    Some((email.to_string(), password.to_string()))
}

fn reject(res: &mut salvo::Response, ctrl: &mut salvo::FlowCtrl, status: StatusCode, code: &str) {
    res.status_code(status);
    res.render(Json(ErrorResponse {
        code: code.to_string(),
        error: "Admin access required".to_string(),
    }));
    ctrl.skip_rest();
}

#[salvo::async_trait]
impl salvo::Handler for AdminAuthMiddleware {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        let Some((email, password)) = parse_basic_credentials(req) else {
            tracing::debug!("Missing or malformed admin credentials");
            reject(res, ctrl, StatusCode::UNAUTHORIZED, "not_authenticated");
            return;
        };

        let provider = match get_db_from_depot(depot) {
            Ok(p) => p,
            Err(e) => {
                error!(error = ?e, "Failed to get database provider from depot");
                res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
                ctrl.skip_rest();
                return;
            }
        };

        let mut conn = match provider.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!(error = ?e, "Failed to get database connection");
                res.status_code(StatusCode::SERVICE_UNAVAILABLE);
                ctrl.skip_rest();
                return;
            }
        };

        match accounts::authenticate_admin(&mut conn, &email, &password).await {
            Ok(admin) => {
                tracing::debug!(admin_email = %admin.email, "Admin authenticated");
                depot.inject(Arc::new(admin));
            }
            Err(lifeline_service::error::ServiceError::NotAuthenticated) => {
                tracing::warn!(email = %email, "Admin authentication failed");
                reject(res, ctrl, StatusCode::FORBIDDEN, "forbidden");
            }
            Err(e) => {
                error!(error = ?e, "Admin authentication errored");
                res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
                ctrl.skip_rest();
            }
        }
    }
}

/// ## Summary
/// Retrieves the authenticated admin from the depot.
///
/// ## Errors
/// Returns an error if no admin was stored by the middleware.
pub fn get_admin_from_depot(depot: &Depot) -> crate::error::AppResult<Arc<AdminAccount>> {
    depot.obtain::<Arc<AdminAccount>>().cloned().map_err(|_err| {
        lifeline_core::error::CoreError::InvariantViolation("Admin not found in depot").into()
    })
}
