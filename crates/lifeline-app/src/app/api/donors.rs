//! Donor search.

use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::Serialize;

use lifeline_db::db::query;

use super::{ErrorResponse, get_conn_or_return};

#[derive(Debug, Serialize)]
struct DonorHit {
    name: String,
    email: String,
    blood_group: String,
    city: String,
    contact_number: Option<String>,
}

/// ## Summary
/// GET /api/donors?blood_group=..&city=.. - Find donors by exact blood
/// group and city.
///
/// ## Errors
/// Returns HTTP 400 when either parameter is missing or the blood group is
/// unknown.
#[handler]
async fn search_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let blood_group = req.query::<String>("blood_group");
    let city = req.query::<String>("city");

    let (Some(blood_group), Some(city)) = (blood_group, city) else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse::new(
            "validation_error",
            "Both blood_group and city parameters are required",
        )));
        return;
    };

    let blood_group = match lifeline_core::types::BloodGroup::parse(&blood_group) {
        Ok(group) => lifeline_db::db::enums::BloodGroup::from(group),
        Err(e) => {
            res.status_code(StatusCode::BAD_REQUEST);
            res.render(Json(ErrorResponse::new("validation_error", e.to_string())));
            return;
        }
    };

    get_conn_or_return!(depot, res, _db, conn);

    match query::profile::search_donors(&mut conn, blood_group, &city).await {
        Ok(hits) => {
            let donors: Vec<DonorHit> = hits
                .into_iter()
                .map(|(profile, user)| DonorHit {
                    name: user.name,
                    email: user.email,
                    blood_group: profile.blood_group.to_string(),
                    city: profile.city,
                    contact_number: profile.contact_number,
                })
                .collect();

            res.render(Json(serde_json::json!({
                "message": format!("Found {} donors", donors.len()),
                "donors": donors,
                "search_criteria": {
                    "blood_group": blood_group.to_string(),
                    "city": city,
                },
            })));
        }
        Err(e) => {
            tracing::error!(error = ?e, "Donor search failed");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse::new("internal_error", "Internal server error")));
        }
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("donors").get(search_handler)
}
