//! Donation request queries, including the idempotency claim that keeps a
//! request from being counted toward the monthly goal more than once.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::enums::RequestStatus;
use crate::db::schema::donation_request;
use crate::model::donation_request::{DonationRequest, NewDonationRequest};

/// ## Summary
/// Inserts a new donation request.
///
/// ## Errors
/// Returns a database error if the insert fails.
pub async fn insert(
    conn: &mut DbConnection<'_>,
    new_request: &NewDonationRequest<'_>,
) -> diesel::QueryResult<DonationRequest> {
    diesel::insert_into(donation_request::table)
        .values(new_request)
        .returning(DonationRequest::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Fetches a donation request by id.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn find(
    conn: &mut DbConnection<'_>,
    id: uuid::Uuid,
) -> diesel::QueryResult<Option<DonationRequest>> {
    donation_request::table
        .find(id)
        .select(DonationRequest::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Requests the user created, newest first.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_made_by(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
) -> diesel::QueryResult<Vec<DonationRequest>> {
    donation_request::table
        .filter(donation_request::requester_id.eq(user_id))
        .order(donation_request::created_at.desc())
        .select(DonationRequest::as_select())
        .load(conn)
        .await
}

/// ## Summary
/// Requests addressed to the user as donor, newest first.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_received_by(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
) -> diesel::QueryResult<Vec<DonationRequest>> {
    donation_request::table
        .filter(donation_request::donor_id.eq(user_id))
        .order(donation_request::created_at.desc())
        .select(DonationRequest::as_select())
        .load(conn)
        .await
}

/// ## Summary
/// Records the requester's yes/no and the derived status.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn set_requester_response(
    conn: &mut DbConnection<'_>,
    id: uuid::Uuid,
    agreed: bool,
    status: RequestStatus,
    at: DateTime<Utc>,
) -> diesel::QueryResult<Option<DonationRequest>> {
    diesel::update(donation_request::table.find(id))
        .set((
            donation_request::requester_confirmed.eq(agreed),
            donation_request::status.eq(status),
            donation_request::updated_at.eq(at),
        ))
        .returning(DonationRequest::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// ## Summary
/// Records the donor's yes/no and the derived status.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn set_donor_response(
    conn: &mut DbConnection<'_>,
    id: uuid::Uuid,
    agreed: bool,
    status: RequestStatus,
    at: DateTime<Utc>,
) -> diesel::QueryResult<Option<DonationRequest>> {
    diesel::update(donation_request::table.find(id))
        .set((
            donation_request::donor_confirmed.eq(agreed),
            donation_request::status.eq(status),
            donation_request::updated_at.eq(at),
        ))
        .returning(DonationRequest::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// ## Summary
/// Claims this request's contribution to the requester's monthly count.
///
/// Atomic: guarded by `counted_at IS NULL`, so of all confirmation paths
/// racing over the same request exactly one wins the claim.
///
/// ## Returns
/// `true` iff this call won the claim.
///
/// ## Errors
/// Returns a database error if the update fails.
#[tracing::instrument(skip(conn))]
pub async fn claim_count(
    conn: &mut DbConnection<'_>,
    id: uuid::Uuid,
    at: DateTime<Utc>,
) -> diesel::QueryResult<bool> {
    let updated = diesel::update(
        donation_request::table
            .find(id)
            .filter(donation_request::counted_at.is_null()),
    )
    .set((
        donation_request::counted_at.eq(at),
        donation_request::updated_at.eq(at),
    ))
    .execute(conn)
    .await?;

    Ok(updated == 1)
}

/// ## Summary
/// Most recent still-open request between a requester/donor pair, used by
/// the email-link path to back-fill the in-app request state.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn find_open_for_pair(
    conn: &mut DbConnection<'_>,
    requester_id: uuid::Uuid,
    donor_id: uuid::Uuid,
) -> diesel::QueryResult<Option<DonationRequest>> {
    donation_request::table
        .filter(donation_request::requester_id.eq(requester_id))
        .filter(donation_request::donor_id.eq(donor_id))
        .filter(donation_request::status.eq_any([RequestStatus::Pending, RequestStatus::Accepted]))
        .order(donation_request::created_at.desc())
        .select(DonationRequest::as_select())
        .first(conn)
        .await
        .optional()
}
