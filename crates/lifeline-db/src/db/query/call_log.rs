//! Call log queries, including the email-link confirmation bookkeeping.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::enums::DonorReply;
use crate::db::schema::call_log;
use crate::model::call_log::{CallLog, NewCallLog};

/// ## Summary
/// Inserts a new call log entry.
///
/// ## Errors
/// Returns a database error if the insert fails.
pub async fn insert(
    conn: &mut DbConnection<'_>,
    new_log: &NewCallLog<'_>,
) -> diesel::QueryResult<CallLog> {
    diesel::insert_into(call_log::table)
        .values(new_log)
        .returning(CallLog::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Fetches a call log by id.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn find(
    conn: &mut DbConnection<'_>,
    id: uuid::Uuid,
) -> diesel::QueryResult<Option<CallLog>> {
    call_log::table
        .find(id)
        .select(CallLog::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Records the donor's reply from the confirmation link.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn set_donor_reply(
    conn: &mut DbConnection<'_>,
    id: uuid::Uuid,
    reply: DonorReply,
    at: DateTime<Utc>,
) -> diesel::QueryResult<Option<CallLog>> {
    diesel::update(call_log::table.find(id))
        .set((
            call_log::donor_reply.eq(reply),
            call_log::replied_at.eq(at),
        ))
        .returning(CallLog::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// ## Summary
/// Marks the confirmation email as sent.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn mark_confirmation_sent(
    conn: &mut DbConnection<'_>,
    id: uuid::Uuid,
    at: DateTime<Utc>,
) -> diesel::QueryResult<usize> {
    diesel::update(call_log::table.find(id))
        .set(call_log::confirmation_email_sent_at.eq(at))
        .execute(conn)
        .await
}

/// ## Summary
/// Claims this call's contribution to the caller's monthly count.
///
/// Atomic: guarded by `counted_at IS NULL`; repeated visits to the same
/// confirmation link count at most once.
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
    let updated = diesel::update(call_log::table.find(id).filter(call_log::counted_at.is_null()))
        .set(call_log::counted_at.eq(at))
        .execute(conn)
        .await?;

    Ok(updated == 1)
}
