//! Account queries, including the two guarded activation flips used by the
//! tracker engine. Both flips check the current value and the manual
//! override inside the UPDATE so an admin action is never clobbered.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::app_user;
use crate::model::user::{NewUser, User};

/// ## Summary
/// Looks up an account by (lowercased) email.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn find_by_email(
    conn: &mut DbConnection<'_>,
    email: &str,
) -> diesel::QueryResult<Option<User>> {
    app_user::table
        .filter(app_user::email.eq(email))
        .select(User::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Looks up an account by id.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn find_by_id(
    conn: &mut DbConnection<'_>,
    id: uuid::Uuid,
) -> diesel::QueryResult<Option<User>> {
    app_user::table
        .find(id)
        .select(User::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Inserts a freshly registered account.
///
/// ## Errors
/// Returns a database error (including the unique-email violation) if the
/// insert fails.
pub async fn insert(conn: &mut DbConnection<'_>, new_user: &NewUser<'_>) -> diesel::QueryResult<User> {
    diesel::insert_into(app_user::table)
        .values(new_user)
        .returning(User::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Stores a new verification-code digest and its issue time.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn set_otp(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    otp_hash: &str,
    at: DateTime<Utc>,
) -> diesel::QueryResult<usize> {
    diesel::update(app_user::table.find(user_id))
        .set((
            app_user::otp_hash.eq(otp_hash),
            app_user::otp_issued_at.eq(at),
            app_user::updated_at.eq(at),
        ))
        .execute(conn)
        .await
}

/// ## Summary
/// Clears any stored verification code (expired or consumed).
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn clear_otp(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    at: DateTime<Utc>,
) -> diesel::QueryResult<usize> {
    diesel::update(app_user::table.find(user_id))
        .set((
            app_user::otp_hash.eq(None::<String>),
            app_user::otp_issued_at.eq(None::<DateTime<Utc>>),
            app_user::updated_at.eq(at),
        ))
        .execute(conn)
        .await
}

/// ## Summary
/// Marks the account verified and consumes the verification code.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn mark_verified(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    at: DateTime<Utc>,
) -> diesel::QueryResult<usize> {
    diesel::update(app_user::table.find(user_id))
        .set((
            app_user::is_verified.eq(true),
            app_user::otp_hash.eq(None::<String>),
            app_user::otp_issued_at.eq(None::<DateTime<Utc>>),
            app_user::updated_at.eq(at),
        ))
        .execute(conn)
        .await
}

/// ## Summary
/// Deactivates the account because the monthly goal was reached.
///
/// Only fires while the account is active and not manually overridden.
///
/// ## Returns
/// `true` iff this call deactivated the account.
///
/// ## Errors
/// Returns a database error if the update fails.
#[tracing::instrument(skip(conn))]
pub async fn block_for_goal(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    at: DateTime<Utc>,
) -> diesel::QueryResult<bool> {
    let updated = diesel::update(
        app_user::table
            .find(user_id)
            .filter(app_user::is_active.eq(true))
            .filter(app_user::manual_block_override.eq(false)),
    )
    .set((app_user::is_active.eq(false), app_user::updated_at.eq(at)))
    .execute(conn)
    .await?;

    Ok(updated == 1)
}

/// ## Summary
/// Reactivates the account on month rollover.
///
/// Only fires while the account is inactive and not manually overridden.
///
/// ## Returns
/// `true` iff this call reactivated the account.
///
/// ## Errors
/// Returns a database error if the update fails.
#[tracing::instrument(skip(conn))]
pub async fn unblock_for_reset(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    at: DateTime<Utc>,
) -> diesel::QueryResult<bool> {
    let updated = diesel::update(
        app_user::table
            .find(user_id)
            .filter(app_user::is_active.eq(false))
            .filter(app_user::manual_block_override.eq(false)),
    )
    .set((app_user::is_active.eq(true), app_user::updated_at.eq(at)))
    .execute(conn)
    .await?;

    Ok(updated == 1)
}

/// ## Summary
/// Admin toggle: sets the active flag directly and records whether the
/// change should override the automatic cycle.
///
/// ## Errors
/// Returns a database error if the update fails.
#[tracing::instrument(skip(conn))]
pub async fn set_active(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    active: bool,
    manual_override: bool,
    at: DateTime<Utc>,
) -> diesel::QueryResult<Option<User>> {
    diesel::update(app_user::table.find(user_id))
        .set((
            app_user::is_active.eq(active),
            app_user::manual_block_override.eq(manual_override),
            app_user::updated_at.eq(at),
        ))
        .returning(User::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// ## Summary
/// All accounts, newest first, for the admin user list.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_all(conn: &mut DbConnection<'_>) -> diesel::QueryResult<Vec<User>> {
    app_user::table
        .order(app_user::created_at.desc())
        .select(User::as_select())
        .load(conn)
        .await
}

/// ## Summary
/// Deletes an account; trackers, profile, requests, and call logs cascade.
///
/// ## Returns
/// `true` iff a row was deleted.
///
/// ## Errors
/// Returns a database error if the delete fails.
pub async fn delete(conn: &mut DbConnection<'_>, user_id: uuid::Uuid) -> diesel::QueryResult<bool> {
    let deleted = diesel::delete(app_user::table.find(user_id))
        .execute(conn)
        .await?;

    Ok(deleted == 1)
}
