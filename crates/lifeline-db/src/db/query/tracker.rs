//! Monthly tracker store primitives.
//!
//! Every mutation here is a single guarded SQL statement: the increment is
//! done in the UPDATE itself (never read-modify-write), the goal flip only
//! fires while the flag is still unset, and concurrent first-creators for
//! the same (user, month) fall back to selecting the winner's row.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::monthly_tracker;
use crate::model::tracker::{MonthlyTracker, NewMonthlyTracker};

/// ## Summary
/// Fetches the tracker for a (user, month) pair.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn get(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    month: NaiveDate,
) -> diesel::QueryResult<Option<MonthlyTracker>> {
    monthly_tracker::table
        .filter(monthly_tracker::user_id.eq(user_id))
        .filter(monthly_tracker::month.eq(month))
        .select(MonthlyTracker::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Returns the existing tracker for (user, month) or creates a zeroed one.
///
/// The insert uses `ON CONFLICT DO NOTHING` on the (user_id, month) unique
/// constraint, so a concurrent creator loses the race silently and picks up
/// the winner's row with the follow-up select.
///
/// ## Returns
/// The tracker and whether this call created it.
///
/// ## Errors
/// Returns a database error if the insert or fallback select fails.
#[tracing::instrument(skip(conn))]
pub async fn get_or_create(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    month: NaiveDate,
) -> diesel::QueryResult<(MonthlyTracker, bool)> {
    let inserted: Option<MonthlyTracker> = diesel::insert_into(monthly_tracker::table)
        .values(&NewMonthlyTracker {
            id: uuid::Uuid::now_v7(),
            user_id,
            month,
        })
        .on_conflict((monthly_tracker::user_id, monthly_tracker::month))
        .do_nothing()
        .returning(MonthlyTracker::as_returning())
        .get_result(conn)
        .await
        .optional()?;

    if let Some(tracker) = inserted {
        tracing::debug!(tracker_id = %tracker.id, %month, "Created monthly tracker");
        return Ok((tracker, true));
    }

    let existing = monthly_tracker::table
        .filter(monthly_tracker::user_id.eq(user_id))
        .filter(monthly_tracker::month.eq(month))
        .select(MonthlyTracker::as_select())
        .first(conn)
        .await?;

    Ok((existing, false))
}

/// ## Summary
/// Atomically increments the completed-call count for (user, month).
///
/// The arithmetic happens inside the UPDATE, so concurrent confirmations
/// cannot lose each other's increments.
///
/// ## Errors
/// Returns `NotFound` if no tracker exists for the pair, or any other
/// database error.
#[tracing::instrument(skip(conn))]
pub async fn increment(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    month: NaiveDate,
    at: DateTime<Utc>,
) -> diesel::QueryResult<MonthlyTracker> {
    diesel::update(
        monthly_tracker::table
            .filter(monthly_tracker::user_id.eq(user_id))
            .filter(monthly_tracker::month.eq(month)),
    )
    .set((
        monthly_tracker::completed_calls_count.eq(monthly_tracker::completed_calls_count + 1),
        monthly_tracker::updated_at.eq(at),
    ))
    .returning(MonthlyTracker::as_returning())
    .get_result(conn)
    .await
}

/// ## Summary
/// Marks the monthly goal completed, at most once per month.
///
/// Guarded by `monthly_goal_completed = false` and the threshold, so only
/// one of any number of concurrent confirmations observes the transition.
///
/// ## Returns
/// `true` iff this call performed the flip.
///
/// ## Errors
/// Returns a database error if the update fails.
#[tracing::instrument(skip(conn))]
pub async fn mark_goal_completed(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    month: NaiveDate,
    threshold: i32,
    at: DateTime<Utc>,
) -> diesel::QueryResult<bool> {
    let updated = diesel::update(
        monthly_tracker::table
            .filter(monthly_tracker::user_id.eq(user_id))
            .filter(monthly_tracker::month.eq(month))
            .filter(monthly_tracker::monthly_goal_completed.eq(false))
            .filter(monthly_tracker::completed_calls_count.ge(threshold)),
    )
    .set((
        monthly_tracker::monthly_goal_completed.eq(true),
        monthly_tracker::goal_completed_at.eq(at),
        monthly_tracker::updated_at.eq(at),
    ))
    .execute(conn)
    .await?;

    Ok(updated == 1)
}

/// ## Summary
/// Zeroes the tracker for (user, month): count 0, flag unset, timestamp
/// cleared. A no-op beyond redundant writes when already reset.
///
/// ## Errors
/// Returns a database error if the update fails.
#[tracing::instrument(skip(conn))]
pub async fn reset(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    month: NaiveDate,
    at: DateTime<Utc>,
) -> diesel::QueryResult<Option<MonthlyTracker>> {
    diesel::update(
        monthly_tracker::table
            .filter(monthly_tracker::user_id.eq(user_id))
            .filter(monthly_tracker::month.eq(month)),
    )
    .set((
        monthly_tracker::completed_calls_count.eq(0),
        monthly_tracker::monthly_goal_completed.eq(false),
        monthly_tracker::goal_completed_at.eq(None::<DateTime<Utc>>),
        monthly_tracker::updated_at.eq(at),
    ))
    .returning(MonthlyTracker::as_returning())
    .get_result(conn)
    .await
    .optional()
}

/// ## Summary
/// Trackers in `month` whose goal completed with at least `threshold`
/// calls — the reset job's scan set.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn goal_completed_in(
    conn: &mut DbConnection<'_>,
    month: NaiveDate,
    threshold: i32,
) -> diesel::QueryResult<Vec<MonthlyTracker>> {
    monthly_tracker::table
        .filter(monthly_tracker::month.eq(month))
        .filter(monthly_tracker::monthly_goal_completed.eq(true))
        .filter(monthly_tracker::completed_calls_count.ge(threshold))
        .select(MonthlyTracker::as_select())
        .load(conn)
        .await
}

/// ## Summary
/// All goal-completed trackers with their users, newest transition first.
/// Backs the admin blocked-profiles view (current and previously blocked).
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn goal_history_with_users(
    conn: &mut DbConnection<'_>,
    threshold: i32,
) -> diesel::QueryResult<Vec<(MonthlyTracker, crate::model::user::User)>> {
    use crate::db::schema::app_user;
    use crate::model::user::User;

    monthly_tracker::table
        .inner_join(app_user::table)
        .filter(monthly_tracker::monthly_goal_completed.eq(true))
        .filter(monthly_tracker::completed_calls_count.ge(threshold))
        .order(monthly_tracker::goal_completed_at.desc())
        .select((MonthlyTracker::as_select(), User::as_select()))
        .load(conn)
        .await
}

#[cfg(test)]
mod tests {
    #[expect(unused_imports)]
    use super::*;

    #[test]
    fn test_tracker_queries_compile() {
        // Query construction is type-checked here; behavior is covered by
        // the engine tests over the in-memory store and by the schema's
        // unique constraint.
    }
}
