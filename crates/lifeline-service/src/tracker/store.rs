//! Storage seams for the tracker engine.
//!
//! The engine talks to two narrow traits instead of the database directly:
//! [`TrackerStore`] for the per-(user, month) rows and [`UserDirectory`]
//! for account lookups and the guarded activation flips. The PostgreSQL
//! implementations delegate to `lifeline_db::db::query`; tests run the
//! engine against in-memory fakes with the same atomicity contracts.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::BoxFuture;

use lifeline_core::constants::MONTHLY_CALL_GOAL;
use lifeline_db::db::DbProvider;
use lifeline_db::db::query;
use lifeline_db::model::tracker::MonthlyTracker;
use lifeline_db::model::user::User;

use crate::error::ServiceResult;

pub trait TrackerStore: Send + Sync {
    fn get(
        &self,
        user_id: uuid::Uuid,
        month: NaiveDate,
    ) -> BoxFuture<'_, ServiceResult<Option<MonthlyTracker>>>;

    fn get_or_create(
        &self,
        user_id: uuid::Uuid,
        month: NaiveDate,
    ) -> BoxFuture<'_, ServiceResult<(MonthlyTracker, bool)>>;

    /// Atomic `count + 1`; implementations must not read-modify-write.
    fn increment(
        &self,
        user_id: uuid::Uuid,
        month: NaiveDate,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, ServiceResult<MonthlyTracker>>;

    /// Returns `true` exactly once per (user, month): the call that
    /// performed the flip.
    fn mark_goal_completed(
        &self,
        user_id: uuid::Uuid,
        month: NaiveDate,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, ServiceResult<bool>>;

    fn reset(
        &self,
        user_id: uuid::Uuid,
        month: NaiveDate,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, ServiceResult<Option<MonthlyTracker>>>;

    fn goal_completed_in(
        &self,
        month: NaiveDate,
    ) -> BoxFuture<'_, ServiceResult<Vec<MonthlyTracker>>>;
}

pub trait UserDirectory: Send + Sync {
    fn find_by_id(&self, id: uuid::Uuid) -> BoxFuture<'_, ServiceResult<Option<User>>>;

    /// Deactivates iff active and not manually overridden; `true` when this
    /// call performed the flip.
    fn block_for_goal(
        &self,
        id: uuid::Uuid,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, ServiceResult<bool>>;

    /// Reactivates iff inactive and not manually overridden; `true` when
    /// this call performed the flip.
    fn unblock_for_reset(
        &self,
        id: uuid::Uuid,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, ServiceResult<bool>>;
}

/// PostgreSQL-backed tracker store.
#[derive(Clone)]
pub struct PgTrackerStore {
    provider: Arc<dyn DbProvider>,
}

impl PgTrackerStore {
    #[must_use]
    pub fn new(provider: Arc<dyn DbProvider>) -> Self {
        Self { provider }
    }
}

impl TrackerStore for PgTrackerStore {
    fn get(
        &self,
        user_id: uuid::Uuid,
        month: NaiveDate,
    ) -> BoxFuture<'_, ServiceResult<Option<MonthlyTracker>>> {
        Box::pin(async move {
            let mut conn = self.provider.get_connection().await?;
            Ok(query::tracker::get(&mut conn, user_id, month).await?)
        })
    }

    fn get_or_create(
        &self,
        user_id: uuid::Uuid,
        month: NaiveDate,
    ) -> BoxFuture<'_, ServiceResult<(MonthlyTracker, bool)>> {
        Box::pin(async move {
            let mut conn = self.provider.get_connection().await?;
            Ok(query::tracker::get_or_create(&mut conn, user_id, month).await?)
        })
    }

    fn increment(
        &self,
        user_id: uuid::Uuid,
        month: NaiveDate,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, ServiceResult<MonthlyTracker>> {
        Box::pin(async move {
            let mut conn = self.provider.get_connection().await?;
            Ok(query::tracker::increment(&mut conn, user_id, month, at).await?)
        })
    }

    fn mark_goal_completed(
        &self,
        user_id: uuid::Uuid,
        month: NaiveDate,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, ServiceResult<bool>> {
        Box::pin(async move {
            let mut conn = self.provider.get_connection().await?;
            Ok(
                query::tracker::mark_goal_completed(&mut conn, user_id, month, MONTHLY_CALL_GOAL, at)
                    .await?,
            )
        })
    }

    fn reset(
        &self,
        user_id: uuid::Uuid,
        month: NaiveDate,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, ServiceResult<Option<MonthlyTracker>>> {
        Box::pin(async move {
            let mut conn = self.provider.get_connection().await?;
            Ok(query::tracker::reset(&mut conn, user_id, month, at).await?)
        })
    }

    fn goal_completed_in(
        &self,
        month: NaiveDate,
    ) -> BoxFuture<'_, ServiceResult<Vec<MonthlyTracker>>> {
        Box::pin(async move {
            let mut conn = self.provider.get_connection().await?;
            Ok(query::tracker::goal_completed_in(&mut conn, month, MONTHLY_CALL_GOAL).await?)
        })
    }
}

/// PostgreSQL-backed user directory.
#[derive(Clone)]
pub struct PgUserDirectory {
    provider: Arc<dyn DbProvider>,
}

impl PgUserDirectory {
    #[must_use]
    pub fn new(provider: Arc<dyn DbProvider>) -> Self {
        Self { provider }
    }
}

impl UserDirectory for PgUserDirectory {
    fn find_by_id(&self, id: uuid::Uuid) -> BoxFuture<'_, ServiceResult<Option<User>>> {
        Box::pin(async move {
            let mut conn = self.provider.get_connection().await?;
            Ok(query::user::find_by_id(&mut conn, id).await?)
        })
    }

    fn block_for_goal(
        &self,
        id: uuid::Uuid,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, ServiceResult<bool>> {
        Box::pin(async move {
            let mut conn = self.provider.get_connection().await?;
            Ok(query::user::block_for_goal(&mut conn, id, at).await?)
        })
    }

    fn unblock_for_reset(
        &self,
        id: uuid::Uuid,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, ServiceResult<bool>> {
        Box::pin(async move {
            let mut conn = self.provider.get_connection().await?;
            Ok(query::user::unblock_for_reset(&mut conn, id, at).await?)
        })
    }
}
