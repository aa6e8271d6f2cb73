use diesel::{pg::Pg, prelude::*};

use crate::db::schema;
use crate::model;

/// Per-user, per-calendar-month record of confirmed donation calls.
///
/// `month` is always the first day of the month; (user_id, month) is unique.
/// Rows from past months are kept untouched as the audit trail behind the
/// admin blocked-profiles view.
#[derive(
    Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations, serde::Serialize,
)]
#[diesel(table_name = schema::monthly_tracker)]
#[diesel(check_for_backend(Pg))]
#[diesel(belongs_to(model::user::User, foreign_key = user_id))]
pub struct MonthlyTracker {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub month: chrono::NaiveDate,
    pub completed_calls_count: i32,
    pub monthly_goal_completed: bool,
    pub goal_completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::monthly_tracker)]
pub struct NewMonthlyTracker {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub month: chrono::NaiveDate,
}
