use diesel::{pg::Pg, prelude::*};

use crate::db::schema;

/// Account row. `is_active` doubles as the blocked flag: the monthly
/// tracker engine deactivates an account when the call goal is reached and
/// reactivates it on month rollover. `manual_block_override` is set by an
/// admin action and suppresses both automatic flips.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = schema::app_user)]
#[diesel(check_for_backend(Pg))]
pub struct User {
    pub id: uuid::Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub otp_hash: Option<String>,
    pub otp_issued_at: Option<chrono::DateTime<chrono::Utc>>,
    pub is_verified: bool,
    pub is_active: bool,
    pub manual_block_override: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Insert struct for registration
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::app_user)]
pub struct NewUser<'a> {
    pub id: uuid::Uuid,
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}
