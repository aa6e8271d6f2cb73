//! Admin account queries.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::admin_account;
use crate::model::admin::{AdminAccount, NewAdminAccount};

/// ## Summary
/// Looks up an active admin account by (lowercased) email.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn find_active_by_email(
    conn: &mut DbConnection<'_>,
    email: &str,
) -> diesel::QueryResult<Option<AdminAccount>> {
    admin_account::table
        .filter(admin_account::email.eq(email))
        .filter(admin_account::is_active.eq(true))
        .select(AdminAccount::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Inserts a new admin account.
///
/// ## Errors
/// Returns a database error (including the unique-email violation) if the
/// insert fails.
pub async fn insert(
    conn: &mut DbConnection<'_>,
    new_admin: &NewAdminAccount<'_>,
) -> diesel::QueryResult<AdminAccount> {
    diesel::insert_into(admin_account::table)
        .values(new_admin)
        .returning(AdminAccount::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Records a successful admin login.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn touch_last_login(
    conn: &mut DbConnection<'_>,
    id: uuid::Uuid,
    at: DateTime<Utc>,
) -> diesel::QueryResult<usize> {
    diesel::update(admin_account::table.find(id))
        .set(admin_account::last_login_at.eq(at))
        .execute(conn)
        .await
}
