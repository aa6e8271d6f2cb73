//! Profile queries: upsert and donor search.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::enums::{BloodGroup, DonorRole};
use crate::db::schema::{app_user, profile};
use crate::model::profile::{NewProfile, Profile, ProfileUpdate};
use crate::model::user::User;

/// ## Summary
/// Fetches the profile belonging to a user.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn find_by_user(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
) -> diesel::QueryResult<Option<Profile>> {
    profile::table
        .filter(profile::user_id.eq(user_id))
        .select(Profile::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Creates or updates the user's profile in one statement
/// (`ON CONFLICT (user_id) DO UPDATE`).
///
/// ## Returns
/// The stored profile and whether a new row was created.
///
/// ## Errors
/// Returns a database error if the upsert fails.
#[tracing::instrument(skip(conn, new_profile, update))]
pub async fn upsert(
    conn: &mut DbConnection<'_>,
    new_profile: &NewProfile<'_>,
    update: &ProfileUpdate<'_>,
) -> diesel::QueryResult<(Profile, bool)> {
    let existed = profile::table
        .filter(profile::user_id.eq(new_profile.user_id))
        .count()
        .get_result::<i64>(conn)
        .await?
        > 0;

    let stored = diesel::insert_into(profile::table)
        .values(new_profile)
        .on_conflict(profile::user_id)
        .do_update()
        .set(update)
        .returning(Profile::as_returning())
        .get_result(conn)
        .await?;

    Ok((stored, !existed))
}

/// ## Summary
/// Donor search: exact blood group and city, roles that can donate,
/// active accounts only.
///
/// ## Errors
/// Returns a database error if the query fails.
#[tracing::instrument(skip(conn))]
pub async fn search_donors(
    conn: &mut DbConnection<'_>,
    blood_group: BloodGroup,
    city: &str,
) -> diesel::QueryResult<Vec<(Profile, User)>> {
    profile::table
        .inner_join(app_user::table)
        .filter(profile::blood_group.eq(blood_group))
        .filter(profile::city.eq(city))
        .filter(profile::role.eq_any([DonorRole::Donor, DonorRole::Both]))
        .filter(app_user::is_active.eq(true))
        .select((Profile::as_select(), User::as_select()))
        .load(conn)
        .await
}
