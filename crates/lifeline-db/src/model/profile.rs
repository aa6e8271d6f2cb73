use diesel::{pg::Pg, prelude::*};

use crate::db::{
    enums::{BloodGroup, DonorRole},
    schema,
};
use crate::model;

/// Donor/recipient profile, one per user.
#[derive(
    Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations, serde::Serialize,
)]
#[diesel(table_name = schema::profile)]
#[diesel(check_for_backend(Pg))]
#[diesel(belongs_to(model::user::User, foreign_key = user_id))]
pub struct Profile {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub blood_group: BloodGroup,
    pub city: String,
    pub contact_number: Option<String>,
    pub role: DonorRole,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::profile)]
pub struct NewProfile<'a> {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub blood_group: BloodGroup,
    pub city: &'a str,
    pub contact_number: Option<&'a str>,
    pub role: DonorRole,
}

/// Changeset applied on profile upsert.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = schema::profile)]
pub struct ProfileUpdate<'a> {
    pub blood_group: BloodGroup,
    pub city: &'a str,
    pub contact_number: Option<&'a str>,
    pub role: DonorRole,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
