use diesel::{pg::Pg, prelude::*};

use crate::db::{
    enums::{BloodGroup, RequestStatus, Urgency},
    schema,
};

/// A requester→donor donation request.
///
/// `requester_confirmed` / `donor_confirmed` are tri-state: null until the
/// party responds. `counted_at` is the idempotency claim — set exactly once
/// when this request contributes a confirmed call to the requester's
/// monthly tracker, no matter which confirmation path fires first.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = schema::donation_request)]
#[diesel(check_for_backend(Pg))]
pub struct DonationRequest {
    pub id: uuid::Uuid,
    pub requester_id: uuid::Uuid,
    pub donor_id: uuid::Uuid,
    pub blood_group: BloodGroup,
    pub urgency: Urgency,
    pub notes: Option<String>,
    pub requester_confirmed: Option<bool>,
    pub donor_confirmed: Option<bool>,
    pub status: RequestStatus,
    pub counted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl DonationRequest {
    /// Both parties have said yes.
    #[must_use]
    pub fn fully_confirmed(&self) -> bool {
        self.requester_confirmed == Some(true) && self.donor_confirmed == Some(true)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::donation_request)]
pub struct NewDonationRequest<'a> {
    pub id: uuid::Uuid,
    pub requester_id: uuid::Uuid,
    pub donor_id: uuid::Uuid,
    pub blood_group: BloodGroup,
    pub urgency: Urgency,
    pub notes: Option<&'a str>,
}
