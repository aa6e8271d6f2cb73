use diesel::{pg::Pg, prelude::*};

use crate::db::{
    enums::{CallOutcome, DonorReply},
    schema,
};

/// One donation call between a requester (caller) and a donor (receiver).
///
/// `counted_at` is the idempotency claim for the email-link confirmation
/// path when the call is not tied to a donation request.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = schema::call_log)]
#[diesel(check_for_backend(Pg))]
pub struct CallLog {
    pub id: uuid::Uuid,
    pub caller_id: uuid::Uuid,
    pub receiver_id: uuid::Uuid,
    pub donation_request_id: Option<uuid::Uuid>,
    pub duration_seconds: i32,
    pub outcome: CallOutcome,
    pub notes: Option<String>,
    pub donor_reply: Option<DonorReply>,
    pub replied_at: Option<chrono::DateTime<chrono::Utc>>,
    pub confirmation_email_sent_at: Option<chrono::DateTime<chrono::Utc>>,
    pub counted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::call_log)]
pub struct NewCallLog<'a> {
    pub id: uuid::Uuid,
    pub caller_id: uuid::Uuid,
    pub receiver_id: uuid::Uuid,
    pub donation_request_id: Option<uuid::Uuid>,
    pub duration_seconds: i32,
    pub outcome: CallOutcome,
    pub notes: Option<&'a str>,
}
