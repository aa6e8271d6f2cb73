//! Donation request workflow: creation with donor notification and the
//! dual in-app confirmation path.
//!
//! This is one of the two coordinators feeding the monthly tracker; see
//! `calls` for the email-link path. Both must win the request's
//! `counted_at` claim before touching the tracker, so a request can only
//! ever contribute one confirmed call no matter how the confirmations
//! arrive.

use chrono::{DateTime, Utc};

use lifeline_db::db::connection::DbConnection;
use lifeline_db::db::enums::{BloodGroup, RequestStatus, Urgency};
use lifeline_db::db::query;
use lifeline_db::model::donation_request::{DonationRequest, NewDonationRequest};
use lifeline_db::model::user::User;

use crate::error::{ServiceError, ServiceResult};
use crate::notify::{Notifier, templates};
use crate::tracker::TrackerEngine;

/// ## Summary
/// Derives the request status from the two tri-state confirmations.
#[must_use]
pub fn derive_status(requester: Option<bool>, donor: Option<bool>) -> RequestStatus {
    match (requester, donor) {
        (Some(true), Some(true)) => RequestStatus::Completed,
        (Some(false), _) => RequestStatus::Cancelled,
        (_, Some(false)) => RequestStatus::Declined,
        (Some(true), None) | (None, Some(true)) => RequestStatus::Accepted,
        (None, None) => RequestStatus::Pending,
    }
}

/// ## Summary
/// Creates a donation request and emails the donor an alert.
///
/// The alert is best-effort: a send failure is logged and the request
/// stands.
///
/// ## Errors
/// Returns an error if persistence fails.
#[tracing::instrument(skip(conn, notifier, requester, donor, notes))]
pub async fn create_request(
    conn: &mut DbConnection<'_>,
    notifier: &dyn Notifier,
    requester: &User,
    donor: &User,
    blood_group: BloodGroup,
    urgency: Urgency,
    notes: Option<&str>,
) -> ServiceResult<DonationRequest> {
    let request = query::donation_request::insert(
        conn,
        &NewDonationRequest {
            id: uuid::Uuid::now_v7(),
            requester_id: requester.id,
            donor_id: donor.id,
            blood_group,
            urgency,
            notes,
        },
    )
    .await?;

    tracing::info!(request_id = %request.id, donor = %donor.email, "Donation request created");

    let alert = templates::donation_request_alert(
        donor,
        &requester.name,
        blood_group.as_str(),
        urgency.as_str(),
        notes,
    );
    if let Err(e) = notifier.send(alert).await {
        tracing::warn!(request_id = %request.id, error = %e, "Donor alert email failed");
    }

    Ok(request)
}

/// Which side of the request is responding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Party {
    Requester,
    Donor,
}

/// What a yes/no response did.
#[derive(Debug, Clone)]
pub struct RespondOutcome {
    pub request: DonationRequest,
    /// True when this response completed a confirmed call for the
    /// requester's monthly tracker.
    pub count_completed: bool,
    pub goal_just_completed: bool,
    pub blocked: bool,
}

/// ## Summary
/// Records one party's yes/no on a request (the dual in-app confirmation
/// path).
///
/// Re-confirmation with the same answer is a no-op. When both parties have
/// said yes, the coordinator claims the request's `counted_at` and — only
/// on winning the claim — counts one confirmed call for the requester,
/// deactivating the account if that call crossed the monthly goal. The
/// other party is notified best-effort.
///
/// ## Errors
/// `NotFound` for an unknown request, `AuthorizationError` when the
/// responder is neither party, or any persistence error.
#[tracing::instrument(skip(conn, engine, notifier, responder, notes))]
pub async fn respond_to_request(
    conn: &mut DbConnection<'_>,
    engine: &TrackerEngine,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
    request_id: uuid::Uuid,
    responder: &User,
    agreed: bool,
    notes: Option<&str>,
) -> ServiceResult<RespondOutcome> {
    let request = query::donation_request::find(conn, request_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("donation request {request_id}")))?;

    let party = if responder.id == request.requester_id {
        Party::Requester
    } else if responder.id == request.donor_id {
        Party::Donor
    } else {
        return Err(ServiceError::AuthorizationError(
            "not a participant in this donation request".to_string(),
        ));
    };

    let request = match party {
        Party::Requester if request.requester_confirmed == Some(agreed) => request,
        Party::Donor if request.donor_confirmed == Some(agreed) => request,
        Party::Requester => {
            let status = derive_status(Some(agreed), request.donor_confirmed);
            query::donation_request::set_requester_response(conn, request_id, agreed, status, now)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("donation request {request_id}")))?
        }
        Party::Donor => {
            let status = derive_status(request.requester_confirmed, Some(agreed));
            query::donation_request::set_donor_response(conn, request_id, agreed, status, now)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("donation request {request_id}")))?
        }
    };

    let mut outcome = RespondOutcome {
        request: request.clone(),
        count_completed: false,
        goal_just_completed: false,
        blocked: false,
    };

    if request.fully_confirmed()
        && query::donation_request::claim_count(conn, request_id, now).await?
    {
        let count = engine.record_confirmed_call(request.requester_id).await?;
        outcome.count_completed = true;
        outcome.goal_just_completed = count.goal_just_completed;

        if count.goal_just_completed {
            outcome.blocked = engine.block_for_goal(request.requester_id).await?;
        }
    }

    notify_other_party(conn, notifier, &request, party, responder, agreed, notes).await;

    Ok(outcome)
}

async fn notify_other_party(
    conn: &mut DbConnection<'_>,
    notifier: &dyn Notifier,
    request: &DonationRequest,
    party: Party,
    responder: &User,
    agreed: bool,
    notes: Option<&str>,
) {
    let recipient_id = match party {
        Party::Requester => request.donor_id,
        Party::Donor => request.requester_id,
    };

    let recipient = match query::user::find_by_id(conn, recipient_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(request_id = %request.id, error = %e, "Could not load response recipient");
            return;
        }
    };

    let message = templates::response_update(
        &recipient,
        &responder.name,
        party == Party::Donor,
        agreed,
        request.blood_group.as_str(),
        notes,
    );

    if let Err(e) = notifier.send(message).await {
        tracing::warn!(request_id = %request.id, error = %e, "Response update email failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_the_confirmation_pair() {
        assert_eq!(derive_status(None, None), RequestStatus::Pending);
        assert_eq!(derive_status(Some(true), None), RequestStatus::Accepted);
        assert_eq!(derive_status(None, Some(true)), RequestStatus::Accepted);
        assert_eq!(derive_status(Some(true), Some(true)), RequestStatus::Completed);
        assert_eq!(derive_status(Some(false), None), RequestStatus::Cancelled);
        assert_eq!(derive_status(Some(false), Some(true)), RequestStatus::Cancelled);
        assert_eq!(derive_status(Some(true), Some(false)), RequestStatus::Declined);
    }
}
