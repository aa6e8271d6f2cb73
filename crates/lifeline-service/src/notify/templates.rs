//! Email subject/body builders.
//!
//! Plain-text templates carried over from the upstream deployment's
//! wording, rendered into ready-to-send [`EmailMessage`] values.

use lifeline_db::model::user::User;

use super::EmailMessage;

/// ## Summary
/// Verification code email sent at registration and on resend.
#[must_use]
pub fn verification_code(user: &User, code: &str) -> EmailMessage {
    EmailMessage {
        to: user.email.clone(),
        subject: "Email Verification Required".to_string(),
        body: format!("Your email verification code: {code}. This code will expire in 10 minutes."),
    }
}

/// ## Summary
/// Account-unblocked notice sent when the monthly cycle reactivates a user.
#[must_use]
pub fn monthly_unblock(user: &User, month_label: &str) -> EmailMessage {
    let body = format!(
        "Dear {name},\n\n\
         Great news! Your account has been automatically unblocked for {month_label}.\n\n\
         Your previous monthly donation goal was completed in the last month, and now you can \
         continue helping save lives with a fresh start.\n\n\
         Monthly status reset:\n\
         - Completed calls count: reset to 0\n\
         - Monthly goal status: reset\n\
         - Account status: active\n\n\
         You can now receive new donation requests, make calls to donors and requesters, and \
         continue your life-saving contributions.\n\n\
         Thank you for being a valuable member of our blood donation community.\n\n\
         Best regards,\n\
         Lifeline Team\n\n\
         Note: This is an automated message. If you have any questions, please contact our \
         support team.",
        name = user.name,
    );

    EmailMessage {
        to: user.email.clone(),
        subject: "Account Unblocked - Welcome Back to Lifeline".to_string(),
        body,
    }
}

/// ## Summary
/// New donation request alert sent to the donor.
#[must_use]
pub fn donation_request_alert(
    donor: &User,
    requester_name: &str,
    blood_group: &str,
    urgency: &str,
    notes: Option<&str>,
) -> EmailMessage {
    let mut body = format!(
        "Hello {donor_name},\n\n\
         You have received a blood donation request from {requester_name} for {blood_group} \
         blood group.\n\n\
         Urgency level: {urgency}\n",
        donor_name = donor.name,
    );

    if let Some(notes) = notes
        && !notes.is_empty()
    {
        body.push_str(&format!("Additional notes: {notes}\n"));
    }

    body.push_str(
        "\nPlease open the Lifeline app to respond to this request.\n\n\
         Thank you for being a potential life saver!",
    );

    EmailMessage {
        to: donor.email.clone(),
        subject: format!("Blood Donation Request - {blood_group} Needed"),
        body,
    }
}

/// ## Summary
/// Yes/no confirmation links emailed to the call's receiver.
#[must_use]
pub fn donor_confirmation(receiver: &User, caller_name: &str, yes_url: &str, no_url: &str) -> EmailMessage {
    let body = format!(
        "Dear {name},\n\n\
         You recently spoke with {caller_name} about a blood donation. Please confirm your \
         decision:\n\n\
         I agree to donate:    {yes_url}\n\
         I cannot donate now:  {no_url}\n\n\
         Your answer helps us keep donation progress accurate for everyone involved.\n\n\
         Thank you for your time,\n\
         Lifeline Team",
        name = receiver.name,
    );

    EmailMessage {
        to: receiver.email.clone(),
        subject: "Call Completed - Please Confirm Your Decision".to_string(),
        body,
    }
}

/// ## Summary
/// Update sent to the other party after a yes/no response on a request.
#[must_use]
pub fn response_update(
    recipient: &User,
    responder_name: &str,
    responder_is_donor: bool,
    agreed: bool,
    blood_group: &str,
    notes: Option<&str>,
) -> EmailMessage {
    let mut body = match (responder_is_donor, agreed) {
        (true, true) => format!(
            "Great news! {responder_name} has agreed to donate {blood_group} blood to you.\n\n\
             Please coordinate with the donor for the donation process.\n\n"
        ),
        (true, false) => format!(
            "{responder_name} is unable to donate blood at this time.\n\n\
             Please try contacting other donors or search for more donors in your area.\n\n"
        ),
        (false, true) => format!(
            "{responder_name} has confirmed they still need {blood_group} blood donation.\n\n\
             Please proceed with your donation if you're still available.\n\n"
        ),
        (false, false) => format!(
            "{responder_name} no longer needs blood donation.\n\n\
             Thank you for your willingness to help!\n\n"
        ),
    };

    if let Some(notes) = notes
        && !notes.is_empty()
    {
        body.push_str(&format!("Additional message: {notes}\n\n"));
    }

    body.push_str("Thank you for using Lifeline!");

    let action = if agreed { "Accepted" } else { "Declined" };

    EmailMessage {
        to: recipient.email.clone(),
        subject: format!("Donation Request {action}"),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, email: &str) -> User {
        let now = chrono::Utc::now();
        User {
            id: uuid::Uuid::now_v7(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: String::new(),
            otp_hash: None,
            otp_issued_at: None,
            is_verified: true,
            is_active: true,
            manual_block_override: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn unblock_notice_names_the_month() {
        let message = monthly_unblock(&user("Sara", "sara@example.com"), "March 2025");
        assert_eq!(message.to, "sara@example.com");
        assert!(message.body.contains("March 2025"));
        assert!(message.body.contains("Dear Sara"));
        assert!(message.subject.contains("Unblocked"));
    }

    #[test]
    fn confirmation_embeds_both_links() {
        let message = donor_confirmation(
            &user("Omar", "omar@example.com"),
            "Sara",
            "http://app/api/calls/confirm?call_log_id=1&response=yes",
            "http://app/api/calls/confirm?call_log_id=1&response=no",
        );
        assert!(message.body.contains("response=yes"));
        assert!(message.body.contains("response=no"));
    }

    #[test]
    fn request_alert_skips_empty_notes() {
        let message = donation_request_alert(&user("Omar", "omar@example.com"), "Sara", "AB+", "high", None);
        assert!(!message.body.contains("Additional notes"));
        assert!(message.body.contains("AB+"));
        assert!(message.body.contains("high"));
    }
}
