//! Account lifecycle: registration with email verification, code reissue,
//! verification, and credential checks for users and admins.

use chrono::{DateTime, Utc};

use lifeline_core::constants::MIN_PASSWORD_LENGTH;
use lifeline_db::db::connection::DbConnection;
use lifeline_db::db::query;
use lifeline_db::model::admin::AdminAccount;
use lifeline_db::model::user::{NewUser, User};

use crate::auth::{otp, password};
use crate::error::{ServiceError, ServiceResult};
use crate::notify::{Notifier, templates};

/// ## Summary
/// Lowercases and trims an email for storage and lookup; emails are
/// case-insensitive throughout.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// ## Summary
/// Minimal shape check carried over from the upstream behavior.
///
/// ## Errors
/// Returns a validation error when the address cannot be an email.
pub fn validate_email(email: &str) -> ServiceResult<()> {
    if email.is_empty() || !email.contains('@') || !email.contains('.') {
        return Err(ServiceError::ValidationError(format!(
            "invalid email address '{email}'"
        )));
    }
    Ok(())
}

#[derive(Debug)]
pub struct RegisterInput<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
}

/// ## Summary
/// Registers a new account and emails its verification code.
///
/// The verification email is part of the registration contract: if it
/// cannot be sent the freshly created row is removed again and the
/// registration fails, so users are never stranded unverifiable.
///
/// ## Errors
/// `ValidationError` for bad input, `Conflict` for an already registered
/// email, `NotificationError` when the code email fails.
#[tracing::instrument(skip(conn, notifier, input), fields(email = %normalize_email(input.email)))]
pub async fn register(
    conn: &mut DbConnection<'_>,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
    input: RegisterInput<'_>,
) -> ServiceResult<User> {
    let email = normalize_email(input.email);
    validate_email(&email)?;

    if input.name.trim().is_empty() {
        return Err(ServiceError::ValidationError("name is required".to_string()));
    }
    if input.password.len() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::ValidationError(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if input.password != input.confirm_password {
        return Err(ServiceError::ValidationError(
            "passwords must match".to_string(),
        ));
    }

    if query::user::find_by_email(conn, &email).await?.is_some() {
        return Err(ServiceError::Conflict(
            "email is already registered".to_string(),
        ));
    }

    let password_hash = password::hash_password(input.password)?;
    let user = query::user::insert(
        conn,
        &NewUser {
            id: uuid::Uuid::now_v7(),
            name: input.name.trim(),
            email: &email,
            password_hash: &password_hash,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User registered");

    match issue_verification_code(conn, notifier, &user, now).await {
        Ok(()) => Ok(user),
        Err(e) => {
            // No verification email means no usable account; roll the row
            // back so the address can be registered again.
            tracing::error!(user_id = %user.id, error = %e, "Verification email failed, rolling back registration");
            query::user::delete(conn, user.id).await?;
            Err(e)
        }
    }
}

/// ## Summary
/// Issues a fresh verification code for an existing account.
///
/// ## Errors
/// `NotFound` for an unknown email; notification errors propagate.
#[tracing::instrument(skip(conn, notifier))]
pub async fn send_verification_code(
    conn: &mut DbConnection<'_>,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
    email: &str,
) -> ServiceResult<User> {
    let email = normalize_email(email);
    let user = query::user::find_by_email(conn, &email)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user '{email}'")))?;

    issue_verification_code(conn, notifier, &user, now).await?;

    Ok(user)
}

async fn issue_verification_code(
    conn: &mut DbConnection<'_>,
    notifier: &dyn Notifier,
    user: &User,
    now: DateTime<Utc>,
) -> ServiceResult<()> {
    let code = otp::generate_code();
    query::user::set_otp(conn, user.id, &otp::digest(&code), now).await?;

    notifier.send(templates::verification_code(user, &code)).await?;

    tracing::info!(user_id = %user.id, "Verification code sent");
    Ok(())
}

/// ## Summary
/// Verifies a submitted code and marks the account verified.
///
/// An expired code is cleared so a stale digest cannot be retried forever.
///
/// ## Errors
/// `NotFound` for an unknown email, `ValidationError` for a missing,
/// expired, or wrong code.
#[tracing::instrument(skip(conn, code))]
pub async fn verify_code(
    conn: &mut DbConnection<'_>,
    now: DateTime<Utc>,
    email: &str,
    code: &str,
) -> ServiceResult<User> {
    let email = normalize_email(email);
    let user = query::user::find_by_email(conn, &email)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user '{email}'")))?;

    let (Some(stored_digest), Some(issued_at)) = (&user.otp_hash, user.otp_issued_at) else {
        return Err(ServiceError::ValidationError(
            "no verification code on file".to_string(),
        ));
    };

    match otp::check(code, stored_digest, issued_at, now) {
        otp::OtpCheck::Expired => {
            query::user::clear_otp(conn, user.id, now).await?;
            Err(ServiceError::ValidationError(
                "verification code expired".to_string(),
            ))
        }
        otp::OtpCheck::Mismatch => Err(ServiceError::ValidationError(
            "invalid verification code".to_string(),
        )),
        otp::OtpCheck::Valid => {
            query::user::mark_verified(conn, user.id, now).await?;
            tracing::info!(user_id = %user.id, "Email verified");
            query::user::find_by_id(conn, user.id)
                .await?
                .ok_or(ServiceError::InvariantViolation("verified user vanished"))
        }
    }
}

/// ## Summary
/// Checks user credentials for login.
///
/// ## Errors
/// `NotAuthenticated` for unknown email or wrong password (never
/// distinguishing the two), `AccountNotVerified` and `AccountBlocked` for
/// the respective account states.
#[tracing::instrument(skip(conn, raw_password))]
pub async fn login(
    conn: &mut DbConnection<'_>,
    email: &str,
    raw_password: &str,
) -> ServiceResult<User> {
    let email = normalize_email(email);
    let user = query::user::find_by_email(conn, &email)
        .await?
        .ok_or(ServiceError::NotAuthenticated)?;

    password::verify_password(raw_password, &user.password_hash)?;

    if !user.is_verified {
        return Err(ServiceError::AccountNotVerified);
    }
    if !user.is_active {
        return Err(ServiceError::AccountBlocked);
    }

    Ok(user)
}

/// ## Summary
/// Checks admin credentials without side effects (per-request auth).
///
/// ## Errors
/// `NotAuthenticated` for unknown email or wrong password.
#[tracing::instrument(skip(conn, raw_password))]
pub async fn authenticate_admin(
    conn: &mut DbConnection<'_>,
    email: &str,
    raw_password: &str,
) -> ServiceResult<AdminAccount> {
    let email = normalize_email(email);
    let admin = query::admin::find_active_by_email(conn, &email)
        .await?
        .ok_or(ServiceError::NotAuthenticated)?;

    password::verify_password(raw_password, &admin.password_hash)?;

    Ok(admin)
}

/// ## Summary
/// Checks admin credentials and records the login time.
///
/// ## Errors
/// `NotAuthenticated` for unknown email or wrong password.
#[tracing::instrument(skip(conn, raw_password))]
pub async fn admin_login(
    conn: &mut DbConnection<'_>,
    now: DateTime<Utc>,
    email: &str,
    raw_password: &str,
) -> ServiceResult<AdminAccount> {
    let admin = authenticate_admin(conn, email, raw_password).await?;

    query::admin::touch_last_login(conn, admin.id, now).await?;

    Ok(admin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Sara@Example.COM "), "sara@example.com");
    }

    #[test]
    fn email_shape_check() {
        assert!(validate_email("sara@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("undefined").is_err());
        assert!(validate_email("sara@nodot").is_err());
        assert!(validate_email("no-at.example.com").is_err());
    }
}
