/// Route component constants shared across crates
pub const API_ROUTE_COMPONENT: &str = "api";

/// Confirmed donation calls a user may complete per calendar month before
/// their account is deactivated until the month rolls over.
pub const MONTHLY_CALL_GOAL: i32 = 3;

/// Minimum accepted password length at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Seconds a verification code stays valid after being issued.
pub const OTP_TTL_SECONDS: i64 = 600;
