//! Email verification codes.
//!
//! The raw six-digit code only ever leaves the process inside the
//! verification email; at rest it is stored as a SHA-256 digest next to its
//! issue time and expires after ten minutes.

use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

use lifeline_core::constants::OTP_TTL_SECONDS;

/// Result of checking a submitted code against the stored digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Valid,
    Expired,
    Mismatch,
}

/// ## Summary
/// Generates a random six-digit verification code.
#[must_use]
pub fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    code.to_string()
}

/// ## Summary
/// SHA-256 digest of a code, hex-encoded, as stored on the account row.
#[must_use]
pub fn digest(code: &str) -> String {
    let hash = Sha256::digest(code.as_bytes());
    hash.iter().fold(String::with_capacity(64), |mut out, byte| {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
        out
    })
}

/// ## Summary
/// Checks a submitted code against the stored digest and issue time.
#[must_use]
pub fn check(
    submitted: &str,
    stored_digest: &str,
    issued_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> OtpCheck {
    if (now - issued_at).num_seconds() > OTP_TTL_SECONDS {
        return OtpCheck::Expired;
    }

    if digest(submitted) == stored_digest {
        OtpCheck::Valid
    } else {
        OtpCheck::Mismatch
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn valid_code_within_ttl() {
        let stored = digest("483920");
        assert_eq!(check("483920", &stored, at(12, 0), at(12, 5)), OtpCheck::Valid);
    }

    #[test]
    fn wrong_code_is_a_mismatch() {
        let stored = digest("483920");
        assert_eq!(
            check("000000", &stored, at(12, 0), at(12, 5)),
            OtpCheck::Mismatch
        );
    }

    #[test]
    fn code_expires_after_ten_minutes() {
        let stored = digest("483920");
        let issued = at(12, 0);
        let just_inside = issued + Duration::seconds(OTP_TTL_SECONDS);
        let just_outside = issued + Duration::seconds(OTP_TTL_SECONDS + 1);

        assert_eq!(check("483920", &stored, issued, just_inside), OtpCheck::Valid);
        assert_eq!(
            check("483920", &stored, issued, just_outside),
            OtpCheck::Expired
        );
    }
}
