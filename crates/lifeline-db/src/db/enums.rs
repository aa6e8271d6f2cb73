//! Database enum types with Diesel serialization.
//!
//! This module provides type-safe enum wrappers for database CHECK constraints.
//! Each enum implements `ToSql` and `FromSql` for automatic conversion between Rust and `PostgreSQL`.

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use std::fmt;
use std::io::Write;

/// Blood group of a profile or donation request.
///
/// Maps to the `blood_group` CHECK constraints.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsExpression,
    FromSqlRow,
    serde::Serialize,
    serde::Deserialize,
)]
#[diesel(sql_type = Text)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodGroup {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::APositive => "A+",
            Self::ANegative => "A-",
            Self::BPositive => "B+",
            Self::BNegative => "B-",
            Self::AbPositive => "AB+",
            Self::AbNegative => "AB-",
            Self::OPositive => "O+",
            Self::ONegative => "O-",
        }
    }
}

impl From<lifeline_core::types::BloodGroup> for BloodGroup {
    fn from(value: lifeline_core::types::BloodGroup) -> Self {
        use lifeline_core::types::BloodGroup as Core;
        match value {
            Core::APositive => Self::APositive,
            Core::ANegative => Self::ANegative,
            Core::BPositive => Self::BPositive,
            Core::BNegative => Self::BNegative,
            Core::AbPositive => Self::AbPositive,
            Core::AbNegative => Self::AbNegative,
            Core::OPositive => Self::OPositive,
            Core::ONegative => Self::ONegative,
        }
    }
}

impl ToSql<Text, Pg> for BloodGroup {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for BloodGroup {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"A+" => Ok(Self::APositive),
            b"A-" => Ok(Self::ANegative),
            b"B+" => Ok(Self::BPositive),
            b"B-" => Ok(Self::BNegative),
            b"AB+" => Ok(Self::AbPositive),
            b"AB-" => Ok(Self::AbNegative),
            b"O+" => Ok(Self::OPositive),
            b"O-" => Ok(Self::ONegative),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a profile plays in donor matching.
///
/// Maps to `profile.role` CHECK constraint.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsExpression,
    FromSqlRow,
    serde::Serialize,
    serde::Deserialize,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum DonorRole {
    Donor,
    Recipient,
    Both,
}

impl DonorRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Donor => "donor",
            Self::Recipient => "recipient",
            Self::Both => "both",
        }
    }
}

impl From<lifeline_core::types::DonorRole> for DonorRole {
    fn from(value: lifeline_core::types::DonorRole) -> Self {
        use lifeline_core::types::DonorRole as Core;
        match value {
            Core::Donor => Self::Donor,
            Core::Recipient => Self::Recipient,
            Core::Both => Self::Both,
        }
    }
}

impl ToSql<Text, Pg> for DonorRole {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for DonorRole {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"donor" => Ok(Self::Donor),
            b"recipient" => Ok(Self::Recipient),
            b"both" => Ok(Self::Both),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl fmt::Display for DonorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency of a donation request.
///
/// Maps to `donation_request.urgency` CHECK constraint.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsExpression,
    FromSqlRow,
    serde::Serialize,
    serde::Deserialize,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl From<lifeline_core::types::Urgency> for Urgency {
    fn from(value: lifeline_core::types::Urgency) -> Self {
        use lifeline_core::types::Urgency as Core;
        match value {
            Core::Low => Self::Low,
            Core::Medium => Self::Medium,
            Core::High => Self::High,
        }
    }
}

impl ToSql<Text, Pg> for Urgency {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for Urgency {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"low" => Ok(Self::Low),
            b"medium" => Ok(Self::Medium),
            b"high" => Ok(Self::High),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a donation request.
///
/// Maps to `donation_request.status` CHECK constraint.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsExpression,
    FromSqlRow,
    serde::Serialize,
    serde::Deserialize,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
    Completed,
    Cancelled,
}

impl RequestStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl ToSql<Text, Pg> for RequestStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for RequestStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"pending" => Ok(Self::Pending),
            b"accepted" => Ok(Self::Accepted),
            b"declined" => Ok(Self::Declined),
            b"completed" => Ok(Self::Completed),
            b"cancelled" => Ok(Self::Cancelled),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a logged call.
///
/// Maps to `call_log.outcome` CHECK constraint.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsExpression,
    FromSqlRow,
    serde::Serialize,
    serde::Deserialize,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Completed,
    NoAnswer,
    Busy,
    Failed,
    Declined,
}

impl CallOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::NoAnswer => "no_answer",
            Self::Busy => "busy",
            Self::Failed => "failed",
            Self::Declined => "declined",
        }
    }
}

impl ToSql<Text, Pg> for CallOutcome {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for CallOutcome {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"completed" => Ok(Self::Completed),
            b"no_answer" => Ok(Self::NoAnswer),
            b"busy" => Ok(Self::Busy),
            b"failed" => Ok(Self::Failed),
            b"declined" => Ok(Self::Declined),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Donor's yes/no reply captured from the confirmation link.
///
/// Maps to `call_log.donor_reply` CHECK constraint.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsExpression,
    FromSqlRow,
    serde::Serialize,
    serde::Deserialize,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum DonorReply {
    Yes,
    No,
}

impl DonorReply {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }

    #[must_use]
    pub const fn agreed(self) -> bool {
        matches!(self, Self::Yes)
    }
}

impl ToSql<Text, Pg> for DonorReply {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for DonorReply {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"yes" => Ok(Self::Yes),
            b"no" => Ok(Self::No),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl fmt::Display for DonorReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_match_check_constraints() {
        assert_eq!(BloodGroup::AbNegative.as_str(), "AB-");
        assert_eq!(DonorRole::Both.as_str(), "both");
        assert_eq!(Urgency::Medium.as_str(), "medium");
        assert_eq!(RequestStatus::Completed.as_str(), "completed");
        assert_eq!(CallOutcome::NoAnswer.as_str(), "no_answer");
        assert_eq!(DonorReply::Yes.as_str(), "yes");
    }

    #[test]
    fn donor_reply_agreement() {
        assert!(DonorReply::Yes.agreed());
        assert!(!DonorReply::No.agreed());
    }
}
