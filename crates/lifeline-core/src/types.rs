use crate::error::{CoreError, CoreResult};

/// Blood group without database dependencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BloodGroup {
    APositive,
    ANegative,
    BPositive,
    BNegative,
    AbPositive,
    AbNegative,
    OPositive,
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

    /// ## Summary
    /// Parses a blood group from its wire form (e.g. `"AB+"`).
    ///
    /// ## Errors
    /// Returns a validation error for anything other than the eight groups.
    pub fn parse(input: &str) -> CoreResult<Self> {
        match input {
            "A+" => Ok(Self::APositive),
            "A-" => Ok(Self::ANegative),
            "B+" => Ok(Self::BPositive),
            "B-" => Ok(Self::BNegative),
            "AB+" => Ok(Self::AbPositive),
            "AB-" => Ok(Self::AbNegative),
            "O+" => Ok(Self::OPositive),
            "O-" => Ok(Self::ONegative),
            other => Err(CoreError::ValidationError(format!(
                "unknown blood group '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a profile plays in donation matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
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

    /// True when the profile should appear in donor search results.
    #[must_use]
    pub const fn can_donate(self) -> bool {
        matches!(self, Self::Donor | Self::Both)
    }
}

impl std::fmt::Display for DonorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency attached to a donation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
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

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blood_group_round_trips() {
        for group in [
            BloodGroup::APositive,
            BloodGroup::ANegative,
            BloodGroup::BPositive,
            BloodGroup::BNegative,
            BloodGroup::AbPositive,
            BloodGroup::AbNegative,
            BloodGroup::OPositive,
            BloodGroup::ONegative,
        ] {
            assert_eq!(BloodGroup::parse(group.as_str()).unwrap(), group);
        }
    }

    #[test]
    fn blood_group_rejects_lowercase() {
        assert!(BloodGroup::parse("ab+").is_err());
        assert!(BloodGroup::parse("C+").is_err());
    }

    #[test]
    fn donor_roles_for_search() {
        assert!(DonorRole::Donor.can_donate());
        assert!(DonorRole::Both.can_donate());
        assert!(!DonorRole::Recipient.can_donate());
    }
}
