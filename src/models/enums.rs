use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(RiskLevel {
    Critical => "critical",
    High => "high",
    Moderate => "moderate",
    Low => "low",
});

str_enum!(TriageStatus {
    Pending => "pending",
    InReview => "in_review",
    Resolved => "resolved",
});

str_enum!(UserRole {
    Patient => "patient",
    Doctor => "doctor",
    Admin => "admin",
});

impl TriageStatus {
    /// Staff-driven lifecycle. `Resolved` is terminal.
    pub fn can_transition_to(&self, next: TriageStatus) -> bool {
        matches!(
            (self, next),
            (TriageStatus::Pending, TriageStatus::InReview)
                | (TriageStatus::Pending, TriageStatus::Resolved)
                | (TriageStatus::InReview, TriageStatus::Resolved)
                | (TriageStatus::InReview, TriageStatus::Pending)
        )
    }
}

impl UserRole {
    /// Clinical staff allowed to work the pending queue.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Doctor | UserRole::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn risk_level_round_trip() {
        for (variant, s) in [
            (RiskLevel::Critical, "critical"),
            (RiskLevel::High, "high"),
            (RiskLevel::Moderate, "moderate"),
            (RiskLevel::Low, "low"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(RiskLevel::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn risk_level_is_case_sensitive() {
        assert!(RiskLevel::from_str("High").is_err());
        assert!(RiskLevel::from_str("CRITICAL").is_err());
        assert!(RiskLevel::from_str("severe").is_err());
    }

    #[test]
    fn triage_status_round_trip() {
        for (variant, s) in [
            (TriageStatus::Pending, "pending"),
            (TriageStatus::InReview, "in_review"),
            (TriageStatus::Resolved, "resolved"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(TriageStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn serde_uses_snake_case_names() {
        let json = serde_json::to_string(&TriageStatus::InReview).unwrap();
        assert_eq!(json, "\"in_review\"");
        let parsed: RiskLevel = serde_json::from_str("\"moderate\"").unwrap();
        assert_eq!(parsed, RiskLevel::Moderate);
    }

    #[test]
    fn invalid_enum_reports_field() {
        let err = TriageStatus::from_str("closed").unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::InvalidEnum { ref field, ref value }
                if field == "TriageStatus" && value == "closed"
        ));
    }

    #[test]
    fn resolved_is_terminal() {
        for next in [TriageStatus::Pending, TriageStatus::InReview, TriageStatus::Resolved] {
            assert!(!TriageStatus::Resolved.can_transition_to(next));
        }
    }

    #[test]
    fn pending_can_be_claimed_or_resolved() {
        assert!(TriageStatus::Pending.can_transition_to(TriageStatus::InReview));
        assert!(TriageStatus::Pending.can_transition_to(TriageStatus::Resolved));
        assert!(!TriageStatus::Pending.can_transition_to(TriageStatus::Pending));
    }

    #[test]
    fn staff_roles() {
        assert!(UserRole::Doctor.is_staff());
        assert!(UserRole::Admin.is_staff());
        assert!(!UserRole::Patient.is_staff());
    }
}
