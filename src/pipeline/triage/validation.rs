//! Strict validation of the model's parsed JSON into an [`Assessment`].
//!
//! Checks run in a fixed order and stop at the first failure:
//! required keys, risk level, priority score, confidence. Nothing here
//! panics; every failure is a [`Rejection`] carrying a reason tag for logs.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::models::{Assessment, RiskLevel, MAX_PRIORITY_SCORE, MIN_PRIORITY_SCORE};

pub const REQUIRED_FIELDS: [&str; 4] =
    ["risk_level", "priority_score", "ai_confidence", "recommendations"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingField,
    BadRiskLevel,
    BadPriorityScore,
    BadConfidence,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingField => "missing_field",
            RejectReason::BadRiskLevel => "bad_risk_level",
            RejectReason::BadPriorityScore => "bad_priority_score",
            RejectReason::BadConfidence => "bad_confidence",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub reason: RejectReason,
    pub detail: String,
}

impl Rejection {
    fn new(reason: RejectReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reason.as_str(), self.detail)
    }
}

/// Validate a parsed model response.
pub fn validate_assessment(value: &Value) -> Result<Assessment, Rejection> {
    let obj = value.as_object().ok_or_else(|| {
        Rejection::new(RejectReason::MissingField, "response is not a JSON object")
    })?;

    // (a) required keys
    if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !obj.contains_key(**f)) {
        return Err(Rejection::new(
            RejectReason::MissingField,
            format!("missing required field: {missing}"),
        ));
    }
    let recommendations = obj["recommendations"]
        .as_str()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| {
            Rejection::new(
                RejectReason::MissingField,
                "recommendations must be non-empty text",
            )
        })?
        .to_string();

    // (b) risk level, exact and case-sensitive
    let risk_level = obj["risk_level"]
        .as_str()
        .and_then(|s| RiskLevel::from_str(s).ok())
        .ok_or_else(|| {
            Rejection::new(
                RejectReason::BadRiskLevel,
                format!("invalid risk_level: {}", obj["risk_level"]),
            )
        })?;

    // (c) integer priority within 1..=10; floats and booleans are not integers
    let priority_score = obj["priority_score"]
        .as_i64()
        .filter(|p| (i64::from(MIN_PRIORITY_SCORE)..=i64::from(MAX_PRIORITY_SCORE)).contains(p))
        .and_then(|p| u8::try_from(p).ok())
        .ok_or_else(|| {
            Rejection::new(
                RejectReason::BadPriorityScore,
                format!("invalid priority_score: {}", obj["priority_score"]),
            )
        })?;

    // (d) numeric confidence within [0, 1]
    let ai_confidence = obj["ai_confidence"]
        .as_f64()
        .filter(|c| (0.0..=1.0).contains(c))
        .ok_or_else(|| {
            Rejection::new(
                RejectReason::BadConfidence,
                format!("invalid ai_confidence: {}", obj["ai_confidence"]),
            )
        })?;

    Ok(Assessment {
        risk_level,
        priority_score,
        ai_confidence,
        recommendations,
        primary_concerns: obj.get("primary_concerns").and_then(string_list),
        reasoning: obj
            .get("reasoning")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Wrong-typed optional lists are treated as absent.
fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "risk_level": "high",
            "priority_score": 8,
            "ai_confidence": 0.87,
            "primary_concerns": ["chest pain", "tachycardia"],
            "recommendations": "Immediate medical attention required",
            "reasoning": "Chest pain with elevated heart rate"
        })
    }

    fn reason(value: Value) -> RejectReason {
        validate_assessment(&value).unwrap_err().reason
    }

    #[test]
    fn accepts_complete_response() {
        let a = validate_assessment(&valid()).unwrap();
        assert_eq!(a.risk_level, RiskLevel::High);
        assert_eq!(a.priority_score, 8);
        assert!((a.ai_confidence - 0.87).abs() < f64::EPSILON);
        assert_eq!(a.primary_concerns.as_ref().unwrap().len(), 2);
        assert_eq!(a.reasoning.as_deref(), Some("Chest pain with elevated heart rate"));
        assert!(a.is_within_bounds());
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let a = validate_assessment(&json!({
            "risk_level": "low",
            "priority_score": 1,
            "ai_confidence": 0,
            "recommendations": "Rest and fluids"
        }))
        .unwrap();
        assert!(a.primary_concerns.is_none());
        assert!(a.reasoning.is_none());
        assert_eq!(a.ai_confidence, 0.0);
    }

    #[test]
    fn rejects_unknown_risk_level() {
        let value = json!({"risk_level":"severe", "priority_score":5, "ai_confidence":0.5, "recommendations":"x"});
        assert_eq!(reason(value), RejectReason::BadRiskLevel);
    }

    #[test]
    fn risk_level_is_case_sensitive() {
        let mut value = valid();
        value["risk_level"] = json!("High");
        assert_eq!(reason(value), RejectReason::BadRiskLevel);
    }

    #[test]
    fn rejects_out_of_range_priority() {
        let value = json!({"risk_level":"high","priority_score":11,"ai_confidence":0.5,"recommendations":"x"});
        assert_eq!(reason(value), RejectReason::BadPriorityScore);
        let value = json!({"risk_level":"high","priority_score":0,"ai_confidence":0.5,"recommendations":"x"});
        assert_eq!(reason(value), RejectReason::BadPriorityScore);
    }

    #[test]
    fn rejects_non_integer_priority() {
        for bad in [json!(5.5), json!(5.0), json!("5"), json!(true), json!(null)] {
            let mut value = valid();
            value["priority_score"] = bad.clone();
            assert_eq!(reason(value), RejectReason::BadPriorityScore, "{bad}");
        }
    }

    #[test]
    fn rejects_bad_confidence() {
        for bad in [json!(1.01), json!(-0.1), json!("0.5"), json!(null)] {
            let mut value = valid();
            value["ai_confidence"] = bad.clone();
            assert_eq!(reason(value), RejectReason::BadConfidence, "{bad}");
        }
    }

    #[test]
    fn confidence_bounds_are_inclusive() {
        for ok in [json!(0), json!(1), json!(0.0), json!(1.0)] {
            let mut value = valid();
            value["ai_confidence"] = ok;
            assert!(validate_assessment(&value).is_ok());
        }
    }

    #[test]
    fn rejects_each_missing_required_field() {
        for field in REQUIRED_FIELDS {
            let mut value = valid();
            value.as_object_mut().unwrap().remove(field);
            let rejection = validate_assessment(&value).unwrap_err();
            assert_eq!(rejection.reason, RejectReason::MissingField);
            assert!(rejection.detail.contains(field));
        }
    }

    #[test]
    fn empty_recommendations_count_as_missing() {
        let mut value = valid();
        value["recommendations"] = json!("  ");
        assert_eq!(reason(value), RejectReason::MissingField);
    }

    #[test]
    fn missing_field_checked_before_enum() {
        let value = json!({"risk_level":"severe","priority_score":50,"ai_confidence":0.5});
        assert_eq!(reason(value), RejectReason::MissingField);
    }

    #[test]
    fn risk_checked_before_priority_and_confidence() {
        let value = json!({"risk_level":"bad","priority_score":50,"ai_confidence":7,"recommendations":"x"});
        assert_eq!(reason(value), RejectReason::BadRiskLevel);
        let value = json!({"risk_level":"low","priority_score":50,"ai_confidence":7,"recommendations":"x"});
        assert_eq!(reason(value), RejectReason::BadPriorityScore);
    }

    #[test]
    fn non_object_is_missing_field() {
        assert_eq!(reason(json!([1, 2, 3])), RejectReason::MissingField);
        assert_eq!(reason(json!("high")), RejectReason::MissingField);
    }

    #[test]
    fn wrong_typed_optionals_are_dropped() {
        let mut value = valid();
        value["primary_concerns"] = json!("chest pain");
        value["reasoning"] = json!(42);
        let a = validate_assessment(&value).unwrap();
        assert!(a.primary_concerns.is_none());
        assert!(a.reasoning.is_none());

        let mut value = valid();
        value["primary_concerns"] = json!(["ok", 3]);
        assert!(validate_assessment(&value).unwrap().primary_concerns.is_none());
    }

    #[test]
    fn reason_tags() {
        assert_eq!(RejectReason::MissingField.as_str(), "missing_field");
        assert_eq!(RejectReason::BadRiskLevel.as_str(), "bad_risk_level");
        assert_eq!(RejectReason::BadPriorityScore.as_str(), "bad_priority_score");
        assert_eq!(RejectReason::BadConfidence.as_str(), "bad_confidence");
    }
}
