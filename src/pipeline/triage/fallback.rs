use crate::models::{Assessment, RiskLevel};

pub const FALLBACK_PRIORITY_SCORE: u8 = 5;
pub const FALLBACK_CONCERN: &str = "Unable to analyze - AI service unavailable";
pub const FALLBACK_RECOMMENDATIONS: &str =
    "Manual assessment required. AI service temporarily unavailable.";
pub const FALLBACK_REASONING: &str = "Fallback response due to AI service failure";

/// Degraded assessment used when the model gives no valid answer.
///
/// Zero confidence and a mid-range priority tell staff the case needs manual review.
pub fn fallback_assessment() -> Assessment {
    Assessment {
        risk_level: RiskLevel::Moderate,
        priority_score: FALLBACK_PRIORITY_SCORE,
        ai_confidence: 0.0,
        recommendations: FALLBACK_RECOMMENDATIONS.to_string(),
        primary_concerns: Some(vec![FALLBACK_CONCERN.to_string()]),
        reasoning: Some(FALLBACK_REASONING.to_string()),
    }
}
