use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{RiskLevel, TriageStatus};

/// Free-form clinical observations (symptoms or vitals), keyed by name.
/// Values are passed through verbatim.
pub type ObservationMap = serde_json::Map<String, serde_json::Value>;

/// Lowest and highest accepted priority scores (10 = most urgent).
pub const MIN_PRIORITY_SCORE: u8 = 1;
pub const MAX_PRIORITY_SCORE: u8 = 10;

/// A structured triage assessment. Only built by the response validator
/// or the fallback policy, so every instance is within bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub risk_level: RiskLevel,
    pub priority_score: u8,
    pub ai_confidence: f64,
    pub recommendations: String,
    pub primary_concerns: Option<Vec<String>>,
    pub reasoning: Option<String>,
}

impl Assessment {
    pub fn is_within_bounds(&self) -> bool {
        (MIN_PRIORITY_SCORE..=MAX_PRIORITY_SCORE).contains(&self.priority_score)
            && (0.0..=1.0).contains(&self.ai_confidence)
            && !self.recommendations.trim().is_empty()
    }
}

/// Persisted triage submission with the accepted assessment flattened in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub symptoms: ObservationMap,
    pub vitals: ObservationMap,
    pub risk_level: RiskLevel,
    pub priority_score: u8,
    pub ai_confidence: f64,
    pub recommendations: String,
    pub primary_concerns: Option<Vec<String>>,
    pub reasoning: Option<String>,
    pub status: TriageStatus,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TriageRecord {
    /// New pending, unassigned record stamped with the current time
    /// (microsecond precision, matching storage).
    pub fn new_pending(
        patient_id: Uuid,
        symptoms: ObservationMap,
        vitals: ObservationMap,
        assessment: Assessment,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            symptoms,
            vitals,
            risk_level: assessment.risk_level,
            priority_score: assessment.priority_score,
            ai_confidence: assessment.ai_confidence,
            recommendations: assessment.recommendations,
            primary_concerns: assessment.primary_concerns,
            reasoning: assessment.reasoning,
            status: TriageStatus::Pending,
            assigned_to: None,
            created_at: Utc::now().trunc_subsecs(6),
        }
    }

    pub fn assessment(&self) -> Assessment {
        Assessment {
            risk_level: self.risk_level,
            priority_score: self.priority_score,
            ai_confidence: self.ai_confidence,
            recommendations: self.recommendations.clone(),
            primary_concerns: self.primary_concerns.clone(),
            reasoning: self.reasoning.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub user_id: Option<String>,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate counts for the admin dashboard.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TriageAnalytics {
    pub total_triages: u64,
    pub risk_distribution: BTreeMap<String, u64>,
    pub recent_triages_24h: u64,
}
