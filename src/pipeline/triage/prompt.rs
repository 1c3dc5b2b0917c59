use crate::models::ObservationMap;

/// Marker used in the prompt when the patient has no recorded history.
pub const NO_HISTORY_MARKER: &str = "None provided";

/// Build the triage prompt for one submission.
///
/// Symptoms and vitals are embedded in full as pretty-printed JSON (keys
/// sorted), the medical history verbatim.
pub fn build_triage_prompt(
    symptoms: &ObservationMap,
    vitals: &ObservationMap,
    medical_history: Option<&str>,
) -> String {
    let history = medical_history
        .filter(|h| !h.trim().is_empty())
        .unwrap_or(NO_HISTORY_MARKER);

    format!(
        r#"You are a medical AI assistant specialized in patient triage. Analyze the following patient data and provide a structured assessment.

Patient Symptoms: {symptoms}
Vital Signs: {vitals}
Medical History: {history}

Provide your assessment in the following JSON format ONLY (no additional text):
{{
  "risk_level": "critical|high|moderate|low",
  "priority_score": <integer 1-10>,
  "ai_confidence": <float 0.0-1.0>,
  "primary_concerns": ["concern1", "concern2"],
  "recommendations": "Detailed medical recommendations",
  "reasoning": "Brief explanation of the assessment"
}}

priority_score 10 is the most urgent. Respond with the JSON object only and ensure it is valid JSON."#,
        symptoms = render_observations(symptoms),
        vitals = render_observations(vitals),
    )
}

fn render_observations(map: &ObservationMap) -> String {
    // A Map of Values always serializes.
    serde_json::to_string_pretty(map).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn observations(pairs: &[(&str, serde_json::Value)]) -> ObservationMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn prompt_embeds_full_observations() {
        let symptoms = observations(&[
            ("chest_pain", json!(true)),
            ("duration", json!("2 hours")),
            ("pain_scale", json!(7)),
        ]);
        let vitals = observations(&[("heart_rate", json!(110)), ("blood_pressure", json!("160/95"))]);
        let prompt = build_triage_prompt(&symptoms, &vitals, Some("Hypertension"));

        assert!(prompt.contains("\"chest_pain\": true"));
        assert!(prompt.contains("\"duration\": \"2 hours\""));
        assert!(prompt.contains("\"pain_scale\": 7"));
        assert!(prompt.contains("\"heart_rate\": 110"));
        assert!(prompt.contains("\"blood_pressure\": \"160/95\""));
        assert!(prompt.contains("Medical History: Hypertension"));
    }

    #[test]
    fn missing_history_uses_marker() {
        let prompt = build_triage_prompt(&ObservationMap::new(), &ObservationMap::new(), None);
        assert!(prompt.contains("Medical History: None provided"));
    }

    #[test]
    fn blank_history_uses_marker() {
        let prompt =
            build_triage_prompt(&ObservationMap::new(), &ObservationMap::new(), Some("   "));
        assert!(prompt.contains("Medical History: None provided"));
    }

    #[test]
    fn history_is_verbatim() {
        let history = "Type 2 Diabetes; allergic to penicillin (rash)";
        let prompt =
            build_triage_prompt(&ObservationMap::new(), &ObservationMap::new(), Some(history));
        assert!(prompt.contains(history));
    }

    #[test]
    fn prompt_specifies_response_shape() {
        let prompt = build_triage_prompt(&ObservationMap::new(), &ObservationMap::new(), None);
        for field in [
            "risk_level",
            "priority_score",
            "ai_confidence",
            "primary_concerns",
            "recommendations",
            "reasoning",
        ] {
            assert!(prompt.contains(&format!("\"{field}\"")), "missing {field}");
        }
        assert!(prompt.contains("critical|high|moderate|low"));
        assert!(prompt.contains("JSON format ONLY"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let symptoms = observations(&[("nausea", json!(true)), ("fever", json!(38.5))]);
        let a = build_triage_prompt(&symptoms, &ObservationMap::new(), None);
        let b = build_triage_prompt(&symptoms, &ObservationMap::new(), None);
        assert_eq!(a, b);
    }
}
