//! Result types produced by the analysis boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How quickly the user should seek care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Emergency,
}

impl Urgency {
    /// Lenient mapping from a free-form model label. Unknown labels
    /// land on `Medium` rather than failing the whole response.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "low" | "mild" => Urgency::Low,
            "high" | "severe" => Urgency::High,
            "emergency" | "critical" | "immediate" => Urgency::Emergency,
            _ => Urgency::Medium,
        }
    }
}

/// One candidate condition with its estimated likelihood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    /// Estimated probability in percent (0–100).
    pub probability: u8,
    #[serde(default)]
    pub description: String,
}

/// Outcome of a symptom-diagnosis request. The `id` is assigned when
/// the response is decoded and serves as the identity the report cache
/// memoizes by.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisResult {
    pub id: Uuid,
    pub conditions: Vec<Condition>,
    pub urgency: Urgency,
    pub advice: String,
    pub generated_at: DateTime<Utc>,
}

impl DiagnosisResult {
    pub fn new(conditions: Vec<Condition>, urgency: Urgency, advice: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            conditions,
            urgency,
            advice,
            generated_at: Utc::now(),
        }
    }
}

/// Outcome of a medication-identification request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedicationReport {
    pub id: Uuid,
    pub name: String,
    pub generic_name: Option<String>,
    pub uses: Vec<String>,
    pub dosage: String,
    pub side_effects: Vec<String>,
    pub warnings: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl MedicationReport {
    pub fn new(
        name: String,
        generic_name: Option<String>,
        uses: Vec<String>,
        dosage: String,
        side_effects: Vec<String>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            generic_name,
            uses,
            dosage,
            side_effects,
            warnings,
            generated_at: Utc::now(),
        }
    }
}
