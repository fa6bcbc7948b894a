//! Google Gemini implementation of the analysis boundary.
//!
//! Each entry point sends one `generateContent` request with a text
//! part (instruction + user prompt) and, when present, an inline base64
//! image part, then decodes the model's JSON answer into the structured
//! result types.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::types::{Condition, DiagnosisResult, MedicationReport, Urgency};
use super::{AnalysisError, AnalysisService};
use crate::capture::ImagePayload;

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const SYMPTOM_INSTRUCTION: &str = "You are a careful medical triage assistant. Analyze the \
symptoms described below (and the attached image, if any) and answer with JSON only, in this \
exact shape: {\"conditions\": [{\"name\": string, \"probability\": integer 0-100, \
\"description\": string}], \"urgency\": \"low\"|\"medium\"|\"high\"|\"emergency\", \
\"advice\": string}. List the most likely conditions first. Always remind the user this is \
not a medical diagnosis in the advice field.";

const MEDICATION_INSTRUCTION: &str = "You are a pharmacology reference assistant. Identify the \
medication described below (or shown in the attached image) and answer with JSON only, in this \
exact shape: {\"name\": string, \"generic_name\": string or null, \"uses\": [string], \
\"dosage\": string, \"side_effects\": [string], \"warnings\": [string]}. If the medication \
cannot be identified with confidence, say so in the warnings.";

const REPORT_INSTRUCTION: &str = "You are preparing a printable patient hand-out. Given the \
structured diagnosis below, produce a clean self-contained HTML fragment (headings, paragraphs \
and lists only, no scripts or styles) summarizing the findings, the urgency and the recommended \
next steps in plain language. Answer with the HTML only.";

const SAMPLE_INSTRUCTION: &str = "Write one short, realistic first-person description of \
symptoms a patient might type into a symptom checker (2-3 sentences, no preamble, plain text).";

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl AnalysisConfig {
    /// Reads the service configuration from the environment (`.env`
    /// files supported). `GEMINI_API_KEY` is required, the rest has
    /// defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        let api_key = std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY must be set")?;
        Ok(Self {
            api_key,
            api_url: std::env::var("GEMINI_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }
}

pub struct GeminiClient {
    client: Client,
    config: AnalysisConfig,
}

impl GeminiClient {
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// One `generateContent` round trip; returns the first candidate's
    /// text.
    #[instrument(skip(self, instruction, prompt, image), fields(model = %self.config.model))]
    async fn generate(
        &self,
        instruction: &str,
        prompt: &str,
        image: Option<&ImagePayload>,
    ) -> Result<String, AnalysisError> {
        let mut parts = vec![json!({ "text": format!("{instruction}\n\n{prompt}") })];
        if let Some(image) = image {
            parts.push(json!({
                "inline_data": { "mime_type": image.mime, "data": image.data }
            }));
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.api_url, self.config.model, self.config.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&json!({ "contents": [{ "parts": parts }] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match status.as_u16() {
                401 | 403 => "Authentication with the analysis service failed".to_string(),
                429 => "Too many requests - please wait a moment and retry".to_string(),
                _ => body,
            };
            warn!(status = status.as_u16(), "analysis request rejected");
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }
        debug!(chars = text.len(), "analysis response received");
        Ok(text)
    }
}

#[async_trait]
impl AnalysisService for GeminiClient {
    async fn analyze_symptoms(
        &self,
        prompt: &str,
        image: Option<&ImagePayload>,
    ) -> Result<DiagnosisResult, AnalysisError> {
        let text = self.generate(SYMPTOM_INSTRUCTION, prompt, image).await?;
        decode_diagnosis(&text)
    }

    async fn analyze_medication(
        &self,
        prompt: &str,
        image: Option<&ImagePayload>,
    ) -> Result<MedicationReport, AnalysisError> {
        let text = self.generate(MEDICATION_INSTRUCTION, prompt, image).await?;
        decode_medication(&text)
    }

    async fn generate_report(
        &self,
        result: &DiagnosisResult,
        prompt: &str,
    ) -> Result<String, AnalysisError> {
        let context = serde_json::to_string_pretty(result)
            .map_err(|e| AnalysisError::Malformed(e.to_string()))?;
        let prompt = format!("Patient-reported symptoms: {prompt}\n\nStructured diagnosis:\n{context}");
        let text = self.generate(REPORT_INSTRUCTION, &prompt, None).await?;
        Ok(strip_code_fence(&text).to_string())
    }

    async fn generate_sample(&self) -> Result<String, AnalysisError> {
        let text = self.generate(SAMPLE_INSTRUCTION, "", None).await?;
        Ok(text.trim().trim_matches('"').to_string())
    }
}

/* ---------- response decoding ---------- */

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct DiagnosisWire {
    #[serde(default)]
    conditions: Vec<Condition>,
    #[serde(default)]
    urgency: String,
    #[serde(default)]
    advice: String,
}

#[derive(Debug, Deserialize)]
struct MedicationWire {
    name: String,
    #[serde(default)]
    generic_name: Option<String>,
    #[serde(default)]
    uses: Vec<String>,
    #[serde(default)]
    dosage: String,
    #[serde(default)]
    side_effects: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

/// Models often wrap JSON answers in markdown fences; strip them before
/// decoding.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.split_once('\n').map_or(inner, |(_, rest)| rest);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

fn decode_diagnosis(text: &str) -> Result<DiagnosisResult, AnalysisError> {
    let wire: DiagnosisWire = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| AnalysisError::Malformed(e.to_string()))?;
    Ok(DiagnosisResult::new(
        wire.conditions,
        Urgency::from_label(&wire.urgency),
        wire.advice,
    ))
}

fn decode_medication(text: &str) -> Result<MedicationReport, AnalysisError> {
    let wire: MedicationWire = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| AnalysisError::Malformed(e.to_string()))?;
    Ok(MedicationReport::new(
        wire.name,
        wire.generic_name,
        wire.uses,
        wire.dosage,
        wire.side_effects,
        wire.warnings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fenced_json() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn decodes_a_diagnosis_response() {
        let text = r#"{
            "conditions": [
                {"name": "Influenza", "probability": 80, "description": "Seasonal viral infection."}
            ],
            "urgency": "High",
            "advice": "Rest, fluids, and see a doctor within 24 hours."
        }"#;
        let result = decode_diagnosis(text).unwrap();
        assert_eq!(result.conditions.len(), 1);
        assert_eq!(result.conditions[0].probability, 80);
        assert_eq!(result.urgency, Urgency::High);
    }

    #[test]
    fn decodes_a_fenced_diagnosis_response() {
        let text = "```json\n{\"conditions\": [], \"urgency\": \"low\", \"advice\": \"ok\"}\n```";
        let result = decode_diagnosis(text).unwrap();
        assert!(result.conditions.is_empty());
        assert_eq!(result.urgency, Urgency::Low);
    }

    #[test]
    fn malformed_diagnosis_is_an_error() {
        assert!(matches!(
            decode_diagnosis("the patient is fine"),
            Err(AnalysisError::Malformed(_))
        ));
    }

    #[test]
    fn decodes_a_medication_response() {
        let text = r#"{
            "name": "Advil",
            "generic_name": "Ibuprofen",
            "uses": ["Pain relief", "Fever reduction"],
            "dosage": "200-400 mg every 4-6 hours",
            "side_effects": ["Stomach upset"],
            "warnings": ["Do not exceed 1200 mg per day without medical advice"]
        }"#;
        let report = decode_medication(text).unwrap();
        assert_eq!(report.name, "Advil");
        assert_eq!(report.generic_name.as_deref(), Some("Ibuprofen"));
        assert_eq!(report.uses.len(), 2);
    }

    #[test]
    fn urgency_labels_are_lenient() {
        assert_eq!(Urgency::from_label("EMERGENCY"), Urgency::Emergency);
        assert_eq!(Urgency::from_label("severe"), Urgency::High);
        assert_eq!(Urgency::from_label("something else"), Urgency::Medium);
    }
}
