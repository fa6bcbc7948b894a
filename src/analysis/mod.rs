//! Boundary to the remote analysis capability.
//!
//! The orchestration layer only ever talks to [`AnalysisService`]; the
//! production implementation in [`gemini`] is one interchangeable
//! provider behind it.

pub mod gemini;
pub mod types;

pub use gemini::{AnalysisConfig, GeminiClient};
pub use types::{Condition, DiagnosisResult, MedicationReport, Urgency};

use async_trait::async_trait;
use thiserror::Error;

use crate::capture::ImagePayload;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("analysis service rejected the request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("analysis service returned an empty response")]
    EmptyResponse,

    #[error("analysis response could not be decoded: {0}")]
    Malformed(String),
}

impl AnalysisError {
    /// Message surfaced to the user. Falls back to a generic notice
    /// when the failure carries nothing presentable.
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Http(err) if err.is_timeout() => {
                "The analysis service took too long to respond. Please try again.".to_string()
            }
            AnalysisError::Http(_) => {
                "Could not reach the analysis service. Check your connection and try again."
                    .to_string()
            }
            AnalysisError::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            _ => "The analysis could not be completed. Please try again.".to_string(),
        }
    }
}

/// Remote analysis entry points, one per workflow, plus the two
/// secondary generators (report document, sample input).
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze_symptoms(
        &self,
        prompt: &str,
        image: Option<&ImagePayload>,
    ) -> Result<DiagnosisResult, AnalysisError>;

    async fn analyze_medication(
        &self,
        prompt: &str,
        image: Option<&ImagePayload>,
    ) -> Result<MedicationReport, AnalysisError>;

    /// Renders a printable HTML report for a completed diagnosis.
    async fn generate_report(
        &self,
        result: &DiagnosisResult,
        prompt: &str,
    ) -> Result<String, AnalysisError>;

    /// Produces an example symptom description for the input box.
    async fn generate_sample(&self) -> Result<String, AnalysisError>;
}
