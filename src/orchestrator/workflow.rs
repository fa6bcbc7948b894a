//! Per-workflow asynchronous request state and the submission guard.

use serde::Serialize;
use tracing::debug;

use crate::analysis::AnalysisError;
use crate::capture::{ImagePayload, InputDraft};

/// Lifecycle of one workflow's request slot. The enum shape makes the
/// invariants structural: a result exists only in `Success`, a message
/// only in `Error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowPhase<R> {
    Idle,
    Loading,
    Success { result: R },
    Error { message: String },
}

/// What [`WorkflowState::begin`] hands to the service call once the
/// guard passes.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub prompt: String,
    pub image: Option<ImagePayload>,
}

/// One instance per workflow; at most one request in flight each.
#[derive(Debug, Clone)]
pub struct WorkflowState<R> {
    phase: WorkflowPhase<R>,
}

impl<R> Default for WorkflowState<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> WorkflowState<R> {
    pub fn new() -> Self {
        Self {
            phase: WorkflowPhase::Idle,
        }
    }

    pub fn phase(&self) -> &WorkflowPhase<R> {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, WorkflowPhase::Loading)
    }

    pub fn result(&self) -> Option<&R> {
        match &self.phase {
            WorkflowPhase::Success { result } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            WorkflowPhase::Error { message } => Some(message),
            _ => None,
        }
    }

    /// Submission guard. Returns `None` — a silent no-op, not an error
    /// — while a request is in flight or when the draft carries neither
    /// text nor image; the caller must not invoke the service then.
    /// Otherwise transitions to `Loading` (clearing any prior error)
    /// and yields the prompt: the trimmed text, or the given fallback
    /// instruction when the draft is image-only.
    pub fn begin(&mut self, draft: &InputDraft, image_only_prompt: &str) -> Option<SubmitRequest> {
        if self.is_loading() {
            debug!("submit ignored: request already in flight");
            return None;
        }
        let text = draft.text.trim();
        if text.is_empty() && draft.image.is_none() {
            debug!("submit ignored: empty draft");
            return None;
        }

        let prompt = if text.is_empty() {
            image_only_prompt.to_string()
        } else {
            text.to_string()
        };
        self.phase = WorkflowPhase::Loading;
        Some(SubmitRequest {
            prompt,
            image: draft.image.clone(),
        })
    }

    /// Applies a completed service call. A late completion after a
    /// reset is written as well — the state is simply no longer
    /// observed, and the next reset clears it.
    pub fn finish(&mut self, outcome: Result<R, AnalysisError>) {
        self.phase = match outcome {
            Ok(result) => WorkflowPhase::Success { result },
            Err(err) => WorkflowPhase::Error {
                message: err.user_message(),
            },
        };
    }

    /// Forces the slot back to `Idle`, dropping any result or error.
    pub fn reset(&mut self) {
        self.phase = WorkflowPhase::Idle;
    }
}
