//! Top-level coordinator: owns the active view, the shared input
//! draft, both workflow states, the camera session, the report cache
//! and the modal slot, for the lifetime of the session.
//!
//! All mutation happens under one async mutex; the async drivers at the
//! bottom of this module release the lock across every external await
//! (analysis call, report generation, camera open) so the user can keep
//! interacting while a request is in flight. No call is ever cancelled:
//! a response landing after a reset is written into state the UI no
//! longer observes, and the next reset clears it.

pub mod report;
pub mod view;
pub mod workflow;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::analysis::{AnalysisService, DiagnosisResult, MedicationReport};
use crate::capture::{CameraDevice, CameraError, CameraSession, InputDraft};
use report::{EnsureOutcome, ReportCache};
use view::{ModalCoordinator, Overlay, ViewMode};
use workflow::{WorkflowPhase, WorkflowState};

/// Instruction sent in place of the prompt when the draft is image-only.
const DIAGNOSIS_IMAGE_PROMPT: &str = "Analyze the symptoms visible in the attached image.";
const MEDICATION_IMAGE_PROMPT: &str = "Identify the medication shown in the attached image.";

/// Fragment cached when report generation fails; the report overlay is
/// non-fatal and never touches the workflow state.
const REPORT_FALLBACK_HTML: &str = "<p class=\"report-error\">The report could not be \
generated. Close this window and try again.</p>";

pub type SharedOrchestrator = Arc<Mutex<Orchestrator>>;

pub struct Orchestrator {
    view: ViewMode,
    pub draft: InputDraft,
    pub diagnosis: WorkflowState<DiagnosisResult>,
    pub medication: WorkflowState<MedicationReport>,
    pub camera: CameraSession,
    report: ReportCache,
    modal: ModalCoordinator,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            view: ViewMode::Diagnosis,
            draft: InputDraft::default(),
            diagnosis: WorkflowState::new(),
            medication: WorkflowState::new(),
            camera: CameraSession::new(),
            report: ReportCache::default(),
            modal: ModalCoordinator::default(),
        }
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn overlay(&self) -> Option<Overlay> {
        self.modal.visible()
    }

    /// Hard reset on a view change: draft, both workflow states, the
    /// report cache, the overlay slot and any live camera session are
    /// all destroyed — no state leaks across views. Switching to the
    /// already-active view is an identity no-op.
    pub fn switch_view(&mut self, new_mode: ViewMode) {
        if self.view == new_mode {
            return;
        }
        info!(from = ?self.view, to = ?new_mode, "switching workflow view");
        self.view = new_mode;
        self.draft.clear();
        self.diagnosis.reset();
        self.medication.reset();
        self.report.invalidate();
        self.camera.stop();
        self.modal.close();
    }

    /// Opens a modal surface. The camera overlay is opened by
    /// [`open_camera`] alongside the device request; the report overlay
    /// by [`ensure_report`].
    pub fn open_overlay(&mut self, overlay: Overlay) {
        self.modal.open(overlay);
    }

    /// Closes whatever overlay is visible; a camera viewfinder also
    /// releases its session.
    pub fn close_overlay(&mut self) {
        if self.modal.visible() == Some(Overlay::Camera) {
            self.camera.stop();
        }
        self.modal.close();
    }

    /// Stops any camera session and dismisses the viewfinder if it is
    /// the visible overlay.
    pub fn stop_camera(&mut self) {
        self.camera.stop();
        self.modal.close_if(Overlay::Camera);
    }

    /// Takes a still from the open camera session into the draft's
    /// image slot. The session is torn down by the capture; the
    /// viewfinder overlay closes with it.
    pub fn capture_still(&mut self) -> Result<(), CameraError> {
        let result = self.camera.capture_still();
        if !self.camera.is_active() {
            self.modal.close_if(Overlay::Camera);
        }
        let still = result?;
        self.draft.from_camera_capture(still);
        Ok(())
    }

    pub fn snapshot(&self) -> UiSnapshot {
        UiSnapshot {
            view: self.view,
            draft_text: self.draft.text.clone(),
            has_image: self.draft.image.is_some(),
            camera_active: self.camera.is_active(),
            overlay: self.modal.visible(),
            diagnosis: self.diagnosis.phase().clone(),
            medication: self.medication.phase().clone(),
            report_generating: self.report.is_generating(),
        }
    }
}

/// Everything the frontend needs to render, in one serializable value.
#[derive(Debug, Clone, Serialize)]
pub struct UiSnapshot {
    pub view: ViewMode,
    pub draft_text: String,
    pub has_image: bool,
    pub camera_active: bool,
    pub overlay: Option<Overlay>,
    pub diagnosis: WorkflowPhase<DiagnosisResult>,
    pub medication: WorkflowPhase<MedicationReport>,
    pub report_generating: bool,
}

/* ---------- async drivers ---------- */

/// Runs one symptom-diagnosis submission end to end. A blocked guard
/// (empty draft, request already in flight) is a silent no-op.
#[instrument(skip_all)]
pub async fn submit_diagnosis(state: &SharedOrchestrator, service: &dyn AnalysisService) {
    let request = {
        let mut guard = state.lock().await;
        let s = &mut *guard;
        match s.diagnosis.begin(&s.draft, DIAGNOSIS_IMAGE_PROMPT) {
            Some(req) => {
                // A new submission supersedes the cached report.
                s.report.invalidate();
                Some(req)
            }
            None => None,
        }
    };
    let Some(req) = request else { return };

    info!(prompt_len = req.prompt.len(), has_image = req.image.is_some(), "diagnosis dispatched");
    let outcome = service.analyze_symptoms(&req.prompt, req.image.as_ref()).await;
    if let Err(err) = &outcome {
        warn!(error = %err, "diagnosis request failed");
    }

    state.lock().await.diagnosis.finish(outcome);
}

/// Runs one medication-identification submission end to end.
#[instrument(skip_all)]
pub async fn submit_medication(state: &SharedOrchestrator, service: &dyn AnalysisService) {
    let request = {
        let mut guard = state.lock().await;
        let s = &mut *guard;
        s.medication.begin(&s.draft, MEDICATION_IMAGE_PROMPT)
    };
    let Some(req) = request else { return };

    info!(prompt_len = req.prompt.len(), has_image = req.image.is_some(), "medication lookup dispatched");
    let outcome = service.analyze_medication(&req.prompt, req.image.as_ref()).await;
    if let Err(err) = &outcome {
        warn!(error = %err, "medication request failed");
    }

    state.lock().await.medication.finish(outcome);
}

/// Returns the report HTML for the current diagnosis result, opening
/// the report overlay and generating the artifact on first request.
/// `None` when there is no completed diagnosis, when a generation for
/// this result is already running, or when the cache was invalidated
/// while generating (the caller re-asks via [`ensure_report`] or
/// `current_state`).
#[instrument(skip_all)]
pub async fn ensure_report(
    state: &SharedOrchestrator,
    service: &dyn AnalysisService,
) -> Option<String> {
    let (result, prompt) = {
        let mut guard = state.lock().await;
        let s = &mut *guard;
        let result = s.diagnosis.result()?.clone();
        s.modal.open(Overlay::Report);
        match s.report.ensure(result.id) {
            EnsureOutcome::Ready(html) => return Some(html),
            EnsureOutcome::AlreadyPending => return None,
            EnsureOutcome::MustGenerate => (result, s.draft.text.trim().to_string()),
        }
    };

    debug!(for_result = %result.id, "generating report artifact");
    let html = match service.generate_report(&result, &prompt).await {
        Ok(html) => html,
        Err(err) => {
            warn!(error = %err, "report generation failed; caching fallback");
            REPORT_FALLBACK_HTML.to_string()
        }
    };

    let mut guard = state.lock().await;
    if guard.report.store(result.id, html.clone()) {
        Some(html)
    } else {
        None
    }
}

/// Opens a camera session: viewfinder overlay up, device request out.
/// A denied or failed device leaves everything closed and surfaces the
/// error as a one-shot notice; a stop that lands while the request is
/// in flight wins, and the late stream is released.
#[instrument(skip_all)]
pub async fn open_camera(
    state: &SharedOrchestrator,
    device: &dyn CameraDevice,
) -> Result<(), CameraError> {
    {
        let mut s = state.lock().await;
        if !s.camera.begin_open() {
            return Ok(());
        }
        s.modal.open(Overlay::Camera);
    }

    match device.open().await {
        Ok(stream) => {
            let mut s = state.lock().await;
            if s.camera.complete_open(stream) {
                debug!("camera stream attached");
            }
            Ok(())
        }
        Err(err) => {
            warn!(error = %err, "camera open failed");
            let mut s = state.lock().await;
            s.camera.fail_open();
            s.modal.close_if(Overlay::Camera);
            Err(err)
        }
    }
}
