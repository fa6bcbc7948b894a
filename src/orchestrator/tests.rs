use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::*;
use crate::analysis::{
    AnalysisError, AnalysisService, Condition, DiagnosisResult, MedicationReport, Urgency,
};
use crate::capture::{CameraDevice, CameraError, CameraStream, ImagePayload};

fn fever_result() -> DiagnosisResult {
    DiagnosisResult::new(
        vec![Condition {
            name: "Influenza".into(),
            probability: 80,
            description: "Seasonal viral infection.".into(),
        }],
        Urgency::High,
        "Rest, fluids, and see a doctor within 24 hours.".into(),
    )
}

fn advil_report() -> MedicationReport {
    MedicationReport::new(
        "Advil".into(),
        Some("Ibuprofen".into()),
        vec!["Pain relief".into()],
        "200-400 mg every 4-6 hours".into(),
        vec!["Stomach upset".into()],
        vec![],
    )
}

fn shared() -> SharedOrchestrator {
    Arc::new(Mutex::new(Orchestrator::new()))
}

/// Canned service: counts calls, records prompts, fails on demand.
#[derive(Default)]
struct ScriptedService {
    fail_analysis: bool,
    fail_report: bool,
    analysis_calls: AtomicUsize,
    report_calls: AtomicUsize,
    prompts: StdMutex<Vec<String>>,
}

#[async_trait]
impl AnalysisService for ScriptedService {
    async fn analyze_symptoms(
        &self,
        prompt: &str,
        _image: Option<&ImagePayload>,
    ) -> Result<DiagnosisResult, AnalysisError> {
        self.analysis_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail_analysis {
            return Err(AnalysisError::EmptyResponse);
        }
        Ok(fever_result())
    }

    async fn analyze_medication(
        &self,
        prompt: &str,
        _image: Option<&ImagePayload>,
    ) -> Result<MedicationReport, AnalysisError> {
        self.analysis_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail_analysis {
            return Err(AnalysisError::EmptyResponse);
        }
        Ok(advil_report())
    }

    async fn generate_report(
        &self,
        result: &DiagnosisResult,
        _prompt: &str,
    ) -> Result<String, AnalysisError> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_report {
            return Err(AnalysisError::EmptyResponse);
        }
        Ok(format!("<h1>Report {}</h1>", result.id))
    }

    async fn generate_sample(&self) -> Result<String, AnalysisError> {
        Ok("I have had a dry cough and a mild fever since yesterday.".into())
    }
}

/// Service whose analysis calls block until released, for exercising
/// in-flight behavior.
#[derive(Default)]
struct GatedService {
    release: Notify,
    calls: AtomicUsize,
}

#[async_trait]
impl AnalysisService for GatedService {
    async fn analyze_symptoms(
        &self,
        _prompt: &str,
        _image: Option<&ImagePayload>,
    ) -> Result<DiagnosisResult, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok(fever_result())
    }

    async fn analyze_medication(
        &self,
        _prompt: &str,
        _image: Option<&ImagePayload>,
    ) -> Result<MedicationReport, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok(advil_report())
    }

    async fn generate_report(
        &self,
        _result: &DiagnosisResult,
        _prompt: &str,
    ) -> Result<String, AnalysisError> {
        Ok("<p>gated</p>".into())
    }

    async fn generate_sample(&self) -> Result<String, AnalysisError> {
        Ok("sample".into())
    }
}

struct FakeStream {
    shut: Arc<AtomicBool>,
}

impl CameraStream for FakeStream {
    fn capture_still(&mut self) -> Result<ImagePayload, CameraError> {
        Ok(ImagePayload::new("image/png", "ZnJhbWU="))
    }

    fn shut_down(&mut self) {
        self.shut.store(true, Ordering::SeqCst);
    }
}

struct FakeDevice {
    deny: bool,
    shut: Arc<AtomicBool>,
}

impl FakeDevice {
    fn granting() -> (Self, Arc<AtomicBool>) {
        let shut = Arc::new(AtomicBool::new(false));
        (
            Self {
                deny: false,
                shut: shut.clone(),
            },
            shut,
        )
    }

    fn denying() -> Self {
        Self {
            deny: true,
            shut: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl CameraDevice for FakeDevice {
    async fn open(&self) -> Result<Box<dyn CameraStream>, CameraError> {
        if self.deny {
            return Err(CameraError::Denied("permission dismissed".into()));
        }
        Ok(Box::new(FakeStream {
            shut: self.shut.clone(),
        }))
    }
}

/* ---------- submission ---------- */

#[tokio::test]
async fn empty_draft_submission_is_a_no_op() {
    let state = shared();
    let service = ScriptedService::default();

    submit_diagnosis(&state, &service).await;
    state.lock().await.draft.set_text("   \n  ".into());
    submit_diagnosis(&state, &service).await;

    assert_eq!(service.analysis_calls.load(Ordering::SeqCst), 0);
    assert_eq!(state.lock().await.diagnosis.phase(), &WorkflowPhase::Idle);
}

#[tokio::test]
async fn text_submission_reaches_success() {
    let state = shared();
    let service = ScriptedService::default();

    state.lock().await.draft.set_text("fever and chills".into());
    submit_diagnosis(&state, &service).await;

    let s = state.lock().await;
    let result = s.diagnosis.result().expect("diagnosis should succeed");
    assert_eq!(result.conditions.len(), 1);
    assert_eq!(result.conditions[0].probability, 80);
    assert_eq!(result.urgency, Urgency::High);
    assert_eq!(service.prompts.lock().unwrap()[0], "fever and chills");
    // the medication workflow is untouched
    assert_eq!(s.medication.phase(), &WorkflowPhase::Idle);
}

#[tokio::test]
async fn image_only_submission_uses_the_fallback_prompt() {
    let state = shared();
    let service = ScriptedService::default();

    state
        .lock()
        .await
        .draft
        .set_image(ImagePayload::new("image/jpeg", "AAAA"));
    submit_diagnosis(&state, &service).await;

    assert_eq!(service.prompts.lock().unwrap()[0], DIAGNOSIS_IMAGE_PROMPT);
    assert!(state.lock().await.diagnosis.result().is_some());
}

#[tokio::test]
async fn failure_surfaces_an_error_and_keeps_the_draft() {
    let state = shared();
    let service = ScriptedService {
        fail_analysis: true,
        ..Default::default()
    };

    state.lock().await.draft.set_text("sore throat".into());
    submit_medication(&state, &service).await;

    let s = state.lock().await;
    assert!(s.medication.error().is_some());
    assert_eq!(s.draft.text, "sore throat");
}

#[tokio::test]
async fn second_submit_while_loading_is_ignored() {
    let state = shared();
    let service = Arc::new(GatedService::default());

    state.lock().await.draft.set_text("fever and chills".into());

    let task = tokio::spawn({
        let state = state.clone();
        let service = service.clone();
        async move { submit_diagnosis(&state, service.as_ref()).await }
    });
    while service.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    assert!(state.lock().await.diagnosis.is_loading());

    submit_diagnosis(&state, service.as_ref()).await;
    assert_eq!(service.calls.load(Ordering::SeqCst), 1);

    service.release.notify_one();
    task.await.unwrap();
    assert!(state.lock().await.diagnosis.result().is_some());
}

#[tokio::test]
async fn late_response_lands_in_unobserved_state() {
    let state = shared();
    let service = Arc::new(GatedService::default());

    state.lock().await.draft.set_text("fever and chills".into());
    let task = tokio::spawn({
        let state = state.clone();
        let service = service.clone();
        async move { submit_diagnosis(&state, service.as_ref()).await }
    });
    while service.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    // switching views while the request is in flight resets the slot...
    state.lock().await.switch_view(ViewMode::Medication);
    assert_eq!(state.lock().await.diagnosis.phase(), &WorkflowPhase::Idle);

    // ...and the late response is written but never rendered.
    service.release.notify_one();
    task.await.unwrap();
    let s = state.lock().await;
    assert_eq!(s.view(), ViewMode::Medication);
    assert!(s.diagnosis.result().is_some());
    assert!(s.draft.is_empty());
}

/* ---------- view switching ---------- */

#[tokio::test]
async fn switching_views_destroys_all_transient_state() {
    let state = shared();
    let service = ScriptedService::default();
    let (device, shut) = FakeDevice::granting();

    state.lock().await.draft.set_text("fever and chills".into());
    submit_diagnosis(&state, &service).await;
    assert!(ensure_report(&state, &service).await.is_some());
    open_camera(&state, &device).await.unwrap();

    state.lock().await.switch_view(ViewMode::Medication);

    let s = state.lock().await;
    assert_eq!(s.view(), ViewMode::Medication);
    assert!(s.draft.is_empty());
    assert_eq!(s.diagnosis.phase(), &WorkflowPhase::Idle);
    assert_eq!(s.medication.phase(), &WorkflowPhase::Idle);
    assert_eq!(s.overlay(), None);
    assert!(!s.camera.is_active());
    assert!(shut.load(Ordering::SeqCst));
    assert!(!s.snapshot().report_generating);
}

#[tokio::test]
async fn switching_to_the_active_view_changes_nothing() {
    let state = shared();
    let service = ScriptedService::default();

    state.lock().await.draft.set_text("fever and chills".into());
    submit_diagnosis(&state, &service).await;

    let mut s = state.lock().await;
    s.switch_view(ViewMode::Diagnosis);
    assert_eq!(s.draft.text, "fever and chills");
    assert!(s.diagnosis.result().is_some());
}

/* ---------- report ---------- */

#[tokio::test]
async fn report_is_generated_once_per_result() {
    let state = shared();
    let service = ScriptedService::default();

    state.lock().await.draft.set_text("fever and chills".into());
    submit_diagnosis(&state, &service).await;

    let first = ensure_report(&state, &service).await.unwrap();
    let second = ensure_report(&state, &service).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(service.report_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.lock().await.overlay(), Some(Overlay::Report));
}

#[tokio::test]
async fn resubmission_invalidates_the_cached_report() {
    let state = shared();
    let service = ScriptedService::default();

    state.lock().await.draft.set_text("fever and chills".into());
    submit_diagnosis(&state, &service).await;
    ensure_report(&state, &service).await.unwrap();

    // same draft, new submission, new result identity
    state.lock().await.close_overlay();
    submit_diagnosis(&state, &service).await;
    ensure_report(&state, &service).await.unwrap();

    assert_eq!(service.report_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_generation_caches_the_fallback_fragment() {
    let state = shared();
    let service = ScriptedService {
        fail_report: true,
        ..Default::default()
    };

    state.lock().await.draft.set_text("fever and chills".into());
    submit_diagnosis(&state, &service).await;

    let html = ensure_report(&state, &service).await.unwrap();
    assert!(html.contains("report-error"));
    // the fallback is memoized like any artifact; the workflow state is untouched
    assert_eq!(ensure_report(&state, &service).await.unwrap(), html);
    assert_eq!(service.report_calls.load(Ordering::SeqCst), 1);
    assert!(state.lock().await.diagnosis.result().is_some());
}

#[tokio::test]
async fn report_without_a_diagnosis_is_unavailable() {
    let state = shared();
    let service = ScriptedService::default();

    assert_eq!(ensure_report(&state, &service).await, None);
    assert_eq!(service.report_calls.load(Ordering::SeqCst), 0);
    assert_eq!(state.lock().await.overlay(), None);
}

/* ---------- overlays ---------- */

#[tokio::test]
async fn only_one_overlay_is_visible_at_a_time() {
    let state = shared();
    let mut s = state.lock().await;

    s.open_overlay(Overlay::Contact);
    s.open_overlay(Overlay::Report);
    assert_eq!(s.overlay(), Some(Overlay::Report));

    s.close_overlay();
    assert_eq!(s.overlay(), None);
}

/* ---------- camera ---------- */

#[tokio::test]
async fn camera_capture_feeds_the_draft_and_closes_the_session() {
    let state = shared();
    let (device, shut) = FakeDevice::granting();

    open_camera(&state, &device).await.unwrap();
    {
        let s = state.lock().await;
        assert!(s.camera.is_open());
        assert_eq!(s.overlay(), Some(Overlay::Camera));
    }

    let mut s = state.lock().await;
    s.capture_still().unwrap();
    assert_eq!(
        s.draft.image,
        Some(ImagePayload::new("image/png", "ZnJhbWU="))
    );
    assert!(!s.camera.is_active());
    assert_eq!(s.overlay(), None);
    assert!(shut.load(Ordering::SeqCst));
}

#[tokio::test]
async fn denied_camera_leaves_everything_closed() {
    let state = shared();
    let device = FakeDevice::denying();

    let err = open_camera(&state, &device).await.unwrap_err();
    assert!(matches!(err, CameraError::Denied(_)));

    let s = state.lock().await;
    assert!(!s.camera.is_active());
    assert_eq!(s.overlay(), None);
    assert!(s.draft.image.is_none());
}

#[tokio::test]
async fn reopening_an_active_camera_is_a_no_op() {
    let state = shared();
    let (device, _shut) = FakeDevice::granting();

    open_camera(&state, &device).await.unwrap();
    open_camera(&state, &device).await.unwrap();
    assert!(state.lock().await.camera.is_open());
}

#[tokio::test]
async fn closing_the_camera_overlay_releases_the_device() {
    let state = shared();
    let (device, shut) = FakeDevice::granting();

    open_camera(&state, &device).await.unwrap();
    let mut s = state.lock().await;
    s.close_overlay();

    assert!(!s.camera.is_active());
    assert_eq!(s.overlay(), None);
    assert!(shut.load(Ordering::SeqCst));
}

#[tokio::test]
async fn stop_camera_dismisses_the_viewfinder() {
    let state = shared();
    let (device, shut) = FakeDevice::granting();

    open_camera(&state, &device).await.unwrap();
    let mut s = state.lock().await;
    s.stop_camera();
    assert!(!s.camera.is_active());
    assert_eq!(s.overlay(), None);
    assert!(shut.load(Ordering::SeqCst));

    // a non-camera overlay is untouched by a redundant stop
    s.open_overlay(Overlay::Contact);
    s.stop_camera();
    assert_eq!(s.overlay(), Some(Overlay::Contact));
}

#[tokio::test]
async fn capture_without_an_open_session_fails_and_keeps_state() {
    let state = shared();
    let mut s = state.lock().await;

    s.open_overlay(Overlay::Contact);
    let err = s.capture_still().unwrap_err();
    assert!(matches!(err, CameraError::NotOpen));
    // a non-camera overlay is not touched by the failed capture
    assert_eq!(s.overlay(), Some(Overlay::Contact));
    assert!(s.draft.image.is_none());
}
