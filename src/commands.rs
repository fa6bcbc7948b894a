//! The webview-facing command surface. Every command is a thin wrapper:
//! lock the shared orchestrator, apply one transition, hand back a
//! [`UiSnapshot`] for the frontend to render.

use std::sync::Arc;

use tauri::command;

use crate::analysis::AnalysisService;
use crate::capture::bridge::WebviewCamera;
use crate::capture::{CameraError, ClipboardItem, ImagePayload};
use crate::orchestrator::view::{Overlay, ViewMode};
use crate::orchestrator::{self, SharedOrchestrator, UiSnapshot};

pub type SharedService = Arc<dyn AnalysisService>;

/* ---------- 1. VIEW & DRAFT ---------- */

#[command]
pub async fn set_view(
    mode: ViewMode,
    state: tauri::State<'_, SharedOrchestrator>,
) -> Result<UiSnapshot, String> {
    let mut s = state.lock().await;
    s.switch_view(mode);
    Ok(s.snapshot())
}

#[command]
pub async fn set_draft_text(
    text: String,
    state: tauri::State<'_, SharedOrchestrator>,
) -> Result<(), String> {
    state.lock().await.draft.set_text(text);
    Ok(())
}

/// File-picker channel: the frontend hands over the selected file as a
/// data URI.
#[command]
pub async fn attach_image(
    data_uri: String,
    state: tauri::State<'_, SharedOrchestrator>,
) -> Result<UiSnapshot, String> {
    let mut s = state.lock().await;
    s.draft.from_file_select(&data_uri);
    Ok(s.snapshot())
}

/// Clipboard channel. Returns `true` when an image item was consumed,
/// so the frontend suppresses the default paste action.
#[command]
pub async fn paste_clipboard(
    items: Vec<ClipboardItem>,
    state: tauri::State<'_, SharedOrchestrator>,
) -> Result<bool, String> {
    Ok(state.lock().await.draft.from_clipboard_paste(&items))
}

#[command]
pub async fn clear_image(
    state: tauri::State<'_, SharedOrchestrator>,
) -> Result<UiSnapshot, String> {
    let mut s = state.lock().await;
    s.draft.clear_image();
    Ok(s.snapshot())
}

#[command]
pub async fn clear_draft(
    state: tauri::State<'_, SharedOrchestrator>,
) -> Result<UiSnapshot, String> {
    let mut s = state.lock().await;
    s.draft.clear();
    Ok(s.snapshot())
}

/// Fills the input box with a generated example symptom description.
#[command]
pub async fn load_sample(
    state: tauri::State<'_, SharedOrchestrator>,
    service: tauri::State<'_, SharedService>,
) -> Result<String, String> {
    let sample = service
        .generate_sample()
        .await
        .map_err(|e| e.user_message())?;
    state.lock().await.draft.set_text(sample.clone());
    Ok(sample)
}

/* ---------- 2. SUBMISSION ---------- */

#[command]
pub async fn submit_diagnosis(
    state: tauri::State<'_, SharedOrchestrator>,
    service: tauri::State<'_, SharedService>,
) -> Result<UiSnapshot, String> {
    orchestrator::submit_diagnosis(state.inner(), service.inner().as_ref()).await;
    Ok(state.lock().await.snapshot())
}

#[command]
pub async fn submit_medication(
    state: tauri::State<'_, SharedOrchestrator>,
    service: tauri::State<'_, SharedService>,
) -> Result<UiSnapshot, String> {
    orchestrator::submit_medication(state.inner(), service.inner().as_ref()).await;
    Ok(state.lock().await.snapshot())
}

#[command]
pub async fn current_state(
    state: tauri::State<'_, SharedOrchestrator>,
) -> Result<UiSnapshot, String> {
    Ok(state.lock().await.snapshot())
}

/* ---------- 3. OVERLAYS & REPORT ---------- */

/// Opens a plain overlay (contact, or re-showing a report). The camera
/// viewfinder goes through `open_camera` instead so the device request
/// travels with it.
#[command]
pub async fn open_overlay(
    overlay: Overlay,
    state: tauri::State<'_, SharedOrchestrator>,
) -> Result<UiSnapshot, String> {
    let mut s = state.lock().await;
    s.open_overlay(overlay);
    Ok(s.snapshot())
}

#[command]
pub async fn close_overlay(
    state: tauri::State<'_, SharedOrchestrator>,
) -> Result<UiSnapshot, String> {
    let mut s = state.lock().await;
    s.close_overlay();
    Ok(s.snapshot())
}

/// Opens the report overlay and returns its HTML, generating it on
/// first view of the current diagnosis. `None` while a generation is
/// still in flight (the frontend polls via `current_state`).
#[command]
pub async fn view_report(
    state: tauri::State<'_, SharedOrchestrator>,
    service: tauri::State<'_, SharedService>,
) -> Result<Option<String>, String> {
    Ok(orchestrator::ensure_report(state.inner(), service.inner().as_ref()).await)
}

/* ---------- 4. CAMERA ---------- */

#[command]
pub async fn open_camera(
    state: tauri::State<'_, SharedOrchestrator>,
    camera: tauri::State<'_, Arc<WebviewCamera>>,
) -> Result<UiSnapshot, String> {
    orchestrator::open_camera(state.inner(), camera.inner().as_ref())
        .await
        .map_err(|e| e.to_string())?;
    Ok(state.lock().await.snapshot())
}

#[command]
pub async fn capture_still(
    state: tauri::State<'_, SharedOrchestrator>,
) -> Result<UiSnapshot, String> {
    let mut s = state.lock().await;
    s.capture_still().map_err(|e| e.to_string())?;
    Ok(s.snapshot())
}

#[command]
pub async fn stop_camera(
    state: tauri::State<'_, SharedOrchestrator>,
) -> Result<UiSnapshot, String> {
    let mut s = state.lock().await;
    s.stop_camera();
    Ok(s.snapshot())
}

/* ---------- 5. CAMERA BRIDGE CALLBACKS ---------- */

/// The webview reports that `getUserMedia` succeeded.
#[command]
pub fn camera_opened(camera: tauri::State<'_, Arc<WebviewCamera>>) {
    camera.resolve(Ok(()));
}

/// The webview reports that the user (or platform) refused access.
#[command]
pub fn camera_denied(reason: String, camera: tauri::State<'_, Arc<WebviewCamera>>) {
    camera.resolve(Err(CameraError::Denied(reason)));
}

/// Latest preview frame, pushed continuously while the viewfinder runs.
#[command]
pub fn camera_frame(data_uri: String, camera: tauri::State<'_, Arc<WebviewCamera>>) {
    camera.frames().push(ImagePayload::from_data_uri(&data_uri));
}
