// Learn more about Tauri commands at https://tauri.app/develop/calling-rust/

mod commands;
pub mod analysis;
pub mod capture;
pub mod orchestrator;

use std::sync::Arc;

use tauri::Manager;
use tokio::sync::Mutex;

use crate::analysis::{AnalysisConfig, GeminiClient};
use crate::capture::bridge::WebviewCamera;
use crate::commands::*;
use crate::orchestrator::{Orchestrator, SharedOrchestrator};

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let config = AnalysisConfig::from_env().expect("analysis service configuration");
    let service: SharedService =
        Arc::new(GeminiClient::new(config).expect("analysis HTTP client"));
    let state: SharedOrchestrator = Arc::new(Mutex::new(Orchestrator::new()));

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .manage(state)
        .manage(service)
        .setup(|app| {
            app.manage(Arc::new(WebviewCamera::new(app.handle().clone())));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            set_view,
            set_draft_text,
            attach_image,
            paste_clipboard,
            clear_image,
            clear_draft,
            load_sample,
            submit_diagnosis,
            submit_medication,
            current_state,
            open_overlay,
            close_overlay,
            view_report,
            open_camera,
            capture_still,
            stop_camera,
            camera_opened,
            camera_denied,
            camera_frame
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
