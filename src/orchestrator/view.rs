//! View selection and the single-slot modal tracker.

use serde::{Deserialize, Serialize};

/// The two mutually exclusive analysis workflows. Exactly one is
/// active; switching destroys all transient state (see
/// [`Orchestrator::switch_view`](super::Orchestrator::switch_view)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    Diagnosis,
    Medication,
}

/// Modal surfaces shown exclusive of one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Overlay {
    Report,
    Contact,
    Camera,
}

/// At most one overlay is visible; opening another simply replaces the
/// slot. Independent of the analysis state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModalCoordinator {
    visible: Option<Overlay>,
}

impl ModalCoordinator {
    pub fn visible(&self) -> Option<Overlay> {
        self.visible
    }

    pub fn open(&mut self, overlay: Overlay) {
        self.visible = Some(overlay);
    }

    pub fn close(&mut self) {
        self.visible = None;
    }

    /// Closes the slot only when the given overlay is the visible one.
    pub fn close_if(&mut self, overlay: Overlay) {
        if self.visible == Some(overlay) {
            self.visible = None;
        }
    }
}
