//! Input capture: the shared text/image draft and the three channels
//! that feed its image slot (file picker, clipboard paste, camera).

pub mod bridge;
pub mod camera;
pub mod payload;


pub use camera::{CameraDevice, CameraError, CameraSession, CameraStream};
pub use payload::ImagePayload;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One entry of a paste event, as reported by the webview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardItem {
    /// Media type of the item, e.g. `text/plain` or `image/png`.
    pub kind: String,
    /// Base64 payload for binary items; absent for plain text.
    #[serde(default)]
    pub data: Option<String>,
}

/// The user's not-yet-submitted input. Shared by both workflows and
/// kept across submissions so a result can be resubmitted with edits;
/// only an explicit clear or a view switch resets it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputDraft {
    pub text: String,
    pub image: Option<ImagePayload>,
}

impl InputDraft {
    pub fn set_text(&mut self, text: String) {
        self.text = text;
    }

    /// Last write wins: a new image replaces rather than appends.
    pub fn set_image(&mut self, image: ImagePayload) {
        self.image = Some(image);
    }

    pub fn clear_image(&mut self) {
        self.image = None;
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.image = None;
    }

    /// A draft is submittable when it has trimmed text or an image.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.image.is_none()
    }

    /// File-picker channel. The picker's own filter is the only
    /// validation; anything it hands over is decoded leniently.
    pub fn from_file_select(&mut self, data_uri: &str) {
        self.set_image(ImagePayload::from_data_uri(data_uri));
    }

    /// Clipboard channel: takes the first item whose media kind is an
    /// image and returns `true` so the caller suppresses the default
    /// paste action. With no image item the paste is left unhandled
    /// (text pastes proceed normally). Items without a payload are
    /// skipped.
    pub fn from_clipboard_paste(&mut self, items: &[ClipboardItem]) -> bool {
        let Some((kind, data)) = items.iter().find_map(|item| {
            let data = item.data.as_deref()?;
            item.kind.starts_with("image/").then_some((&item.kind, data))
        }) else {
            return false;
        };
        debug!(kind = %kind, "image taken from clipboard paste");
        self.set_image(ImagePayload::new(kind.clone(), data));
        true
    }

    /// Camera channel: stores the still the session just captured.
    pub fn from_camera_capture(&mut self, still: ImagePayload) {
        self.set_image(still);
    }
}
