//! Webview-backed camera device.
//!
//! The webview owns `getUserMedia`; this side asks it to start via a
//! `camera://open` event, waits for the verdict reported back through
//! the `camera_opened` / `camera_denied` commands, and buffers the most
//! recent preview frame pushed by `camera_frame` so stills can be taken
//! synchronously.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tauri::{AppHandle, Emitter};
use tokio::sync::oneshot;
use tracing::debug;

use super::camera::{CameraDevice, CameraError, CameraStream};
use super::payload::ImagePayload;

/// Single-slot buffer holding the most recent preview frame.
#[derive(Clone, Default)]
pub struct FrameBuffer {
    inner: Arc<Mutex<Option<ImagePayload>>>,
}

impl FrameBuffer {
    pub fn push(&self, frame: ImagePayload) {
        *self.inner.lock().unwrap() = Some(frame);
    }

    pub fn take(&self) -> Option<ImagePayload> {
        self.inner.lock().unwrap().take()
    }

    pub fn clear(&self) {
        *self.inner.lock().unwrap() = None;
    }
}

/// [`CameraDevice`] implementation bridging to the webview viewfinder.
pub struct WebviewCamera {
    app: AppHandle,
    frames: FrameBuffer,
    pending: Arc<Mutex<Option<oneshot::Sender<Result<(), CameraError>>>>>,
}

impl WebviewCamera {
    pub fn new(app: AppHandle) -> Self {
        Self {
            app,
            frames: FrameBuffer::default(),
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn frames(&self) -> FrameBuffer {
        self.frames.clone()
    }

    /// Called from the `camera_opened` / `camera_denied` commands to
    /// resolve the pending open request. A verdict without a pending
    /// request is dropped.
    pub fn resolve(&self, verdict: Result<(), CameraError>) {
        if let Some(tx) = self.pending.lock().unwrap().take() {
            let _ = tx.send(verdict);
        } else {
            debug!("camera verdict arrived with no pending open");
        }
    }
}

#[async_trait]
impl CameraDevice for WebviewCamera {
    async fn open(&self) -> Result<Box<dyn CameraStream>, CameraError> {
        let (tx, rx) = oneshot::channel();
        *self.pending.lock().unwrap() = Some(tx);

        self.app
            .emit("camera://open", ())
            .map_err(|e| CameraError::Unavailable(e.to_string()))?;

        match rx.await {
            Ok(Ok(())) => Ok(Box::new(WebviewStream {
                app: self.app.clone(),
                frames: self.frames.clone(),
            })),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(CameraError::Unavailable("camera bridge dropped".into())),
        }
    }
}

struct WebviewStream {
    app: AppHandle,
    frames: FrameBuffer,
}

impl CameraStream for WebviewStream {
    fn capture_still(&mut self) -> Result<ImagePayload, CameraError> {
        self.frames.take().ok_or(CameraError::NoFrame)
    }

    fn shut_down(&mut self) {
        // Tells the frontend to stop its media tracks.
        let _ = self.app.emit("camera://close", ());
        self.frames.clear();
    }
}
