//! Camera device lifecycle: closed → opening → open → closed.
//!
//! The device itself sits behind [`CameraDevice`]; the session only
//! tracks the acquisition state and guarantees that an acquired stream
//! is released on every exit path — capture, explicit stop, failed
//! open, or a stop that lands while the open request is still in
//! flight.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use super::payload::ImagePayload;

#[derive(Debug, Error)]
pub enum CameraError {
    /// The platform refused access to the device.
    #[error("camera access denied: {0}")]
    Denied(String),

    /// No usable device, or the bridge to it went away.
    #[error("camera unavailable: {0}")]
    Unavailable(String),

    /// A still was requested outside the `open` state.
    #[error("camera is not open")]
    NotOpen,

    /// The stream has not produced a frame yet.
    #[error("no preview frame available")]
    NoFrame,
}

/// Platform capability that can hand out a live camera stream.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn open(&self) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// A live, acquired camera stream.
pub trait CameraStream: Send {
    /// Grabs one still from the current frame.
    fn capture_still(&mut self) -> Result<ImagePayload, CameraError>;

    /// Releases the underlying device resource. Idempotent.
    fn shut_down(&mut self);
}

enum Phase {
    Closed,
    Opening,
    Open(Box<dyn CameraStream>),
}

/// At most one session exists at a time; it is owned by the
/// orchestrator alongside the rest of the transient UI state.
pub struct CameraSession {
    phase: Phase,
}

impl Default for CameraSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Closed,
        }
    }

    /// True while a device is acquired or being acquired.
    pub fn is_active(&self) -> bool {
        !matches!(self.phase, Phase::Closed)
    }

    pub fn is_open(&self) -> bool {
        matches!(self.phase, Phase::Open(_))
    }

    /// Marks the session as opening. Returns `false` when a session
    /// already exists — the caller must not request the device again.
    pub fn begin_open(&mut self) -> bool {
        if matches!(self.phase, Phase::Closed) {
            self.phase = Phase::Opening;
            true
        } else {
            debug!("camera open ignored: session already active");
            false
        }
    }

    /// Installs the stream acquired by an earlier [`begin_open`]. If
    /// the session was stopped while the device request was in flight
    /// the late-arriving stream is released immediately and `false` is
    /// returned.
    ///
    /// [`begin_open`]: CameraSession::begin_open
    pub fn complete_open(&mut self, mut stream: Box<dyn CameraStream>) -> bool {
        if matches!(self.phase, Phase::Opening) {
            self.phase = Phase::Open(stream);
            true
        } else {
            debug!("camera stream arrived after stop; releasing");
            stream.shut_down();
            false
        }
    }

    /// Records a failed acquisition; the session returns to closed.
    pub fn fail_open(&mut self) {
        if matches!(self.phase, Phase::Opening) {
            self.phase = Phase::Closed;
        }
    }

    /// Grabs one still and tears the session down, releasing the
    /// device. Valid only in the open state; the session is closed
    /// afterwards whether or not the grab succeeded.
    pub fn capture_still(&mut self) -> Result<ImagePayload, CameraError> {
        match std::mem::replace(&mut self.phase, Phase::Closed) {
            Phase::Open(mut stream) => {
                let still = stream.capture_still();
                stream.shut_down();
                still
            }
            other => {
                self.phase = other;
                Err(CameraError::NotOpen)
            }
        }
    }

    /// Releases any acquired resource. Valid in `opening` or `open`;
    /// a stop during `opening` leaves the in-flight open request to
    /// find the session closed and release its stream itself.
    pub fn stop(&mut self) {
        if let Phase::Open(mut stream) = std::mem::replace(&mut self.phase, Phase::Closed) {
            stream.shut_down();
        }
    }
}
