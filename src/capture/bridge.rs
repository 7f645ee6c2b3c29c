use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::capture::native::{copy_native_image, LockableImage};
use crate::diagnostics::stats::{DiagnosticSnapshot, DiagnosticStats};
use crate::frame::error::{FrameError, Result};
use crate::frame::types::{FrameBuffer, PixelFormat};
use crate::settings::types::PipelineSettings;

/// Which capture stream a frame came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Preview,
    Still,
}

/// Callback invoked for every frame the bridge accepts.
///
/// Runs on the capture engine's worker thread, never the UI thread, after the
/// frame has been stored, so `current_frame`/`current_still` already return
/// it. The frame is only borrowed for the duration of the call; clone it to
/// keep it.
pub type FrameListener = Arc<dyn Fn(FrameKind, &FrameBuffer) + Send + Sync>;

/// Pixel payload handed over by the capture engine.
pub enum FramePayload<'a> {
    /// Bytes already in process memory, rows packed with no padding.
    RawBytes(&'a [u8]),
    /// A platform bitmap that has to be locked before reading.
    NativeImage(&'a mut dyn LockableImage),
}

impl<'a> FramePayload<'a> {
    /// Wrap a driver-owned buffer.
    ///
    /// Returns `NullFrame` for a null pointer or zero length.
    ///
    /// # Safety
    ///
    /// If non-null, `ptr` must be valid for reads of `len` bytes for `'a`,
    /// and the memory must not be written while the payload is alive.
    pub unsafe fn from_raw_parts(ptr: *const u8, len: usize) -> Result<Self> {
        if ptr.is_null() || len == 0 {
            return Err(FrameError::NullFrame);
        }
        Ok(Self::RawBytes(std::slice::from_raw_parts(ptr, len)))
    }
}

/// Geometry and format negotiated for a delivered frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo<'a> {
    pub width: u32,
    pub height: u32,
    /// Negotiated video subtype name, e.g. `"Y800"` or `"RGB24"`.
    pub subtype: &'a str,
    /// Capture timestamp in microseconds.
    pub timestamp_us: u64,
}

/// Build a frame from a capture payload.
///
/// The format, and with it the row order, comes from the subtype name. Raw
/// bytes are assumed packed (`stride = width * bytes_per_sample`); native
/// images keep the magnitude of their own row stride.
pub fn build_frame(payload: FramePayload<'_>, info: &FrameInfo<'_>) -> Result<FrameBuffer> {
    let format = PixelFormat::from_subtype(info.subtype);
    match payload {
        FramePayload::RawBytes(bytes) => {
            if bytes.is_empty() {
                return Err(FrameError::NullFrame);
            }
            FrameBuffer::packed(info.width, info.height, format, bytes, info.timestamp_us)
        }
        FramePayload::NativeImage(image) => {
            let copy = copy_native_image(image, info.height)?;
            FrameBuffer::new(
                info.width,
                info.height,
                copy.stride,
                format,
                copy.data,
                info.timestamp_us,
            )
        }
    }
}

/// Receives frames from the capture engine and keeps the latest of each kind.
///
/// The engine calls `on_preview_frame`/`on_still_image_frame` from its
/// worker thread, at most one at a time per camera. Consumers on other
/// threads read copies through `current_frame`/`current_still`.
pub struct CaptureBridge {
    device_id: String,
    latest_preview: Mutex<Option<FrameBuffer>>,
    latest_still: Mutex<Option<FrameBuffer>>,
    listeners: Mutex<Vec<FrameListener>>,
    stats: Mutex<DiagnosticStats>,
    first_frames_logged: u64,
}

impl CaptureBridge {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self::with_settings(device_id, &PipelineSettings::default())
    }

    pub fn with_settings(device_id: impl Into<String>, settings: &PipelineSettings) -> Self {
        Self {
            device_id: device_id.into(),
            latest_preview: Mutex::new(None),
            latest_still: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            stats: Mutex::new(DiagnosticStats::new()),
            first_frames_logged: settings.first_frames_logged,
        }
    }

    /// Return the device ID for this bridge.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Register a listener for accepted frames.
    pub fn subscribe(&self, listener: FrameListener) {
        self.listeners.lock().push(listener);
    }

    /// Preview stream callback.
    pub fn on_preview_frame(&self, payload: FramePayload<'_>, info: FrameInfo<'_>) -> Result<()> {
        self.deliver(FrameKind::Preview, payload, &info)
    }

    /// Still-image callback (hardware trigger or snapshot pin).
    pub fn on_still_image_frame(
        &self,
        payload: FramePayload<'_>,
        info: FrameInfo<'_>,
    ) -> Result<()> {
        self.deliver(FrameKind::Still, payload, &info)
    }

    /// Copy of the most recent preview frame.
    pub fn current_frame(&self) -> Result<FrameBuffer> {
        self.latest_preview
            .lock()
            .clone()
            .ok_or(FrameError::DeviceNotReady)
    }

    /// Copy of the most recent still image.
    pub fn current_still(&self) -> Result<FrameBuffer> {
        self.latest_still
            .lock()
            .clone()
            .ok_or(FrameError::DeviceNotReady)
    }

    /// Take a snapshot of diagnostic stats for this bridge.
    pub fn diagnostics(&self) -> DiagnosticSnapshot {
        self.stats.lock().snapshot()
    }

    fn deliver(
        &self,
        kind: FrameKind,
        payload: FramePayload<'_>,
        info: &FrameInfo<'_>,
    ) -> Result<()> {
        let frame = match build_frame(payload, info) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(
                    "dropping {kind:?} frame from {} ({}x{}, subtype {:?}): {e}",
                    self.device_id, info.width, info.height, info.subtype
                );
                self.stats.lock().record_drop(&e.to_string());
                return Err(e);
            }
        };

        let delivered = {
            let mut stats = self.stats.lock();
            stats.record_frame(kind, frame.data().len(), frame.timestamp_us());
            stats.frame_count()
        };
        if delivered <= self.first_frames_logged {
            debug!(
                "frame #{delivered} delivered from {}: {kind:?} {}x{} {}, {} bytes",
                self.device_id,
                frame.width(),
                frame.height(),
                frame.format(),
                frame.data().len()
            );
        }

        let slot = match kind {
            FrameKind::Preview => &self.latest_preview,
            FrameKind::Still => &self.latest_still,
        };
        *slot.lock() = Some(frame.clone());

        // Snapshot the listener list so a listener may subscribe without deadlocking.
        let listeners = self.listeners.lock().clone();
        for listener in &listeners {
            listener(kind, &frame);
        }
        Ok(())
    }
}
