// Frame model and display conversion for USB capture devices.
//
// capture engine -> CaptureBridge -> FrameBuffer -> FormatConverter
//   -> DisplayTargetAdapter (reused target) or a fresh PixelBlob

pub mod capture;
pub mod convert;
pub mod diagnostics;
pub mod display;
pub mod frame;
pub mod settings;

pub use capture::bridge::{
    build_frame, CaptureBridge, FrameInfo, FrameKind, FrameListener, FramePayload,
};
pub use capture::native::{LockableImage, LockedBits};
pub use convert::{aligned_stride, FormatConverter, Gray16Depth};
pub use display::surface::{DisplaySurface, SurfaceGuard};
pub use display::target::{DisplayTargetAdapter, ReusableTarget};
pub use frame::error::{FrameError, Result};
pub use frame::types::{FormatTag, FrameBuffer, PixelBlob, PixelFormat};
pub use settings::store::SettingsStore;
pub use settings::types::{PipelineSettings, SettingsError};

/// Build a bridge and display adapter from persisted settings.
///
/// When `DUMMY_CAMERA=1` is set the caller can drive the bridge with
/// [`capture::dummy::DummyCamera`] instead of a real capture engine.
pub fn create_pipeline(
    device_id: impl Into<String>,
    store: &SettingsStore,
) -> std::result::Result<(CaptureBridge, DisplayTargetAdapter), SettingsError> {
    let settings = store.get();
    let adapter = settings.adapter()?;
    let bridge = CaptureBridge::with_settings(device_id, &settings);
    tracing::info!(
        "pipeline ready for {} (gray16 bits {}, row alignment {}){}",
        bridge.device_id(),
        settings.gray16_significant_bits,
        settings.row_alignment,
        if capture::dummy::DummyCamera::is_enabled() {
            ", dummy camera enabled"
        } else {
            ""
        }
    );
    Ok((bridge, adapter))
}
