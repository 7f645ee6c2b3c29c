use crate::capture::bridge::{CaptureBridge, FrameInfo, FramePayload};
use crate::capture::native::{LockableImage, LockedBits};
use crate::frame::error::{FrameError, Result};
use crate::frame::types::PixelFormat;

/// Nominal frame interval of the simulated camera (30 fps).
const FRAME_INTERVAL_US: u64 = 33_333;

/// A fake capture engine for running the pipeline without hardware.
///
/// Produces a moving gradient in the requested layout and feeds it to a
/// [`CaptureBridge`] the same way a real engine does: preview frames as raw
/// bytes, still images as a lockable bitmap with DIB-style padded rows.
///
/// Enable via `DUMMY_CAMERA=1` environment variable.
pub struct DummyCamera {
    width: u32,
    height: u32,
    format: PixelFormat,
    frame_index: u64,
}

impl DummyCamera {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            frame_index: 0,
        }
    }

    /// Whether the dummy camera is enabled via environment variable.
    pub fn is_enabled() -> bool {
        std::env::var("DUMMY_CAMERA").is_ok_and(|v| v == "1" || v == "true")
    }

    /// Subtype name a driver would negotiate for this layout.
    pub fn subtype(&self) -> &'static str {
        match self.format {
            PixelFormat::PackedBgr24BottomUp => "RGB24",
            PixelFormat::Gray8TopDown => "Y800",
            PixelFormat::Gray16TopDown => "Y16 ",
        }
    }

    /// Test pattern for frame `index`, rows packed with `stride` bytes.
    ///
    /// The visible pixel at (x, y) has level `x + y + index`; BGR frames are
    /// stored bottom row first.
    pub fn test_frame(&self, index: u64, stride: usize) -> Vec<u8> {
        let width = self.width as usize;
        let height = self.height as usize;
        let mut data = vec![0u8; stride * height];

        for y in 0..height {
            let stored_y = if self.format.is_bottom_up() {
                height - 1 - y
            } else {
                y
            };
            let row = &mut data[stored_y * stride..(stored_y + 1) * stride];
            let pixels = row
                .chunks_exact_mut(self.format.bytes_per_sample())
                .take(width);
            for (x, px) in pixels.enumerate() {
                let level = (x + y) as u64 + index;
                match self.format {
                    PixelFormat::PackedBgr24BottomUp => {
                        px.copy_from_slice(&[level as u8, y as u8, x as u8]);
                    }
                    PixelFormat::Gray8TopDown => px[0] = level as u8,
                    PixelFormat::Gray16TopDown => {
                        // 12 significant bits, left-aligned
                        let sample = ((level % 4096) as u16) << 4;
                        px.copy_from_slice(&sample.to_le_bytes());
                    }
                }
            }
        }
        data
    }

    fn next_info(&mut self) -> (u64, FrameInfo<'static>) {
        let index = self.frame_index;
        self.frame_index += 1;
        let info = FrameInfo {
            width: self.width,
            height: self.height,
            subtype: self.subtype(),
            timestamp_us: index * FRAME_INTERVAL_US,
        };
        (index, info)
    }

    /// Deliver the next preview frame to `bridge`.
    pub fn emit_preview(&mut self, bridge: &CaptureBridge) -> Result<()> {
        let (index, info) = self.next_info();
        let stride = self.width as usize * self.format.bytes_per_sample();
        let data = self.test_frame(index, stride);
        bridge.on_preview_frame(FramePayload::RawBytes(&data), info)
    }

    /// Deliver the next frame to `bridge` as a still image.
    pub fn emit_still(&mut self, bridge: &CaptureBridge) -> Result<()> {
        let (index, info) = self.next_info();
        let row = self.width as usize * self.format.bytes_per_sample();
        let stride = row.div_ceil(4) * 4;
        let mut bitmap = DummyBitmap::new(self.test_frame(index, stride), stride);
        bridge.on_still_image_frame(FramePayload::NativeImage(&mut bitmap), info)
    }
}

/// In-memory bitmap with DIB semantics: bottom-up rows report a negative stride.
pub struct DummyBitmap {
    pixels: Vec<u8>,
    stride: usize,
    locked: bool,
}

impl DummyBitmap {
    pub fn new(pixels: Vec<u8>, stride: usize) -> Self {
        Self {
            pixels,
            stride,
            locked: false,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl LockableImage for DummyBitmap {
    fn lock_bits(&mut self) -> Result<()> {
        if self.locked {
            return Err(FrameError::NativeImage("bitmap already locked".to_string()));
        }
        self.locked = true;
        Ok(())
    }

    fn locked_bits(&self) -> Result<LockedBits<'_>> {
        if !self.locked {
            return Err(FrameError::NativeImage("bitmap not locked".to_string()));
        }
        Ok(LockedBits {
            bytes: &self.pixels,
            row_stride: -(self.stride as isize),
        })
    }

    fn unlock_bits(&mut self) {
        self.locked = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::target::DisplayTargetAdapter;

    #[test]
    fn subtype_round_trips_through_inference() {
        for format in [
            PixelFormat::PackedBgr24BottomUp,
            PixelFormat::Gray8TopDown,
            PixelFormat::Gray16TopDown,
        ] {
            let camera = DummyCamera::new(2, 2, format);
            assert_eq!(PixelFormat::from_subtype(camera.subtype()), format);
        }
    }

    #[test]
    fn preview_frames_reach_the_bridge() {
        let bridge = CaptureBridge::new("dummy:test:camera-001");
        let mut camera = DummyCamera::new(4, 3, PixelFormat::Gray8TopDown);

        camera.emit_preview(&bridge).unwrap();
        camera.emit_preview(&bridge).unwrap();

        let frame = bridge.current_frame().unwrap();
        assert_eq!(frame.timestamp_us(), FRAME_INTERVAL_US);
        // level at (0, 0) of frame 1
        assert_eq!(frame.data()[0], 1);
        assert_eq!(bridge.diagnostics().preview_frames, 2);
    }

    #[test]
    fn bgr_preview_displays_top_row_first() {
        let bridge = CaptureBridge::new("dummy");
        let mut camera = DummyCamera::new(2, 3, PixelFormat::PackedBgr24BottomUp);
        camera.emit_preview(&bridge).unwrap();

        let mut slot = None;
        let target = DisplayTargetAdapter::default()
            .bind(&bridge.current_frame().unwrap(), &mut slot)
            .unwrap();

        // visible row 0: B = x + y, G = y, R = x
        assert_eq!(target.row(0), &[0, 0, 0, 1, 0, 1]);
        assert_eq!(target.row(2), &[2, 2, 0, 3, 2, 1]);
    }

    #[test]
    fn still_frames_go_through_native_lock() {
        let bridge = CaptureBridge::new("dummy");
        let mut camera = DummyCamera::new(5, 2, PixelFormat::PackedBgr24BottomUp);

        camera.emit_still(&bridge).unwrap();

        let still = bridge.current_still().unwrap();
        // 15-byte rows padded to 16
        assert_eq!(still.stride(), 16);
        assert_eq!(still.data().len(), 32);
        assert!(bridge.current_frame().is_err());
    }

    #[test]
    fn gray16_pattern_converts_to_scaled_levels() {
        let bridge = CaptureBridge::new("dummy");
        let mut camera = DummyCamera::new(2, 1, PixelFormat::Gray16TopDown);
        camera.emit_preview(&bridge).unwrap();

        let frame = bridge.current_frame().unwrap();
        let blob = crate::convert::FormatConverter::default()
            .convert(&frame)
            .unwrap();
        // level 1 -> 1 * 255 / 4095 = 0
        assert_eq!(blob.as_bytes(), &[0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn bitmap_rejects_double_lock() {
        let mut bitmap = DummyBitmap::new(vec![0u8; 4], 4);
        bitmap.lock_bits().unwrap();
        assert!(bitmap.lock_bits().is_err());
        bitmap.unlock_bits();
        assert!(!bitmap.is_locked());
        assert!(bitmap.locked_bits().is_err());
    }

    #[test]
    fn is_enabled_reads_env_var() {
        // Default test environment has DUMMY_CAMERA unset
        if std::env::var("DUMMY_CAMERA").is_err() {
            assert!(!DummyCamera::is_enabled());
        }
    }
}
