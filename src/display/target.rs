use std::fmt;

use tracing::{info, trace};

use crate::convert::{aligned_stride, FormatConverter};
use crate::display::surface::{DisplaySurface, SurfaceGuard};
use crate::frame::error::Result;
use crate::frame::types::{FrameBuffer, OUTPUT_BYTES_PER_PIXEL};

/// Default row alignment for new targets, matching DIB/GDI bitmaps.
pub const DEFAULT_ROW_ALIGNMENT: usize = 4;

/// Destination buffer reused across frames of the same size.
///
/// Always packed BGR24, rows top-down, `stride` bytes apart. The stride is
/// rounded up to the host's row alignment and may exceed `width * 3`.
pub struct ReusableTarget {
    width: u32,
    height: u32,
    stride: usize,
    pixels: Vec<u8>,
    fresh: bool,
}

impl ReusableTarget {
    fn allocate(width: u32, height: u32, row_alignment: usize) -> Self {
        let stride = aligned_stride(width, row_alignment);
        Self {
            width,
            height,
            stride,
            pixels: vec![0u8; stride * height as usize],
            fresh: true,
        }
    }

    fn fits(&self, frame: &FrameBuffer) -> bool {
        self.width == frame.width() && self.height == frame.height()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Whether the most recent bind allocated this target.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// The meaningful `width * 3` bytes of row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.pixels[start..start + self.width as usize * OUTPUT_BYTES_PER_PIXEL]
    }
}

impl fmt::Debug for ReusableTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReusableTarget")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("len", &self.pixels.len())
            .field("fresh", &self.fresh)
            .finish()
    }
}

/// Writes converted frames into a reusable display target.
///
/// The adapter itself is stateless. The target lives in a caller-owned
/// `Option<ReusableTarget>` slot; `bind` takes the slot by `&mut`, so writes
/// into one target are serialised by the borrow checker. Callers that share
/// a slot between threads must put it behind their own lock, and should
/// only bind from the thread that owns the display surface.
#[derive(Debug, Clone, Copy)]
pub struct DisplayTargetAdapter {
    converter: FormatConverter,
    row_alignment: usize,
}

impl DisplayTargetAdapter {
    pub fn new(converter: FormatConverter, row_alignment: usize) -> Self {
        Self {
            converter,
            row_alignment,
        }
    }

    pub fn converter(&self) -> &FormatConverter {
        &self.converter
    }

    /// Convert `frame` into the target held in `slot`.
    ///
    /// Reuses the existing target when its width and height match the frame;
    /// otherwise (or when the slot is empty) a new target replaces it. The
    /// frame's format is resolved first, so an unsupported frame leaves the
    /// slot exactly as it was.
    pub fn bind<'t>(
        &self,
        frame: &FrameBuffer,
        slot: &'t mut Option<ReusableTarget>,
    ) -> Result<&'t mut ReusableTarget> {
        frame.format().pixel_format()?;

        let target = match slot.take() {
            Some(mut existing) if existing.fits(frame) => {
                trace!(
                    target: "camframe::display",
                    "reusing {}x{} target",
                    existing.width,
                    existing.height
                );
                existing.fresh = false;
                existing
            }
            previous => {
                match previous {
                    Some(old) => info!(
                        "display target resized {}x{} -> {}x{}",
                        old.width,
                        old.height,
                        frame.width(),
                        frame.height()
                    ),
                    None => info!(
                        "allocating {}x{} display target",
                        frame.width(),
                        frame.height()
                    ),
                }
                ReusableTarget::allocate(frame.width(), frame.height(), self.row_alignment)
            }
        };

        // Sized from the frame above, so the destination always fits.
        let target = slot.insert(target);
        self.converter
            .convert_into(frame, &mut target.pixels, target.stride)?;
        Ok(target)
    }

    /// Bind `frame` and publish the result while holding the surface lock.
    ///
    /// The lock is released on every path, including a failed conversion.
    pub fn present<'t, S: DisplaySurface + ?Sized>(
        &self,
        frame: &FrameBuffer,
        slot: &'t mut Option<ReusableTarget>,
        surface: &mut S,
    ) -> Result<&'t mut ReusableTarget> {
        let mut guard = SurfaceGuard::acquire(surface);
        let target = self.bind(frame, slot)?;
        guard.publish(target);
        Ok(target)
    }
}

impl Default for DisplayTargetAdapter {
    fn default() -> Self {
        Self::new(FormatConverter::default(), DEFAULT_ROW_ALIGNMENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::surface::tests::RecordingSurface;
    use crate::frame::error::FrameError;
    use crate::frame::types::{FormatTag, PixelFormat};

    fn gray8(width: u32, height: u32) -> FrameBuffer {
        let data: Vec<u8> = (0..width * height).map(|i| i as u8).collect();
        FrameBuffer::packed(width, height, PixelFormat::Gray8TopDown, data, 0).unwrap()
    }

    fn unsupported() -> FrameBuffer {
        FrameBuffer::new(
            2,
            2,
            2,
            FormatTag::Unrecognized("MJPG".to_string()),
            vec![0u8; 4],
            0,
        )
        .unwrap()
    }

    #[test]
    fn empty_slot_allocates_fresh_target() {
        let adapter = DisplayTargetAdapter::default();
        let mut slot = None;

        let target = adapter.bind(&gray8(4, 2), &mut slot).unwrap();

        assert!(target.is_fresh());
        assert_eq!((target.width(), target.height()), (4, 2));
        assert!(slot.is_some());
    }

    #[test]
    fn same_dimensions_reuse_target() {
        let adapter = DisplayTargetAdapter::default();
        let mut slot = None;

        let first = adapter.bind(&gray8(4, 2), &mut slot).unwrap().pixels().as_ptr();
        let target = adapter.bind(&gray8(4, 2), &mut slot).unwrap();

        assert!(!target.is_fresh());
        assert_eq!(target.pixels().as_ptr(), first);
    }

    #[test]
    fn different_width_allocates_new_target() {
        let adapter = DisplayTargetAdapter::default();
        let mut slot = None;

        adapter.bind(&gray8(4, 2), &mut slot).unwrap();
        let target = adapter.bind(&gray8(5, 2), &mut slot).unwrap();

        assert!(target.is_fresh());
        assert_eq!(target.width(), 5);
    }

    #[test]
    fn different_height_allocates_new_target() {
        let adapter = DisplayTargetAdapter::default();
        let mut slot = None;

        adapter.bind(&gray8(4, 2), &mut slot).unwrap();
        let target = adapter.bind(&gray8(4, 3), &mut slot).unwrap();

        assert!(target.is_fresh());
        assert_eq!(target.height(), 3);
    }

    #[test]
    fn target_stride_is_row_aligned() {
        let adapter = DisplayTargetAdapter::default();
        let mut slot = None;

        // 5px * 3 = 15 bytes, aligned to 16
        let target = adapter.bind(&gray8(5, 2), &mut slot).unwrap();

        assert_eq!(target.stride(), 16);
        assert_eq!(target.pixels().len(), 32);
        assert_eq!(target.row(1), &[5, 5, 5, 6, 6, 6, 7, 7, 7, 8, 8, 8, 9, 9, 9]);
    }

    #[test]
    fn reused_target_receives_new_pixels() {
        let adapter = DisplayTargetAdapter::default();
        let mut slot = None;
        let bright =
            FrameBuffer::packed(1, 1, PixelFormat::Gray8TopDown, vec![200u8], 0).unwrap();
        let dark = FrameBuffer::packed(1, 1, PixelFormat::Gray8TopDown, vec![10u8], 0).unwrap();

        adapter.bind(&bright, &mut slot).unwrap();
        let target = adapter.bind(&dark, &mut slot).unwrap();

        assert_eq!(target.row(0), &[10, 10, 10]);
    }

    #[test]
    fn format_change_with_same_size_reuses_target() {
        let adapter = DisplayTargetAdapter::default();
        let mut slot = None;
        let bgr = FrameBuffer::packed(
            1,
            1,
            PixelFormat::PackedBgr24BottomUp,
            vec![1u8, 2, 3],
            0,
        )
        .unwrap();

        adapter.bind(&gray8(1, 1), &mut slot).unwrap();
        let target = adapter.bind(&bgr, &mut slot).unwrap();

        assert!(!target.is_fresh());
        assert_eq!(target.row(0), &[1, 2, 3]);
    }

    #[test]
    fn unsupported_frame_leaves_slot_untouched() {
        let adapter = DisplayTargetAdapter::default();
        let mut slot = None;
        adapter.bind(&gray8(4, 2), &mut slot).unwrap();
        let before = slot.as_ref().unwrap().pixels().to_vec();

        let err = adapter.bind(&unsupported(), &mut slot).unwrap_err();

        assert_eq!(err, FrameError::UnsupportedFormat("MJPG".to_string()));
        let target = slot.as_ref().unwrap();
        assert_eq!((target.width(), target.height()), (4, 2));
        assert_eq!(target.pixels(), &before[..]);
    }

    #[test]
    fn unsupported_frame_does_not_fill_empty_slot() {
        let adapter = DisplayTargetAdapter::default();
        let mut slot = None;
        assert!(adapter.bind(&unsupported(), &mut slot).is_err());
        assert!(slot.is_none());
    }

    #[test]
    fn present_publishes_inside_lock() {
        let adapter = DisplayTargetAdapter::default();
        let mut slot = None;
        let mut surface = RecordingSurface::default();

        adapter.present(&gray8(4, 2), &mut slot, &mut surface).unwrap();

        assert_eq!(surface.events, vec!["lock", "publish 4x2", "unlock"]);
    }

    #[test]
    fn present_unlocks_when_conversion_fails() {
        let adapter = DisplayTargetAdapter::default();
        let mut slot = None;
        let mut surface = RecordingSurface::default();

        let result = adapter.present(&unsupported(), &mut slot, &mut surface);

        assert!(result.is_err());
        assert_eq!(surface.events, vec!["lock", "unlock"]);
        assert!(!surface.locked);
    }

    #[test]
    fn debug_omits_pixel_bytes() {
        let mut slot = None;
        let frame = FrameBuffer::packed(1, 1, PixelFormat::Gray8TopDown, vec![200u8], 0).unwrap();
        let target = DisplayTargetAdapter::default().bind(&frame, &mut slot).unwrap();

        let text = format!("{target:?}");
        assert!(text.contains("len: 4"));
        assert!(!text.contains("200"));
    }

    #[test]
    fn target_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ReusableTarget>();
        assert_send::<DisplayTargetAdapter>();
    }
}
