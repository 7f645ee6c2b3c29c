use crate::frame::error::{FrameError, Result};

/// Pixel memory exposed by a locked native image.
///
/// `bytes` starts at the lowest address of the pixel block, and the block
/// size is always `|row_stride| * height`. The sign of `row_stride` is not
/// used: row order follows the negotiated subtype, as for raw payloads.
pub struct LockedBits<'a> {
    pub bytes: &'a [u8],
    pub row_stride: isize,
}

/// A platform bitmap whose pixels must be locked before they can be read.
pub trait LockableImage {
    /// Pin the pixel memory.
    fn lock_bits(&mut self) -> Result<()>;

    /// The pinned pixel memory. Only valid between `lock_bits` and `unlock_bits`.
    fn locked_bits(&self) -> Result<LockedBits<'_>>;

    /// Release the pin taken by `lock_bits`.
    fn unlock_bits(&mut self);
}

/// Holds a native image locked; unlocks on drop.
struct ImageLock<'a, I: LockableImage + ?Sized> {
    image: &'a mut I,
}

impl<'a, I: LockableImage + ?Sized> ImageLock<'a, I> {
    fn acquire(image: &'a mut I) -> Result<Self> {
        image.lock_bits()?;
        Ok(Self { image })
    }

    fn bits(&self) -> Result<LockedBits<'_>> {
        self.image.locked_bits()
    }
}

impl<I: LockableImage + ?Sized> Drop for ImageLock<'_, I> {
    fn drop(&mut self) {
        self.image.unlock_bits();
    }
}

/// Pixels copied out of a native image.
#[derive(Debug)]
pub(crate) struct NativeCopy {
    pub data: Vec<u8>,
    pub stride: usize,
}

/// Copy `|row_stride| * height` bytes out of `image`.
///
/// The image is unlocked before this returns, whether or not the copy
/// succeeded.
pub(crate) fn copy_native_image<I: LockableImage + ?Sized>(
    image: &mut I,
    height: u32,
) -> Result<NativeCopy> {
    let lock = ImageLock::acquire(image)?;
    let bits = lock.bits()?;

    let stride = bits.row_stride.unsigned_abs();
    let len = stride.checked_mul(height as usize).ok_or_else(|| {
        FrameError::NativeImage(format!("stride {stride} x height {height} overflows"))
    })?;
    if bits.bytes.len() < len {
        return Err(FrameError::NativeImage(format!(
            "locked region holds {} bytes, need {len}",
            bits.bytes.len()
        )));
    }

    Ok(NativeCopy {
        data: bits.bytes[..len].to_vec(),
        stride,
    })
}
