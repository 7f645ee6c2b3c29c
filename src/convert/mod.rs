// Format conversion — source layouts to packed top-down BGR24.
//
// Every source row is written to `y * dest_stride` in the destination, so
// callers can hand in buffers whose rows are padded for the host platform.

use tracing::trace;

use crate::frame::error::{FrameError, Result};
use crate::frame::types::{FrameBuffer, PixelBlob, PixelFormat, OUTPUT_BYTES_PER_PIXEL};

/// Number of significant bits in a `Gray16TopDown` sample.
///
/// Samples are left-aligned in 16 bits: the low `16 - bits` bits are padding
/// and are shifted out before rescaling the remaining range to 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gray16Depth {
    significant_bits: u8,
}

impl Gray16Depth {
    /// 12 significant bits, as delivered by common Y16 industrial cameras.
    pub const TWELVE_BIT: Self = Self {
        significant_bits: 12,
    };

    /// Returns `None` unless `1 <= bits <= 16`.
    pub const fn new(bits: u8) -> Option<Self> {
        if bits == 0 || bits > 16 {
            None
        } else {
            Some(Self {
                significant_bits: bits,
            })
        }
    }

    pub const fn significant_bits(self) -> u8 {
        self.significant_bits
    }

    /// Largest value after the padding bits are shifted out (4095 for 12 bits).
    pub const fn max_value(self) -> u32 {
        (1u32 << self.significant_bits) - 1
    }

    /// Map a raw little-endian sample to an 8-bit grey level.
    ///
    /// Divides by the full-scale value rather than shifting, so the top of
    /// the range lands on 255.
    pub const fn to_gray8(self, raw: u16) -> u8 {
        let shift = 16 - self.significant_bits as u32;
        let value = (raw as u32) >> shift;
        (value * 255 / self.max_value()) as u8
    }
}

impl Default for Gray16Depth {
    fn default() -> Self {
        Self::TWELVE_BIT
    }
}

/// Converts captured frames into display-ready BGR24.
///
/// Holds only immutable configuration, so one converter can be shared
/// between threads and used on different frames concurrently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatConverter {
    depth: Gray16Depth,
}

impl FormatConverter {
    pub fn new(depth: Gray16Depth) -> Self {
        Self { depth }
    }

    pub fn depth(&self) -> Gray16Depth {
        self.depth
    }

    /// Convert into a freshly allocated, unpadded buffer.
    pub fn convert(&self, frame: &FrameBuffer) -> Result<PixelBlob> {
        self.convert_with_stride(frame, min_dest_stride(frame))
    }

    /// Convert into a freshly allocated buffer whose rows are `dest_stride`
    /// bytes apart. Padding bytes are zero.
    pub fn convert_with_stride(
        &self,
        frame: &FrameBuffer,
        dest_stride: usize,
    ) -> Result<PixelBlob> {
        let format = frame.format().pixel_format()?;
        let required = required_len(frame, dest_stride)?;

        let mut data = vec![0u8; required];
        self.write_rows(format, frame, &mut data, dest_stride);
        Ok(PixelBlob::new(frame.width(), frame.height(), dest_stride, data))
    }

    /// Convert into a caller-owned buffer.
    ///
    /// All checks run before the first byte is written; on error `dest` is
    /// left untouched. Padding bytes between rows are never written.
    pub fn convert_into(
        &self,
        frame: &FrameBuffer,
        dest: &mut [u8],
        dest_stride: usize,
    ) -> Result<()> {
        let format = frame.format().pixel_format()?;
        let required = required_len(frame, dest_stride)?;
        if dest.len() < required {
            return Err(FrameError::DimensionMismatch {
                required,
                actual: dest.len(),
            });
        }

        self.write_rows(format, frame, &mut dest[..required], dest_stride);
        Ok(())
    }

    fn write_rows(
        &self,
        format: PixelFormat,
        frame: &FrameBuffer,
        dest: &mut [u8],
        dest_stride: usize,
    ) {
        let width = frame.width() as usize;
        let height = frame.height() as usize;
        let row_bytes = width * OUTPUT_BYTES_PER_PIXEL;

        trace!(
            target: "camframe::convert",
            "converting {width}x{height} {format} frame (src stride {}, dest stride {dest_stride})",
            frame.stride()
        );

        let rows = dest.chunks_mut(dest_stride).take(height).enumerate();
        match format {
            PixelFormat::PackedBgr24BottomUp => {
                for (y, dst_row) in rows {
                    let src_row = frame.stored_row(height - 1 - y);
                    dst_row[..row_bytes].copy_from_slice(&src_row[..row_bytes]);
                }
            }
            PixelFormat::Gray8TopDown => {
                for (y, dst_row) in rows {
                    expand_gray8_row(&frame.stored_row(y)[..width], &mut dst_row[..row_bytes]);
                }
            }
            PixelFormat::Gray16TopDown => {
                for (y, dst_row) in rows {
                    expand_gray16_row(
                        &frame.stored_row(y)[..width * 2],
                        &mut dst_row[..row_bytes],
                        self.depth,
                    );
                }
            }
        }
    }
}

/// Smallest destination stride that fits one converted row.
pub fn min_dest_stride(frame: &FrameBuffer) -> usize {
    frame.width() as usize * OUTPUT_BYTES_PER_PIXEL
}

/// Round a row of `width` BGR24 pixels up to a multiple of `alignment` bytes.
///
/// An alignment of 0 or 1 means unaligned.
pub fn aligned_stride(width: u32, alignment: usize) -> usize {
    let row = width as usize * OUTPUT_BYTES_PER_PIXEL;
    if alignment <= 1 {
        return row;
    }
    row.div_ceil(alignment) * alignment
}

fn required_len(frame: &FrameBuffer, dest_stride: usize) -> Result<usize> {
    let min_stride = min_dest_stride(frame);
    if dest_stride < min_stride {
        return Err(FrameError::DimensionMismatch {
            required: min_stride,
            actual: dest_stride,
        });
    }
    dest_stride
        .checked_mul(frame.height() as usize)
        .ok_or_else(|| FrameError::InvalidGeometry(format!("dest stride {dest_stride} overflows")))
}

/// Replicate each 8-bit sample into a B=G=R triplet.
fn expand_gray8_row(src: &[u8], dst: &mut [u8]) {
    for (&sample, px) in src.iter().zip(dst.chunks_exact_mut(3)) {
        px.fill(sample);
    }
}

/// Rescale each little-endian 16-bit sample to 8 bits and replicate it.
fn expand_gray16_row(src: &[u8], dst: &mut [u8], depth: Gray16Depth) {
    for (sample, px) in src.chunks_exact(2).zip(dst.chunks_exact_mut(3)) {
        let raw = u16::from_le_bytes([sample[0], sample[1]]);
        px.fill(depth.to_gray8(raw));
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Converting a bottom-up frame and re-reversing the output rows
        /// yields the stored rows exactly.
        #[test]
        fn prop_bottom_up_round_trip(
            width in 1u32..=8,
            height in 1u32..=16,
            seed in prop::collection::vec(any::<u8>(), 8 * 3 * 16),
        ) {
            let stride = width as usize * 3;
            let data = seed[..stride * height as usize].to_vec();
            let frame = FrameBuffer::packed(width, height, PixelFormat::PackedBgr24BottomUp, data.clone(), 0).unwrap();

            let blob = FormatConverter::default().convert(&frame).unwrap();

            let restored: Vec<u8> = blob
                .as_bytes()
                .chunks(stride)
                .rev()
                .flatten()
                .copied()
                .collect();
            prop_assert_eq!(restored, data);
        }

        /// Every output triplet of a Gray8 frame repeats its source sample.
        #[test]
        fn prop_gray8_triplets_repeat_sample(
            width in 1u32..=8,
            height in 1u32..=8,
            seed in prop::collection::vec(any::<u8>(), 64),
        ) {
            let data = seed[..(width * height) as usize].to_vec();
            let frame = FrameBuffer::packed(width, height, PixelFormat::Gray8TopDown, data.clone(), 0).unwrap();

            let blob = FormatConverter::default().convert(&frame).unwrap();

            for (px, &sample) in blob.as_bytes().chunks_exact(3).zip(data.iter()) {
                prop_assert_eq!(px, &[sample, sample, sample][..]);
            }
        }

        /// Raising the significant part of a sample never darkens the output.
        #[test]
        fn prop_gray16_monotonic(
            a in 0u16..=0x0FFF,
            b in 0u16..=0x0FFF,
            low in 0u16..=0x000F,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let depth = Gray16Depth::TWELVE_BIT;
            prop_assert!(depth.to_gray8((lo << 4) | low) <= depth.to_gray8((hi << 4) | low));
        }

        #[test]
        fn prop_gray16_monotonic_any_depth(
            bits in 1u8..=16,
            a in any::<u16>(),
            b in any::<u16>(),
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let depth = Gray16Depth::new(bits).unwrap();
            prop_assert!(depth.to_gray8(lo) <= depth.to_gray8(hi));
        }
    }
}
