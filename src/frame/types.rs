use std::fmt;

use crate::frame::error::{FrameError, Result};

/// Bytes per pixel of every converted output buffer (packed BGR24).
pub const OUTPUT_BYTES_PER_PIXEL: usize = 3;

/// Source pixel layouts the converter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 24-bit BGR with rows stored bottom row first (DIB order).
    PackedBgr24BottomUp,
    /// 8-bit greyscale, rows top-down.
    Gray8TopDown,
    /// 16-bit little-endian greyscale, rows top-down.
    Gray16TopDown,
}

impl PixelFormat {
    /// Size of one pixel in the source layout.
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::Gray8TopDown => 1,
            Self::Gray16TopDown => 2,
            Self::PackedBgr24BottomUp => 3,
        }
    }

    /// Whether the first row in memory is the visually bottom row.
    pub const fn is_bottom_up(self) -> bool {
        matches!(self, Self::PackedBgr24BottomUp)
    }

    /// Infer the layout from a negotiated video subtype name.
    ///
    /// Greyscale subtypes are recognised by substring (`Y800`/`Y8`, `Y16`);
    /// everything else is delivered by the sample grabber as bottom-up BGR24.
    pub fn from_subtype(subtype: &str) -> Self {
        let upper = subtype.to_ascii_uppercase();
        if upper.contains("Y800") || upper.contains("Y8") {
            Self::Gray8TopDown
        } else if upper.contains("Y16") {
            Self::Gray16TopDown
        } else {
            Self::PackedBgr24BottomUp
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::PackedBgr24BottomUp => "PackedBgr24BottomUp",
            Self::Gray8TopDown => "Gray8TopDown",
            Self::Gray16TopDown => "Gray16TopDown",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Format tag carried by a frame.
///
/// A frame may be tagged with a layout this crate cannot render (for
/// example a compressed subtype handed through by the capture engine).
/// Such frames can be constructed and cloned, but conversion rejects them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormatTag {
    Known(PixelFormat),
    Unrecognized(String),
}

impl FormatTag {
    /// Resolve the tag to a renderable layout.
    pub fn pixel_format(&self) -> Result<PixelFormat> {
        match self {
            Self::Known(format) => Ok(*format),
            Self::Unrecognized(tag) => Err(FrameError::UnsupportedFormat(tag.clone())),
        }
    }
}

impl From<PixelFormat> for FormatTag {
    fn from(format: PixelFormat) -> Self {
        Self::Known(format)
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(format) => write!(f, "{format}"),
            Self::Unrecognized(tag) => f.write_str(tag),
        }
    }
}

/// One captured image: geometry, format tag and an owned copy of the pixels.
///
/// Pixel data is exactly `stride * height` bytes and never mutated after
/// construction. `clone()` deep-copies the pixels, so a consumer that needs
/// a frame beyond the capture callback can retain its own copy.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    stride: usize,
    format: FormatTag,
    data: Vec<u8>,
    timestamp_us: u64,
}

impl FrameBuffer {
    /// Build a frame from raw bytes laid out with the given row stride.
    ///
    /// Bytes beyond `stride * height` are discarded.
    pub fn new(
        width: u32,
        height: u32,
        stride: usize,
        format: impl Into<FormatTag>,
        data: impl Into<Vec<u8>>,
        timestamp_us: u64,
    ) -> Result<Self> {
        let format = format.into();
        let mut data = data.into();
        if data.is_empty() {
            return Err(FrameError::NullFrame);
        }
        if width == 0 || height == 0 {
            return Err(FrameError::InvalidGeometry(format!(
                "zero dimension {width}x{height}"
            )));
        }

        let bytes_per_sample = match &format {
            FormatTag::Known(f) => f.bytes_per_sample(),
            FormatTag::Unrecognized(_) => 1,
        };
        let min_stride = width as usize * bytes_per_sample;
        if stride < min_stride {
            return Err(FrameError::InvalidGeometry(format!(
                "stride {stride} below minimum {min_stride} for {width}px of {format}"
            )));
        }

        let expected = stride.checked_mul(height as usize).ok_or_else(|| {
            FrameError::InvalidGeometry(format!("stride {stride} x height {height} overflows"))
        })?;
        if data.len() < expected {
            return Err(FrameError::InvalidGeometry(format!(
                "got {} bytes, expected {expected} ({width}x{height}, stride {stride})",
                data.len()
            )));
        }
        data.truncate(expected);

        Ok(Self {
            width,
            height,
            stride,
            format,
            data,
            timestamp_us,
        })
    }

    /// Build a frame whose rows carry no padding.
    pub fn packed(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: impl Into<Vec<u8>>,
        timestamp_us: u64,
    ) -> Result<Self> {
        let stride = width as usize * format.bytes_per_sample();
        Self::new(width, height, stride, format, data, timestamp_us)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes from the start of one stored row to the next.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> &FormatTag {
        &self.format
    }

    /// Capture timestamp in microseconds.
    pub fn timestamp_us(&self) -> u64 {
        self.timestamp_us
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The `y`-th row as stored in memory (not corrected for orientation).
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn stored_row(&self, y: usize) -> &[u8] {
        &self.data[y * self.stride..(y + 1) * self.stride]
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("format", &self.format)
            .field("len", &self.data.len())
            .field("timestamp_us", &self.timestamp_us)
            .finish()
    }
}

/// Converted, display-ready pixels: packed BGR24, rows top-down.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBlob {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl PixelBlob {
    pub(crate) fn new(width: u32, height: u32, stride: usize, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride,
            data,
        }
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

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// The meaningful `width * 3` bytes of output row `y`, padding excluded.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.width as usize * OUTPUT_BYTES_PER_PIXEL]
    }
}

impl fmt::Debug for PixelBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBlob")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("len", &self.data.len())
            .finish()
    }
}
