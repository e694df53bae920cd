use rgb::{ComponentBytes, RGB8};

use crate::color;
use crate::error::PixelError;

/// Bytes per pixel in caller memory: R, G, B.
pub const BYTES_PER_PIXEL: usize = 3;

/// Borrowed view over caller-owned pixel data.
///
/// The memory holds `len()` pixels of three bytes each in (R, G, B) order.
/// The view never owns or reallocates it; the driver only borrows it for
/// the duration of one transmission.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PixelBuffer<'a> {
    bytes: &'a [u8],
}

impl<'a> PixelBuffer<'a> {
    /// View the first `count` pixels of `bytes`.
    pub fn new(bytes: &'a [u8], count: usize) -> Result<Self, PixelError> {
        let too_small = PixelError::BufferTooSmall {
            pixels: count,
            bytes: bytes.len(),
        };
        let needed = count.checked_mul(BYTES_PER_PIXEL).ok_or(too_small)?;
        let bytes = bytes.get(..needed).ok_or(too_small)?;
        Ok(Self { bytes })
    }

    /// View every whole pixel in `bytes`. Trailing bytes that do not make a
    /// full pixel are ignored.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        let whole = bytes.len() - bytes.len() % BYTES_PER_PIXEL;
        Self {
            bytes: &bytes[..whole],
        }
    }

    /// View a slice of colors.
    pub fn from_colors(colors: &'a [RGB8]) -> Self {
        Self {
            bytes: colors.as_bytes(),
        }
    }

    /// Number of pixels.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / BYTES_PER_PIXEL
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Color of pixel `index`.
    pub fn pixel(&self, index: usize) -> Result<RGB8, PixelError> {
        let start = index
            .checked_mul(BYTES_PER_PIXEL)
            .filter(|start| *start < self.bytes.len())
            .ok_or(PixelError::OutOfRange {
                index,
                len: self.len(),
            })?;
        Ok(color::from_array([
            self.bytes[start],
            self.bytes[start + 1],
            self.bytes[start + 2],
        ]))
    }

    pub fn iter(&self) -> impl Iterator<Item = RGB8> + 'a {
        self.bytes
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|px| color::from_array([px[0], px[1], px[2]]))
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

impl<'a> From<&'a [RGB8]> for PixelBuffer<'a> {
    fn from(colors: &'a [RGB8]) -> Self {
        Self::from_colors(colors)
    }
}

impl core::fmt::Debug for PixelBuffer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("len", &self.len())
            .finish()
    }
}
