//! Turn one pixel into the 24 compare values the timer plays back.

use rgb::RGB8;

use crate::timing::DutyCodes;

/// Bits sent per pixel: 8 each for G, R, B.
pub const BITS_PER_PIXEL: usize = 24;

/// One pixel worth of compare values.
pub type PixelSlot<T> = [T; BITS_PER_PIXEL];

/// Encode `color` into `out`: green, then red, then blue, each MSB first.
///
/// WS2812 parts latch the bits in exactly this order, so it is not
/// configurable.
#[inline]
pub fn encode_pixel<T: Copy>(out: &mut PixelSlot<T>, color: RGB8, codes: &DutyCodes<T>) {
    let bits = ((color.g as u32) << 16) | ((color.r as u32) << 8) | (color.b as u32);
    for (i, loc) in out.iter_mut().enumerate() {
        *loc = if (bits >> (BITS_PER_PIXEL - i - 1)) & 1 == 1 {
            codes.one
        } else {
            codes.zero
        };
    }
}

/// Fill `out` with a reset frame: the line stays low for every bit.
#[inline]
pub fn encode_reset<T: Copy>(out: &mut PixelSlot<T>, codes: &DutyCodes<T>) {
    out.fill(codes.reset);
}
