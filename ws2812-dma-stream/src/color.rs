//! Pixel colors.
//!
//! Colors are plain [`RGB8`] values, the same type the `smart-leds`
//! ecosystem passes around.

use rand_core::RngCore;
pub use rgb::RGB8;

pub const WHITE: RGB8 = RGB8 { r: 0xff, g: 0xff, b: 0xff };
pub const BLACK: RGB8 = RGB8 { r: 0, g: 0, b: 0 };
pub const RED: RGB8 = RGB8 { r: 0xff, g: 0, b: 0 };
pub const GREEN: RGB8 = RGB8 { r: 0, g: 0xff, b: 0 };
pub const BLUE: RGB8 = RGB8 { r: 0, g: 0, b: 0xff };

/// Bytes of a color in (R, G, B) order, as stored in a pixel buffer.
#[inline]
pub const fn to_array(color: RGB8) -> [u8; 3] {
    [color.r, color.g, color.b]
}

/// Inverse of [`to_array`].
#[inline]
pub const fn from_array([r, g, b]: [u8; 3]) -> RGB8 {
    RGB8 { r, g, b }
}

/// Uniformly random color. Meant for demos and diagnostics.
pub fn random_color<R: RngCore + ?Sized>(rng: &mut R) -> RGB8 {
    let [r, g, b, _] = rng.next_u32().to_le_bytes();
    RGB8 { r, g, b }
}
