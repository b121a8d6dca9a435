//! Per-pixel intensity adjustment functions.
//!
//! All functions work on 8-bit channels where 0 is black and 255 is white.

/// Midpoint that stays fixed under [`contrast`].
pub const CONTRAST_CENTER: f32 = 128.0;

/// Composite one colour channel over an opaque white background.
///
/// `alpha = 0` gives white, `alpha = 255` keeps the channel as is.
#[inline]
pub fn over_white(channel: u8, alpha: u8) -> u8 {
    let c = channel as u32;
    let a = alpha as u32;
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

/// ITU-R 601-2 luma of an RGB pixel, rounded.
///
/// `L = R * 299/1000 + G * 587/1000 + B * 114/1000`
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114 + 500) / 1000) as u8
}

/// Adjust contrast around [`CONTRAST_CENTER`].
///
/// # Parameters
/// - `value`: Input luminance
/// - `amount`: Contrast multiplier (>1 increases, <1 decreases)
#[inline]
pub fn contrast(value: u8, amount: f32) -> u8 {
    let stretched = CONTRAST_CENTER + (value as f32 - CONTRAST_CENTER) * amount;
    stretched.round().clamp(0.0, 255.0) as u8
}
