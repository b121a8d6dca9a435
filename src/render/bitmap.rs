//! # 1-Bit Raster Images
//!
//! [`RasterImage`] is the thresholded, bit-packed form of a picture, laid out
//! exactly as the `GS v 0` command expects it.
//!
//! ## Bit Packing
//!
//! - Rows are `ceil(width / 8)` bytes, top to bottom
//! - Bit 7 (MSB) = leftmost pixel of each byte
//! - 1 = ink, 0 = background
//! - Padding bits at the right edge are always 0

use image::{GrayImage, Luma};

use crate::error::{PaperTrailError, Result};
use crate::protocol::commands::PrinterCommand;
use crate::protocol::graphics;

/// Pack a row of boolean pixel values into bytes.
///
/// ## Example
///
/// ```
/// use paper_trail::render::bitmap::pack_row;
///
/// // 8 pixels pack into 1 byte
/// let row = vec![true, true, true, true, false, false, false, false];
/// assert_eq!(pack_row(&row), vec![0xF0]);
///
/// // 12 pixels pack into 2 bytes (4 bits padding)
/// let row = vec![true; 12];
/// assert_eq!(pack_row(&row), vec![0xFF, 0xF0]);
/// ```
pub fn pack_row(pixels: &[bool]) -> Vec<u8> {
    let num_bytes = pixels.len().div_ceil(8);
    let mut bytes = vec![0u8; num_bytes];

    for (i, &pixel) in pixels.iter().enumerate() {
        if pixel {
            let byte_idx = i / 8;
            let bit_idx = 7 - (i % 8); // MSB first
            bytes[byte_idx] |= 1 << bit_idx;
        }
    }

    bytes
}

/// A packed single-bit-per-pixel image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u16,
    height: u16,
    data: Vec<u8>,
}

impl RasterImage {
    /// Build a raster from an ink predicate evaluated per pixel.
    ///
    /// Fails with [`PaperTrailError::Encoding`] for zero-sized images.
    pub fn from_fn<F>(width: u16, height: u16, mut is_ink: F) -> Result<Self>
    where
        F: FnMut(u32, u32) -> bool,
    {
        if width == 0 || height == 0 {
            return Err(PaperTrailError::Encoding(format!(
                "image resolves to {}x{}, nothing to print",
                width, height
            )));
        }

        let bytes_per_row = width.div_ceil(8) as usize;
        let mut data = Vec::with_capacity(bytes_per_row * height as usize);
        let mut row = Vec::with_capacity(width as usize);

        for y in 0..height as u32 {
            row.clear();
            row.extend((0..width as u32).map(|x| is_ink(x, y)));
            data.extend(pack_row(&row));
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Row stride in bytes: `ceil(width / 8)`.
    pub fn bytes_per_row(&self) -> u16 {
        self.width.div_ceil(8)
    }

    /// Packed bitmap, `bytes_per_row * height` bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the pixel at (x, y) is ink.
    pub fn is_ink(&self, x: u16, y: u16) -> bool {
        let idx = y as usize * self.bytes_per_row() as usize + x as usize / 8;
        (self.data[idx] >> (7 - (x % 8))) & 1 == 1
    }

    /// Number of ink pixels.
    pub fn ink_count(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Wrap the bitmap in a `GS v 0` command.
    pub fn to_command(&self) -> PrinterCommand {
        graphics::bit_image(self.bytes_per_row(), self.height, &self.data)
    }

    /// Render the bitmap as a black-on-white grayscale image for previews.
    pub fn to_luma_image(&self) -> GrayImage {
        let mut img = GrayImage::new(self.width as u32, self.height as u32);
        for y in 0..self.height {
            for x in 0..self.width {
                let color = if self.is_ink(x, y) { 0u8 } else { 255u8 };
                img.put_pixel(x as u32, y as u32, Luma([color]));
            }
        }
        img
    }
}
