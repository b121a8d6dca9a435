//! # Image Encoder
//!
//! Turns an arbitrary picture into a `GS v 0` bit-image command.
//!
//! ## Pipeline
//!
//! ```text
//! decode (RGBA) → fit inside max×max → flatten alpha onto white
//!   → luma → contrast stretch → threshold → pack bits → GS v 0
//! ```
//!
//! The output is a hard black/white threshold, not a dither: receipts carry
//! logos and line art where crisp edges read better than halftone.
//!
//! Encoding is all-or-nothing. Either a complete command comes back or an
//! error does.

use std::fs;
use std::path::Path;

use image::{DynamicImage, imageops::FilterType};

use super::adjust::{contrast, luminance, over_white};
use super::bitmap::RasterImage;
use crate::error::{PaperTrailError, Result};
use crate::printer::PrinterConfig;
use crate::protocol::commands::PrinterCommand;

/// Printable width of a 58mm printer at 203 DPI.
pub const DEFAULT_MAX_DIMENSION: u32 = 384;

/// Contrast multiplier applied before thresholding.
pub const DEFAULT_CONTRAST: f32 = 2.5;

/// Luminance below this becomes ink. Higher = less printed.
pub const DEFAULT_BLACK_THRESHOLD: u8 = 200;

/// Tuning knobs for [`ImageEncoder`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderOptions {
    /// Longest allowed side in dots. Images are shrunk to fit, never enlarged.
    pub max_dimension: u32,
    /// Contrast multiplier around mid-grey.
    pub contrast: f32,
    /// Luminance cut-off for ink.
    pub black_threshold: u8,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            contrast: DEFAULT_CONTRAST,
            black_threshold: DEFAULT_BLACK_THRESHOLD,
        }
    }
}

impl EncoderOptions {
    /// Defaults, with images capped at the printable width of `printer`.
    pub fn for_printer(printer: &PrinterConfig) -> Self {
        Self {
            max_dimension: u32::from(printer.width_dots),
            ..Self::default()
        }
    }
}

/// # Image Encoder
///
/// ## Example
///
/// ```
/// use image::{DynamicImage, Rgba, RgbaImage};
/// use paper_trail::render::ImageEncoder;
///
/// let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 2, Rgba([0, 0, 0, 255])));
/// let cmd = ImageEncoder::default().encode_image(&img)?;
///
/// // 8 header bytes + 2 bytes/row × 2 rows, all ink
/// assert_eq!(cmd.as_bytes(), &[0x1D, 0x76, 0x30, 0x00, 2, 0, 2, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
/// # Ok::<(), paper_trail::PaperTrailError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ImageEncoder {
    options: EncoderOptions,
}

impl ImageEncoder {
    pub fn new(options: EncoderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    /// Read and encode an image file.
    pub fn encode_path<P: AsRef<Path>>(&self, path: P) -> Result<PrinterCommand> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            PaperTrailError::ImageLoad(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.encode_bytes(&bytes)
    }

    /// Decode and encode an in-memory image (PNG, JPEG, GIF, BMP, WebP...).
    pub fn encode_bytes(&self, bytes: &[u8]) -> Result<PrinterCommand> {
        let image = load_image(bytes)?;
        self.encode_image(&image)
    }

    pub fn encode_image(&self, image: &DynamicImage) -> Result<PrinterCommand> {
        Ok(self.rasterize(image)?.to_command())
    }

    /// Run the pipeline up to the packed bitmap.
    pub fn rasterize(&self, image: &DynamicImage) -> Result<RasterImage> {
        let rgba = image.to_rgba8();
        let (width, height) = fit_within(rgba.width(), rgba.height(), self.options.max_dimension);

        if width == 0 || height == 0 {
            return Err(PaperTrailError::Encoding(format!(
                "{}x{} image scales to {}x{}",
                rgba.width(),
                rgba.height(),
                width,
                height
            )));
        }

        let rgba = if (width, height) != rgba.dimensions() {
            image::imageops::resize(&rgba, width, height, FilterType::Triangle)
        } else {
            rgba
        };

        let width = u16::try_from(width)
            .map_err(|_| PaperTrailError::Encoding(format!("width {} exceeds u16", width)))?;
        let height = u16::try_from(height)
            .map_err(|_| PaperTrailError::Encoding(format!("height {} exceeds u16", height)))?;

        let EncoderOptions {
            contrast: amount,
            black_threshold,
            ..
        } = self.options;

        RasterImage::from_fn(width, height, |x, y| {
            let [r, g, b, a] = rgba.get_pixel(x, y).0;
            let luma = luminance(over_white(r, a), over_white(g, a), over_white(b, a));
            contrast(luma, amount) < black_threshold
        })
    }
}

/// Decode an image from memory.
pub fn load_image(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| PaperTrailError::ImageLoad(format!("Failed to decode image: {}", e)))
}

/// Largest size that fits inside `max × max` with the same aspect ratio.
///
/// The longer side becomes exactly `max`; the shorter one is scaled and
/// rounded down. Images already inside the box are returned unchanged.
///
/// ```
/// use paper_trail::render::encoder::fit_within;
///
/// assert_eq!(fit_within(1000, 500, 384), (384, 192));
/// assert_eq!(fit_within(200, 100, 384), (200, 100));
/// ```
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }

    let (w, h, max) = (width as u64, height as u64, max as u64);
    if w >= h {
        (max as u32, (h * max / w) as u32)
    } else {
        ((w * max / h) as u32, max as u32)
    }
}

// ============================================================================
// TESTS
// ============================================================================
