//! # Image Rendering
//!
//! Converts pictures into the 1-bit raster the printer understands.
//!
//! - [`adjust`]: Per-pixel alpha flattening, luma and contrast
//! - [`bitmap`]: Bit packing and the [`RasterImage`] container
//! - [`encoder`]: The full decode → threshold → `GS v 0` pipeline

pub mod adjust;
pub mod bitmap;
pub mod encoder;

pub use bitmap::RasterImage;
pub use encoder::{EncoderOptions, ImageEncoder};
