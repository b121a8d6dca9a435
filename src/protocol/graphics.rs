//! # ESC/POS Bit-Image Raster Command
//!
//! This module implements `GS v 0`, the raster bit-image command understood
//! by 58mm ESC/POS thermal printers.
//!
//! ## Coordinate System
//!
//! ```text
//! (0,0) ──────────────────────► X (horizontal, 384 dots max)
//!   │
//!   │   ████████  ← Each dot is ~0.125mm (203 DPI)
//!   │   ████████
//!   ▼
//!   Y (vertical, paper feed direction)
//! ```
//!
//! ## Bit Packing
//!
//! Graphics data is packed as bytes where each bit represents one dot:
//! - Bit 7 (MSB) = leftmost dot
//! - Bit 0 (LSB) = rightmost dot
//! - 1 = black (print), 0 = white (no print)
//!
//! ```text
//! Byte value 0xF0 = 11110000 = ████░░░░
//! Byte value 0x0F = 00001111 = ░░░░████
//! ```

use super::commands::{CommandKind, GS, PrinterCommand, u16_le};

/// `GS v 0 m` with `m = 0` (normal density).
pub const RASTER_HEADER: [u8; 4] = [GS, b'v', b'0', 0x00];

/// Header length: 4 command bytes + 4 size bytes.
pub const RASTER_PREAMBLE_LEN: usize = 8;

/// # Print Raster Bit Image (GS v 0 m xL xH yL yH d1...dk)
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | GS v 0 m xL xH yL yH d1...dk |
/// | Hex     | 1D 76 30 00 xL xH yL yH d1...dk |
///
/// ## Parameters
///
/// - `m`: Mode, always 0 (normal)
/// - `xL, xH`: Width in **bytes**, little-endian
/// - `yL, yH`: Height in dots, little-endian
/// - `d1...dk`: Image data, k = width_bytes × height
///
/// ## Example
///
/// ```
/// use paper_trail::protocol::graphics;
///
/// // 384 dots (48 bytes) wide, 2 rows
/// let cmd = graphics::bit_image(48, 2, &[0xFF; 96]);
///
/// assert_eq!(&cmd.as_bytes()[0..4], &[0x1D, 0x76, 0x30, 0x00]);
/// assert_eq!(&cmd.as_bytes()[4..8], &[48, 0, 2, 0]);
/// assert_eq!(cmd.len(), 8 + 96);
/// ```
pub fn bit_image(width_bytes: u16, height: u16, data: &[u8]) -> PrinterCommand {
    debug_assert!(
        data.len() == width_bytes as usize * height as usize,
        "Raster data length mismatch. Expected {} ({} bytes × {} rows), got {}",
        width_bytes as usize * height as usize,
        width_bytes,
        height,
        data.len()
    );

    let [xl, xh] = u16_le(width_bytes);
    let [yl, yh] = u16_le(height);

    let mut cmd = Vec::with_capacity(RASTER_PREAMBLE_LEN + data.len());
    cmd.extend_from_slice(&RASTER_HEADER);
    cmd.push(xl);
    cmd.push(xh);
    cmd.push(yl);
    cmd.push(yh);
    cmd.extend_from_slice(data);
    PrinterCommand::new(CommandKind::Raster, cmd)
}

// ============================================================================
// TESTS
// ============================================================================
