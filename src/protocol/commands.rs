//! # ESC/POS Command Primitives
//!
//! Byte constants shared by the command builders and the [`PrinterCommand`]
//! container that every builder produces.
//!
//! ## Byte Order
//!
//! Multi-byte integers use **little-endian** encoding:
//! - `u16` value 0x1234 is sent as bytes `[0x34, 0x12]`

// ============================================================================
// CONTROL BYTES
// ============================================================================

/// GS (Group Separator) - Extended command prefix
///
/// Used for the bit-image raster command `GS v 0`.
/// - Hex: 0x1D, Decimal: 29
pub const GS: u8 = 0x1D;

/// LF (Line Feed) - Print and advance one line
pub const LF: u8 = 0x0A;

/// CR (Carriage Return)
pub const CR: u8 = 0x0D;

// ============================================================================
// COMMAND CONTAINER
// ============================================================================

/// What a [`PrinterCommand`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Bit-image raster block (`GS v 0` header + packed bitmap)
    Raster,
    /// UTF-8 text ticket, CRLF separated
    Text,
    /// Bare paper feed
    Feed,
}

/// # Printer Command
///
/// An opaque byte sequence ready to be written to the device. Produced by the
/// image encoder or the ticket formatter and consumed once by the transport.
///
/// ```
/// use paper_trail::protocol::commands::{self, CommandKind};
///
/// let feed = commands::feed_lines(4);
/// assert_eq!(feed.kind(), CommandKind::Feed);
/// assert_eq!(feed.as_bytes(), b"\n\n\n\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterCommand {
    kind: CommandKind,
    bytes: Vec<u8>,
}

impl PrinterCommand {
    pub(crate) fn new(kind: CommandKind, bytes: Vec<u8>) -> Self {
        Self { kind, bytes }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

// ============================================================================
// PAPER FEED
// ============================================================================

/// # Feed Lines
///
/// Advances the paper by `n` plain line-feeds. Written after every job so the
/// last printed line clears the tear-off bar.
///
/// A raw LF is used instead of `ESC d n` because the cheap Bluetooth bridges
/// these printers sit behind pass bytes through untouched, and every
/// ESC/POS-compatible firmware honours a bare LF.
pub fn feed_lines(n: u8) -> PrinterCommand {
    PrinterCommand::new(CommandKind::Feed, vec![LF; n as usize])
}

/// Encode a u16 as little-endian bytes.
///
/// ```
/// use paper_trail::protocol::commands::u16_le;
///
/// assert_eq!(u16_le(0x1234), [0x34, 0x12]);
/// assert_eq!(u16_le(384), [0x80, 0x01]); // 384 = 0x0180
/// ```
#[inline]
pub const fn u16_le(value: u16) -> [u8; 2] {
    [value as u8, (value >> 8) as u8]
}

// ============================================================================
// TESTS
// ============================================================================
