//! # ESC/POS Protocol Implementation
//!
//! This module provides the byte-level command builders for the two command
//! families the worker sends to the printer.
//!
//! ## Module Structure
//!
//! - [`commands`]: Control bytes, paper feed, [`PrinterCommand`](commands::PrinterCommand)
//! - [`graphics`]: `GS v 0` bit-image raster
//! - [`text`]: CRLF-separated UTF-8 text tickets
//!
//! ## Usage Example
//!
//! ```
//! use paper_trail::protocol::{commands, graphics, text};
//!
//! let job = vec![
//!     graphics::bit_image(1, 1, &[0x80]),
//!     text::lines(["hello"]),
//!     commands::feed_lines(4),
//! ];
//!
//! let total: usize = job.iter().map(|cmd| cmd.len()).sum();
//! assert_eq!(total, 9 + 7 + 4);
//! ```

pub mod commands;
pub mod graphics;
pub mod text;

pub use commands::{CommandKind, PrinterCommand};
