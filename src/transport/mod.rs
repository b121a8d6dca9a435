//! # Printer Transport Layer
//!
//! This module provides communication backends for sending data to printers.
//!
//! ## Available Transports
//!
//! - [`serial`]: Serial TTY (USB serial adapters, Bluetooth RFCOMM bridges)
//! - [`memory`]: In-memory recorder for dry runs and tests

pub mod memory;
pub mod serial;

pub use memory::MemoryTransport;
pub use serial::{SerialSettings, SerialTransport};

use crate::error::Result;

/// A byte sink connected to one physical printer.
pub trait Transport: Send {
    /// Write all bytes and flush them to the device before returning.
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Drop the current connection and open a fresh one.
    fn reconnect(&mut self) -> Result<()>;

    /// Release the device. Further writes fail until [`reconnect`](Self::reconnect).
    fn close(&mut self) -> Result<()>;

    /// Human readable target, for logs.
    fn describe(&self) -> String;
}
