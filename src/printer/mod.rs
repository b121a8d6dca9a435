//! # Printer Module
//!
//! [`Printer`] owns the one transport connection for the life of the process
//! and turns a list of [`PrinterCommand`]s into a complete, flushed job.
//!
//! ## Modules
//!
//! - [`config`]: Printer hardware specifications
//!
//! ## Write Failures
//!
//! A failed job gets exactly one reconnect. The retry resumes at the command
//! whose write failed, so a logo that already went out is not printed again;
//! the failed command itself is resent whole. If the retry also fails the job
//! is reported as [`PaperTrailError::TransportWrite`] and further retries are
//! left to queue redelivery, which reprints the whole job (at-least-once).

pub mod config;

pub use config::PrinterConfig;

use tracing::{debug, warn};

use crate::error::{PaperTrailError, Result};
use crate::protocol::commands::{self, PrinterCommand};
use crate::transport::Transport;

/// A connected printer.
///
/// ```
/// use paper_trail::printer::{Printer, PrinterConfig};
/// use paper_trail::protocol::text;
/// use paper_trail::transport::MemoryTransport;
///
/// let sink = MemoryTransport::new();
/// let mut printer = Printer::new(sink.clone(), PrinterConfig::POS58);
///
/// printer.print(&[text::lines(["hi"])])?;
/// assert_eq!(sink.bytes(), b"hi\r\n\n\n\n\n".to_vec());
/// # Ok::<(), paper_trail::PaperTrailError>(())
/// ```
pub struct Printer<T: Transport> {
    transport: T,
    config: PrinterConfig,
}

impl<T: Transport> Printer<T> {
    pub fn new(transport: T, config: PrinterConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Write every command of a job followed by the trailing feed.
    pub fn print(&mut self, job: &[PrinterCommand]) -> Result<()> {
        let feed = commands::feed_lines(self.config.feed_lines);
        let commands: Vec<&PrinterCommand> = job.iter().chain(std::iter::once(&feed)).collect();

        let (failed_at, first) = match self.send(&commands) {
            Ok(()) => return Ok(()),
            Err(failure) => failure,
        };

        warn!(
            device = %self.transport.describe(),
            error = %first,
            command = failed_at,
            "write failed, reconnecting once"
        );

        self.transport.reconnect().map_err(|e| {
            PaperTrailError::TransportWrite(format!("{}; reconnect failed: {}", first, e))
        })?;

        self.send(&commands[failed_at..]).map_err(|(_, e)| match e {
            PaperTrailError::TransportWrite(msg) => {
                PaperTrailError::TransportWrite(format!("retry after reconnect: {}", msg))
            }
            other => PaperTrailError::TransportWrite(other.to_string()),
        })
    }

    /// On failure, returns the index of the command that did not go out.
    fn send(
        &mut self,
        commands: &[&PrinterCommand],
    ) -> std::result::Result<(), (usize, PaperTrailError)> {
        for (index, command) in commands.iter().enumerate() {
            debug!(kind = ?command.kind(), bytes = command.len(), "writing command");
            self.transport
                .write_all(command.as_bytes())
                .map_err(|e| (index, e))?;
        }
        Ok(())
    }

    /// Release the device.
    pub fn close(mut self) -> Result<()> {
        self.transport.close()
    }
}
