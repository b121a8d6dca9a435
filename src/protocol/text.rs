//! # Plain Text Tickets
//!
//! Text mode needs no framing header: the printer prints whatever bytes it
//! receives, one line per CR LF. Text is sent as UTF-8 so diacritics reach
//! printers whose code page is set to UTF-8 intact.

use super::commands::{CR, CommandKind, LF, PrinterCommand};

/// Line terminator used by every ticket line.
pub const CRLF: [u8; 2] = [CR, LF];

/// # Text Lines
///
/// Joins `lines` with CR LF and terminates the last line with CR LF too.
///
/// ```
/// use paper_trail::protocol::text;
///
/// let cmd = text::lines(["Name : Ana", "IP   : 10.0.0.5"]);
/// assert_eq!(cmd.as_bytes(), b"Name : Ana\r\nIP   : 10.0.0.5\r\n");
/// ```
pub fn lines<I, S>(lines: I) -> PrinterCommand
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut buf = Vec::new();
    for line in lines {
        buf.extend_from_slice(line.as_ref().as_bytes());
        buf.extend_from_slice(&CRLF);
    }
    PrinterCommand::new(CommandKind::Text, buf)
}
