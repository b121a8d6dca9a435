//! # Ticket Formatter
//!
//! Lays a [`SubmissionMessage`] out as a fixed-width text receipt:
//!
//! ```text
//! (5 blank lines)
//! Conferinta Fii-ITist 2025
//! Hosts:
//!    Achitei Marius &
//!    Stefan Leustean
//! ...
//! ------------------------------
//! Name : Ana
//! Phone: Pixel 4 XL
//! IP   : 10.0.0.5
//! ------------------------------
//! Powered by
//! ...
//! (4 blank lines)
//! ```
//!
//! Every line is cut to [`MAX_LINE_CHARS`] characters. Long values are
//! truncated, never wrapped, so one submission is always one fixed-height
//! ticket.

use chrono::{DateTime, NaiveDateTime};

use crate::message::SubmissionMessage;
use crate::protocol::commands::PrinterCommand;
use crate::protocol::text;

/// Characters per printed line.
pub const MAX_LINE_CHARS: usize = 30;

/// Printed in place of a missing field.
pub const PLACEHOLDER: &str = "N/A";

const LEADING_BLANK_LINES: usize = 5;
const TRAILING_BLANK_LINES: usize = 4;

/// Static text around the per-submission fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketLayout {
    pub header: Vec<String>,
    pub footer: Vec<String>,
    /// Character repeated to draw separator rules.
    pub rule: char,
}

impl Default for TicketLayout {
    fn default() -> Self {
        Self {
            header: [
                "Conferinta Fii-ITist 2025",
                "Hosts: ",
                "   Achitei Marius &",
                "   Stefan Leustean",
                "Presentation:",
                " Cloud Signal to Paper Trail:",
                " Python on AWS",
            ]
            .map(String::from)
            .to_vec(),
            footer: ["Powered by", "  coffee, beer,  good vibes,", "  Python & AWS"]
                .map(String::from)
                .to_vec(),
            rule: '-',
        }
    }
}

/// # Ticket Formatter
///
/// ```
/// use paper_trail::message::SubmissionMessage;
/// use paper_trail::ticket::TicketFormatter;
///
/// let record = SubmissionMessage {
///     name: Some("Ana".into()),
///     ..Default::default()
/// };
/// let lines = TicketFormatter::default().lines(&record);
///
/// assert!(lines.contains(&"Name : Ana".to_string()));
/// assert!(lines.contains(&"IP   : N/A".to_string()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TicketFormatter {
    layout: TicketLayout,
}

impl TicketFormatter {
    pub fn new(layout: TicketLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &TicketLayout {
        &self.layout
    }

    /// Build the text command for one record. Never fails.
    pub fn format(&self, record: &SubmissionMessage) -> PrinterCommand {
        text::lines(self.lines(record))
    }

    /// The ticket as truncated lines, without terminators.
    pub fn lines(&self, record: &SubmissionMessage) -> Vec<String> {
        let rule: String = std::iter::repeat_n(self.layout.rule, MAX_LINE_CHARS).collect();

        let mut lines = vec![String::new(); LEADING_BLANK_LINES];
        lines.extend(self.layout.header.iter().cloned());
        lines.push(rule.clone());

        lines.push(format!("Name : {}", field(&record.name)));
        lines.push(format!("Phone: {}", field(&record.phone_model)));
        lines.push(format!("IP   : {}", field(&record.ip)));

        if record.has_request_details() {
            lines.push(format!("Req  : {}", field(&record.request_id)));
            lines.push(format!(
                "Route: {} {}",
                field(&record.method),
                field(&record.path)
            ));
            let time = record
                .timestamp
                .as_deref()
                .map(compact_timestamp)
                .unwrap_or_else(|| PLACEHOLDER.to_string());
            lines.push(format!("Time : {}", time));
        }

        lines.push(rule.clone());
        lines.extend(self.layout.footer.iter().cloned());
        lines.push(rule);
        lines.extend(std::iter::repeat_n(String::new(), TRAILING_BLANK_LINES));

        lines.into_iter().map(|line| truncate(&line)).collect()
    }
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(PLACEHOLDER)
}

/// Cut a line to [`MAX_LINE_CHARS`] characters without splitting a character.
pub fn truncate(line: &str) -> String {
    line.chars().take(MAX_LINE_CHARS).collect()
}

/// `2025-10-17T12:34:56.123456` -> `2025-10-17 12:34:56`.
///
/// Unparseable timestamps are printed as given (and then truncated).
fn compact_timestamp(raw: &str) -> String {
    const OUT: &str = "%Y-%m-%d %H:%M:%S";

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(OUT).to_string();
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.format(OUT).to_string())
        .unwrap_or_else(|_| raw.to_string())
}
