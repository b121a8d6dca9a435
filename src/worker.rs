//! # Queue Consumer Loop
//!
//! [`Worker`] drains a [`MessageQueue`] one message at a time and prints each
//! submission as a ticket.
//!
//! ## States
//!
//! ```text
//!            empty poll
//!           ┌─────────┐
//!           ▼         │
//!  ──▶ Polling ───────┘
//!        │  ▲
//!  message│  │ printed / failed / dropped
//!        ▼  │
//!     Processing
//!
//!  cancel (while polling or settling) ──▶ ShuttingDown ──▶ printer closed
//! ```
//!
//! ## Acknowledgment
//!
//! A message is deleted only after the printer accepted the whole job. A
//! failed write leaves it on the queue, so it reappears after the visibility
//! timeout. Bodies that are not JSON objects are logged and deleted: they
//! will never print, and leaving them would redeliver them forever.
//!
//! ## Cancellation
//!
//! The token is observed during the long poll and during the settle and
//! back-off pauses. A job that has started writing always finishes, and is
//! acknowledged, before the loop looks at the token again.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{PaperTrailError, Result};
use crate::message::SubmissionMessage;
use crate::printer::Printer;
use crate::protocol::commands::PrinterCommand;
use crate::queue::{MessageQueue, ReceiveOptions, ReceivedMessage};
use crate::ticket::TicketFormatter;
use crate::transport::Transport;

/// Pause after each printed ticket.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(2);

/// Pause after a failed receive.
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Characters of an unparseable body quoted in the log.
const BODY_PREVIEW_CHARS: usize = 80;

// ============================================================================
// CONFIGURATION & STATE
// ============================================================================

/// Worker tuning.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub receive: ReceiveOptions,
    pub settle: Duration,
    pub error_backoff: Duration,
    /// Raster printed above every ticket, encoded once at startup.
    pub logo: Option<PrinterCommand>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            receive: ReceiveOptions::default(),
            settle: DEFAULT_SETTLE,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            logo: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Polling,
    Processing,
    ShuttingDown,
}

/// What happened to one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The long poll came back empty.
    Idle,
    /// Written to the printer and acknowledged.
    Printed,
    /// Malformed body, acknowledged without printing.
    Dropped,
    /// Write failed; left for redelivery.
    Failed,
}

/// Running totals, reported at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub printed: u64,
    pub failed: u64,
    pub dropped: u64,
    /// Printed jobs whose delete call failed. These will print again.
    pub unacknowledged: u64,
}

impl WorkerStats {
    fn record(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Idle => {}
            JobOutcome::Printed => self.printed += 1,
            JobOutcome::Dropped => self.dropped += 1,
            JobOutcome::Failed => self.failed += 1,
        }
    }
}

// ============================================================================
// WORKER
// ============================================================================

/// Single sequential consumer bound to one queue and one printer.
pub struct Worker<Q, T>
where
    Q: MessageQueue,
    T: Transport + 'static,
{
    queue: Q,
    printer: Arc<Mutex<Printer<T>>>,
    formatter: TicketFormatter,
    config: WorkerConfig,
    state: WorkerState,
    stats: WorkerStats,
}

impl<Q, T> Worker<Q, T>
where
    Q: MessageQueue,
    T: Transport + 'static,
{
    pub fn new(queue: Q, printer: Printer<T>, config: WorkerConfig) -> Self {
        Self {
            queue,
            printer: Arc::new(Mutex::new(printer)),
            formatter: TicketFormatter::default(),
            config,
            state: WorkerState::Polling,
            stats: WorkerStats::default(),
        }
    }

    pub fn with_formatter(mut self, formatter: TicketFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats
    }

    /// Poll until `cancel` fires, then close the printer.
    pub async fn run(mut self, cancel: CancellationToken) -> WorkerStats {
        info!(
            queue = %self.queue.describe(),
            wait_secs = self.config.receive.wait.as_secs(),
            visibility_secs = self.config.receive.visibility_timeout.as_secs(),
            logo = self.config.logo.is_some(),
            "worker started"
        );

        loop {
            self.state = WorkerState::Polling;

            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                received = self.queue.receive(&self.config.receive) => received,
            };

            let pause = match received {
                Ok(None) => {
                    debug!("no messages");
                    continue;
                }
                Ok(Some(message)) => {
                    self.state = WorkerState::Processing;
                    match self.process(message).await {
                        JobOutcome::Printed => self.config.settle,
                        _ => continue,
                    }
                }
                Err(e) => {
                    error!(
                        error = %e,
                        backoff_secs = self.config.error_backoff.as_secs(),
                        "receive failed"
                    );
                    self.config.error_backoff
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        self.state = WorkerState::ShuttingDown;
        info!(
            printed = self.stats.printed,
            failed = self.stats.failed,
            dropped = self.stats.dropped,
            unacknowledged = self.stats.unacknowledged,
            "worker stopping"
        );
        let stats = self.stats;
        self.release_printer();
        stats
    }

    /// One receive followed, if a message came back, by processing it.
    pub async fn poll_once(&mut self) -> Result<JobOutcome> {
        self.state = WorkerState::Polling;
        let Some(message) = self.queue.receive(&self.config.receive).await? else {
            return Ok(JobOutcome::Idle);
        };

        self.state = WorkerState::Processing;
        let outcome = self.process(message).await;
        self.state = WorkerState::Polling;
        Ok(outcome)
    }

    /// Print one message and acknowledge it if the write succeeded.
    #[instrument(
        skip_all,
        fields(message_id = %message.id, receive_count = message.receive_count)
    )]
    pub async fn process(&mut self, message: ReceivedMessage) -> JobOutcome {
        let outcome = match SubmissionMessage::from_json(&message.body) {
            Ok(record) => self.print_record(&message, &record).await,
            Err(e) => {
                warn!(
                    error = %e,
                    body = %preview(&message.body),
                    "dropping malformed message"
                );
                self.acknowledge(&message).await;
                JobOutcome::Dropped
            }
        };
        self.stats.record(outcome);
        outcome
    }

    async fn print_record(
        &mut self,
        message: &ReceivedMessage,
        record: &SubmissionMessage,
    ) -> JobOutcome {
        let job = self.build_job(record);
        let bytes: usize = job.iter().map(PrinterCommand::len).sum();

        match self.print_job(job).await {
            Ok(()) => {
                info!(bytes, name = record.name.as_deref().unwrap_or("-"), "ticket printed");
                if !self.acknowledge(message).await {
                    self.stats.unacknowledged += 1;
                }
                JobOutcome::Printed
            }
            Err(e) => {
                error!(error = %e, "print failed, leaving message for redelivery");
                JobOutcome::Failed
            }
        }
    }

    /// Logo (if any) followed by the ticket text.
    fn build_job(&self, record: &SubmissionMessage) -> Vec<PrinterCommand> {
        let mut job = Vec::with_capacity(2);
        job.extend(self.config.logo.iter().cloned());
        job.push(self.formatter.format(record));
        job
    }

    async fn print_job(&self, job: Vec<PrinterCommand>) -> Result<()> {
        let printer = Arc::clone(&self.printer);
        tokio::task::spawn_blocking(move || {
            let mut printer = printer.lock().unwrap_or_else(|e| e.into_inner());
            printer.print(&job)
        })
        .await
        .map_err(|e| PaperTrailError::TransportWrite(format!("print task failed: {}", e)))?
    }

    /// Delete the message; returns whether the queue accepted it.
    async fn acknowledge(&self, message: &ReceivedMessage) -> bool {
        match self.queue.delete(&message.handle).await {
            Ok(()) => {
                debug!(handle = %message.handle, "acknowledged");
                true
            }
            Err(e) => {
                error!(
                    error = %e,
                    handle = %message.handle,
                    "delete failed, message will be redelivered"
                );
                false
            }
        }
    }

    fn release_printer(self) {
        let printer = match Arc::try_unwrap(self.printer) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(|e| e.into_inner()),
            Err(_) => {
                warn!("printer still in use, leaving it to be dropped");
                return;
            }
        };

        let device = printer.transport().describe();
        match printer.close() {
            Ok(()) => info!(device = %device, "printer closed"),
            Err(e) => warn!(device = %device, error = %e, "closing printer failed"),
        }
    }
}

fn preview(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(BODY_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::PrinterConfig;
    use crate::protocol::graphics;
    use crate::queue::MemoryQueue;
    use crate::transport::MemoryTransport;

    fn quick_config() -> WorkerConfig {
        WorkerConfig {
            receive: ReceiveOptions {
                wait: Duration::from_millis(20),
                visibility_timeout: Duration::from_secs(60),
            },
            settle: Duration::from_millis(1),
            error_backoff: Duration::from_millis(1),
            logo: None,
        }
    }

    type TestWorker = Worker<MemoryQueue, MemoryTransport>;

    fn worker() -> (MemoryQueue, MemoryTransport, TestWorker) {
        let queue = MemoryQueue::new();
        let sink = MemoryTransport::new();
        let printer = Printer::new(sink.clone(), PrinterConfig::POS58);
        let worker = Worker::new(queue.clone(), printer, quick_config());
        (queue, sink, worker)
    }

    fn with_logo(worker: TestWorker) -> TestWorker {
        let mut config = quick_config();
        config.logo = Some(graphics::bit_image(2, 2, &[0xFF; 4]));
        Worker { config, ..worker }
    }

    #[tokio::test]
    async fn test_empty_poll_is_idle() {
        let (_, sink, mut worker) = worker();
        assert_eq!(worker.poll_once().await.unwrap(), JobOutcome::Idle);
        assert!(sink.writes().is_empty());
    }

    #[tokio::test]
    async fn test_printed_job_is_acknowledged() {
        let (queue, sink, mut worker) = worker();
        let id = queue.push(r#"{"name":"Ana","phoneModel":"Pixel 4 XL","ip":"10.0.0.5"}"#);

        assert_eq!(worker.poll_once().await.unwrap(), JobOutcome::Printed);

        assert_eq!(queue.deleted(), vec![id]);
        // ticket text + trailing feed
        assert_eq!(sink.writes().len(), 2);
        assert_eq!(worker.stats().printed, 1);
        assert_eq!(worker.state(), WorkerState::Polling);
    }

    #[tokio::test]
    async fn test_write_failure_is_not_acknowledged() {
        let (queue, sink, mut worker) = worker();
        sink.fail_always(true);
        queue.push(r#"{"name":"Ana"}"#);

        assert_eq!(worker.poll_once().await.unwrap(), JobOutcome::Failed);

        assert!(queue.deleted().is_empty());
        assert_eq!(queue.len(), 1);
        assert_eq!(worker.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_dropped() {
        let (queue, sink, mut worker) = worker();
        let id = queue.push("not json at all");

        assert_eq!(worker.poll_once().await.unwrap(), JobOutcome::Dropped);

        assert_eq!(queue.deleted(), vec![id]);
        assert!(sink.writes().is_empty());
        assert_eq!(worker.stats().dropped, 1);
    }

    #[tokio::test]
    async fn test_logo_printed_before_ticket() {
        let (queue, sink, worker) = worker();
        let mut worker = with_logo(worker);
        queue.push(r#"{"name":"Ana"}"#);

        assert_eq!(worker.poll_once().await.unwrap(), JobOutcome::Printed);

        let writes = sink.writes();
        assert_eq!(writes.len(), 3);
        assert_eq!(&writes[0][..8], &[0x1D, 0x76, 0x30, 0x00, 2, 0, 2, 0]);
        assert!(String::from_utf8_lossy(&writes[1]).contains("Name : Ana"));
    }

    #[tokio::test]
    async fn test_same_logo_on_every_ticket() {
        let (queue, sink, worker) = worker();
        let mut worker = with_logo(worker);
        queue.push(r#"{"name":"Ana"}"#);
        queue.push(r#"{"name":"Bogdan"}"#);

        worker.poll_once().await.unwrap();
        worker.poll_once().await.unwrap();

        let writes = sink.writes();
        assert_eq!(writes.len(), 6);
        assert_eq!(writes[0], writes[3]);
        assert_eq!(worker.stats().printed, 2);
    }

    #[tokio::test]
    async fn test_receive_error_propagates_from_poll_once() {
        let (queue, _, mut worker) = worker();
        queue.fail_next_receives(1);
        assert!(matches!(worker.poll_once().await, Err(PaperTrailError::Queue(_))));
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel_and_closes_printer() {
        let (queue, sink, worker) = worker();
        queue.push(r#"{"name":"Ana"}"#);
        queue.push("[]");

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(worker.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        let stats = handle.await.unwrap();

        assert_eq!(stats.printed, 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(queue.deleted().len(), 2);
        assert!(sink.is_closed());
    }

    #[test]
    fn test_preview_truncates_long_bodies() {
        assert_eq!(preview("short"), "short");
        let long = "x".repeat(200);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), BODY_PREVIEW_CHARS + 1);
        assert!(shown.ends_with('…'));
    }

    #[test]
    fn test_stats_record() {
        let mut stats = WorkerStats::default();
        for outcome in [
            JobOutcome::Printed,
            JobOutcome::Printed,
            JobOutcome::Failed,
            JobOutcome::Idle,
        ] {
            stats.record(outcome);
        }
        assert_eq!(
            stats,
            WorkerStats {
                printed: 2,
                failed: 1,
                dropped: 0,
                unacknowledged: 0,
            }
        );
    }
}
