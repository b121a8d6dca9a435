//! # End-to-End Worker Tests
//!
//! These tests drive the full pipeline (queue → parse → format/encode →
//! printer → acknowledge) against the in-memory queue and transport.
//!
//! ## Test Coverage
//!
//! - **Acknowledgment**: delete exactly once per printed job, never after a
//!   failed write
//! - **Recovery**: no reconnect between healthy jobs, one reconnect per
//!   failed job, redelivery after the visibility timeout
//! - **Shutdown**: prompt exit while polling, printer released
//! - **Wire bytes**: the conference ticket and the raster header

use std::io::{Cursor, Write};
use std::time::Duration;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use paper_trail::config::{RawSettings, Settings};
use paper_trail::printer::{Printer, PrinterConfig};
use paper_trail::queue::{MemoryQueue, ReceiveOptions};
use paper_trail::render::ImageEncoder;
use paper_trail::transport::MemoryTransport;
use paper_trail::worker::{JobOutcome, Worker, WorkerConfig};

const ANA: &str = r#"{"name":"Ana","phoneModel":"Pixel 4 XL","ip":"10.0.0.5"}"#;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn config(visibility: Duration) -> WorkerConfig {
    WorkerConfig {
        receive: ReceiveOptions {
            wait: Duration::from_millis(20),
            visibility_timeout: visibility,
        },
        settle: Duration::from_millis(1),
        error_backoff: Duration::from_millis(1),
        logo: None,
    }
}

type TestWorker = Worker<MemoryQueue, MemoryTransport>;

fn setup(config: WorkerConfig) -> (MemoryQueue, MemoryTransport, TestWorker) {
    let queue = MemoryQueue::new();
    let sink = MemoryTransport::new();
    let printer = Printer::new(sink.clone(), PrinterConfig::POS58);
    let worker = Worker::new(queue.clone(), printer, config);
    (queue, sink, worker)
}

fn png(img: RgbaImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn printed_text(sink: &MemoryTransport) -> String {
    String::from_utf8(sink.bytes()).unwrap()
}

// ============================================================================
// ACKNOWLEDGMENT
// ============================================================================

#[tokio::test]
async fn test_delete_once_per_printed_job() {
    let (queue, sink, mut worker) = setup(config(Duration::from_secs(60)));
    let first = queue.push(ANA);
    let second = queue.push(r#"{"name":"Bogdan"}"#);

    assert_eq!(worker.poll_once().await.unwrap(), JobOutcome::Printed);
    assert_eq!(worker.poll_once().await.unwrap(), JobOutcome::Printed);
    assert_eq!(worker.poll_once().await.unwrap(), JobOutcome::Idle);

    assert_eq!(queue.deleted(), vec![first, second]);
    assert!(queue.is_empty());
    // one handle for both jobs
    assert_eq!(sink.reconnects(), 0);

    // Print order follows delivery order
    let text = printed_text(&sink);
    let ana = text.find("Name : Ana").unwrap();
    let bogdan = text.find("Name : Bogdan").unwrap();
    assert!(ana < bogdan);
}

#[tokio::test]
async fn test_failed_write_is_redelivered_not_deleted() {
    let (queue, sink, mut worker) = setup(config(Duration::from_millis(30)));
    let id = queue.push(ANA);
    sink.fail_always(true);

    assert_eq!(worker.poll_once().await.unwrap(), JobOutcome::Failed);
    assert!(queue.deleted().is_empty());
    // one reconnect for the one failed job
    assert_eq!(sink.reconnects(), 1);

    // Printer comes back, message reappears after the visibility timeout
    sink.fail_always(false);
    tokio::time::sleep(Duration::from_millis(40)).await;

    assert_eq!(worker.poll_once().await.unwrap(), JobOutcome::Printed);
    assert_eq!(queue.deleted(), vec![id]);

    let stats = worker.stats();
    assert_eq!((stats.printed, stats.failed), (1, 1));
}

#[tokio::test]
async fn test_ticket_failure_does_not_reprint_logo() {
    let black = png(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255])));
    let mut cfg = config(Duration::from_secs(60));
    cfg.logo = Some(ImageEncoder::default().encode_bytes(&black).unwrap());
    let (queue, sink, mut worker) = setup(cfg);
    let id = queue.push(ANA);
    // logo write succeeds, ticket write fails once
    sink.fail_write_number(2);

    assert_eq!(worker.poll_once().await.unwrap(), JobOutcome::Printed);

    let writes = sink.writes();
    assert_eq!(writes.len(), 3);
    assert_eq!(writes.iter().filter(|w| w.starts_with(&[0x1D, 0x76])).count(), 1);
    assert_eq!(sink.reconnects(), 1);
    assert_eq!(queue.deleted(), vec![id]);
}

#[tokio::test]
async fn test_transient_write_failure_reconnects_and_deletes() {
    let (queue, sink, mut worker) = setup(config(Duration::from_secs(60)));
    let id = queue.push(ANA);
    sink.fail_next_writes(1);

    assert_eq!(worker.poll_once().await.unwrap(), JobOutcome::Printed);

    assert_eq!(sink.reconnects(), 1);
    assert_eq!(queue.deleted(), vec![id]);
    assert!(printed_text(&sink).contains("Name : Ana"));
}

#[tokio::test]
async fn test_malformed_bodies_are_acknowledged_once() {
    let (queue, sink, mut worker) = setup(config(Duration::from_secs(60)));
    let garbage = queue.push("{not json");
    let array = queue.push("[1,2,3]");

    assert_eq!(worker.poll_once().await.unwrap(), JobOutcome::Dropped);
    assert_eq!(worker.poll_once().await.unwrap(), JobOutcome::Dropped);
    assert_eq!(worker.poll_once().await.unwrap(), JobOutcome::Idle);

    assert_eq!(queue.deleted(), vec![garbage, array]);
    assert!(sink.writes().is_empty());
}

#[tokio::test]
async fn test_missing_fields_print_placeholders() {
    let (queue, sink, mut worker) = setup(config(Duration::from_secs(60)));
    queue.push(r#"{"name":null,"phoneModel":""}"#);

    assert_eq!(worker.poll_once().await.unwrap(), JobOutcome::Printed);

    let text = printed_text(&sink);
    assert!(text.contains("Name : N/A\r\n"));
    assert!(text.contains("Phone: N/A\r\n"));
    assert!(text.contains("IP   : N/A\r\n"));
}

// ============================================================================
// SHUTDOWN
// ============================================================================

#[tokio::test]
async fn test_cancel_while_polling_exits_promptly() {
    let mut cfg = config(Duration::from_secs(60));
    cfg.receive.wait = Duration::from_secs(20);
    let (_, sink, worker) = setup(cfg);

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(worker.run(cancel.clone()));

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let stats = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("worker did not stop within a second")
        .unwrap();

    assert_eq!(stats.printed, 0);
    assert!(sink.is_closed());
}

#[tokio::test]
async fn test_run_survives_receive_errors() {
    let (queue, sink, worker) = setup(config(Duration::from_secs(60)));
    queue.fail_next_receives(3);
    let id = queue.push(ANA);

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(worker.run(cancel.clone()));

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    let stats = handle.await.unwrap();

    assert_eq!(stats.printed, 1);
    assert_eq!(queue.deleted(), vec![id]);
    assert!(sink.is_closed());
}

// ============================================================================
// WIRE BYTES
// ============================================================================

#[tokio::test]
async fn test_ana_ticket_bytes() {
    let (queue, sink, mut worker) = setup(config(Duration::from_secs(60)));
    queue.push(ANA);

    worker.poll_once().await.unwrap();

    let text = printed_text(&sink);
    let lines: Vec<&str> = text.split("\r\n").collect();
    for expected in ["Name : Ana", "Phone: Pixel 4 XL", "IP   : 10.0.0.5"] {
        assert!(lines.contains(&expected), "missing line {:?}", expected);
    }
    assert!(lines.iter().all(|l| l.trim_end_matches('\n').chars().count() <= 30));

    // ticket ends with CRLF, then the 4 line-feed trailing feed
    assert!(text.ends_with("\r\n\n\n\n\n"));
    assert!(text.starts_with("\r\n\r\n\r\n\r\n\r\nConferinta Fii-ITist 2025\r\n"));
}

#[tokio::test]
async fn test_red_logo_then_ticket() {
    let logo = png(RgbaImage::from_pixel(1000, 500, Rgba([255, 0, 0, 255])));
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&logo).unwrap();

    // The logo is encoded once, while the settings are validated
    let settings = Settings::from_raw(RawSettings {
        queue_url: Some("http://localhost:9324/000000000000/tickets".into()),
        region: Some("eu-central-1".into()),
        logo: Some(file.path().to_path_buf()),
        ..RawSettings::default()
    })
    .unwrap();

    let mut cfg = config(Duration::from_secs(60));
    cfg.logo = settings.worker.logo;
    let (queue, sink, mut worker) = setup(cfg);
    queue.push(ANA);

    assert_eq!(worker.poll_once().await.unwrap(), JobOutcome::Printed);

    let writes = sink.writes();
    assert_eq!(writes.len(), 3);

    // GS v 0, 48 bytes per row, 192 rows
    let raster = &writes[0];
    assert_eq!(&raster[..8], &[0x1D, 0x76, 0x30, 0x00, 48, 0, 192, 0]);
    assert_eq!(raster.len() - 8, 9216);
    assert!(raster[8..].iter().all(|&b| b == 0xFF));

    // Same bytes as encoding directly
    let direct = ImageEncoder::default().encode_bytes(&logo).unwrap();
    assert_eq!(raster.as_slice(), direct.as_bytes());

    assert!(String::from_utf8_lossy(&writes[1]).contains("Name : Ana"));
    assert_eq!(writes[2], b"\n\n\n\n".to_vec());
}
