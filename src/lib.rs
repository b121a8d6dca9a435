//! # Paper Trail - Queue-to-Receipt Printer Worker
//!
//! Paper Trail drains a message queue and prints every submission on a
//! thermal receipt printer. It provides:
//!
//! - **Protocol implementation**: ESC/POS text and `GS v 0` raster builders
//! - **Image encoding**: resize, flatten, contrast, threshold, bit-pack
//! - **Ticket formatting**: fixed-width, placeholder-filled receipts
//! - **Transport**: serial TTY with one reconnect per failed job
//! - **Queue worker**: long-poll, print, acknowledge only on success
//!
//! ## Quick Start
//!
//! ```no_run
//! use paper_trail::{
//!     printer::{Printer, PrinterConfig},
//!     queue::{QueueSettings, SqsQueue},
//!     transport::{SerialSettings, SerialTransport},
//!     worker::{Worker, WorkerConfig},
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), paper_trail::PaperTrailError> {
//! let transport = SerialTransport::open(SerialSettings::default())?;
//! let printer = Printer::new(transport, PrinterConfig::POS58);
//!
//! let queue = SqsQueue::connect(&QueueSettings {
//!     queue_url: "https://sqs.eu-central-1.amazonaws.com/123456789012/tickets".into(),
//!     region: "eu-central-1".into(),
//!     endpoint_url: None,
//! })
//! .await;
//!
//! let stats = Worker::new(queue, printer, WorkerConfig::default())
//!     .run(CancellationToken::new())
//!     .await;
//! println!("printed {}", stats.printed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | ESC/POS command builders |
//! | [`render`] | Image to raster encoding |
//! | [`message`] | Queue message contract |
//! | [`ticket`] | Ticket text layout |
//! | [`transport`] | Communication backends |
//! | [`printer`] | Printer configurations and job writes |
//! | [`queue`] | Queue backends |
//! | [`worker`] | Consumer loop |
//! | [`config`] | Startup settings |
//! | [`error`] | Error types |

pub mod config;
pub mod error;
pub mod message;
pub mod printer;
pub mod protocol;
pub mod queue;
pub mod render;
pub mod ticket;
pub mod transport;
pub mod worker;

// Re-exports for convenience
pub use error::PaperTrailError;
pub use message::SubmissionMessage;
pub use printer::{Printer, PrinterConfig};
pub use render::ImageEncoder;
pub use ticket::TicketFormatter;
pub use transport::SerialTransport;
pub use worker::{Worker, WorkerConfig};
