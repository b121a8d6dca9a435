//! # Startup Configuration
//!
//! Settings arrive as CLI flags or `PAPER_TRAIL_*` environment variables
//! (clap merges the two in `main`) and are validated here, once, before the
//! device or the queue is touched.
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `PAPER_TRAIL_QUEUE_URL` | yes | |
//! | `PAPER_TRAIL_REGION` | yes | |
//! | `PAPER_TRAIL_DEVICE` | no | `/dev/rfcomm0` |
//! | `PAPER_TRAIL_ENDPOINT_URL` | no | |
//! | `PAPER_TRAIL_LOGO` | no | |
//! | `PAPER_TRAIL_BAUD` | no | `9600` |
//! | `PAPER_TRAIL_SETTLE_MS` | no | `2000` |
//! | `PAPER_TRAIL_PAPER` | no | `58mm` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PaperTrailError, Result};
use crate::printer::PrinterConfig;
use crate::protocol::PrinterCommand;
use crate::queue::QueueSettings;
use crate::render::{EncoderOptions, ImageEncoder};
use crate::transport::serial::{self, SerialSettings};
use crate::worker::WorkerConfig;

/// Values as supplied, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawSettings {
    pub queue_url: Option<String>,
    pub region: Option<String>,
    pub device: Option<PathBuf>,
    pub endpoint_url: Option<String>,
    pub logo: Option<PathBuf>,
    pub baud_rate: Option<u32>,
    pub settle_ms: Option<u64>,
    pub paper: Option<String>,
}

/// Validated settings for the `run` command.
#[derive(Debug, Clone)]
pub struct Settings {
    pub queue: QueueSettings,
    pub serial: SerialSettings,
    pub printer: PrinterConfig,
    pub worker: WorkerConfig,
}

impl Settings {
    /// Validate `raw` and encode the logo, if one is configured.
    pub fn from_raw(raw: RawSettings) -> Result<Self> {
        let queue_url = required(raw.queue_url, "queue URL (PAPER_TRAIL_QUEUE_URL)")?;
        if !is_http_url(&queue_url) {
            return Err(PaperTrailError::Config(format!(
                "queue URL must start with http:// or https://, got {:?}",
                queue_url
            )));
        }
        let region = required(raw.region, "AWS region (PAPER_TRAIL_REGION)")?;

        let endpoint_url = raw.endpoint_url.filter(|s| !s.trim().is_empty());
        if let Some(endpoint) = &endpoint_url
            && !is_http_url(endpoint)
        {
            return Err(PaperTrailError::Config(format!(
                "endpoint URL must start with http:// or https://, got {:?}",
                endpoint
            )));
        }

        let baud_rate = raw.baud_rate.unwrap_or(serial::DEFAULT_BAUD_RATE);
        if !serial::is_supported_baud(baud_rate) {
            return Err(PaperTrailError::Config(format!("unsupported baud rate {}", baud_rate)));
        }

        let device = match raw.device {
            Some(path) if path.as_os_str().is_empty() => {
                return Err(PaperTrailError::Config("device path is empty".into()));
            }
            Some(path) => path,
            None => PathBuf::from(serial::DEFAULT_DEVICE),
        };

        let printer = match raw.paper.as_deref() {
            None => PrinterConfig::default(),
            Some(name) => PrinterConfig::by_name(name).ok_or_else(|| {
                PaperTrailError::Config(format!("unknown paper size {:?} (try 58mm or 80mm)", name))
            })?,
        };

        let mut worker = WorkerConfig::default();
        if let Some(ms) = raw.settle_ms {
            worker.settle = Duration::from_millis(ms);
        }
        if let Some(path) = raw.logo {
            worker.logo = Some(encode_logo(&path, &printer)?);
        }

        Ok(Self {
            queue: QueueSettings {
                queue_url,
                region,
                endpoint_url,
            },
            serial: SerialSettings {
                device,
                baud_rate,
                ..SerialSettings::default()
            },
            printer,
            worker,
        })
    }
}

fn required(value: Option<String>, what: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(PaperTrailError::Config(format!("missing {}", what))),
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Read and rasterize the logo once; every ticket reuses the command.
fn encode_logo(path: &Path, printer: &PrinterConfig) -> Result<PrinterCommand> {
    let bytes = std::fs::read(path).map_err(|e| {
        PaperTrailError::Config(format!("cannot read logo {}: {}", path.display(), e))
    })?;

    ImageEncoder::new(EncoderOptions::for_printer(printer))
        .encode_bytes(&bytes)
        .map_err(|e| PaperTrailError::Config(format!("logo {}: {}", path.display(), e)))
}
