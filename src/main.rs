//! # Paper Trail CLI
//!
//! Command-line interface for the receipt printer worker.
//!
//! ## Usage
//!
//! ```bash
//! # Drain the queue until Ctrl-C / SIGTERM
//! PAPER_TRAIL_QUEUE_URL=https://sqs.eu-central-1.amazonaws.com/123456789012/tickets \
//! PAPER_TRAIL_REGION=eu-central-1 \
//!     paper-trail run --logo logo.png
//!
//! # Print one ticket by hand, or just show it
//! paper-trail ticket '{"name":"Ana","phoneModel":"Pixel 4 XL","ip":"10.0.0.5"}'
//! echo '{"name":"Ana"}' | paper-trail ticket --dry-run -
//!
//! # Print an image, or save the thresholded preview
//! paper-trail image logo.png
//! paper-trail image --png preview.png logo.png
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use paper_trail::{
    PaperTrailError, Printer, PrinterConfig, SerialTransport, SubmissionMessage, TicketFormatter,
    Worker,
    config::{RawSettings, Settings},
    queue::SqsQueue,
    render::{EncoderOptions, ImageEncoder},
    transport::{SerialSettings, serial},
};

/// Paper Trail - prints queued submissions on a thermal printer
#[derive(Parser, Debug)]
#[command(name = "paper-trail")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the queue worker until interrupted
    Run(RunArgs),

    /// Format one submission and print it
    Ticket {
        /// JSON object, or `-` to read it from stdin
        json: String,

        /// Write the ticket text to stdout instead of the printer
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Encode an image and print it
    Image {
        /// Image file (PNG, JPEG, GIF, BMP, WebP)
        file: PathBuf,

        /// Save the thresholded bitmap to PNG instead of printing
        #[arg(long, value_name = "FILE")]
        png: Option<PathBuf>,

        /// Paper width (58mm or 80mm); sets the maximum image dimension
        #[arg(long, env = "PAPER_TRAIL_PAPER", default_value = "58mm")]
        paper: String,

        #[command(flatten)]
        device: DeviceArgs,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// SQS queue URL
    #[arg(long, env = "PAPER_TRAIL_QUEUE_URL")]
    queue_url: Option<String>,

    /// AWS region of the queue
    #[arg(long, env = "PAPER_TRAIL_REGION")]
    region: Option<String>,

    /// Printer device path
    #[arg(long, env = "PAPER_TRAIL_DEVICE")]
    device: Option<PathBuf>,

    /// Override the SQS endpoint (ElasticMQ, LocalStack)
    #[arg(long, env = "PAPER_TRAIL_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Image printed above every ticket
    #[arg(long, env = "PAPER_TRAIL_LOGO")]
    logo: Option<PathBuf>,

    /// Serial line speed
    #[arg(long, env = "PAPER_TRAIL_BAUD")]
    baud: Option<u32>,

    /// Pause after each printed ticket, in milliseconds
    #[arg(long, env = "PAPER_TRAIL_SETTLE_MS")]
    settle_ms: Option<u64>,

    /// Paper width (58mm or 80mm)
    #[arg(long, env = "PAPER_TRAIL_PAPER")]
    paper: Option<String>,
}

#[derive(Args, Debug)]
struct DeviceArgs {
    /// Printer device path
    #[arg(long, env = "PAPER_TRAIL_DEVICE", default_value = serial::DEFAULT_DEVICE)]
    device: PathBuf,

    /// Serial line speed
    #[arg(long, env = "PAPER_TRAIL_BAUD", default_value_t = serial::DEFAULT_BAUD_RATE)]
    baud: u32,
}

impl DeviceArgs {
    fn open_printer(
        self,
        config: PrinterConfig,
    ) -> Result<Printer<SerialTransport>, PaperTrailError> {
        let transport = SerialTransport::open(SerialSettings {
            device: self.device,
            baud_rate: self.baud,
            ..SerialSettings::default()
        })?;
        Ok(Printer::new(transport, config))
    }
}

fn main() {
    init_tracing();

    if let Err(e) = run() {
        error!(error = %e, "fatal");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .init();
}

fn run() -> Result<(), PaperTrailError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_worker(args))
        }
        Commands::Ticket {
            json,
            dry_run,
            device,
        } => print_ticket(&json, dry_run, device),
        Commands::Image {
            file,
            png,
            paper,
            device,
        } => print_image(&file, png, &paper, device),
    }
}

async fn run_worker(args: RunArgs) -> Result<(), PaperTrailError> {
    // Validate everything before touching the device or the queue
    let settings = Settings::from_raw(RawSettings {
        queue_url: args.queue_url,
        region: args.region,
        device: args.device,
        endpoint_url: args.endpoint_url,
        logo: args.logo,
        baud_rate: args.baud,
        settle_ms: args.settle_ms,
        paper: args.paper,
    })?;

    let transport = SerialTransport::open(settings.serial.clone())?;
    let printer = Printer::new(transport, settings.printer);
    let queue = SqsQueue::connect(&settings.queue).await;
    info!(paper = settings.printer.name, "printer ready");

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let stats = Worker::new(queue, printer, settings.worker).run(cancel).await;

    info!(
        printed = stats.printed,
        failed = stats.failed,
        dropped = stats.dropped,
        "worker stopped"
    );
    Ok(())
}

/// Cancel `cancel` on Ctrl-C or SIGTERM.
async fn shutdown_signal(cancel: CancellationToken) {
    use tokio::signal::unix::{SignalKind, signal};

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown requested, finishing current job");
    cancel.cancel();
}

fn print_ticket(json: &str, dry_run: bool, device: DeviceArgs) -> Result<(), PaperTrailError> {
    let body = if json == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        json.to_string()
    };

    let record = SubmissionMessage::from_json(&body)?;
    let formatter = TicketFormatter::default();

    if dry_run {
        for line in formatter.lines(&record) {
            println!("{}", line);
        }
        return Ok(());
    }

    let mut printer = device.open_printer(PrinterConfig::default())?;
    printer.print(&[formatter.format(&record)])?;
    printer.close()?;
    println!("Printed successfully!");
    Ok(())
}

fn print_image(
    file: &Path,
    png: Option<PathBuf>,
    paper: &str,
    device: DeviceArgs,
) -> Result<(), PaperTrailError> {
    let config = PrinterConfig::by_name(paper).ok_or_else(|| {
        PaperTrailError::Config(format!("unknown paper size {:?} (try 58mm or 80mm)", paper))
    })?;
    let encoder = ImageEncoder::new(EncoderOptions::for_printer(&config));

    if let Some(png_path) = png {
        let bytes = std::fs::read(file)
            .map_err(|e| PaperTrailError::ImageLoad(format!("{}: {}", file.display(), e)))?;
        let raster = encoder.rasterize(&paper_trail::render::encoder::load_image(&bytes)?)?;
        raster
            .to_luma_image()
            .save(&png_path)
            .map_err(|e| PaperTrailError::Encoding(format!("Failed to save PNG: {}", e)))?;
        println!(
            "Saved {}x{} preview to {}",
            raster.width(),
            raster.height(),
            png_path.display()
        );
        return Ok(());
    }

    let command = encoder.encode_path(file)?;
    let mut printer = device.open_printer(config)?;
    printer.print(&[command])?;
    printer.close()?;
    println!("Printed successfully!");
    Ok(())
}
