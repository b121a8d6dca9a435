//! # Serial TTY Transport
//!
//! This module talks to an ESC/POS printer through a serial character device:
//! a USB serial adapter (`/dev/ttyUSB0`) or a Bluetooth Serial Port Profile
//! link bound with `rfcomm bind` (`/dev/rfcomm0`).
//!
//! ## Bluetooth Setup (Linux)
//!
//! ```bash
//! $ bluetoothctl
//! [bluetooth]# pair 00:11:62:XX:XX:XX
//! $ sudo rfcomm bind 0 00:11:62:XX:XX:XX
//! # This creates /dev/rfcomm0
//! ```
//!
//! ## TTY Configuration
//!
//! The device is opened in raw mode so binary raster data is transmitted
//! without modification:
//!
//! - **No input processing**, no XON/XOFF flow control
//! - **No output processing**: OPOST off (no LF -> CR LF translation)
//! - **8N1**: CS8, no parity
//! - **Non-canonical**, no echo
//! - **Baud rate** as configured (RFCOMM ignores it, real UARTs do not)
//! - **Read timeout** via VMIN = 0 / VTIME
//!
//! Devices that are not terminals (e.g. `/dev/usb/lp0`) skip the termios step.
//!
//! ## Chunked Writes
//!
//! Large data blocks are written in chunks to avoid overwhelming the
//! Bluetooth buffer. The default chunk size is 4096 bytes with a small
//! delay between chunks.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use super::Transport;
use crate::error::{PaperTrailError, Result};

/// Default RFCOMM device path
pub const DEFAULT_DEVICE: &str = "/dev/rfcomm0";

/// Default line speed
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Default chunk size for writes (bytes)
const CHUNK_SIZE: usize = 4096;

/// Delay between chunks (milliseconds)
const CHUNK_DELAY_MS: u64 = 2;

/// Connection parameters for [`SerialTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub device: PathBuf,
    pub baud_rate: u32,
    pub read_timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// # Serial Printer Transport
///
/// Holds one open file descriptor for its whole lifetime. The descriptor is
/// closed on [`Transport::close`] or when the transport is dropped.
///
/// ## Example
///
/// ```no_run
/// use paper_trail::transport::{SerialSettings, SerialTransport, Transport};
///
/// let mut transport = SerialTransport::open(SerialSettings::default())?;
/// transport.write_all(b"hello\r\n")?;
///
/// # Ok::<(), paper_trail::PaperTrailError>(())
/// ```
pub struct SerialTransport {
    settings: SerialSettings,
    file: Option<File>,
    is_tty: bool,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl SerialTransport {
    /// Open and configure the device.
    ///
    /// ## Errors
    ///
    /// Returns [`PaperTrailError::Transport`] if:
    /// - The device doesn't exist
    /// - Permission denied (may need root or dialout group)
    /// - The baud rate is not a standard rate
    /// - TTY configuration fails
    pub fn open(settings: SerialSettings) -> Result<Self> {
        let (file, is_tty) = connect(&settings)?;

        info!(
            device = %settings.device.display(),
            baud = settings.baud_rate,
            tty = is_tty,
            "printer device opened"
        );

        Ok(Self {
            settings,
            file: Some(file),
            is_tty,
            chunk_size: CHUNK_SIZE,
            chunk_delay: Duration::from_millis(CHUNK_DELAY_MS),
        })
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    /// Set the chunk size for large writes.
    ///
    /// Larger chunks are faster but may overflow the Bluetooth buffer.
    /// Default is 4096 bytes.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    /// Set the delay between chunks. Default is 2ms.
    pub fn set_chunk_delay(&mut self, delay: Duration) {
        self.chunk_delay = delay;
    }

    fn write_err(&self, what: &str, e: io::Error) -> PaperTrailError {
        PaperTrailError::TransportWrite(format!(
            "{} on {} failed: {}",
            what,
            self.settings.device.display(),
            e
        ))
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(PaperTrailError::TransportWrite(format!(
                "{} is not open",
                self.settings.device.display()
            )));
        };

        let mut result = Ok(());
        if data.len() <= self.chunk_size {
            result = file.write_all(data);
        } else {
            for chunk in data.chunks(self.chunk_size) {
                result = file.write_all(chunk);
                if result.is_err() {
                    break;
                }
                if !self.chunk_delay.is_zero() {
                    thread::sleep(self.chunk_delay);
                }
            }
        }
        let result = result.and_then(|()| file.flush());
        let result = result.and_then(|()| {
            if self.is_tty {
                drain(file.as_raw_fd())
            } else {
                Ok(())
            }
        });

        result.map_err(|e| self.write_err("write", e))
    }

    fn reconnect(&mut self) -> Result<()> {
        self.file = None;
        let (file, is_tty) = connect(&self.settings)?;
        self.file = Some(file);
        self.is_tty = is_tty;
        info!(device = %self.settings.device.display(), "printer device reopened");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.file.take().is_some() {
            info!(device = %self.settings.device.display(), "printer device closed");
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.settings.device.display().to_string()
    }
}

/// Open the device read/write and put it in raw mode.
fn connect(settings: &SerialSettings) -> Result<(File, bool)> {
    let path = &settings.device;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| {
            PaperTrailError::Transport(format!("Failed to open {}: {}", path.display(), e))
        })?;

    let is_tty = configure_tty_raw(file.as_raw_fd(), settings.baud_rate, settings.read_timeout)?;
    if !is_tty {
        debug!(device = %path.display(), "not a terminal, skipping termios setup");
    }

    Ok((file, is_tty))
}

/// Map a numeric baud rate to its termios constant.
fn baud_constant(baud: u32) -> Option<libc::speed_t> {
    Some(match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        _ => return None,
    })
}

/// Whether `baud` is one of the standard rates the transport can set.
pub fn is_supported_baud(baud: u32) -> bool {
    baud_constant(baud).is_some()
}

/// VTIME is expressed in tenths of a second and capped at 255.
fn vtime_deciseconds(timeout: Duration) -> libc::cc_t {
    (timeout.as_millis() / 100).min(255) as libc::cc_t
}

/// Configure a file descriptor for raw TTY mode.
///
/// Returns `Ok(false)` without touching anything if `fd` is not a terminal.
///
/// Note: IXON/IXOFF/IXANY disable XON/XOFF software flow control. This is critical
/// because 0x11 (XON/DC1) and 0x13 (XOFF/DC3) can appear in binary raster data.
fn configure_tty_raw(fd: i32, baud: u32, read_timeout: Duration) -> Result<bool> {
    use std::mem::MaybeUninit;

    let speed = baud_constant(baud).ok_or_else(|| {
        PaperTrailError::Transport(format!("Unsupported baud rate: {}", baud))
    })?;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ENOTTY) {
            return Ok(false);
        }
        return Err(PaperTrailError::Transport(format!("tcgetattr failed: {}", err)));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);

    termios.c_oflag &= !libc::OPOST;

    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);

    // 8N1, ignore modem control lines, enable receiver
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::CSTOPB);
    termios.c_cflag |= libc::CS8 | libc::CLOCAL | libc::CREAD;

    // Reads return after VTIME tenths of a second even with no data
    termios.c_cc[libc::VMIN] = 0;
    termios.c_cc[libc::VTIME] = vtime_deciseconds(read_timeout);

    let speed_result = unsafe {
        libc::cfsetispeed(&mut termios, speed) | libc::cfsetospeed(&mut termios, speed)
    };
    if speed_result != 0 {
        return Err(PaperTrailError::Transport(format!(
            "cfsetspeed({}) failed: {}",
            baud,
            io::Error::last_os_error()
        )));
    }

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(PaperTrailError::Transport(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(true)
}

/// Block until everything written to `fd` has left the output queue.
fn drain(fd: i32) -> io::Result<()> {
    let result = unsafe { libc::tcdrain(fd) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = SerialSettings::default();
        assert_eq!(settings.device, PathBuf::from("/dev/rfcomm0"));
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.read_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_supported_baud_rates() {
        for baud in [1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200] {
            assert!(is_supported_baud(baud), "{}", baud);
        }
        assert!(!is_supported_baud(0));
        assert!(!is_supported_baud(9601));
    }

    #[test]
    fn test_vtime_deciseconds() {
        assert_eq!(vtime_deciseconds(Duration::from_secs(1)), 10);
        assert_eq!(vtime_deciseconds(Duration::from_millis(50)), 0);
        assert_eq!(vtime_deciseconds(Duration::from_secs(60)), 255);
    }

    #[test]
    fn test_open_missing_device_fails() {
        let result = SerialTransport::open(SerialSettings {
            device: PathBuf::from("/nonexistent/rfcomm9"),
            ..Default::default()
        });
        assert!(matches!(result, Err(PaperTrailError::Transport(_))));
    }

    #[test]
    fn test_plain_file_skips_termios() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut transport = SerialTransport::open(SerialSettings {
            device: file.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        transport.set_chunk_size(3);
        transport.set_chunk_delay(Duration::ZERO);
        transport.write_all(b"hello\r\n").unwrap();
        transport.reconnect().unwrap();
        transport.write_all(b"again").unwrap();

        // Reopening without truncation overwrites from the start
        assert_eq!(std::fs::read(file.path()).unwrap(), b"again\r\n");
    }

    #[test]
    fn test_write_after_close_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut transport = SerialTransport::open(SerialSettings {
            device: file.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        transport.close().unwrap();
        let err = transport.write_all(b"x").unwrap_err();
        assert!(matches!(err, PaperTrailError::TransportWrite(_)));
    }

    // Note: TTY behaviour requires actual hardware.
    // Integration tests should be run manually with a connected printer.
}
