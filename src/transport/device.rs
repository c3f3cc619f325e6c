//! # Device File Transport
//!
//! Talks ESC/POS to a label printer exposed as a device file: the USB printer
//! class (`/dev/usb/lp0`), a serial port, or a bound RFCOMM channel.
//!
//! ## Buffering
//!
//! Commands are collected in memory while the job is built and written in
//! one pass at `end_job`, so a job that fails halfway sends nothing.
//!
//! ## TTY Configuration
//!
//! Serial and RFCOMM devices are switched to raw mode so binary raster data
//! is transmitted unmodified. Other device files are written as they are.
//!
//! ## Chunked Writes
//!
//! Large jobs are written in 4096-byte chunks with a short delay between
//! them to avoid overrunning small printer buffers.

use image::GrayImage;
use image::imageops::{self, FilterType};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use super::{DestRect, PrinterTransport, escpos};
use crate::error::LabelError;
use crate::render::pack_1bit;

/// Default chunk size for writes (bytes)
const CHUNK_SIZE: usize = 4096;

/// Delay between chunks (milliseconds)
const CHUNK_DELAY_MS: u64 = 2;

/// # Device Printer Transport
///
/// ```no_run
/// use miracle_label::transport::{DeviceTransport, PrintSession};
///
/// let transport = DeviceTransport::open("/dev/usb/lp0")?;
/// let image = image::GrayImage::new(354, 236);
/// PrintSession::new(transport).print_image("Label", &image)?;
/// # Ok::<(), miracle_label::error::LabelError>(())
/// ```
pub struct DeviceTransport {
    file: File,
    path: PathBuf,
    buffer: Vec<u8>,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl DeviceTransport {
    /// Open the printer device for writing.
    ///
    /// ## Errors
    ///
    /// Returns [`LabelError::PrinterUnavailable`] if the device doesn't exist,
    /// permission is denied, or TTY configuration fails.
    pub fn open<P: AsRef<Path>>(device: P) -> Result<Self, LabelError> {
        let path = device.as_ref();

        let file = OpenOptions::new().write(true).open(path).map_err(|e| {
            LabelError::PrinterUnavailable(format!("Failed to open {}: {}", path.display(), e))
        })?;

        configure_tty_raw(&file)?;

        tracing::debug!(device = %path.display(), "opened printer device");

        Ok(Self {
            file,
            path: path.to_path_buf(),
            buffer: Vec::new(),
            chunk_size: CHUNK_SIZE,
            chunk_delay: Duration::from_millis(CHUNK_DELAY_MS),
        })
    }

    /// Set the chunk size for large writes. Default is 4096 bytes.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    /// Set the delay between chunks. Default is 2ms.
    pub fn set_chunk_delay(&mut self, delay: Duration) {
        self.chunk_delay = delay;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, action: &str, e: io::Error) -> LabelError {
        LabelError::PrinterUnavailable(format!("{} {}: {}", action, self.path.display(), e))
    }

    /// Write the buffered job, chunking large writes.
    fn write_buffer(&mut self) -> Result<(), LabelError> {
        let data = std::mem::take(&mut self.buffer);

        for chunk in data.chunks(self.chunk_size) {
            self.file
                .write_all(chunk)
                .map_err(|e| self.unavailable("Write to", e))?;

            if data.len() > self.chunk_size && !self.chunk_delay.is_zero() {
                thread::sleep(self.chunk_delay);
            }
        }

        self.file.flush().map_err(|e| self.unavailable("Flush", e))
    }
}

/// Raster command for `image` scaled to the destination size.
///
/// The raster always starts at the top-left of the label, so only a
/// destination at the origin can be honoured.
fn raster_command(image: &GrayImage, dest: DestRect) -> Result<Vec<u8>, LabelError> {
    if dest.x != 0 || dest.y != 0 {
        return Err(LabelError::Transport(format!(
            "blit origin must be (0, 0), got ({}, {})",
            dest.x, dest.y
        )));
    }

    let scaled;
    let image = if image.dimensions() == (dest.width, dest.height) {
        image
    } else {
        scaled = imageops::resize(image, dest.width, dest.height, FilterType::Nearest);
        &scaled
    };

    let width_bytes = u16::try_from(image.width().div_ceil(8))
        .map_err(|_| LabelError::Image(format!("image too wide: {} dots", image.width())))?;
    let height = u16::try_from(image.height())
        .map_err(|_| LabelError::Image(format!("image too tall: {} rows", image.height())))?;

    Ok(escpos::raster(width_bytes, height, &pack_1bit(image)))
}

impl PrinterTransport for DeviceTransport {
    fn begin_job(&mut self, name: &str) -> Result<(), LabelError> {
        tracing::debug!(job = name, device = %self.path.display(), "begin job");
        self.buffer.clear();
        self.buffer.extend(escpos::init());
        Ok(())
    }

    fn begin_page(&mut self) -> Result<(), LabelError> {
        Ok(())
    }

    fn blit(&mut self, image: &GrayImage, dest: DestRect) -> Result<(), LabelError> {
        let command = raster_command(image, dest)?;
        self.buffer.extend(command);
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), LabelError> {
        self.buffer.extend(escpos::label_feed());
        Ok(())
    }

    fn end_job(&mut self) -> Result<(), LabelError> {
        tracing::debug!(bytes = self.buffer.len(), "sending job");
        self.write_buffer()
    }

    fn close(&mut self) -> Result<(), LabelError> {
        self.buffer.clear();
        self.file.flush().map_err(|e| self.unavailable("Close", e))
    }
}

/// Configure a terminal device for raw TTY mode. Non-terminals are left alone.
///
/// ## What Gets Disabled
///
/// - **Input flags**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR, ICRNL, IXON, IXOFF, IXANY
/// - **Output flags**: OPOST
/// - **Local flags**: ECHO, ECHONL, ICANON, ISIG, IEXTEN
/// - **Control flags**: CSIZE, PARENB (then CS8 is set)
///
/// IXON/IXOFF/IXANY must be off: 0x11 and 0x13 occur in raster data.
#[cfg(unix)]
fn configure_tty_raw(file: &File) -> Result<(), LabelError> {
    use std::mem::MaybeUninit;
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    if unsafe { libc::isatty(fd) } != 1 {
        return Ok(());
    }

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(LabelError::PrinterUnavailable(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
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
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(LabelError::PrinterUnavailable(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_file: &File) -> Result<(), LabelError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::PrintSession;
    use image::Luma;
    use std::fs;

    fn temp_device(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}.bin", name, std::process::id()));
        fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_open_missing_device() {
        let err = DeviceTransport::open("/nonexistent/dev/lp9").err().unwrap();
        assert!(matches!(err, LabelError::PrinterUnavailable(_)));
    }

    #[test]
    fn test_job_bytes() {
        let path = temp_device("label-job");
        let mut image = GrayImage::from_pixel(16, 2, Luma([255]));
        image.put_pixel(0, 0, Luma([0]));

        let transport = DeviceTransport::open(&path).unwrap();
        PrintSession::new(transport).print_image("Label", &image).unwrap();

        let written = fs::read(&path).unwrap();
        let mut expected = vec![0x1B, 0x40];
        expected.extend([0x1D, 0x76, 0x30, 0x00, 2, 0, 2, 0]);
        expected.extend([0x80, 0x00, 0x00, 0x00]);
        expected.extend([0x1D, 0x0C]);
        assert_eq!(written, expected);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_failed_job_writes_nothing() {
        let path = temp_device("label-abort");
        {
            let mut session = PrintSession::new(DeviceTransport::open(&path).unwrap());
            session.begin_job("Label").unwrap();
            session.begin_page().unwrap();
            session
                .blit(&GrayImage::new(8, 8), DestRect::covering(&GrayImage::new(8, 8)))
                .unwrap();
        }
        assert!(fs::read(&path).unwrap().is_empty());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_blit_resizes_to_destination() {
        let image = GrayImage::from_pixel(4, 4, Luma([0]));
        let dest = DestRect {
            x: 0,
            y: 0,
            width: 16,
            height: 3,
        };
        let cmd = raster_command(&image, dest).unwrap();
        assert_eq!(&cmd[4..8], &[2, 0, 3, 0]);
        assert!(cmd[8..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_blit_away_from_origin_is_refused() {
        let path = temp_device("label-offset");
        let mut transport = DeviceTransport::open(&path).unwrap();
        let image = GrayImage::from_pixel(8, 2, Luma([0]));
        let dest = DestRect {
            x: 4,
            y: 0,
            ..DestRect::covering(&image)
        };

        transport.begin_job("Label").unwrap();
        let err = transport.blit(&image, dest).unwrap_err();
        assert!(matches!(err, LabelError::Transport(_)));
        assert_eq!(transport.buffer, escpos::init());

        transport.close().unwrap();
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_chunked_write() {
        let path = temp_device("label-chunks");
        let mut transport = DeviceTransport::open(&path).unwrap();
        transport.set_chunk_size(3);
        transport.set_chunk_delay(Duration::ZERO);

        let image = GrayImage::from_pixel(24, 4, Luma([0]));
        PrintSession::new(transport).print_image("Label", &image).unwrap();

        let written = fs::read(&path).unwrap();
        assert_eq!(written.len(), 2 + 8 + 3 * 4 + 2);
        fs::remove_file(path).unwrap();
    }
}
