//! # Printer Transport Layer
//!
//! A print job is a fixed sequence of calls on a [`PrinterTransport`]:
//!
//! ```text
//!            begin_job          begin_page
//!  Closed ─────────────► JobOpen ─────────► PageOpen ─┐ blit
//!                          │  ▲                │ ◄────┘
//!                          │  └────────────────┘ end_page
//!                          │ end_job
//!                          ▼
//!                      JobClosed ──► close()
//! ```
//!
//! [`PrintSession`] owns a transport, enforces that order and closes the
//! transport on every exit path: explicitly through [`PrintSession::close`],
//! or on drop when a step failed midway.
//!
//! ## Available Transports
//!
//! - [`device`]: raw device file (USB printer class, serial, RFCOMM) speaking ESC/POS

pub mod device;
pub mod escpos;

pub use device::DeviceTransport;

use image::GrayImage;
use std::fmt;

use crate::error::LabelError;

/// Destination rectangle of a blit, in printer dots. [`DeviceTransport`]
/// rasters from the label's top-left and refuses any other origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DestRect {
    /// Rectangle covering `image` at the origin.
    pub fn covering(image: &GrayImage) -> Self {
        Self {
            x: 0,
            y: 0,
            width: image.width(),
            height: image.height(),
        }
    }
}

/// Capability of an opened printer. Opening is the implementation's
/// constructor; a [`PrintSession`] drives the rest.
pub trait PrinterTransport {
    fn begin_job(&mut self, name: &str) -> Result<(), LabelError>;
    fn begin_page(&mut self) -> Result<(), LabelError>;
    fn blit(&mut self, image: &GrayImage, dest: DestRect) -> Result<(), LabelError>;
    fn end_page(&mut self) -> Result<(), LabelError>;
    fn end_job(&mut self) -> Result<(), LabelError>;
    fn close(&mut self) -> Result<(), LabelError>;
}

impl<T: PrinterTransport + ?Sized> PrinterTransport for &mut T {
    fn begin_job(&mut self, name: &str) -> Result<(), LabelError> {
        (**self).begin_job(name)
    }
    fn begin_page(&mut self) -> Result<(), LabelError> {
        (**self).begin_page()
    }
    fn blit(&mut self, image: &GrayImage, dest: DestRect) -> Result<(), LabelError> {
        (**self).blit(image, dest)
    }
    fn end_page(&mut self) -> Result<(), LabelError> {
        (**self).end_page()
    }
    fn end_job(&mut self) -> Result<(), LabelError> {
        (**self).end_job()
    }
    fn close(&mut self) -> Result<(), LabelError> {
        (**self).close()
    }
}

impl<T: PrinterTransport + ?Sized> PrinterTransport for Box<T> {
    fn begin_job(&mut self, name: &str) -> Result<(), LabelError> {
        (**self).begin_job(name)
    }
    fn begin_page(&mut self) -> Result<(), LabelError> {
        (**self).begin_page()
    }
    fn blit(&mut self, image: &GrayImage, dest: DestRect) -> Result<(), LabelError> {
        (**self).blit(image, dest)
    }
    fn end_page(&mut self) -> Result<(), LabelError> {
        (**self).end_page()
    }
    fn end_job(&mut self) -> Result<(), LabelError> {
        (**self).end_job()
    }
    fn close(&mut self) -> Result<(), LabelError> {
        (**self).close()
    }
}

/// Where a session is in the job sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Closed,
    JobOpen,
    PageOpen,
    JobClosed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::JobOpen => "job open",
            Self::PageOpen => "page open",
            Self::JobClosed => "job closed",
        };
        f.write_str(name)
    }
}

/// # Print Session
///
/// Scoped ownership of an opened transport.
///
/// ```
/// use image::GrayImage;
/// use miracle_label::error::LabelError;
/// use miracle_label::transport::{DestRect, PrintSession, PrinterTransport};
///
/// struct Discard;
///
/// impl PrinterTransport for Discard {
///     fn begin_job(&mut self, _: &str) -> Result<(), LabelError> { Ok(()) }
///     fn begin_page(&mut self) -> Result<(), LabelError> { Ok(()) }
///     fn blit(&mut self, _: &GrayImage, _: DestRect) -> Result<(), LabelError> { Ok(()) }
///     fn end_page(&mut self) -> Result<(), LabelError> { Ok(()) }
///     fn end_job(&mut self) -> Result<(), LabelError> { Ok(()) }
///     fn close(&mut self) -> Result<(), LabelError> { Ok(()) }
/// }
///
/// let image = GrayImage::new(354, 236);
/// PrintSession::new(Discard).print_image("Label", &image)?;
/// # Ok::<(), LabelError>(())
/// ```
pub struct PrintSession<T: PrinterTransport> {
    transport: T,
    state: JobState,
    closed: bool,
}

impl<T: PrinterTransport> PrintSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: JobState::Closed,
            closed: false,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    fn expect(&self, expected: JobState, action: &str) -> Result<(), LabelError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LabelError::Transport(format!(
                "cannot {} while {}",
                action, self.state
            )))
        }
    }

    pub fn begin_job(&mut self, name: &str) -> Result<(), LabelError> {
        self.expect(JobState::Closed, "begin job")?;
        self.transport.begin_job(name)?;
        self.state = JobState::JobOpen;
        Ok(())
    }

    pub fn begin_page(&mut self) -> Result<(), LabelError> {
        self.expect(JobState::JobOpen, "begin page")?;
        self.transport.begin_page()?;
        self.state = JobState::PageOpen;
        Ok(())
    }

    pub fn blit(&mut self, image: &GrayImage, dest: DestRect) -> Result<(), LabelError> {
        self.expect(JobState::PageOpen, "blit")?;
        self.transport.blit(image, dest)
    }

    pub fn end_page(&mut self) -> Result<(), LabelError> {
        self.expect(JobState::PageOpen, "end page")?;
        self.transport.end_page()?;
        self.state = JobState::JobOpen;
        Ok(())
    }

    pub fn end_job(&mut self) -> Result<(), LabelError> {
        self.expect(JobState::JobOpen, "end job")?;
        self.transport.end_job()?;
        self.state = JobState::JobClosed;
        Ok(())
    }

    /// Close the transport and end the session.
    pub fn close(mut self) -> Result<(), LabelError> {
        self.closed = true;
        self.transport.close()
    }

    /// Run a complete single-page job and close the session.
    ///
    /// The transport is closed whether or not a step fails; the first error
    /// is returned.
    pub fn print_image(mut self, job_name: &str, image: &GrayImage) -> Result<(), LabelError> {
        let printed = self.run_page(job_name, image);
        let closed = self.close();
        printed.and(closed)
    }

    fn run_page(&mut self, job_name: &str, image: &GrayImage) -> Result<(), LabelError> {
        self.begin_job(job_name)?;
        self.begin_page()?;
        self.blit(image, DestRect::covering(image))?;
        self.end_page()?;
        self.end_job()
    }
}

impl<T: PrinterTransport> Drop for PrintSession<T> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        tracing::warn!(state = %self.state, "print session dropped without close");
        if let Err(e) = self.transport.close() {
            tracing::warn!(error = %e, "failed to close printer transport");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::mock::RecordingTransport;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_job_order() {
        let transport = RecordingTransport::default();
        let image = GrayImage::new(354, 236);

        PrintSession::new(transport.clone())
            .print_image("Label", &image)
            .unwrap();

        assert_eq!(
            transport.calls(),
            vec![
                "begin_job Label",
                "begin_page",
                "blit 354x236",
                "end_page",
                "end_job",
                "close",
            ]
        );
    }

    #[test]
    fn test_failure_still_closes() {
        let transport = RecordingTransport::failing_on("blit");
        let image = GrayImage::new(10, 10);

        let err = PrintSession::new(transport.clone())
            .print_image("Label", &image)
            .unwrap_err();

        assert!(matches!(err, LabelError::PrinterUnavailable(_)));
        assert_eq!(
            transport.calls(),
            vec!["begin_job Label", "begin_page", "blit 10x10", "close"]
        );
    }

    #[test]
    fn test_drop_closes_transport() {
        let transport = RecordingTransport::default();
        {
            let mut session = PrintSession::new(transport.clone());
            session.begin_job("Label").unwrap();
            session.begin_page().unwrap();
        }
        assert_eq!(transport.calls(), vec!["begin_job Label", "begin_page", "close"]);
    }

    #[test]
    fn test_out_of_order_calls_rejected() {
        let transport = RecordingTransport::default();
        let mut session = PrintSession::new(transport.clone());

        assert!(matches!(session.begin_page(), Err(LabelError::Transport(_))));
        assert!(matches!(
            session.blit(&GrayImage::new(1, 1), DestRect::covering(&GrayImage::new(1, 1))),
            Err(LabelError::Transport(_))
        ));
        session.begin_job("Label").unwrap();
        assert!(matches!(session.begin_job("Again"), Err(LabelError::Transport(_))));
        assert!(matches!(session.end_page(), Err(LabelError::Transport(_))));
        assert_eq!(session.state(), JobState::JobOpen);
        session.end_job().unwrap();
        assert_eq!(session.state(), JobState::JobClosed);
        session.close().unwrap();

        assert_eq!(transport.calls(), vec!["begin_job Label", "end_job", "close"]);
    }

    #[test]
    fn test_failed_begin_job_stays_closed() {
        let transport = RecordingTransport::failing_on("begin_job");
        let mut session = PrintSession::new(transport.clone());
        assert!(session.begin_job("Label").is_err());
        assert_eq!(session.state(), JobState::Closed);
    }

    #[test]
    fn test_dest_rect_covering() {
        let image = GrayImage::new(354, 236);
        assert_eq!(
            DestRect::covering(&image),
            DestRect {
                x: 0,
                y: 0,
                width: 354,
                height: 236
            }
        );
    }
}
