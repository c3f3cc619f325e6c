//! # Print Driver
//!
//! Runs one label job end to end:
//!
//! ```text
//! LabelRequest ─► validate ─► FontSet::load ─► layout ─► render ─► PrintSession
//! ```
//!
//! Malformed requests are rejected before any font is loaded or anything
//! is sent to the device; the transport is still closed. Font problems
//! never fail a job.

use image::GrayImage;

use crate::config::LabelConfig;
use crate::error::LabelError;
use crate::font::{FontSet, GlyphMetrics};
use crate::layout::{LabelLayout, LabelRequest, layout};
use crate::render::{render_label, to_png};
use crate::transport::{PrintSession, PrinterTransport};

/// Lay out and render `request` with already loaded fonts.
pub fn render_request(
    request: &LabelRequest,
    config: &LabelConfig,
    fonts: &FontSet,
) -> Result<(LabelLayout, GrayImage), LabelError> {
    request.validate()?;
    let label = layout(&GlyphMetrics, request, config, fonts);
    let image = render_label(&label, &config.geometry).into_image();
    Ok((label, image))
}

/// Render `request` and print it through `transport`.
///
/// The transport is closed before this returns, whether the job succeeded
/// or not.
pub fn print_label<T>(
    request: &LabelRequest,
    config: &LabelConfig,
    transport: T,
) -> Result<(), LabelError>
where
    T: PrinterTransport,
{
    let session = PrintSession::new(transport);
    if let Err(e) = request.validate() {
        return Err(abandon(session, e));
    }
    let fonts = FontSet::load(&config.fonts);
    run_session(session, request, config, &fonts)
}

/// [`print_label`] with fonts loaded by the caller.
pub fn print_with_fonts<T>(
    request: &LabelRequest,
    config: &LabelConfig,
    fonts: &FontSet,
    transport: T,
) -> Result<(), LabelError>
where
    T: PrinterTransport,
{
    run_session(PrintSession::new(transport), request, config, fonts)
}

fn run_session<T>(
    session: PrintSession<T>,
    request: &LabelRequest,
    config: &LabelConfig,
    fonts: &FontSet,
) -> Result<(), LabelError>
where
    T: PrinterTransport,
{
    let (label, image) = match render_request(request, config, fonts) {
        Ok(rendered) => rendered,
        Err(e) => return Err(abandon(session, e)),
    };

    session.print_image(&config.printer.job_name, &image)?;

    tracing::info!(
        buyer = %request.buyer,
        item = %request.item,
        price = request.price().unwrap_or("N/A"),
        lines = label.instructions.len(),
        "label printed"
    );
    Ok(())
}

/// Close a session that never started a job and hand back `error`.
fn abandon<T: PrinterTransport>(session: PrintSession<T>, error: LabelError) -> LabelError {
    if let Err(e) = session.close() {
        tracing::warn!(error = %e, "failed to close printer transport");
    }
    error
}

/// Render `request` to PNG bytes.
pub fn preview_label(request: &LabelRequest, config: &LabelConfig) -> Result<Vec<u8>, LabelError> {
    request.validate()?;
    let fonts = FontSet::load(&config.fonts);
    let (_, image) = render_request(request, config, &fonts)?;
    to_png(&image)
}
