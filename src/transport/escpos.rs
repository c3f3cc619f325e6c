//! # ESC/POS Label Commands
//!
//! The handful of ESC/POS commands a raster label job needs.
//!
//! ## Job Layout
//!
//! ```text
//! ESC @                    initialize (once per job)
//! GS v 0 m xL xH yL yH d…  raster image (once per blit)
//! GS FF                    feed to the next label (once per page)
//! ```
//!
//! ## Bit Packing
//!
//! Raster data is row-major, one bit per dot, MSB = leftmost dot,
//! 1 = black. Rows are padded to whole bytes.

/// ESC (Escape) - Command prefix
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - Extended command prefix
pub const GS: u8 = 0x1D;

/// FF (Form Feed)
pub const FF: u8 = 0x0C;

/// Encode a u16 as little-endian bytes
///
/// ```
/// use miracle_label::transport::escpos::u16_le;
///
/// assert_eq!(u16_le(0x1234), [0x34, 0x12]);
/// assert_eq!(u16_le(236), [0xEC, 0x00]);
/// ```
#[inline]
pub const fn u16_le(value: u16) -> [u8; 2] {
    [value as u8, (value >> 8) as u8]
}

/// # Initialize Printer (ESC @)
///
/// Clears the print buffer and resets modes to their power-on defaults.
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

/// # Print Raster Bit Image (GS v 0)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | GS v 0 m xL xH yL yH d1...dk |
/// | Hex     | 1D 76 30 m xL xH yL yH d1...dk |
///
/// - `m`: 0 (normal density)
/// - `x`: width in bytes
/// - `y`: height in dots
/// - `k = x * y`
///
/// ```
/// use miracle_label::transport::escpos;
///
/// let cmd = escpos::raster(45, 2, &[0xFF; 90]);
/// assert_eq!(&cmd[..8], &[0x1D, 0x76, 0x30, 0x00, 45, 0, 2, 0]);
/// assert_eq!(cmd.len(), 8 + 90);
/// ```
pub fn raster(width_bytes: u16, height: u16, data: &[u8]) -> Vec<u8> {
    debug_assert_eq!(
        data.len(),
        width_bytes as usize * height as usize,
        "Raster data must be exactly width_bytes * height bytes"
    );

    let mut cmd = Vec::with_capacity(8 + data.len());
    cmd.extend([GS, b'v', b'0', 0]);
    cmd.extend(u16_le(width_bytes));
    cmd.extend(u16_le(height));
    cmd.extend_from_slice(data);
    cmd
}

/// # Feed Label (GS FF)
///
/// Advances the media to the start of the next label.
#[inline]
pub fn label_feed() -> Vec<u8> {
    vec![GS, FF]
}
