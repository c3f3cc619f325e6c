//! # Miracle Label - Auction Win Label Printing
//!
//! Lays out and prints small thermal labels for auction wins: the buyer's
//! name, the item (wrapped to two lines), an optional price in a fixed
//! column, and a two-line footer.
//!
//! ## Quick Start
//!
//! ```no_run
//! use miracle_label::{
//!     config::LabelConfig,
//!     job,
//!     layout::LabelRequest,
//!     transport::DeviceTransport,
//! };
//!
//! let config = LabelConfig::m221();
//! let request = LabelRequest::new("Johnathan Smith", "Gold Eagle 2024 1oz", Some("$150"))?;
//!
//! let transport = DeviceTransport::open(&config.printer.name)?;
//! job::print_label(&request, &config, transport)?;
//!
//! # Ok::<(), miracle_label::LabelError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`layout`] | Word wrapping and line placement |
//! | [`font`] | Font loading and text measurement |
//! | [`render`] | Drawing a layout onto a raster canvas |
//! | [`transport`] | Print job state machine and device output |
//! | [`job`] | One request end to end |
//! | [`server`] | HTTP event server |
//! | [`config`] | Label geometry, offsets and fonts |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! Currently tested with:
//! - Phomemo M221 (30×20 mm labels, 300 DPI, USB)

pub mod config;
pub mod error;
pub mod font;
pub mod job;
pub mod layout;
pub mod render;
pub mod server;
pub mod transport;

// Re-exports for convenience
pub use config::LabelConfig;
pub use error::LabelError;
pub use layout::{LabelRequest, layout};
