//! # Miracle Label CLI
//!
//! Command-line interface for printing auction win labels.
//!
//! ## Usage
//!
//! ```bash
//! # Print one label
//! miracle-label print "Johnathan Smith" "Gold Eagle 2024 1oz" '$150'
//!
//! # Render to PNG instead of printing
//! miracle-label preview "Johnathan Smith" "Gold Eagle 2024 1oz" --png label.png
//!
//! # Run the event server
//! miracle-label serve --listen 127.0.0.1:7777 --device /dev/usb/lp0
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `miracle_label=info,tower_http=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use miracle_label::{
    LabelError,
    config::LabelConfig,
    job,
    layout::LabelRequest,
    server::{self, ServerConfig},
    transport::DeviceTransport,
};

/// Miracle Label - auction win label printer
#[derive(Parser, Debug)]
#[command(name = "miracle-label")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a label to the printer
    Print {
        /// Buyer name
        buyer: String,

        /// Item description
        item: String,

        /// Formatted price, e.g. '$25'
        price: Option<String>,

        /// JSON label configuration
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Printer device path (overrides the configuration)
        #[arg(long)]
        device: Option<String>,
    },

    /// Render a label to a PNG file
    Preview {
        /// Buyer name
        buyer: String,

        /// Item description
        item: String,

        /// Formatted price, e.g. '$25'
        price: Option<String>,

        /// Output PNG file
        #[arg(long, value_name = "FILE", default_value = "label.png")]
        png: PathBuf,

        /// JSON label configuration
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Run the HTTP event server
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:7777")]
        listen: String,

        /// Printer device path (overrides the configuration)
        #[arg(long)]
        device: Option<String>,

        /// JSON label configuration
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// File keeping settings and win history across restarts
        #[arg(long, value_name = "FILE", default_value = "label-state.json")]
        state: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "miracle_label=info,tower_http=info".into()),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), LabelError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Print {
            buyer,
            item,
            price,
            config,
            device,
        } => {
            let mut config = LabelConfig::load_or_default(config.as_deref())?;
            if let Some(device) = device {
                config.printer.name = device;
            }
            let request = LabelRequest::new(buyer, item, price)?;
            let transport = DeviceTransport::open(&config.printer.name)?;
            job::print_label(&request, &config, transport)?;
            println!("Printed label for {}", request.buyer);
        }

        Commands::Preview {
            buyer,
            item,
            price,
            png,
            config,
        } => {
            let config = LabelConfig::load_or_default(config.as_deref())?;
            let request = LabelRequest::new(buyer, item, price)?;
            let png_bytes = job::preview_label(&request, &config)?;
            std::fs::write(&png, png_bytes)?;
            println!("Saved to {}", png.display());
        }

        Commands::Serve {
            listen,
            device,
            config,
            state,
        } => {
            let mut label = LabelConfig::load_or_default(config.as_deref())?;
            if let Some(device) = device {
                label.printer.name = device;
            }
            let config = ServerConfig {
                listen_addr: listen,
                label,
                state_path: Some(state),
            };
            tokio::runtime::Runtime::new()?.block_on(server::serve(config))?;
        }
    }

    Ok(())
}
