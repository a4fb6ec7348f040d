// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};

mod cli;

#[derive(Parser)]
#[command(name = "codewatch")]
#[command(about = "Optical code presence watcher")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a capture source and report code presence changes
    Watch {
        /// Capture source: device index, /dev path, http(s) URL or stub://WxH
        #[arg(short, long, default_value = "0")]
        source: String,

        /// Scan the whole frame instead of the pointer region
        #[arg(long)]
        full_frame: bool,

        /// Fixed pointer position "x,y" in display coordinates
        /// (defaults to the display center)
        #[arg(long)]
        pointer: Option<String>,

        /// Region-of-interest half-width in pixels
        #[arg(short, long)]
        radius: Option<u32>,
    },

    /// Drive the dropper to a position
    Drop {
        /// Target position: left, center or right
        position: String,

        /// Dropper HTTP base URL (overrides config)
        #[arg(long)]
        url: Option<String>,

        /// Dropper serial device path (overrides config, wins over --url)
        #[arg(long)]
        port: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=codewatch=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            source,
            full_frame,
            pointer,
            radius,
        } => cli::watch(&source, full_frame, pointer.as_deref(), radius),
        Commands::Drop {
            position,
            url,
            port,
        } => cli::drop_position(&position, url, port),
    }
}
