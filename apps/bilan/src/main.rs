//! # Bilan - Assessment Progression Server
//!
//! The main binary for the Bilan assessment progression engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for assessment operations
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                apps/bilan (THE BINARY)              │
//! │                                                     │
//! │     ┌─────────────┐           ┌─────────────┐       │
//! │     │    CLI      │           │   HTTP API  │       │
//! │     │   (clap)    │           │   (axum)    │       │
//! │     └──────┬──────┘           └──────┬──────┘       │
//! │            └────────────┬────────────┘              │
//! │                         ▼                           │
//! │                 ┌───────────────┐                   │
//! │                 │  bilan-core   │                   │
//! │                 │  (THE LOGIC)  │                   │
//! │                 └───────────────┘                   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! bilan server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! bilan create --owner 7f0c...
//! bilan save-step <id> --step 2 --data '{"skills":["SQL"]}'
//! bilan complete-phase <id> --phase preliminary
//! ```

use bilan::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing: BILAN_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("BILAN_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bilan=info,bilan_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Bilan startup banner.
fn print_banner() {
    println!(
        r#"
  ██████╗ ██╗██╗      █████╗ ███╗   ██╗
  ██╔══██╗██║██║     ██╔══██╗████╗  ██║
  ██████╔╝██║██║     ███████║██╔██╗ ██║
  ██╔══██╗██║██║     ██╔══██║██║╚██╗██║
  ██████╔╝██║███████╗██║  ██║██║ ╚████║
  ╚═════╝ ╚═╝╚══════╝╚═╝  ╚═╝╚═╝  ╚═══╝

  Assessment Progression Engine v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
