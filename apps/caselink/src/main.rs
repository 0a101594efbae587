//! # Caselink - Cross-Case Linking CLI
//!
//! The main binary for the caselink entity graph and linking engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │           apps/caselink (THE BINARY)          │
//! │                                               │
//! │   ┌─────────────┐        ┌────────────────┐   │
//! │   │    CLI      │        │  TOML config   │   │
//! │   │   (clap)    │        │   (toml)       │   │
//! │   └──────┬──────┘        └───────┬────────┘   │
//! │          └──────────┬────────────┘            │
//! │                     ▼                         │
//! │             ┌───────────────┐                 │
//! │             │ caselink-core │                 │
//! │             │  (THE LOGIC)  │                 │
//! │             └───────────────┘                 │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! caselink status -f cases.json
//! caselink similar -f cases.json --case PB-2024-001 --min 0.4
//! caselink link -f cases.json --confirm 0 --reviewer "det. ramos"
//! caselink clusters -f cases.json --min-size 3
//! caselink traverse -f cases.json --case PB-2024-001 --depth 2
//! ```

use caselink::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // CASELINK_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("CASELINK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let cli = cli::Cli::parse();

    let default_filter = if cli.verbose {
        "caselink=debug"
    } else {
        "caselink=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr so --json-mode output stays parseable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
   ___   _   ___ ___ _    ___ _  _ _  __
  / __| /_\ / __| __| |  |_ _| \| | |/ /
 | (__ / _ \\__ \ _|| |__ | || .` | ' <
  \___/_/ \_\___/___|____|___|_|\_|_|\_\

  Cross-Case Linking Engine v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
