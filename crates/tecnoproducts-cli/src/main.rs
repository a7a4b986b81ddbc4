//! TecnoProducts - a command-line storefront panel.
//!
//! Logs in against the backend, keeps the session between runs, and lists
//! categories, products, sales and suppliers behind the route guard.

mod commands;

use std::io;
use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tecnoproducts_core::{App, Config};

use commands::Command;

/// Log file name prefix inside the data directory
const LOG_FILE: &str = "tecnoproducts.log";

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn print_usage() {
    eprintln!("Usage: tecnoproducts <command>\n");
    eprintln!("Commands:");
    eprintln!("  login [username]   Log in and store the session");
    eprintln!("  logout             End the session");
    eprintln!("  status             Show whether a session is active");
    eprintln!("  refresh            Renew the access token");
    eprintln!("  open <path>        Show where navigating to <path> leads");
    eprintln!("  categories         List categories");
    eprintln!("  products           List products");
    eprintln!("  sales              List sales");
    eprintln!("  suppliers          List suppliers");
    eprintln!();
    eprintln!("  category add <nombre> <descripcion>");
    eprintln!("  category edit <id> <nombre> <descripcion>");
    eprintln!("  category rm <id>");
    eprintln!("  product add <nombre> <precio> <stock> [categoria] [proveedor]");
    eprintln!("  product edit <id> <nombre> <precio> <stock> [categoria] [proveedor]");
    eprintln!("  product rm <id>");
    eprintln!("  sale add <producto> <cantidad>");
    eprintln!("  sale rm <id>");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = Command::parse(&args) else {
        print_usage();
        std::process::exit(2);
    };

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config, using defaults: {:#}", e);
            Config::default()
        }
    };

    let log_dir = config.data_dir().ok();
    let _log_guard = init_tracing(log_dir.as_deref());
    info!(api = %config.api_base_url, "TecnoProducts panel starting");

    let mut app = App::new(config)?;
    let result = commands::run(&mut app, command).await;

    if let Err(ref e) = result {
        warn!(error = %e, "Command failed");
    }
    result
}
