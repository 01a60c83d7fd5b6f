//! Vaspera CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vaspera::cli::{handle_error, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    // `run` installs the configured logger; one-shot commands keep stdout
    // clean and only log warnings to stderr.
    if !cli.is_long_running() {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    if let Err(err) = cli.dispatch().await {
        handle_error(&err, json_mode);
    }
}
