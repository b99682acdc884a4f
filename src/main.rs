use std::process;

use clap::Parser;
use gitai::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Default to "warn" unless RUST_LOG is set; --verbose raises to
    // debug. Logs go to stderr so generated output stays clean on
    // stdout.
    let default_filter = if cli.verbose { "gitai=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    if let Err(e) = cli.execute().await {
        eprintln!("Error: {e}");

        // Print the full error chain if available
        let mut source = e.source();
        while let Some(err) = source {
            eprintln!("  Caused by: {err}");
            source = err.source();
        }

        process::exit(1);
    }
}
