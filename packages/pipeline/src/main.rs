//! CLI entry point for the sentiment pipeline.

use sentiment_pipeline::cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize tracing with WARN level by default, respecting RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    if let Err(e) = cli::run().await {
        eprintln!("Error: {e}");
        if e.is_input_error() {
            eprintln!("Check the thread reference, the headers file and LLM_API_KEY.");
        }
        std::process::exit(1);
    }
}
