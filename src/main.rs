//! This file defines the variant-charts binary entry point.

use variant_charts::app;
use variant_charts::cli;
use variant_charts::metrics;
use variant_charts::server;
use variant_charts::tracing;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing(&args);
    metrics::register_metrics();
    let service = app::service(&args);
    server::serve(&args, service).await;
    tracing::shutdown_tracing();
}
