//! Chart server routes and request handlers.

use crate::app_state::{AppState, SharedAppState};
use crate::cli::CommandLineArgs;
use crate::error::ChartError;
use crate::frame::Frame;
use crate::metrics;
use crate::qq;
use crate::queries;
use crate::scatter;

use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

/// Body of the health check response.
pub const HEALTH_MESSAGE: &str = "Variant chart service is running";

/// A rendered chart, or a message explaining why there is none.
#[derive(Debug)]
pub enum ChartResponse {
    /// Rendered HTML document
    Html(String),
    /// The query returned nothing plottable
    NoData,
}

impl IntoResponse for ChartResponse {
    fn into_response(self) -> Response {
        match self {
            ChartResponse::Html(html) => Html(html).into_response(),
            ChartResponse::NoData => qq::NO_DATA_MESSAGE.into_response(),
        }
    }
}

/// The service type returned by [service].
pub type Service = NormalizePath<Router>;

/// Returns a [axum::Router] for the chart API
///
/// # Arguments
///
/// * `state`: Shared application state
pub fn router(state: SharedAppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/qqplot", get(qq_plot))
        .route("/scatter", get(scatter_plot))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(
            TraceLayer::new_for_http()
                .on_request(metrics::request_counter)
                .on_response(metrics::record_response_metrics),
        )
        .with_state(state)
}

/// Returns the chart [Service] backed by BigQuery
///
/// # Arguments
///
/// * `args`: Command line arguments
pub fn service(args: &CommandLineArgs) -> Service {
    service_with_state(Arc::new(AppState::new(args)))
}

/// Returns the chart [Service] for the given state
///
/// Trailing slashes are trimmed from request paths before routing.
pub fn service_with_state(state: SharedAppState) -> Service {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

async fn health() -> &'static str {
    HEALTH_MESSAGE
}

/// Run a chart query, recording its duration and size.
///
/// # Arguments
///
/// * `state`: Shared application state
/// * `chart`: Chart name used to label metrics
/// * `sql`: Query text
async fn run_query(state: &AppState, chart: &str, sql: &str) -> Result<Frame, ChartError> {
    let start = Instant::now();
    let frame = state.warehouse.query(sql).await?;
    metrics::record_query(chart, start.elapsed(), frame.num_rows());
    tracing::debug!("{} query returned {} rows", chart, frame.num_rows());
    Ok(frame)
}

/// Write a rendered chart to a named temporary file and read it back.
///
/// The file is created in `dir` if given, else in the system temporary directory, and is
/// removed before returning.
///
/// # Arguments
///
/// * `dir`: Optional output directory
/// * `html`: Rendered document
async fn through_temp_file(dir: Option<&str>, html: String) -> Result<String, ChartError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("qqplot-").suffix(".html");
    let file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    tokio::fs::write(file.path(), html).await?;
    let html = tokio::fs::read_to_string(file.path()).await?;
    tracing::debug!("Served chart from {}", file.path().display());
    Ok(html)
}

/// Handler for the Q-Q plot
#[tracing::instrument(level = "DEBUG", skip_all)]
async fn qq_plot(State(state): State<SharedAppState>) -> Result<ChartResponse, ChartError> {
    let sql = queries::qq_plot_sql(&state.args.dataset, state.args.qq_sample_size);
    let frame = run_query(&state, "qqplot", &sql).await?;
    let Some(plot) = qq::build(frame)? else {
        tracing::info!("No rows for Q-Q plot");
        return Ok(ChartResponse::NoData);
    };
    let html = plot.figure().to_html()?;
    let html = through_temp_file(state.args.output_dir.as_deref(), html).await?;
    Ok(ChartResponse::Html(html))
}

/// Handler for the AF vs gnomAD AF scatter plot
#[tracing::instrument(level = "DEBUG", skip_all)]
async fn scatter_plot(State(state): State<SharedAppState>) -> Result<ChartResponse, ChartError> {
    let sql = queries::scatter_sql(&state.args.dataset);
    let frame = run_query(&state, "scatter", &sql).await?;
    let html = scatter::build(&frame)?.to_html()?;
    Ok(ChartResponse::Html(html))
}
