//! Error handling.

use axum::{
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tracing::{event, Level};

/// Variant chart server error type
///
/// This type encapsulates the various errors that may occur while querying the warehouse and
/// rendering a chart.
#[derive(Debug, Error)]
pub enum ChartError {
    /// Error reported by the BigQuery API
    #[error("BigQuery request failed with status {status}: {message}")]
    BigQuery { status: u16, message: String },

    /// BigQuery response lacking a field required to continue
    #[error("incomplete BigQuery response: {message}")]
    BigQueryResponse { message: String },

    /// Cell in a query result that does not match its declared type
    #[error("failed to parse value {value:?} in column {column} as {type_name}")]
    CellParse {
        column: String,
        value: String,
        type_name: &'static str,
    },

    /// Column with an unexpected storage type
    #[error("column {column} is not {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
    },

    /// Error writing or reading a rendered chart
    #[error("failed to write chart output")]
    Io(#[from] std::io::Error),

    /// Error obtaining credentials or project from the metadata server
    #[error("metadata server request for {path} failed: {message}")]
    Metadata { path: String, message: String },

    /// Column expected in a query result but not present
    #[error("query result has no column {column}")]
    MissingColumn { column: String },

    /// Query did not complete within the configured timeout
    #[error("query job {job_id} did not complete within {seconds}s")]
    QueryTimeout { job_id: String, seconds: u64 },

    /// Error sending a request to the warehouse or metadata server
    #[error("error communicating with the data warehouse")]
    Request(#[from] reqwest::Error),

    /// Query result row with the wrong number of cells
    #[error("query result row has {actual} cells, expected {expected}")]
    RowShape { expected: usize, actual: usize },

    /// Error (de)serialising JSON
    #[error("failed to (de)serialise JSON")]
    Json(#[from] serde_json::Error),

    /// Error building a request URL
    #[error("invalid request URL")]
    Url(#[from] url::ParseError),
}

impl IntoResponse for ChartError {
    /// Convert from a `ChartError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut caused_by = None;
        let mut current = error.source();
        while let Some(source) = current {
            let mut causes: Vec<String> = caused_by.unwrap_or_default();
            causes.push(source.to_string());
            caused_by = Some(causes);
            current = source.source();
        }
        // Remove duplicate entries.
        if let Some(caused_by) = caused_by.as_mut() {
            caused_by.dedup()
        }
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<ChartError> for ErrorResponse {
    /// Convert from a `ChartError` into an `ErrorResponse`.
    ///
    /// Requests carry no parameters, so every failure is the server's own.
    fn from(error: ChartError) -> Self {
        let response = match &error {
            ChartError::BigQuery { .. }
            | ChartError::BigQueryResponse { .. }
            | ChartError::CellParse { .. }
            | ChartError::ColumnType { .. }
            | ChartError::Io(_)
            | ChartError::Metadata { .. }
            | ChartError::MissingColumn { .. }
            | ChartError::QueryTimeout { .. }
            | ChartError::Request(_)
            | ChartError::RowShape { .. }
            | ChartError::Json(_)
            | ChartError::Url(_) => Self::internal_server_error(&error),
        };

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
