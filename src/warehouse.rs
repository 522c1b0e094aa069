use crate::error::ChartError;
use crate::frame::Frame;

use async_trait::async_trait;

/// Data warehouse trait.
///
/// Defines the interface between the chart handlers and the warehouse that answers their
/// queries.
///
/// # Methods
/// * `query`: Run a SQL query and return the full result set.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Run a query.
    ///
    /// Returns the complete result as a [Frame].
    ///
    /// # Arguments
    ///
    /// * `sql`: Standard SQL query text
    async fn query(&self, sql: &str) -> Result<Frame, ChartError>;
}
