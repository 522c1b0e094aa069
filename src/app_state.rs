use crate::bigquery::BigQueryClient;
use crate::cli::CommandLineArgs;
use crate::warehouse::Warehouse;

use std::sync::Arc;

/// Shared application state passed to each chart request handler.
pub struct AppState {
    /// Command line arguments.
    pub args: CommandLineArgs,

    /// Warehouse that answers chart queries.
    pub warehouse: Arc<dyn Warehouse>,
}

impl AppState {
    /// Create and return an [AppState] backed by BigQuery.
    pub fn new(args: &CommandLineArgs) -> Self {
        Self::with_warehouse(args, Arc::new(BigQueryClient::new(args)))
    }

    /// Create and return an [AppState] backed by the given warehouse.
    pub fn with_warehouse(args: &CommandLineArgs, warehouse: Arc<dyn Warehouse>) -> Self {
        Self {
            args: args.clone(),
            warehouse,
        }
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;
