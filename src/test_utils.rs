use crate::cli::CommandLineArgs;
use crate::error::ChartError;
use crate::frame::{Field, Frame};
use crate::warehouse::Warehouse;

use async_trait::async_trait;
use axum::Router;
use clap::Parser;
use std::sync::Mutex;
use url::Url;

/// Parse command line arguments, prefixed with the binary name.
pub(crate) fn get_test_args(args: &[&str]) -> CommandLineArgs {
    let mut argv = vec!["variant-charts"];
    argv.extend_from_slice(args);
    CommandLineArgs::try_parse_from(argv).unwrap()
}

/// Build a row of string-encoded cells.
pub(crate) fn row(cells: &[Option<&str>]) -> Vec<Option<String>> {
    cells.iter().map(|c| c.map(str::to_string)).collect()
}

/// Build a Q-Q query result frame from `(subtype, control_percent, percent_diff)` rows.
pub(crate) fn qq_frame(rows: &[(&str, f64, f64)]) -> Frame {
    let schema = vec![
        Field::new("subtype", "STRING"),
        Field::new("control_percent", "FLOAT"),
        Field::new("percent_diff", "FLOAT"),
        Field::new("case_percent", "FLOAT"),
    ];
    let rows: Vec<Vec<Option<String>>> = rows
        .iter()
        .map(|(subtype, control, diff)| {
            vec![
                Some(subtype.to_string()),
                Some(control.to_string()),
                Some(diff.to_string()),
                Some((control + diff).to_string()),
            ]
        })
        .collect();
    Frame::from_bigquery(&schema, &rows).unwrap()
}

/// Build a scatter query result frame from
/// `(ID, symbol, subtype, af, gnomad_af)` rows.
pub(crate) fn scatter_frame(
    rows: &[(&str, Option<&str>, Option<&str>, Option<f64>, Option<f64>)],
) -> Frame {
    let schema = vec![
        Field::new("ID", "STRING"),
        Field::new("symbol", "STRING"),
        Field::new("subtype", "STRING"),
        Field::new("af", "FLOAT"),
        Field::new("gnomad_af", "FLOAT"),
        Field::new("mean_diff", "FLOAT"),
        Field::new("chromosome", "STRING"),
    ];
    let rows: Vec<Vec<Option<String>>> = rows
        .iter()
        .map(|(id, symbol, subtype, af, gnomad_af)| {
            let mean_diff = match (af, gnomad_af) {
                (Some(af), Some(gnomad_af)) => Some((gnomad_af - af).to_string()),
                _ => None,
            };
            vec![
                Some(id.to_string()),
                symbol.map(str::to_string),
                subtype.map(str::to_string),
                af.map(|v| v.to_string()),
                gnomad_af.map(|v| v.to_string()),
                mean_diff,
                Some("chr1".to_string()),
            ]
        })
        .collect();
    Frame::from_bigquery(&schema, &rows).unwrap()
}

/// A warehouse that returns a canned result and records the queries it receives.
pub(crate) struct FakeWarehouse {
    result: Mutex<Option<Result<Frame, ChartError>>>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeWarehouse {
    pub(crate) fn new(result: Result<Frame, ChartError>) -> Self {
        FakeWarehouse {
            result: Mutex::new(Some(result)),
            queries: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn query(&self, sql: &str) -> Result<Frame, ChartError> {
        self.queries.lock().unwrap().push(sql.to_string());
        self.result
            .lock()
            .unwrap()
            .take()
            .expect("fake warehouse queried more than once")
    }
}

/// Serve a router on an ephemeral local port, returning its base URL.
pub(crate) async fn spawn_fake_server(router: Router) -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::Server::from_tcp(listener)
            .unwrap()
            .serve(router.into_make_service())
            .await
            .unwrap();
    });
    Url::parse(&format!("http://{}/", addr)).unwrap()
}
