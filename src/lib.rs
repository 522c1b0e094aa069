//! This crate provides a small chart server for allele frequency statistics. Each chart runs a
//! fixed query against a BigQuery dataset and renders the result as an interactive
//! [Plotly](https://plotly.com/javascript/) chart.
//!
//! Two charts are served:
//!
//! * `/qqplot`: a Q-Q plot of control against case frequency for the AIS, IIS and JIS subtypes.
//! * `/scatter`: cohort AF against gnomAD AF, coloured by subtype.
//!
//! The server is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team.
//! * [reqwest] talks to the BigQuery REST API and the compute metadata server.
//! * [Serde](serde) performs (de)serialisation of API responses and chart figures.
//! * [ndarray] holds the numeric columns summarised by the Q-Q plot.

pub mod app;
pub mod app_state;
pub mod auth;
pub mod bigquery;
pub mod chart;
pub mod cli;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod qq;
pub mod queries;
pub mod scatter;
pub mod server;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod warehouse;
