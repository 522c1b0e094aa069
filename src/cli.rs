//! Command Line Interface (CLI) arguments.

use clap::Parser;
use url::Url;

/// Variant charts command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "VARIANT_CHARTS_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8080, env = "PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "VARIANT_CHARTS_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/variant-charts/certs/cert.pem",
        env = "VARIANT_CHARTS_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/variant-charts/certs/key.pem",
        env = "VARIANT_CHARTS_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for requests to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "VARIANT_CHARTS_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Whether to enable sending traces to Jaeger.
    #[arg(long, default_value_t = false, env = "VARIANT_CHARTS_ENABLE_JAEGER")]
    pub enable_jaeger: bool,
    /// Google Cloud project that runs the queries. Resolved from the metadata server if unset.
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
    pub project: Option<String>,
    /// BigQuery dataset holding the variant tables, as `project.dataset`
    #[arg(
        long,
        default_value = "shc-variants.igg_dev",
        env = "VARIANT_CHARTS_DATASET",
        value_parser = parse_dataset
    )]
    pub dataset: String,
    /// BigQuery location (region) in which to run query jobs
    #[arg(long, env = "VARIANT_CHARTS_LOCATION")]
    pub location: Option<String>,
    /// Base URL of the BigQuery REST API
    #[arg(
        long,
        default_value = "https://bigquery.googleapis.com/bigquery/v2",
        env = "VARIANT_CHARTS_BIGQUERY_URL"
    )]
    pub bigquery_url: Url,
    /// Base URL of the compute metadata server used for credentials and project discovery
    #[arg(
        long,
        default_value = "http://metadata.google.internal/computeMetadata/v1",
        env = "VARIANT_CHARTS_METADATA_URL"
    )]
    pub metadata_url: Url,
    /// Static OAuth2 bearer token. When unset, tokens are fetched from the metadata server.
    #[arg(long, env = "VARIANT_CHARTS_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,
    /// Maximum time in seconds to wait for a query to complete
    #[arg(long, default_value_t = 300, env = "VARIANT_CHARTS_QUERY_TIMEOUT")]
    pub query_timeout: u64,
    /// Number of rows sampled per subtype for the Q-Q plot
    #[arg(
        long,
        default_value_t = 20000,
        env = "VARIANT_CHARTS_QQ_SAMPLE_SIZE",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub qq_sample_size: u32,
    /// Directory for rendered chart files. Defaults to the system temporary directory.
    #[arg(long, env = "VARIANT_CHARTS_OUTPUT_DIR")]
    pub output_dir: Option<String>,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}

/// Validate a `project.dataset` identifier.
///
/// The identifier is interpolated into backquoted table references, so only characters valid in
/// project and dataset names are accepted.
pub fn parse_dataset(value: &str) -> Result<String, String> {
    let mut parts = value.split('.');
    let (Some(project), Some(dataset), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected `project.dataset`, got `{}`", value));
    };
    let valid = |part: &str, allow_dash: bool| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || (allow_dash && c == '-'))
    };
    if !valid(project, true) {
        return Err(format!("invalid project name `{}`", project));
    }
    if !valid(dataset, false) {
        return Err(format!("invalid dataset name `{}`", dataset));
    }
    Ok(value.to_string())
}
