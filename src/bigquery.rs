//! A minimal BigQuery client that runs a query and collects every result page.
//! It speaks the REST API v2 directly using `jobs.query` and `jobs.getQueryResults`.

use crate::auth::{self, TokenSource};
use crate::cli::CommandLineArgs;
use crate::error::ChartError;
use crate::frame::{Field, Frame};
use crate::warehouse::Warehouse;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use url::Url;

/// Longest time a single API call may block waiting for the job.
const POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of a `jobs.query` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
}

/// Response of `jobs.query` and `jobs.getQueryResults`.
///
/// The two share the fields used here.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    job_reference: Option<JobReference>,
    schema: Option<Schema>,
    #[serde(default)]
    rows: Vec<Row>,
    page_token: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Schema {
    #[serde(default)]
    fields: Vec<Field>,
}

#[derive(Debug, Deserialize)]
struct Row {
    f: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    #[serde(default)]
    v: serde_json::Value,
}

impl Row {
    /// Cells as optional strings. Nested (repeated or record) values are kept as JSON text.
    fn into_cells(self) -> Vec<Option<String>> {
        self.f
            .into_iter()
            .map(|cell| match cell.v {
                serde_json::Value::Null => None,
                serde_json::Value::String(value) => Some(value),
                other => Some(other.to_string()),
            })
            .collect()
    }
}

/// Error attached to a job.
#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

/// Google API error envelope.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// BigQuery client.
///
/// Implements [Warehouse] for BigQuery.
pub struct BigQueryClient {
    /// HTTP client shared by API and metadata requests.
    client: reqwest::Client,
    /// BigQuery REST API base URL.
    api_url: Url,
    /// Metadata server base URL, used to discover the project.
    metadata_url: Url,
    /// Project that runs query jobs. Resolved on first use if not configured.
    project: OnceCell<String>,
    /// Optional job location.
    location: Option<String>,
    /// Bearer token source.
    tokens: TokenSource,
    /// Overall time limit for a query, including paging.
    query_timeout: Duration,
}

impl BigQueryClient {
    /// Create a BigQuery client from the command line arguments.
    ///
    /// No network requests are made until the first query.
    ///
    /// # Arguments
    ///
    /// * `args`: Command line arguments
    pub fn new(args: &CommandLineArgs) -> Self {
        let client = reqwest::Client::new();
        let tokens = match &args.access_token {
            Some(token) => TokenSource::Static(token.clone()),
            None => TokenSource::metadata(client.clone(), args.metadata_url.clone()),
        };
        Self {
            client,
            api_url: args.bigquery_url.clone(),
            metadata_url: args.metadata_url.clone(),
            project: OnceCell::new_with(args.project.clone()),
            location: args.location.clone(),
            tokens,
            query_timeout: Duration::from_secs(args.query_timeout),
        }
    }

    /// Returns the project, asking the metadata server on first use if not configured.
    async fn project(&self) -> Result<&str, ChartError> {
        let project = self
            .project
            .get_or_try_init(|| async {
                let body =
                    auth::metadata_get(&self.client, &self.metadata_url, "project/project-id")
                        .await?;
                let project = body.trim().to_string();
                tracing::info!("Using project {} from metadata server", project);
                Ok::<_, ChartError>(project)
            })
            .await?;
        Ok(project.as_str())
    }

    /// Send an authenticated API request and decode the JSON response.
    ///
    /// # Arguments
    ///
    /// * `request`: Request to send
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ChartError> {
        let token = self.tokens.token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_error) => api_error.error.message,
                Err(_) => body.trim().to_string(),
            };
            return Err(ChartError::BigQuery {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch results of a job, waiting up to `timeout` for it to complete.
    ///
    /// # Arguments
    ///
    /// * `project`: Project owning the job
    /// * `job`: Job reference returned by `jobs.query`
    /// * `page_token`: Optional token of the page to fetch
    /// * `timeout`: Time the server may wait for the job to complete
    async fn get_query_results(
        &self,
        project: &str,
        job: &JobReference,
        page_token: Option<&str>,
        timeout: Duration,
    ) -> Result<QueryResponse, ChartError> {
        let url = auth::join(
            &self.api_url,
            &format!("projects/{}/queries/{}", project, job.job_id),
        )?;
        let mut params = vec![("timeoutMs", timeout.as_millis().to_string())];
        if let Some(location) = job.location.as_ref().or(self.location.as_ref()) {
            params.push(("location", location.clone()));
        }
        if let Some(page_token) = page_token {
            params.push(("pageToken", page_token.to_string()));
        }
        self.send(self.client.get(url).query(&params)).await
    }
}

/// Errors of a completed job joined into a single message.
fn job_errors(errors: &[ErrorProto]) -> String {
    errors
        .iter()
        .map(|error| format!("{}: {}", error.reason, error.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Time remaining until `deadline`, capped at a single poll.
fn poll_timeout(deadline: Instant) -> Duration {
    deadline
        .saturating_duration_since(Instant::now())
        .min(POLL_TIMEOUT)
}

#[async_trait]
impl Warehouse for BigQueryClient {
    /// Run a query.
    ///
    /// Polls until the job completes, then follows page tokens until every row has been read.
    ///
    /// # Arguments
    ///
    /// * `sql`: Standard SQL query text
    #[tracing::instrument(level = "DEBUG", skip(self, sql))]
    async fn query(&self, sql: &str) -> Result<Frame, ChartError> {
        let project = self.project().await?;
        let deadline = Instant::now() + self.query_timeout;
        let url = auth::join(&self.api_url, &format!("projects/{}/queries", project))?;
        let request = QueryRequest {
            query: sql,
            use_legacy_sql: false,
            timeout_ms: poll_timeout(deadline).as_millis() as u64,
            location: self.location.as_deref(),
        };
        let mut response: QueryResponse = self.send(self.client.post(url).json(&request)).await?;

        let mut schema: Option<Schema> = None;
        let mut rows: Vec<Vec<Option<String>>> = Vec::new();
        loop {
            if response.job_complete && !response.errors.is_empty() {
                return Err(ChartError::BigQuery {
                    status: 200,
                    message: job_errors(&response.errors),
                });
            }
            if response.job_complete {
                if schema.is_none() {
                    schema = response.schema.take();
                }
                rows.extend(response.rows.drain(..).map(Row::into_cells));
                if response.page_token.is_none() {
                    break;
                }
            }
            let job = response
                .job_reference
                .take()
                .ok_or_else(|| ChartError::BigQueryResponse {
                    message: "missing job reference".to_string(),
                })?;
            if Instant::now() >= deadline {
                return Err(ChartError::QueryTimeout {
                    job_id: job.job_id,
                    seconds: self.query_timeout.as_secs(),
                });
            }
            let page_token = response.page_token.take();
            tracing::debug!(
                "Fetching results of job {} (page token {:?})",
                job.job_id,
                page_token
            );
            response = self
                .get_query_results(project, &job, page_token.as_deref(), poll_timeout(deadline))
                .await?;
            // getQueryResults may omit the job reference or its location.
            response.job_reference = Some(match response.job_reference.take() {
                Some(mut next) => {
                    if next.location.is_none() {
                        next.location = job.location;
                    }
                    next
                }
                None => job,
            });
        }

        let schema = schema.ok_or_else(|| ChartError::BigQueryResponse {
            message: "missing result schema".to_string(),
        })?;
        tracing::debug!("Query returned {} rows", rows.len());
        Frame::from_bigquery(&schema.fields, &rows)
    }
}
