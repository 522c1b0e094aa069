//! Credentials for the warehouse API.
//!
//! Either a static bearer token supplied in configuration, or the default service account token
//! served by the compute metadata server (as on Cloud Run or GCE).

use crate::error::ChartError;

use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use url::Url;

/// Refresh metadata tokens this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Header required by the metadata server on every request.
static METADATA_FLAVOR: (&str, &str) = ("Metadata-Flavor", "Google");

/// Token response from the metadata server.
#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

/// A bearer token and the instant after which it should no longer be used.
#[derive(Clone, Debug)]
pub struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Source of OAuth2 bearer tokens.
#[derive(Debug)]
pub enum TokenSource {
    /// A fixed token, e.g. from `gcloud auth print-access-token`.
    Static(String),
    /// Tokens fetched from the metadata server and cached until shortly before expiry.
    Metadata {
        client: reqwest::Client,
        base_url: Url,
        cached: RwLock<Option<CachedToken>>,
    },
}

impl TokenSource {
    /// Create a metadata server token source.
    ///
    /// # Arguments
    ///
    /// * `client`: HTTP client
    /// * `base_url`: Metadata server base URL, e.g. `http://metadata.google.internal/computeMetadata/v1`
    pub fn metadata(client: reqwest::Client, base_url: Url) -> Self {
        TokenSource::Metadata {
            client,
            base_url,
            cached: RwLock::new(None),
        }
    }

    /// Returns a bearer token, fetching a new one if required.
    pub async fn token(&self) -> Result<String, ChartError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Metadata {
                client,
                base_url,
                cached,
            } => {
                // Common case: the cached token is still fresh.
                {
                    let cached = cached.read().await;
                    if let Some(cached) = cached.as_ref() {
                        if Instant::now() < cached.refresh_at {
                            return Ok(cached.token.clone());
                        }
                    }
                }
                let mut cached = cached.write().await;
                // Another request may have refreshed the token since we dropped the read lock.
                if let Some(existing) = cached.as_ref() {
                    if Instant::now() < existing.refresh_at {
                        return Ok(existing.token.clone());
                    }
                }
                tracing::debug!("Fetching access token from metadata server");
                let body =
                    metadata_get(client, base_url, "instance/service-accounts/default/token")
                        .await?;
                let token: MetadataToken = serde_json::from_str(&body)?;
                let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
                *cached = Some(CachedToken {
                    token: token.access_token.clone(),
                    refresh_at: Instant::now() + lifetime,
                });
                Ok(token.access_token)
            }
        }
    }
}

/// Perform a GET request against the metadata server and return the body text.
///
/// # Arguments
///
/// * `client`: HTTP client
/// * `base_url`: Metadata server base URL
/// * `path`: Path relative to the base URL
pub async fn metadata_get(
    client: &reqwest::Client,
    base_url: &Url,
    path: &str,
) -> Result<String, ChartError> {
    let url = join(base_url, path)?;
    let response = client
        .get(url)
        .header(METADATA_FLAVOR.0, METADATA_FLAVOR.1)
        .send()
        .await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ChartError::Metadata {
            path: path.to_string(),
            message: format!("status {}: {}", status.as_u16(), body.trim()),
        });
    }
    Ok(body)
}

/// Join a relative path onto a base URL, treating the base as a directory.
pub(crate) fn join(base_url: &Url, path: &str) -> Result<Url, ChartError> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }
    Ok(base.join(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_utils::spawn_fake_server;
    use axum::{http::HeaderMap, http::StatusCode, routing::get, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn join_without_trailing_slash() {
        let base = Url::parse("http://metadata.google.internal/computeMetadata/v1").unwrap();
        assert_eq!(
            "http://metadata.google.internal/computeMetadata/v1/project/project-id",
            join(&base, "project/project-id").unwrap().as_str()
        );
    }

    #[test]
    fn join_with_trailing_slash() {
        let base = Url::parse("http://localhost:1234/v2/").unwrap();
        assert_eq!(
            "http://localhost:1234/v2/projects/p/queries",
            join(&base, "projects/p/queries").unwrap().as_str()
        );
    }

    #[tokio::test]
    async fn static_token() {
        let source = TokenSource::Static("abc".to_string());
        assert_eq!("abc", source.token().await.unwrap());
    }

    #[tokio::test]
    async fn metadata_token_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/computeMetadata/v1/instance/service-accounts/default/token",
            get(move |headers: HeaderMap| {
                let counter = counter.clone();
                async move {
                    assert_eq!("Google", headers["metadata-flavor"]);
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(serde_json::json!({
                        "access_token": "token-1",
                        "expires_in": 3599,
                        "token_type": "Bearer"
                    }))
                }
            }),
        );
        let base = spawn_fake_server(router).await;
        let source =
            TokenSource::metadata(reqwest::Client::new(), base.join("computeMetadata/v1").unwrap());
        assert_eq!("token-1", source.token().await.unwrap());
        assert_eq!("token-1", source.token().await.unwrap());
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn metadata_token_short_lived_refetched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/computeMetadata/v1/instance/service-accounts/default/token",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    // Expires inside the refresh margin, so is never reused.
                    Json(serde_json::json!({"access_token": "short", "expires_in": 30}))
                }
            }),
        );
        let base = spawn_fake_server(router).await;
        let source =
            TokenSource::metadata(reqwest::Client::new(), base.join("computeMetadata/v1").unwrap());
        source.token().await.unwrap();
        source.token().await.unwrap();
        assert_eq!(2, calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn metadata_error_status() {
        let router = Router::new().route(
            "/computeMetadata/v1/project/project-id",
            get(|| async { (StatusCode::NOT_FOUND, "not here") }),
        );
        let base = spawn_fake_server(router).await;
        let client = reqwest::Client::new();
        let base = base.join("computeMetadata/v1").unwrap();
        match metadata_get(&client, &base, "project/project-id").await {
            Err(ChartError::Metadata { path, message }) => {
                assert_eq!("project/project-id", path);
                assert_eq!("status 404: not here", message);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
