use async_trait::async_trait;
use serde::Deserialize;

use crate::backend::{BackendClient, PopulateOptions};
use refill_types::{Entity, EntityKind, RefillError, Result};

// ---------------------------------------------------------------------------
// HttpBackend
// ---------------------------------------------------------------------------

/// Backend client over the workspace HTTP API, authenticated with a bearer
/// token. One instance per run; the orchestrator never issues concurrent
/// requests through it.
#[derive(Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Read the auth token from `REFILL_TOKEN`.
    pub fn from_env(base_url: impl Into<String>) -> Result<Self> {
        let token = std::env::var("REFILL_TOKEN").map_err(|_| RefillError::Auth)?;
        Ok(Self::new(base_url, token))
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| RefillError::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RefillError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(map_error(status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_empty(&self, path: &str, kind: EntityKind, name: &str) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| RefillError::Http(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RefillError::UnknownEntity {
                kind,
                name: name.to_string(),
            });
        }
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .map_err(|e| RefillError::Http(e.to_string()))?;
            return Err(map_error(status, &body));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// List response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NamedItem {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DataSourceList {
    datasources: Vec<NamedItem>,
}

#[derive(Debug, Deserialize)]
struct PipeList {
    pipes: Vec<NamedItem>,
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

// Entity names come from user config and the remote catalog; anything that
// is not a plain identifier must not break the path.
fn truncate_path(name: &str) -> String {
    format!("/v0/datasources/{}/truncate", urlencoding::encode(name))
}

fn populate_path(name: &str, options: &PopulateOptions) -> String {
    format!(
        "/v0/pipes/{}/populate?wait={}&truncate={}",
        urlencoding::encode(name),
        options.wait,
        options.truncate
    )
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn map_error(status: reqwest::StatusCode, body: &str) -> RefillError {
    let status_u16 = status.as_u16();
    match status_u16 {
        401 | 403 => RefillError::Auth,
        429 => {
            // The backend reports retry-after in seconds inside the error body.
            let retry_ms = serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| v["error"]["retry_after"].as_f64())
                .map(|s| (s * 1000.0) as u64)
                .unwrap_or(1000);
            RefillError::RateLimited {
                retry_after_ms: retry_ms,
            }
        }
        500..=599 => RefillError::Backend {
            status: status_u16,
            message: extract_error_message(body),
            retryable: true,
        },
        _ => RefillError::Backend {
            status: status_u16,
            message: extract_error_message(body),
            retryable: false,
        },
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

// ---------------------------------------------------------------------------
// BackendClient implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl BackendClient for HttpBackend {
    async fn list_data_sources(&self) -> Result<Vec<Entity>> {
        let body = self.get_json("/v0/datasources").await?;
        let list: DataSourceList = serde_json::from_value(body)?;
        tracing::debug!(count = list.datasources.len(), "listed data sources");
        Ok(list
            .datasources
            .into_iter()
            .map(|item| Entity::data_source(item.name))
            .collect())
    }

    async fn truncate_data_source(&self, name: &str) -> Result<()> {
        tracing::info!(name, "truncating data source");
        self.post_empty(&truncate_path(name), EntityKind::DataSource, name)
            .await
    }

    async fn list_pipes(&self) -> Result<Vec<Entity>> {
        let body = self.get_json("/v0/pipes").await?;
        let list: PipeList = serde_json::from_value(body)?;
        tracing::debug!(count = list.pipes.len(), "listed pipes");
        Ok(list
            .pipes
            .into_iter()
            .map(|item| Entity::pipe(item.name))
            .collect())
    }

    async fn populate_pipe(&self, name: &str, options: PopulateOptions) -> Result<()> {
        tracing::info!(name, wait = options.wait, truncate = options.truncate, "populating pipe");
        self.post_empty(&populate_path(name, &options), EntityKind::Pipe, name)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let backend = HttpBackend::new("https://api.example.com/", "tok");
        assert_eq!(backend.base_url, "https://api.example.com");
    }

    #[test]
    fn data_source_list_parses_and_ignores_extra_fields() {
        let body = r#"{
            "datasources": [
                {"name": "cdc_orders", "row_count": 120},
                {"name": "agg_daily"}
            ]
        }"#;
        let list: DataSourceList = serde_json::from_str(body).unwrap();
        assert_eq!(list.datasources.len(), 2);
        assert_eq!(list.datasources[0].name, "cdc_orders");
        assert_eq!(list.datasources[1].name, "agg_daily");
    }

    #[test]
    fn pipe_list_parses_in_order() {
        let body = r#"{"pipes": [{"name": "etl_b"}, {"name": "etl_a"}]}"#;
        let list: PipeList = serde_json::from_str(body).unwrap();
        let names: Vec<&str> = list.pipes.iter().map(|p| p.name.as_str()).collect();
        // Catalog order is preserved as returned, never sorted.
        assert_eq!(names, vec!["etl_b", "etl_a"]);
    }

    #[test]
    fn truncate_path_escapes_the_name_segment() {
        assert_eq!(
            truncate_path("cdc_orders"),
            "/v0/datasources/cdc_orders/truncate"
        );
        assert_eq!(
            truncate_path("a/b c"),
            "/v0/datasources/a%2Fb%20c/truncate"
        );
    }

    #[test]
    fn populate_path_escapes_the_name_segment() {
        let options = PopulateOptions::blocking_refresh();
        assert_eq!(
            populate_path("etl_orders", &options),
            "/v0/pipes/etl_orders/populate?wait=true&truncate=true"
        );
        // A name with reserved characters cannot leak into path or query.
        assert_eq!(
            populate_path("etl?x=1", &options),
            "/v0/pipes/etl%3Fx%3D1/populate?wait=true&truncate=true"
        );
    }

    #[test]
    fn map_error_401_is_auth() {
        let err = map_error(reqwest::StatusCode::UNAUTHORIZED, "{}");
        assert!(matches!(err, RefillError::Auth));
    }

    #[test]
    fn map_error_403_is_auth() {
        let err = map_error(reqwest::StatusCode::FORBIDDEN, "{}");
        assert!(matches!(err, RefillError::Auth));
    }

    #[test]
    fn map_error_429_extracts_retry_after() {
        let body = r#"{"error": {"message": "slow down", "retry_after": 2.5}}"#;
        let err = map_error(reqwest::StatusCode::TOO_MANY_REQUESTS, body);
        match err {
            RefillError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, 2500),
            other => panic!("expected RateLimited, got: {other:?}"),
        }
    }

    #[test]
    fn map_error_429_defaults_retry_after() {
        let err = map_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "not json");
        match err {
            RefillError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, 1000),
            other => panic!("expected RateLimited, got: {other:?}"),
        }
    }

    #[test]
    fn map_error_500_is_retryable_backend() {
        let body = r#"{"error": {"message": "internal"}}"#;
        let err = map_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, body);
        match err {
            RefillError::Backend {
                status,
                message,
                retryable,
            } => {
                assert_eq!(status, 500);
                assert_eq!(message, "internal");
                assert!(retryable);
            }
            other => panic!("expected Backend, got: {other:?}"),
        }
    }

    #[test]
    fn map_error_400_is_not_retryable() {
        let err = map_error(reqwest::StatusCode::BAD_REQUEST, "bad params");
        match err {
            RefillError::Backend {
                status, retryable, ..
            } => {
                assert_eq!(status, 400);
                assert!(!retryable);
            }
            other => panic!("expected Backend, got: {other:?}"),
        }
    }

    #[test]
    fn extract_error_message_falls_back_to_body() {
        assert_eq!(extract_error_message("plain text"), "plain text");
        assert_eq!(
            extract_error_message(r#"{"error": {"message": "nope"}}"#),
            "nope"
        );
    }
}
