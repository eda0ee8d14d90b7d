// Diff source: the paginated list of merged pull requests

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::models::DiffPage;

#[derive(Debug, Error)]
pub enum DiffSourceError {
    #[error("Failed to reach the diff source: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Rejected(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiffSource: Send + Sync {
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<DiffPage, DiffSourceError>;
}

#[derive(Debug, Clone)]
pub struct HttpDiffSource {
    url: String,
    client: Client,
}

impl HttpDiffSource {
    pub fn new(url: String, request_timeout: u64) -> Result<Self, DiffSourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(request_timeout))
            .build()?;

        Ok(Self { url, client })
    }
}

#[async_trait]
impl DiffSource for HttpDiffSource {
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<DiffPage, DiffSourceError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("page", page), ("per_page", per_page)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DiffSourceError::Rejected(rejection_message(status, &body)));
        }

        Ok(response.json::<DiffPage>().await?)
    }
}

/// Prefer the body's `error` or `details` field over the bare status
fn rejection_message(status: reqwest::StatusCode, body: &str) -> String {
    let fallback = format!("HTTP error! status: {}", status.as_u16());
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        tracing::warn!("Failed to parse diff source error response as JSON");
        return fallback;
    };

    ["error", "details"]
        .iter()
        .find_map(|field| json[*field].as_str().filter(|m| !m.is_empty()))
        .map_or(fallback, ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_rejection_message() {
        let status = reqwest::StatusCode::INTERNAL_SERVER_ERROR;
        assert_eq!(
            rejection_message(status, r#"{"error":"GitHub rate limit"}"#),
            "GitHub rate limit"
        );
        assert_eq!(
            rejection_message(status, r#"{"details":"token expired"}"#),
            "token expired"
        );
        assert_eq!(
            rejection_message(status, "<html>oops</html>"),
            "HTTP error! status: 500"
        );
        assert_eq!(rejection_message(status, "{}"), "HTTP error! status: 500");
    }

    #[tokio::test]
    async fn test_fetch_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sample-diffs"))
            .and(query_param("page", "2"))
            .and(query_param("per_page", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "diffs": [{"id": "7", "description": "Fix login", "diff": "-bug", "url": "u"}],
                "nextPage": 3,
                "currentPage": 2,
                "perPage": 10
            })))
            .mount(&server)
            .await;

        let source =
            HttpDiffSource::new(format!("{}/api/sample-diffs", server.uri()), 30).unwrap();
        let page = source.fetch_page(2, 10).await.unwrap();

        assert_eq!(page.current_page, 2);
        assert_eq!(page.next_page, Some(3));
        assert_eq!(page.diffs[0].description, "Fix login");
    }

    #[tokio::test]
    async fn test_fetch_page_surfaces_error_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(502)
                    .set_body_json(serde_json::json!({"error": "upstream unavailable"})),
            )
            .mount(&server)
            .await;

        let source = HttpDiffSource::new(server.uri(), 30).unwrap();
        let error = source.fetch_page(1, 10).await.unwrap_err();
        assert_eq!(error.to_string(), "upstream unavailable");
    }
}
