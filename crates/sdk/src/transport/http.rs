//! HTTP transport layer for the Promptlift SDK.

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use reqwest::{header, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// HTTP transport for making API requests.
///
/// Every request is attempted exactly once. The service is metered per key,
/// so retry policy belongs to the caller.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: Arc<ClientConfig>,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given configuration.
    pub fn new(config: Arc<ClientConfig>) -> ApiResult<Self> {
        let mut headers = header::HeaderMap::new();

        let mut auth = header::HeaderValue::from_str(&format!(
            "Bearer {}",
            config.api_key.expose()
        ))
        .map_err(|_| ApiError::Config("Invalid API key format".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// Build a URL for the given path, relative to the base URL.
    fn build_url(&self, path: &str) -> ApiResult<url::Url> {
        Ok(self.config.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Send a request once and turn non-success statuses into errors.
    async fn execute(&self, request_builder: RequestBuilder) -> ApiResult<Response> {
        let response = request_builder.send().await.map_err(|e| {
            warn!(error = %e, "Request failed before a response was received");
            ApiError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();

        warn!(status = status.as_u16(), "Request returned an error status");
        Err(ApiError::from_response(
            status.as_u16(),
            retry_after.as_deref(),
            &body,
        ))
    }

    /// Execute a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.build_url(path)?;
        debug!(url = %url, "GET request");

        let response = self.execute(self.client.get(url)).await?;
        let body = response.json().await?;
        Ok(body)
    }

    /// Execute a GET request with query parameters.
    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> ApiResult<T> {
        let url = self.build_url(path)?;
        debug!(url = %url, "GET request with query");

        let response = self.execute(self.client.get(url).query(query)).await?;
        let body = response.json().await?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptlift_core::ApiKey;
    use serde::Deserialize;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "sk-test-0123456789abcdef";

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestResponse {
        message: String,
    }

    fn create_config(base_url: &str) -> Arc<ClientConfig> {
        Arc::new(ClientConfig::new(
            url::Url::parse(base_url).unwrap(),
            ApiKey::parse(KEY).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_get_sends_bearer_key() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/test"))
            .and(header("authorization", format!("Bearer {}", KEY).as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "ok"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri())).unwrap();

        let result: TestResponse = transport.get("/api/test").await.unwrap();
        assert_eq!(result.message, "ok");
    }

    #[tokio::test]
    async fn test_get_with_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/q"))
            .and(query_param("input", r#"{"a":1}"#))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "q"})),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri())).unwrap();

        let result: TestResponse = transport
            .get_with_query("api/q", &[("input", r#"{"a":1}"#)])
            .await
            .unwrap();
        assert_eq!(result.message, "q");
    }

    #[tokio::test]
    async fn test_429_is_rate_limited_and_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/limited"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "42"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri())).unwrap();

        let result: ApiResult<TestResponse> = transport.get("/api/limited").await;
        assert!(matches!(
            result,
            Err(ApiError::RateLimited {
                retry_after_secs: Some(42)
            })
        ));
    }

    #[tokio::test]
    async fn test_401_is_unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/secure"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"error": "invalid key"})),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri())).unwrap();

        let result: ApiResult<TestResponse> = transport.get("/api/secure").await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_500_is_server_error_and_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/broken"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri())).unwrap();

        let result: ApiResult<TestResponse> = transport.get("/api/broken").await;
        match result {
            Err(ApiError::ServerError { status, message }) => {
                assert_eq!(status, 502);
                assert_eq!(message, "bad gateway");
            }
            other => panic!("Expected ServerError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_failure_is_unreachable() {
        // Bind then release a port so nothing is listening on it.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let uri = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let transport = HttpTransport::new(create_config(&uri)).unwrap();

        let result: ApiResult<TestResponse> = transport.get("/api/test").await;
        assert!(matches!(
            result,
            Err(ApiError::Unreachable {
                timed_out: false,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_unreachable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"message": "late"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let mut config = ClientConfig::new(
            url::Url::parse(&server.uri()).unwrap(),
            ApiKey::parse(KEY).unwrap(),
        );
        config.timeout = Duration::from_millis(50);
        let transport = HttpTransport::new(Arc::new(config)).unwrap();

        let result: ApiResult<TestResponse> = transport.get("/api/slow").await;
        assert!(matches!(
            result,
            Err(ApiError::Unreachable {
                timed_out: true,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_invalid_response() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/garbage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri())).unwrap();

        let result: ApiResult<TestResponse> = transport.get("/api/garbage").await;
        assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_build_url() {
        let transport = HttpTransport::new(create_config("http://localhost:8080")).unwrap();

        let url = transport.build_url("/api/test").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/test");
    }

    #[tokio::test]
    async fn test_build_url_keeps_base_path() {
        let transport =
            HttpTransport::new(create_config("http://localhost:8080/promptlift")).unwrap();

        let url = transport.build_url("/api/test").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/promptlift/api/test");
    }
}
