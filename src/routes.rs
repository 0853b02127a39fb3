use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{FirecrawlConfig, TextConfig};
use crate::error::{ConfigError, ScrapeError};
use crate::models::{GenerationRequest, OutlineResult};
use crate::services::outline::generate_outline;
use crate::services::scraper::FirecrawlClient;

/// Reference images arrive inline in the multipart body.
const MAX_OUTLINE_BODY_BYTES: usize = 50 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(config_dir: PathBuf) -> Self {
        Self { config_dir: Arc::new(config_dir) }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/outline",
            post(create_outline).layer(DefaultBodyLimit::max(MAX_OUTLINE_BODY_BYTES)),
        )
        .route("/api/firecrawl/status", get(firecrawl_status))
        .route("/api/firecrawl/scrape", post(scrape_url))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(AllowMethods::any())
                .allow_headers(AllowHeaders::any()),
        )
}

/// A failed request, rendered as `{"success": false, "error": ...}`.
pub struct ApiError(StatusCode, String);

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError(StatusCode::BAD_REQUEST, message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "success": false, "error": self.1 }))).into_response()
    }
}

async fn health_check() -> &'static str {
    "OK"
}

async fn create_outline(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<OutlineResult>), ApiError> {
    let mut request = GenerationRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("请求体解析失败: {e}")))?
    {
        let name = field.name().unwrap_or("unknown").to_string();
        match name.as_str() {
            "topic" | "source_content" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("{name} 读取失败: {e}")))?;
                if name == "topic" {
                    request.topic = text;
                } else if !text.trim().is_empty() {
                    request.source_content = Some(text);
                }
            }
            "images" | "images[]" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("图片读取失败: {e}")))?;
                if !data.is_empty() {
                    request.images.push(data.to_vec());
                }
            }
            _ => {}
        }
    }

    request.topic = request.topic.trim().to_string();
    if request.topic.is_empty() {
        return Err(ApiError::bad_request("参数错误：topic 不能为空"));
    }

    let config = TextConfig::load(&state.config_dir)?;
    let result = generate_outline(&config, &request).await?;
    let status = if result.is_success() {
        info!("大纲请求完成: {} 页", result.pages().len());
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(result)))
}

async fn firecrawl_status(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let config = FirecrawlConfig::load(&state.config_dir).map_err(|e| {
        error!("获取 Firecrawl 状态失败: {}", e);
        ApiError::internal(e.to_string())
    })?;
    Ok(Json(json!({
        "success": true,
        "enabled": config.enabled,
        "configured": config.configured(),
    })))
}

#[derive(Debug, Deserialize)]
struct ScrapeRequest {
    url: Option<String>,
}

async fn scrape_url(
    State(state): State<AppState>,
    Json(payload): Json<ScrapeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let url = payload
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("缺少 url 参数"))?;

    let config = FirecrawlConfig::load(&state.config_dir).map_err(|e| ApiError::internal(e.to_string()))?;
    if !config.enabled {
        return Err(ApiError::bad_request("Firecrawl 未启用，请先在设置中启用"));
    }

    let client = FirecrawlClient::new(&config).map_err(|e| ApiError::internal(e.to_string()))?;
    match client.scrape(&url).await {
        Ok(page) => Ok(Json(json!({ "success": true, "data": page }))),
        Err(ScrapeError::Request(e)) => {
            error!("抓取网页失败: {}", e);
            Err(ApiError::internal(format!("抓取网页失败: {e}")))
        }
        Err(e) => Ok(Json(json!({ "success": false, "error": e.to_string() }))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use http::Request;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BOUNDARY: &str = "XBOUNDARYX";

    fn multipart_body(fields: &[(&str, &str)]) -> String {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    fn outline_request(fields: &[(&str, &str)]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/outline")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(multipart_body(fields)))
            .unwrap()
    }

    fn outline_request_with_image(topic: &str, image: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"topic\"\r\n\r\n{topic}\r\n\
             --{BOUNDARY}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"photo.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(image);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/outline")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(dir: &TempDir, request: Request<Body>) -> (StatusCode, Value) {
        let app = router(AppState::new(dir.path().to_path_buf()));
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn write_providers(dir: &TempDir, base_url: &str) {
        fs::write(
            dir.path().join("text_providers.yaml"),
            format!(
                "active_provider: local\nproviders:\n  local:\n    type: openai_compatible\n    api_key: sk-test\n    model: test-model\n    base_url: {base_url}\n"
            ),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn health_is_ok() {
        let dir = TempDir::new().unwrap();
        let app = router(AppState::new(dir.path().to_path_buf()));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn outline_requires_topic() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(&dir, outline_request(&[("topic", "   ")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn outline_config_error_is_bad_request() {
        // No config file: the default provider has no API key.
        let dir = TempDir::new().unwrap();
        let (status, body) = send(&dir, outline_request(&[("topic", "露营")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("API Key"));
    }

    #[tokio::test]
    async fn outline_success_returns_pages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "[封面]\n露营<page>[总结]\n出发吧" } }]
            })))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        write_providers(&dir, &server.uri());

        let (status, body) = send(&dir, outline_request(&[("topic", "露营")])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["has_images"], false);
        assert_eq!(body["pages"][1]["type"], "summary");
    }

    #[tokio::test]
    async fn outline_accepts_photo_sized_images() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "[封面]\n露营" } }]
            })))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        write_providers(&dir, &server.uri());

        let mut image = vec![0xFF, 0xD8, 0xFF, 0xE0];
        image.resize(3 * 1024 * 1024, 0x5A);
        let (status, body) = send(&dir, outline_request_with_image("露营", &image)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["has_images"], true);
    }

    #[tokio::test]
    async fn outline_upstream_failure_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        write_providers(&dir, &server.uri());

        let (status, body) = send(&dir, outline_request(&[("topic", "露营")])).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("API 配额限制。"));
    }

    #[tokio::test]
    async fn firecrawl_status_reports_flags() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("firecrawl_config.yaml"), "enabled: true\napi_key: fc\n").unwrap();
        let request = Request::builder().uri("/api/firecrawl/status").body(Body::empty()).unwrap();
        let (status, body) = send(&dir, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "enabled": true, "configured": true }));
    }

    fn scrape_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/firecrawl/scrape")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn scrape_rejects_missing_url_and_disabled_service() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(&dir, scrape_request(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "缺少 url 参数");

        let (status, body) = send(&dir, scrape_request(json!({ "url": "https://a.b" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("未启用"));
    }

    #[tokio::test]
    async fn scrape_returns_normalized_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/scrape"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "markdown": "正文", "metadata": { "title": "T" } }
            })))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("firecrawl_config.yaml"),
            format!("enabled: true\nbase_url: {}\n", server.uri()),
        )
        .unwrap();

        let (status, body) = send(&dir, scrape_request(json!({ "url": "https://a.b" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "data": { "title": "T", "content": "正文", "word_count": 2, "url": "https://a.b" }
            })
        );
    }

    #[tokio::test]
    async fn scrape_undecodable_response_is_internal_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/scrape"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("firecrawl_config.yaml"),
            format!("enabled: true\nbase_url: {}\n", server.uri()),
        )
        .unwrap();

        let (status, body) = send(&dir, scrape_request(json!({ "url": "https://a.b" }))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
    }
}
