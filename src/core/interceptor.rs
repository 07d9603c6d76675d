use crate::core::request::{Method, RequestBody, RequestMetadata};
use crate::utils::error::{ApiError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A request after URL resolution, as seen by request interceptors.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
    /// Token of the issuing client, read when the call started.
    pub auth_token: Option<String>,
    pub metadata: Option<RequestMetadata>,
}

impl OutgoingRequest {
    pub fn request_id(&self) -> Option<String> {
        self.metadata.as_ref().map(|m| m.request_id.clone())
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub request_id: Option<String>,
    pub response_time_ms: Option<i64>,
}

impl ApiResponse {
    /// 空的 body（例如 204）當作 JSON null 解析，讓 `()` 也能解
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let bytes: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
        serde_json::from_slice(bytes).map_err(|e| {
            ApiError::generic(format!("Failed to decode response body: {}", e))
                .with_status(self.status)
                .with_request_id(self.request_id.clone())
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn on_request(&self, request: &mut OutgoingRequest) -> Result<()>;
}

#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn on_response(&self, request: &OutgoingRequest, response: &mut ApiResponse);

    /// Observes an already classified failure.
    async fn on_error(&self, _request: &OutgoingRequest, _error: &ApiError) {}
}

#[derive(Clone, Default)]
pub struct InterceptorChain {
    request: Vec<Arc<dyn RequestInterceptor>>,
    response: Vec<Arc<dyn ResponseInterceptor>>,
}

impl InterceptorChain {
    pub fn add_request(&mut self, interceptor: Arc<dyn RequestInterceptor>) {
        tracing::debug!("🔗 Registered request interceptor: {}", interceptor.name());
        self.request.push(interceptor);
    }

    pub fn add_response(&mut self, interceptor: Arc<dyn ResponseInterceptor>) {
        tracing::debug!("🔗 Registered response interceptor: {}", interceptor.name());
        self.response.push(interceptor);
    }

    pub fn request_interceptors(&self) -> &[Arc<dyn RequestInterceptor>] {
        &self.request
    }

    pub fn response_interceptors(&self) -> &[Arc<dyn ResponseInterceptor>] {
        &self.response
    }

    pub fn counts(&self) -> (usize, usize) {
        (self.request.len(), self.response.len())
    }

    pub fn is_empty(&self) -> bool {
        self.request.is_empty() && self.response.is_empty()
    }

    pub fn clear(&mut self) {
        self.request.clear();
        self.response.clear();
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field(
                "request",
                &self.request.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .field(
                "response",
                &self.response.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Sets `Authorization: Bearer <token>` when the request carries a token.
pub fn attach_bearer(request: &mut OutgoingRequest) -> Result<()> {
    if let Some(token) = request.auth_token.as_deref().filter(|t| !t.is_empty()) {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::generic("Auth token contains characters not allowed in a header"))?;
        request.headers.insert(AUTHORIZATION, value);
    }
    Ok(())
}

/// 請求端攔截器：附加 bearer token 與請求診斷資訊
#[derive(Debug, Default)]
pub struct RequestStamp;

#[async_trait]
impl RequestInterceptor for RequestStamp {
    fn name(&self) -> &'static str {
        "request-stamp"
    }

    async fn on_request(&self, request: &mut OutgoingRequest) -> Result<()> {
        attach_bearer(request)?;

        let metadata = RequestMetadata::generate();
        if let Ok(value) = HeaderValue::from_str(&metadata.request_id) {
            request
                .headers
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        tracing::debug!(
            request_id = %metadata.request_id,
            "📡 {} {}",
            request.method,
            request.url
        );
        request.metadata = Some(metadata);
        Ok(())
    }
}

/// 回應端攔截器：記錄耗時並回填 request id
#[derive(Debug, Default)]
pub struct ResponseTiming;

#[async_trait]
impl ResponseInterceptor for ResponseTiming {
    fn name(&self) -> &'static str {
        "response-timing"
    }

    async fn on_response(&self, request: &OutgoingRequest, response: &mut ApiResponse) {
        if let Some(metadata) = &request.metadata {
            response.response_time_ms = Some(metadata.elapsed_ms());
            response.request_id = Some(metadata.request_id.clone());
        }
        tracing::debug!(
            "✅ {} {} -> {} ({} ms)",
            request.method,
            request.url.path(),
            response.status,
            response.response_time_ms.unwrap_or_default()
        );
    }

    async fn on_error(&self, request: &OutgoingRequest, error: &ApiError) {
        let elapsed = request.metadata.as_ref().map(|m| m.elapsed_ms());
        tracing::warn!(
            kind = ?error.kind(),
            status = ?error.status_code(),
            elapsed_ms = ?elapsed,
            "❌ {} {} failed: {}",
            request.method,
            request.url.path(),
            error
        );
    }
}

/// The default chain: one request interceptor, one response interceptor.
pub fn install_defaults(chain: &mut InterceptorChain) -> Result<()> {
    chain.add_request(Arc::new(RequestStamp));
    chain.add_response(Arc::new(ResponseTiming));
    Ok(())
}
