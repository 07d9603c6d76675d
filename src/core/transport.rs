use crate::config::TransportConfig;
use crate::core::interceptor::{attach_bearer, ApiResponse, InterceptorChain, OutgoingRequest};
use crate::core::request::{RequestBody, RequestConfig};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{classify, ApiError, ErrorKind, RawFailure, Result};
use crate::utils::validation::Validate;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use url::Url;

/// Token slot shared by every client built over the same transport.
pub type SharedToken = Arc<tokio::sync::RwLock<Option<String>>>;

const SESSION_EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A request came back 401; the session is no longer valid.
    Logout {
        request_id: Option<String>,
        status_code: Option<u16>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    AlreadyInstalled,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InstallState {
    Pending,
    Installed,
    Degraded,
}

/// Settled result of a call that did not reject.
#[derive(Debug, Clone)]
pub enum Envelope {
    Data(ApiResponse),
    /// Authentication/NotFound: no data, the classified error rides along.
    Absent(ApiError),
}

impl Envelope {
    pub fn data(&self) -> Option<&ApiResponse> {
        match self {
            Envelope::Data(response) => Some(response),
            Envelope::Absent(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Envelope::Data(_) => None,
            Envelope::Absent(error) => Some(error),
        }
    }
}

/// 所有服務共用的 HTTP 傳輸層
pub struct Transport {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    with_credentials: bool,
    chain: RwLock<InterceptorChain>,
    install_state: Mutex<InstallState>,
    token: SharedToken,
    session_tx: broadcast::Sender<SessionEvent>,
}

impl Transport {
    pub fn new(config: TransportConfig) -> Result<Self> {
        config.validate()?;

        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| ApiError::configuration(format!("Invalid base URL: {}", e)))?;
        let timeout = Duration::from_secs(config.timeout_seconds);

        let mut default_headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let (name, value) = parse_header(name, value).map_err(|e| {
                ApiError::configuration(format!("Invalid default header '{}': {}", name, e))
            })?;
            default_headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .cookie_store(config.with_credentials)
            .build()
            .map_err(|e| {
                ApiError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        let (session_tx, _) = broadcast::channel(SESSION_EVENT_CAPACITY);

        tracing::info!(
            "🚀 Transport ready: {} (timeout {}s, credentials {})",
            base_url,
            config.timeout_seconds,
            config.with_credentials
        );

        Ok(Self {
            client,
            base_url,
            timeout,
            with_credentials: config.with_credentials,
            chain: RwLock::new(InterceptorChain::default()),
            install_state: Mutex::new(InstallState::Pending),
            token: Arc::new(tokio::sync::RwLock::new(None)),
            session_tx,
        })
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        Self::new(TransportConfig::from_provider(config))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn with_credentials(&self) -> bool {
        self.with_credentials
    }

    pub fn shared_token(&self) -> SharedToken {
        Arc::clone(&self.token)
    }

    pub fn subscribe_session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.session_tx.subscribe()
    }

    /// Runs `install` at most once for this transport.
    ///
    /// The closure fills a staged chain which only replaces the live one on
    /// success. A failing closure leaves the chain empty and the transport in
    /// degraded mode: requests still go out, without metadata.
    pub fn install_interceptors<F>(&self, install: F) -> InstallOutcome
    where
        F: FnOnce(&mut InterceptorChain) -> Result<()>,
    {
        let mut state = self
            .install_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match *state {
            InstallState::Installed => return InstallOutcome::AlreadyInstalled,
            InstallState::Degraded => return InstallOutcome::Degraded,
            InstallState::Pending => {}
        }

        let mut staged = InterceptorChain::default();
        let installed = install(&mut staged).and_then(|()| {
            let mut chain = self
                .chain
                .write()
                .map_err(|_| ApiError::generic("Interceptor chain lock poisoned"))?;
            *chain = staged;
            Ok(())
        });

        match installed {
            Ok(()) => {
                *state = InstallState::Installed;
                InstallOutcome::Installed
            }
            Err(e) => {
                tracing::warn!(
                    "🔶 Interceptor installation failed, continuing without metadata: {}",
                    e
                );
                *state = InstallState::Degraded;
                InstallOutcome::Degraded
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        let state = self
            .install_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *state == InstallState::Degraded
    }

    /// (request interceptors, response interceptors)
    pub fn interceptor_counts(&self) -> (usize, usize) {
        self.chain_snapshot().counts()
    }

    fn chain_snapshot(&self) -> InterceptorChain {
        self.chain
            .read()
            .map(|chain| chain.clone())
            .unwrap_or_default()
    }

    pub fn resolve_url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path)
                .map_err(|e| ApiError::generic(format!("Invalid request URL '{}': {}", path, e)));
        }

        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| ApiError::generic(format!("Invalid request URL '{}': {}", joined, e)))
    }

    /// Sends one request through the interceptor chain.
    ///
    /// `Ok(Envelope::Data)` on 2xx, `Ok(Envelope::Absent)` for Authentication and
    /// NotFound, `Err` for every other classified failure.
    pub async fn dispatch(
        &self,
        config: RequestConfig,
        auth_token: Option<String>,
    ) -> Result<Envelope> {
        let RequestConfig {
            method,
            path,
            query,
            headers,
            body,
            abort,
        } = config;

        let mut url = self.resolve_url(&path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }

        let mut header_map = HeaderMap::new();
        for (name, value) in &headers {
            let (name, value) = parse_header(name, value)
                .map_err(|e| ApiError::generic(format!("Invalid header '{}': {}", name, e)))?;
            header_map.append(name, value);
        }

        let mut request = OutgoingRequest {
            method,
            url,
            headers: header_map,
            body,
            auth_token,
            metadata: None,
        };

        let chain = self.chain_snapshot();
        for interceptor in chain.request_interceptors() {
            interceptor.on_request(&mut request).await?;
        }
        if self.is_degraded() {
            attach_bearer(&mut request)?;
        }

        let builder = self.build_request(&mut request)?;

        let sent = match abort {
            Some(mut signal) => {
                if signal.is_aborted() {
                    return self.settle(self.cancelled(&request), &request, &chain).await;
                }
                tokio::select! {
                    _ = signal.aborted() => {
                        tracing::info!("🛑 {} {} cancelled", request.method, request.url.path());
                        return self.settle(self.cancelled(&request), &request, &chain).await;
                    }
                    result = builder.send() => result,
                }
            }
            None => builder.send().await,
        };

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("📡 Transport error for {}: {}", request.url, e);
                let error =
                    classify(&RawFailure::from_reqwest(&e)).with_request_id(request.request_id());
                return self.settle(error, &request, &chain).await;
            }
        };

        let status = response.status();
        let response_headers = response.headers().clone();
        let body = response.bytes().await;

        if status.is_success() {
            let bytes = match body {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!("📡 Failed to read body from {}: {}", request.url, e);
                    let error = ApiError::fallback(Some(status.as_u16()))
                        .with_request_id(request.request_id());
                    return self.settle(error, &request, &chain).await;
                }
            };

            let mut api_response = ApiResponse {
                status: status.as_u16(),
                headers: response_headers,
                body: bytes.to_vec(),
                request_id: request.request_id(),
                response_time_ms: None,
            };
            for interceptor in chain.response_interceptors() {
                interceptor.on_response(&request, &mut api_response).await;
            }
            return Ok(Envelope::Data(api_response));
        }

        let error = match body {
            Ok(bytes) => classify(&RawFailure::with_response(
                status.as_u16(),
                parse_error_body(&bytes),
            )),
            Err(_) => ApiError::fallback(Some(status.as_u16())),
        }
        .with_request_id(request.request_id());

        self.settle(error, &request, &chain).await
    }

    fn build_request(&self, request: &mut OutgoingRequest) -> Result<reqwest::RequestBuilder> {
        let builder = self
            .client
            .request(request.method.as_reqwest(), request.url.clone())
            .headers(request.headers.clone());

        let builder = match std::mem::take(&mut request.body) {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(form.into_reqwest()?),
        };
        Ok(builder)
    }

    fn cancelled(&self, request: &OutgoingRequest) -> ApiError {
        ApiError::cancelled().with_request_id(request.request_id())
    }

    async fn settle(
        &self,
        error: ApiError,
        request: &OutgoingRequest,
        chain: &InterceptorChain,
    ) -> Result<Envelope> {
        if chain.response_interceptors().is_empty() {
            tracing::warn!(
                "❌ {} {} failed: {} ({:?})",
                request.method,
                request.url.path(),
                error,
                error.kind()
            );
        }
        for interceptor in chain.response_interceptors() {
            interceptor.on_error(request, &error).await;
        }

        if error.kind() == ErrorKind::Authentication {
            // 沒有訂閱者時 send 會失敗，忽略即可
            let _ = self.session_tx.send(SessionEvent::Logout {
                request_id: error.request_id().map(str::to_string),
                status_code: error.status_code(),
            });
        }

        if error.is_absent() {
            Ok(Envelope::Absent(error))
        } else {
            Err(error)
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("with_credentials", &self.with_credentials)
            .field("chain", &self.chain_snapshot())
            .finish_non_exhaustive()
    }
}

fn parse_header(name: &str, value: &str) -> std::result::Result<(HeaderName, HeaderValue), String> {
    let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|e| e.to_string())?;
    let value = HeaderValue::from_str(value).map_err(|e| e.to_string())?;
    Ok((name, value))
}

fn parse_error_body(bytes: &[u8]) -> Option<serde_json::Value> {
    if bytes.is_empty() {
        return None;
    }
    serde_json::from_slice(bytes)
        .ok()
        .or_else(|| Some(serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interceptor::install_defaults;

    fn transport(base_url: &str) -> Transport {
        Transport::new(TransportConfig::new(base_url)).unwrap()
    }

    #[test]
    fn test_resolve_url_keeps_base_path() {
        let transport = transport("http://localhost:8000/console/");
        let url = transport.resolve_url("/api/auth/me").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/console/api/auth/me");

        let url = transport.resolve_url("https://other.example.com/x").unwrap();
        assert_eq!(url.host_str(), Some("other.example.com"));
    }

    #[test]
    fn test_install_runs_once() {
        let transport = transport("http://localhost:8000");
        let mut calls = 0;

        let first = transport.install_interceptors(|chain| {
            calls += 1;
            install_defaults(chain)
        });
        let second = transport.install_interceptors(|chain| {
            calls += 1;
            install_defaults(chain)
        });

        assert_eq!(first, InstallOutcome::Installed);
        assert_eq!(second, InstallOutcome::AlreadyInstalled);
        assert_eq!(calls, 1);
        assert_eq!(transport.interceptor_counts(), (1, 1));
    }

    #[test]
    fn test_failed_install_degrades() {
        let transport = transport("http://localhost:8000");

        let outcome = transport.install_interceptors(|chain| {
            install_defaults(chain)?;
            Err(ApiError::generic("registration rejected"))
        });

        assert_eq!(outcome, InstallOutcome::Degraded);
        assert!(transport.is_degraded());
        assert_eq!(transport.interceptor_counts(), (0, 0));
        assert_eq!(
            transport.install_interceptors(install_defaults),
            InstallOutcome::Degraded
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = Transport::new(TransportConfig::new("not a url")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = Transport::new(TransportConfig::new("http://localhost").header("bad header", "x"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_parse_error_body() {
        assert_eq!(parse_error_body(b""), None);
        assert_eq!(
            parse_error_body(br#"{"detail":"nope"}"#).unwrap()["detail"],
            "nope"
        );
        assert_eq!(
            parse_error_body(b"Bad Gateway"),
            Some(serde_json::Value::String("Bad Gateway".to_string()))
        );
    }
}
