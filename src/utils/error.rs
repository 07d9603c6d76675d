use serde::Serialize;
use thiserror::Error;

/// 錯誤分類，由 HTTP 狀態碼決定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    Network,
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Conflict,
    RateLimit,
    Server,
    Generic,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

pub const NETWORK_ERROR_MESSAGE: &str = "Network error - please check your connection";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";
pub const FALLBACK_ERROR_MESSAGE: &str = "Request failed";
pub const CANCELLED_MESSAGE: &str = "Request cancelled";

/// A classified failure. Built once per failed call and handed to the caller as is.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status_code: Option<u16>,
    payload: Option<serde_json::Value>,
    request_id: Option<String>,
    cancelled: bool,
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Raw transport failure before classification.
#[derive(Debug, Clone, Default)]
pub struct RawFailure {
    pub request_sent: bool,
    pub response: Option<RawResponse>,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Option<serde_json::Value>,
}

impl RawFailure {
    pub fn with_response(status: u16, body: Option<serde_json::Value>) -> Self {
        Self {
            request_sent: true,
            response: Some(RawResponse { status, body }),
            message: None,
        }
    }

    pub fn no_response(message: impl Into<String>) -> Self {
        Self {
            request_sent: true,
            response: None,
            message: Some(message.into()),
        }
    }

    pub fn not_sent(message: Option<String>) -> Self {
        Self {
            request_sent: false,
            response: None,
            message,
        }
    }

    /// reqwest 的 builder 錯誤代表請求根本沒有送出；其餘錯誤都視為送出後沒有回應
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_builder() {
            Self::not_sent(Some(err.to_string()))
        } else {
            Self::no_response(err.to_string())
        }
    }
}

/// Maps a raw transport failure onto the taxonomy. Never fails.
pub fn classify(raw: &RawFailure) -> ApiError {
    if let Some(response) = &raw.response {
        return classify_status(response.status, response.body.as_ref());
    }

    if raw.request_sent {
        return ApiError::new(ErrorKind::Network, NETWORK_ERROR_MESSAGE);
    }

    let message = raw
        .message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(UNEXPECTED_ERROR_MESSAGE);
    ApiError::new(ErrorKind::Generic, message)
}

fn classify_status(status: u16, body: Option<&serde_json::Value>) -> ApiError {
    let (kind, default_message) = match status {
        401 => (ErrorKind::Authentication, "Authentication failed".to_string()),
        403 => (ErrorKind::Authorization, "Access forbidden".to_string()),
        404 => (ErrorKind::NotFound, "Resource not found".to_string()),
        400 | 422 => (ErrorKind::Validation, "Validation failed".to_string()),
        409 => (ErrorKind::Conflict, "Resource conflict".to_string()),
        429 => (ErrorKind::RateLimit, "Rate limit exceeded".to_string()),
        500 => (ErrorKind::Server, "Internal server error".to_string()),
        502..=504 => (ErrorKind::Server, "Server error".to_string()),
        other => (
            ErrorKind::Generic,
            format!("Request failed with status {}", other),
        ),
    };

    let message = body
        .and_then(body_message)
        .unwrap_or(default_message);

    let error = ApiError::new(kind, message).with_status(status);
    match body {
        Some(body) => error.with_payload(body.clone()),
        None => error,
    }
}

/// 後端錯誤訊息可能放在 message、detail 或 error 欄位
fn body_message(body: &serde_json::Value) -> Option<String> {
    // 純文字 body 只在看起來像訊息時採用（排除 proxy 回傳的 HTML 頁面）
    if let serde_json::Value::String(text) = body {
        let trimmed = text.trim();
        let looks_like_message =
            !trimmed.is_empty() && !trimmed.starts_with('<') && trimmed.len() <= 200;
        return looks_like_message.then(|| trimmed.to_string());
    }

    ["message", "detail", "error"]
        .iter()
        .filter_map(|key| body.get(key))
        .filter_map(|value| value.as_str())
        .find(|text| !text.trim().is_empty())
        .map(str::to_string)
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            payload: None,
            request_id: None,
            cancelled: false,
        }
    }

    /// Used when the failed response cannot even be read.
    pub fn fallback(status: Option<u16>) -> Self {
        Self {
            status_code: status,
            ..Self::new(ErrorKind::Generic, FALLBACK_ERROR_MESSAGE)
        }
    }

    pub fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Self::new(ErrorKind::Generic, CANCELLED_MESSAGE)
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generic, message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.payload.as_ref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// "Not logged in yet" and "not there" are the kinds callers may treat as absence.
    pub fn is_absent(&self) -> bool {
        matches!(self.kind, ErrorKind::Authentication | ErrorKind::NotFound)
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.kind {
            ErrorKind::NotFound | ErrorKind::Conflict => ErrorSeverity::Low,
            ErrorKind::Network | ErrorKind::RateLimit | ErrorKind::Server => ErrorSeverity::Medium,
            ErrorKind::Authentication
            | ErrorKind::Authorization
            | ErrorKind::Validation
            | ErrorKind::Generic => ErrorSeverity::High,
            ErrorKind::Configuration => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => NETWORK_ERROR_MESSAGE.to_string(),
            ErrorKind::Authentication => format!("Please sign in again ({})", self.message),
            ErrorKind::Authorization => format!("Access denied: {}", self.message),
            ErrorKind::RateLimit => "Too many requests, slow down and try again".to_string(),
            _ => match self.status_code {
                Some(status) => format!("{} (HTTP {})", self.message, status),
                None => self.message.clone(),
            },
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.kind {
            ErrorKind::Network => "Check the API base URL and your network connection",
            ErrorKind::Authentication => "Log in again or pass a fresh --token",
            ErrorKind::Authorization => "Ask a tenant administrator for the required permission",
            ErrorKind::Validation => "Check the request fields against the API documentation",
            ErrorKind::NotFound => "Verify the resource id and the active tenant",
            ErrorKind::Conflict => "Reload the resource and apply the change again",
            ErrorKind::RateLimit => "Wait a moment before sending more requests",
            ErrorKind::Server => "The backend is unhealthy; check `docex health --detailed`",
            ErrorKind::Generic => "Re-run with --verbose for request details",
            ErrorKind::Configuration => "Fix the configuration file or command line flags",
        }
    }
}

/// Per-call opt-in for treating Authentication/NotFound as "no value".
pub trait AbsentAsNone<T> {
    fn absent_as_none(self) -> Result<Option<T>>;
}

impl<T> AbsentAsNone<T> for Result<T> {
    fn absent_as_none(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_absent() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::generic(format!("Serialization error: {}", err))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::configuration(format!("IO error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_codes_map_to_kinds() {
        let cases = [
            (400, ErrorKind::Validation),
            (401, ErrorKind::Authentication),
            (403, ErrorKind::Authorization),
            (404, ErrorKind::NotFound),
            (409, ErrorKind::Conflict),
            (422, ErrorKind::Validation),
            (429, ErrorKind::RateLimit),
            (500, ErrorKind::Server),
            (502, ErrorKind::Server),
            (503, ErrorKind::Server),
            (504, ErrorKind::Server),
        ];

        for (status, expected) in cases {
            let err = classify(&RawFailure::with_response(status, None));
            assert_eq!(err.kind(), expected, "status {}", status);
            assert_eq!(err.status_code(), Some(status));
        }
    }

    #[test]
    fn test_default_messages() {
        let message = |status| classify(&RawFailure::with_response(status, None)).to_string();

        assert_eq!(message(401), "Authentication failed");
        assert_eq!(message(403), "Access forbidden");
        assert_eq!(message(404), "Resource not found");
        assert_eq!(message(422), "Validation failed");
        assert_eq!(message(409), "Resource conflict");
        assert_eq!(message(429), "Rate limit exceeded");
        assert_eq!(message(500), "Internal server error");
        assert_eq!(message(503), "Server error");
        assert_eq!(message(418), "Request failed with status 418");
    }

    #[test]
    fn test_body_message_and_detail_win() {
        let err = classify(&RawFailure::with_response(
            422,
            Some(json!({"message": "title is required"})),
        ));
        assert_eq!(err.message(), "title is required");
        assert_eq!(err.payload().unwrap()["message"], "title is required");

        let err = classify(&RawFailure::with_response(
            401,
            Some(json!({"detail": "Token expired"})),
        ));
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(err.message(), "Token expired");

        // FastAPI 的驗證錯誤 detail 是陣列，退回預設訊息
        let err = classify(&RawFailure::with_response(
            422,
            Some(json!({"detail": [{"loc": ["body", "name"], "msg": "field required"}]})),
        ));
        assert_eq!(err.message(), "Validation failed");

        let err = classify(&RawFailure::with_response(418, Some(json!({"error": "teapot"}))));
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.message(), "teapot");

        let err = classify(&RawFailure::with_response(
            409,
            Some(json!("Category name already exists")),
        ));
        assert_eq!(err.message(), "Category name already exists");

        let err = classify(&RawFailure::with_response(
            502,
            Some(json!("<html><body>Bad Gateway</body></html>")),
        ));
        assert_eq!(err.message(), "Server error");
    }

    #[test]
    fn test_request_without_response_is_network() {
        let raw = RawFailure {
            request_sent: true,
            response: None,
            message: Some("connection refused".to_string()),
        };
        let err = classify(&raw);
        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(err.message(), NETWORK_ERROR_MESSAGE);
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_neither_request_nor_response_is_generic() {
        let err = classify(&RawFailure::not_sent(Some("builder error: bad url".to_string())));
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.message(), "builder error: bad url");

        let err = classify(&RawFailure::not_sent(None));
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.message(), UNEXPECTED_ERROR_MESSAGE);

        let err = classify(&RawFailure::default());
        assert_eq!(err.message(), UNEXPECTED_ERROR_MESSAGE);
    }

    #[test]
    fn test_fallback_keeps_status() {
        let err = ApiError::fallback(Some(502));
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.message(), FALLBACK_ERROR_MESSAGE);
        assert_eq!(err.status_code(), Some(502));
    }

    #[test]
    fn test_absent_as_none() {
        let not_found: Result<u32> = Err(classify(&RawFailure::with_response(404, None)));
        assert!(matches!(not_found.absent_as_none(), Ok(None)));

        let unauthenticated: Result<u32> = Err(classify(&RawFailure::with_response(401, None)));
        assert!(matches!(unauthenticated.absent_as_none(), Ok(None)));

        let forbidden: Result<u32> = Err(classify(&RawFailure::with_response(403, None)));
        let err = forbidden.absent_as_none().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let ok: Result<u32> = Ok(7);
        assert_eq!(ok.absent_as_none().unwrap(), Some(7));
    }

    #[test]
    fn test_severity_and_suggestions() {
        assert_eq!(ApiError::configuration("x").severity(), ErrorSeverity::Critical);
        assert_eq!(
            classify(&RawFailure::no_response("timeout")).severity(),
            ErrorSeverity::Medium
        );
        assert!(ApiError::cancelled().is_cancelled());
        assert!(!ApiError::configuration("x").recovery_suggestion().is_empty());
    }
}
