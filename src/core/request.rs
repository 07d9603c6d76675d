use crate::utils::error::{ApiError, Result};
use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_reqwest(&self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_reqwest().as_str())
    }
}

/// 請求診斷資訊，只在單次呼叫期間存在
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMetadata {
    pub request_id: String,
    pub issued_at_ms: i64,
}

impl RequestMetadata {
    pub fn generate() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            issued_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn elapsed_ms(&self) -> i64 {
        (chrono::Utc::now().timestamp_millis() - self.issued_at_ms).max(0)
    }
}

#[derive(Debug, Clone)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        bytes: Vec<u8>,
        content_type: Option<String>,
    },
}

/// Multipart body kept as plain data; `reqwest::multipart::Form` is built at send time.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        bytes: Vec<u8>,
        content_type: Option<String>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            filename: filename.into(),
            bytes,
            content_type,
        });
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub fn into_reqwest(self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for part in self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File {
                    name,
                    filename,
                    bytes,
                    content_type,
                } => {
                    let mut file_part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
                    if let Some(mime) = content_type {
                        file_part = file_part.mime_str(&mime).map_err(|e| {
                            ApiError::validation(format!("Invalid content type '{}': {}", mime, e))
                        })?;
                    }
                    form.part(name, file_part)
                }
            };
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartForm),
}

/// Fires an [`AbortSignal`]. Dropping the handle does not abort.
#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx }, AbortSignal { rx })
}

impl AbortHandle {
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once aborted. Pends forever if the handle is dropped unfired.
    pub async fn aborted(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Input of [`BaseClient::request`](crate::core::client::BaseClient::request).
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    pub abort: Option<AbortSignal>,
}

impl RequestConfig {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            abort: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query<Q: Serialize + ?Sized>(mut self, params: &Q) -> Result<Self> {
        self.query.extend(query_pairs(params)?);
        Ok(self)
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(|e| {
            ApiError::generic(format!("Failed to serialize request body: {}", e))
        })?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn abort(mut self, signal: Option<AbortSignal>) -> Self {
        self.abort = signal;
        self
    }
}

/// Flattens a serializable value into query pairs.
///
/// Accepts a struct/map (null fields skipped, arrays repeat the key), a list of
/// `(key, value)` tuples, or unit/`None` for no parameters.
pub fn query_pairs<Q: Serialize + ?Sized>(params: &Q) -> Result<Vec<(String, String)>> {
    let value = serde_json::to_value(params)
        .map_err(|e| ApiError::generic(format!("Failed to serialize query parameters: {}", e)))?;

    let mut pairs = Vec::new();
    match value {
        serde_json::Value::Null => {}
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                push_pair(&mut pairs, key, value);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                match item {
                    serde_json::Value::Array(mut pair) if pair.len() == 2 => {
                        let value = pair.pop().unwrap_or(serde_json::Value::Null);
                        let key = match pair.pop() {
                            Some(serde_json::Value::String(key)) => key,
                            Some(other) => scalar_to_string(&other),
                            None => continue,
                        };
                        push_pair(&mut pairs, key, value);
                    }
                    other => {
                        return Err(ApiError::generic(format!(
                            "Query parameters must be key/value pairs, got {}",
                            other
                        )))
                    }
                }
            }
        }
        other => {
            return Err(ApiError::generic(format!(
                "Query parameters must be a map or key/value pairs, got {}",
                other
            )))
        }
    }
    Ok(pairs)
}

fn push_pair(pairs: &mut Vec<(String, String)>, key: String, value: serde_json::Value) {
    match value {
        serde_json::Value::Null => {}
        serde_json::Value::Array(values) => {
            for value in values.iter().filter(|v| !v.is_null()) {
                pairs.push((key.clone(), scalar_to_string(value)));
            }
        }
        other => pairs.push((key, scalar_to_string(&other))),
    }
}

fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub const NO_PARAMS: &[(&str, &str)] = &[];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Query {
        page: u32,
        search: Option<String>,
        status: Vec<&'static str>,
    }

    #[test]
    fn test_query_pairs_from_struct() {
        let pairs = query_pairs(&Query {
            page: 2,
            search: None,
            status: vec!["processed", "failed"],
        })
        .unwrap();

        assert!(pairs.contains(&("page".to_string(), "2".to_string())));
        assert!(pairs.contains(&("status".to_string(), "processed".to_string())));
        assert!(pairs.contains(&("status".to_string(), "failed".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "search"));
    }

    #[test]
    fn test_query_pairs_from_tuples_and_unit() {
        let pairs = query_pairs(&[("tenant_id", "t-1"), ("limit", "10")]).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("tenant_id".to_string(), "t-1".to_string()),
                ("limit".to_string(), "10".to_string())
            ]
        );

        assert!(query_pairs(&()).unwrap().is_empty());
        assert!(query_pairs(NO_PARAMS).unwrap().is_empty());
        assert!(query_pairs(&json!(42)).is_err());
    }

    #[test]
    fn test_request_config_builder() {
        let config = RequestConfig::post("/api/extractions/e-1/review")
            .json(&json!({"action": "approve"}))
            .unwrap()
            .header("X-Trace", "abc");

        assert_eq!(config.method, Method::Post);
        assert_eq!(config.headers, vec![("X-Trace".to_string(), "abc".to_string())]);
        assert!(matches!(config.body, RequestBody::Json(ref v) if v["action"] == "approve"));
    }

    #[test]
    fn test_metadata_is_unique_per_call() {
        let a = RequestMetadata::generate();
        let b = RequestMetadata::generate();
        assert_ne!(a.request_id, b.request_id);
        assert!(a.elapsed_ms() >= 0);
    }

    #[tokio::test]
    async fn test_abort_signal() {
        let (handle, mut signal) = abort_pair();
        assert!(!signal.is_aborted());

        let waiter = tokio::spawn(async move {
            signal.aborted().await;
            true
        });
        handle.abort();

        assert!(waiter.await.unwrap());
        assert!(handle.signal().is_aborted());
    }

    #[test]
    fn test_multipart_parts() {
        let form = MultipartForm::new()
            .text("category_id", "c-1")
            .file("file", "invoice.pdf", vec![1, 2, 3], Some("application/pdf".to_string()));

        assert_eq!(form.parts().len(), 2);
        assert!(form.into_reqwest().is_ok());
    }
}
