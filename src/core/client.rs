use crate::core::interceptor::install_defaults;
use crate::core::request::{AbortSignal, MultipartForm, RequestConfig};
use crate::core::transport::{Envelope, InstallOutcome, SharedToken, Transport};
use crate::domain::ports::TokenAware;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Typed HTTP calls over a shared [`Transport`].
///
/// Every domain service wraps one of these. Clones share the transport and
/// the token slot.
#[derive(Clone)]
pub struct BaseClient {
    transport: Arc<Transport>,
    token: SharedToken,
}

impl BaseClient {
    /// Uses the transport's token slot, so a token set through any client
    /// built this way is seen by all of them.
    pub fn new(transport: Arc<Transport>) -> Self {
        let token = transport.shared_token();
        Self::with_token_source(transport, token)
    }

    /// A client with its own token slot.
    pub fn isolated(transport: Arc<Transport>) -> Self {
        Self::with_token_source(transport, Arc::new(tokio::sync::RwLock::new(None)))
    }

    pub fn with_token_source(transport: Arc<Transport>, token: SharedToken) -> Self {
        if transport.install_interceptors(install_defaults) == InstallOutcome::Installed {
            tracing::debug!("🔗 Default interceptors installed");
        }
        Self { transport, token }
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    pub async fn set_auth_token(&self, token: Option<String>) {
        let token = token.filter(|t| !t.trim().is_empty());
        *self.token.write().await = token;
    }

    pub async fn auth_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Dispatches and hands back the settled envelope untouched.
    pub async fn send(&self, config: RequestConfig) -> Result<Envelope> {
        let token = self.auth_token().await;
        self.transport.dispatch(config, token).await
    }

    /// Dispatches and decodes the payload. An absent envelope becomes its error again.
    pub async fn request<T: DeserializeOwned>(&self, config: RequestConfig) -> Result<T> {
        match self.send(config).await? {
            Envelope::Data(response) => response.json(),
            Envelope::Absent(error) => Err(error),
        }
    }

    pub async fn get<T, Q>(&self, path: &str, params: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.request(RequestConfig::get(path).query(params)?).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(RequestConfig::post(path).json(body)?).await
    }

    pub async fn post_with_abort<T, B>(
        &self,
        path: &str,
        body: &B,
        abort: Option<AbortSignal>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(RequestConfig::post(path).json(body)?.abort(abort))
            .await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(RequestConfig::put(path).json(body)?).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(RequestConfig::patch(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(RequestConfig::delete(path)).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: MultipartForm,
    ) -> Result<T> {
        self.request(RequestConfig::post(path).multipart(form)).await
    }
}

#[async_trait]
impl TokenAware for BaseClient {
    async fn set_auth_token(&self, token: Option<String>) {
        BaseClient::set_auth_token(self, token).await;
    }
}

impl std::fmt::Debug for BaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseClient")
            .field("base_url", &self.transport.base_url().as_str())
            .finish_non_exhaustive()
    }
}
