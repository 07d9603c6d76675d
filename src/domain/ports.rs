use async_trait::async_trait;
use std::any::Any;

/// Where the transport settings come from (CLI flags, TOML file, code).
pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn timeout_seconds(&self) -> u64;
    fn with_credentials(&self) -> bool;
    fn default_headers(&self) -> Vec<(String, String)>;

    fn auth_token(&self) -> Option<&str> {
        None
    }

    fn tenant_id(&self) -> Option<&str> {
        None
    }
}

/// Anything that can be kept in the service registry.
pub trait ApiService: Any + Send + Sync {
    fn service_name(&self) -> &'static str;

    /// 只有能接收 token 的服務需要覆寫
    fn token_aware(&self) -> Option<&dyn TokenAware> {
        None
    }
}

#[async_trait]
pub trait TokenAware: Send + Sync {
    async fn set_auth_token(&self, token: Option<String>);
}
