use super::item_path;
use crate::core::client::BaseClient;
use crate::core::request::NO_PARAMS;
use crate::core::transport::Transport;
use crate::domain::model::HealthStatus;
use crate::domain::ports::{ApiService, TokenAware};
use crate::utils::error::Result;
use std::sync::Arc;

const BASE: &str = "/api/health";

#[derive(Debug, Clone)]
pub struct HealthService {
    client: BaseClient,
}

impl HealthService {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            client: BaseClient::new(transport),
        }
    }

    pub fn client(&self) -> &BaseClient {
        &self.client
    }

    pub async fn check(&self) -> Result<HealthStatus> {
        self.client.get(&format!("{}/", BASE), NO_PARAMS).await
    }

    pub async fn detailed(&self) -> Result<HealthStatus> {
        self.client
            .get(&format!("{}/detailed", BASE), NO_PARAMS)
            .await
    }

    pub async fn llm_status(&self) -> Result<serde_json::Value> {
        self.client
            .get(&format!("{}/llm/status", BASE), NO_PARAMS)
            .await
    }

    pub async fn llm_provider(&self, provider: &str) -> Result<serde_json::Value> {
        let path = item_path(&format!("{}/llm", BASE), "provider", provider)?;
        self.client.get(&path, NO_PARAMS).await
    }

    pub async fn rate_limits(&self) -> Result<serde_json::Value> {
        self.client
            .get(&format!("{}/rate-limits", BASE), NO_PARAMS)
            .await
    }

    pub async fn tenant_rate_limits(&self, tenant_id: &str) -> Result<serde_json::Value> {
        let path = item_path(&format!("{}/rate-limits", BASE), "tenant_id", tenant_id)?;
        self.client.get(&path, NO_PARAMS).await
    }
}

impl ApiService for HealthService {
    fn service_name(&self) -> &'static str {
        "health"
    }

    fn token_aware(&self) -> Option<&dyn TokenAware> {
        Some(&self.client)
    }
}
