use super::item_path;
use crate::core::client::BaseClient;
use crate::core::request::NO_PARAMS;
use crate::core::transport::Transport;
use crate::domain::model::{ConfigSection, MessageResponse, SecretValue, TenantSecret};
use crate::domain::ports::{ApiService, TokenAware};
use crate::utils::error::Result;
use crate::utils::validation::validate_path_segment;
use std::sync::Arc;

const BASE: &str = "/api/tenants";

/// 租戶設定（依區段、可選環境）、密鑰與基礎設施狀態
#[derive(Debug, Clone)]
pub struct TenantService {
    client: BaseClient,
}

impl TenantService {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            client: BaseClient::new(transport),
        }
    }

    pub fn client(&self) -> &BaseClient {
        &self.client
    }

    pub async fn get_config(
        &self,
        tenant_id: &str,
        section: ConfigSection,
        environment: Option<&str>,
    ) -> Result<serde_json::Value> {
        let path = config_path(tenant_id, section, environment)?;
        self.client.get(&path, NO_PARAMS).await
    }

    pub async fn update_config(
        &self,
        tenant_id: &str,
        section: ConfigSection,
        environment: Option<&str>,
        config: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let path = config_path(tenant_id, section, environment)?;
        tracing::info!("⚙️ Updating {} config for tenant {}", section.as_path(), tenant_id);
        self.client.put(&path, config).await
    }

    /// Secret names and metadata only; values are never returned.
    pub async fn list_secrets(&self, tenant_id: &str) -> Result<Vec<TenantSecret>> {
        let path = format!("{}/secrets", item_path(BASE, "tenant_id", tenant_id)?);
        self.client.get(&path, NO_PARAMS).await
    }

    pub async fn set_secret(
        &self,
        tenant_id: &str,
        name: &str,
        secret: &SecretValue,
    ) -> Result<MessageResponse> {
        let path = secret_path(tenant_id, name)?;
        self.client.put(&path, secret).await
    }

    pub async fn delete_secret(&self, tenant_id: &str, name: &str) -> Result<()> {
        let path = secret_path(tenant_id, name)?;
        self.client
            .delete::<serde_json::Value>(&path)
            .await
            .map(drop)
    }

    pub async fn get_infrastructure_status(&self, tenant_id: &str) -> Result<serde_json::Value> {
        let path = format!(
            "{}/infrastructure/status",
            item_path(BASE, "tenant_id", tenant_id)?
        );
        self.client.get(&path, NO_PARAMS).await
    }
}

fn config_path(
    tenant_id: &str,
    section: ConfigSection,
    environment: Option<&str>,
) -> Result<String> {
    let path = format!(
        "{}/config/{}",
        item_path(BASE, "tenant_id", tenant_id)?,
        section.as_path()
    );
    match environment {
        Some(environment) => {
            validate_path_segment("environment", environment)?;
            Ok(format!("{}/{}", path, environment))
        }
        None => Ok(path),
    }
}

fn secret_path(tenant_id: &str, name: &str) -> Result<String> {
    let secrets = format!("{}/secrets", item_path(BASE, "tenant_id", tenant_id)?);
    item_path(&secrets, "secret_name", name)
}

impl ApiService for TenantService {
    fn service_name(&self) -> &'static str {
        "tenants"
    }

    fn token_aware(&self) -> Option<&dyn TokenAware> {
        Some(&self.client)
    }
}
