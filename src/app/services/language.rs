use super::item_path;
use crate::core::client::BaseClient;
use crate::core::request::NO_PARAMS;
use crate::core::transport::Transport;
use crate::domain::model::{
    LanguageDetectRequest, LanguageDetection, LanguageValidateRequest, LanguageValidation,
    SupportedLanguage, TenantLanguageConfig,
};
use crate::domain::ports::{ApiService, TokenAware};
use crate::utils::error::Result;
use crate::utils::validation::validate_non_empty_string;
use std::sync::Arc;

const BASE: &str = "/api/language";

#[derive(Debug, Clone)]
pub struct LanguageService {
    client: BaseClient,
}

impl LanguageService {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            client: BaseClient::new(transport),
        }
    }

    pub fn client(&self) -> &BaseClient {
        &self.client
    }

    pub async fn detect_language(&self, text: &str) -> Result<LanguageDetection> {
        validate_non_empty_string("text", text)?;
        self.client
            .post(
                &format!("{}/detect", BASE),
                &LanguageDetectRequest {
                    text: text.to_string(),
                },
            )
            .await
    }

    pub async fn get_supported_languages(&self) -> Result<Vec<SupportedLanguage>> {
        self.client
            .get(&format!("{}/supported", BASE), NO_PARAMS)
            .await
    }

    pub async fn get_tenant_config(&self, tenant_id: &str) -> Result<TenantLanguageConfig> {
        let path = format!(
            "{}/config",
            item_path(&format!("{}/tenant", BASE), "tenant_id", tenant_id)?
        );
        self.client.get(&path, NO_PARAMS).await
    }

    pub async fn update_tenant_config(
        &self,
        tenant_id: &str,
        config: &TenantLanguageConfig,
    ) -> Result<TenantLanguageConfig> {
        let path = format!(
            "{}/config",
            item_path(&format!("{}/tenant", BASE), "tenant_id", tenant_id)?
        );
        self.client.put(&path, config).await
    }

    pub async fn validate_language(
        &self,
        request: &LanguageValidateRequest,
    ) -> Result<LanguageValidation> {
        self.client
            .post(&format!("{}/validate", BASE), request)
            .await
    }
}

impl ApiService for LanguageService {
    fn service_name(&self) -> &'static str {
        "language"
    }

    fn token_aware(&self) -> Option<&dyn TokenAware> {
        Some(&self.client)
    }
}
