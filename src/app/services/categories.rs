use super::item_path;
use crate::core::client::BaseClient;
use crate::core::request::NO_PARAMS;
use crate::core::transport::Transport;
use crate::domain::model::{Category, CategoryInput};
use crate::domain::ports::{ApiService, TokenAware};
use crate::utils::error::Result;
use std::sync::Arc;

const BASE: &str = "/api/categories";

#[derive(Debug, Clone)]
pub struct CategoryService {
    client: BaseClient,
}

impl CategoryService {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            client: BaseClient::new(transport),
        }
    }

    pub fn client(&self) -> &BaseClient {
        &self.client
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.client.get(BASE, NO_PARAMS).await
    }

    pub async fn get_category(&self, category_id: &str) -> Result<Category> {
        let path = item_path(BASE, "category_id", category_id)?;
        self.client.get(&path, NO_PARAMS).await
    }

    pub async fn create_category(&self, category: &CategoryInput) -> Result<Category> {
        self.client.post(BASE, category).await
    }

    pub async fn update_category(
        &self,
        category_id: &str,
        category: &CategoryInput,
    ) -> Result<Category> {
        let path = item_path(BASE, "category_id", category_id)?;
        self.client.put(&path, category).await
    }

    pub async fn delete_category(&self, category_id: &str) -> Result<()> {
        let path = item_path(BASE, "category_id", category_id)?;
        self.client
            .delete::<serde_json::Value>(&path)
            .await
            .map(drop)
    }
}

impl ApiService for CategoryService {
    fn service_name(&self) -> &'static str {
        "categories"
    }

    fn token_aware(&self) -> Option<&dyn TokenAware> {
        Some(&self.client)
    }
}
