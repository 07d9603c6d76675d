use super::item_path;
use crate::core::client::BaseClient;
use crate::core::request::NO_PARAMS;
use crate::core::transport::Transport;
use crate::domain::model::{
    Extraction, ExtractionCreate, ExtractionQuery, ExtractionUpdate, ReviewRequest,
    ReviewResponse,
};
use crate::domain::ports::{ApiService, TokenAware};
use crate::utils::error::Result;
use std::sync::Arc;

const BASE: &str = "/api/extractions";

#[derive(Debug, Clone)]
pub struct ExtractionService {
    client: BaseClient,
}

impl ExtractionService {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            client: BaseClient::new(transport),
        }
    }

    pub fn client(&self) -> &BaseClient {
        &self.client
    }

    pub async fn list_extractions(&self, query: &ExtractionQuery) -> Result<Vec<Extraction>> {
        self.client.get(BASE, query).await
    }

    pub async fn get_extraction(&self, extraction_id: &str) -> Result<Extraction> {
        let path = item_path(BASE, "extraction_id", extraction_id)?;
        self.client.get(&path, NO_PARAMS).await
    }

    pub async fn create_extraction(&self, request: &ExtractionCreate) -> Result<Extraction> {
        self.client.post(BASE, request).await
    }

    pub async fn update_extraction(
        &self,
        extraction_id: &str,
        update: &ExtractionUpdate,
    ) -> Result<Extraction> {
        let path = item_path(BASE, "extraction_id", extraction_id)?;
        self.client.put(&path, update).await
    }

    pub async fn delete_extraction(&self, extraction_id: &str) -> Result<()> {
        let path = item_path(BASE, "extraction_id", extraction_id)?;
        self.client
            .delete::<serde_json::Value>(&path)
            .await
            .map(drop)
    }

    /// Moves an extraction through the review workflow and returns the new review state.
    pub async fn start_review(
        &self,
        extraction_id: &str,
        review: &ReviewRequest,
    ) -> Result<ReviewResponse> {
        let path = format!("{}/review", item_path(BASE, "extraction_id", extraction_id)?);
        tracing::info!("📝 Review {:?} on extraction {}", review.action, extraction_id);
        self.client.post(&path, review).await
    }
}

impl ApiService for ExtractionService {
    fn service_name(&self) -> &'static str {
        "extractions"
    }

    fn token_aware(&self) -> Option<&dyn TokenAware> {
        Some(&self.client)
    }
}
