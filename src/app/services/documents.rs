use super::item_path;
use crate::core::client::BaseClient;
use crate::core::request::{MultipartForm, NO_PARAMS};
use crate::core::transport::Transport;
use crate::domain::model::{
    BulkDocumentDelete, BulkDocumentUpdate, BulkOperationResult, Document, DocumentContent,
    DocumentQuery, DocumentUpdate, DocumentUpload, Page,
};
use crate::domain::ports::{ApiService, TokenAware};
use crate::utils::error::{AbsentAsNone, ApiError, Result};
use crate::utils::validation::validate_non_empty_string;
use std::sync::Arc;

const BASE: &str = "/api/documents";

#[derive(Debug, Clone)]
pub struct DocumentService {
    client: BaseClient,
}

impl DocumentService {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            client: BaseClient::new(transport),
        }
    }

    pub fn client(&self) -> &BaseClient {
        &self.client
    }

    /// Multipart upload: `file`, plus `category_id` and `metadata` (JSON text) when set.
    pub async fn upload_document(&self, upload: DocumentUpload) -> Result<Document> {
        validate_non_empty_string("filename", &upload.filename)?;
        tracing::info!(
            "📤 Uploading {} ({} bytes)",
            upload.filename,
            upload.bytes.len()
        );

        let mut form = MultipartForm::new().file(
            "file",
            upload.filename,
            upload.bytes,
            upload.content_type,
        );
        if let Some(category_id) = upload.category_id {
            form = form.text("category_id", category_id);
        }
        if let Some(metadata) = upload.metadata {
            let metadata = serde_json::to_string(&metadata).map_err(|e| {
                ApiError::validation(format!("Invalid document metadata: {}", e))
            })?;
            form = form.text("metadata", metadata);
        }

        self.client
            .post_multipart(&format!("{}/upload", BASE), form)
            .await
    }

    pub async fn get_documents(&self, query: &DocumentQuery) -> Result<Page<Document>> {
        self.client.get(BASE, query).await
    }

    pub async fn get_document(&self, document_id: &str) -> Result<Document> {
        let path = item_path(BASE, "document_id", document_id)?;
        self.client.get(&path, NO_PARAMS).await
    }

    /// `None` when the document or its extracted content does not exist.
    pub async fn get_document_content(&self, document_id: &str) -> Result<Option<DocumentContent>> {
        let path = format!("{}/content", item_path(BASE, "document_id", document_id)?);
        self.client
            .get::<DocumentContent, _>(&path, NO_PARAMS)
            .await
            .absent_as_none()
    }

    pub async fn get_document_preview(&self, document_id: &str) -> Result<serde_json::Value> {
        let path = item_path(&format!("{}/preview", BASE), "document_id", document_id)?;
        self.client.get(&path, NO_PARAMS).await
    }

    pub async fn get_document_tracking(&self, document_id: &str) -> Result<serde_json::Value> {
        let path = format!("{}/tracking", item_path(BASE, "document_id", document_id)?);
        self.client.get(&path, NO_PARAMS).await
    }

    pub async fn update_document(
        &self,
        document_id: &str,
        update: &DocumentUpdate,
    ) -> Result<Document> {
        let path = item_path(BASE, "document_id", document_id)?;
        self.client.put(&path, update).await
    }

    pub async fn delete_document(&self, document_id: &str) -> Result<()> {
        let path = item_path(BASE, "document_id", document_id)?;
        self.client
            .delete::<serde_json::Value>(&path)
            .await
            .map(drop)
    }

    pub async fn bulk_update(&self, request: &BulkDocumentUpdate) -> Result<BulkOperationResult> {
        self.client
            .post(&format!("{}/bulk-update", BASE), request)
            .await
    }

    pub async fn bulk_delete(&self, document_ids: Vec<String>) -> Result<BulkOperationResult> {
        self.client
            .post(
                &format!("{}/bulk-delete", BASE),
                &BulkDocumentDelete { document_ids },
            )
            .await
    }
}

impl ApiService for DocumentService {
    fn service_name(&self) -> &'static str {
        "documents"
    }

    fn token_aware(&self) -> Option<&dyn TokenAware> {
        Some(&self.client)
    }
}
