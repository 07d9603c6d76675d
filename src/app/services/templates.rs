use super::item_path;
use crate::core::client::BaseClient;
use crate::core::request::{AbortSignal, NO_PARAMS};
use crate::core::transport::Transport;
use crate::domain::model::{
    GenerateFieldsFromDocument, GenerateFieldsFromPrompt, GeneratedFields, Template,
    TemplateInput, TemplateTestRequest,
};
use crate::domain::ports::{ApiService, TokenAware};
use crate::utils::error::Result;
use crate::utils::validation::validate_non_empty_string;
use std::sync::Arc;

const BASE: &str = "/api/templates";

#[derive(Debug, Clone)]
pub struct TemplateService {
    client: BaseClient,
}

impl TemplateService {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            client: BaseClient::new(transport),
        }
    }

    pub fn client(&self) -> &BaseClient {
        &self.client
    }

    pub async fn list_templates(&self) -> Result<Vec<Template>> {
        self.client.get(BASE, NO_PARAMS).await
    }

    pub async fn get_template(&self, template_id: &str) -> Result<Template> {
        let path = item_path(BASE, "template_id", template_id)?;
        self.client.get(&path, NO_PARAMS).await
    }

    pub async fn create_template(&self, template: &TemplateInput) -> Result<Template> {
        self.client.post(BASE, template).await
    }

    pub async fn update_template(
        &self,
        template_id: &str,
        template: &TemplateInput,
    ) -> Result<Template> {
        let path = item_path(BASE, "template_id", template_id)?;
        self.client.put(&path, template).await
    }

    pub async fn delete_template(&self, template_id: &str) -> Result<()> {
        let path = item_path(BASE, "template_id", template_id)?;
        self.client
            .delete::<serde_json::Value>(&path)
            .await
            .map(drop)
    }

    /// Runs the template against one document; the result shape is backend-defined.
    pub async fn test_template(
        &self,
        template_id: &str,
        request: &TemplateTestRequest,
    ) -> Result<serde_json::Value> {
        let path = format!("{}/test", item_path(BASE, "template_id", template_id)?);
        self.client.post(&path, request).await
    }

    /// LLM field suggestion. Can take a while, so the caller may abort it.
    pub async fn generate_fields_from_prompt(
        &self,
        request: &GenerateFieldsFromPrompt,
        abort: Option<AbortSignal>,
    ) -> Result<GeneratedFields> {
        validate_non_empty_string("prompt", &request.prompt)?;
        self.client
            .post_with_abort(
                &format!("{}/generate-fields-from-prompt", BASE),
                request,
                abort,
            )
            .await
    }

    pub async fn generate_fields_from_document(
        &self,
        request: &GenerateFieldsFromDocument,
        abort: Option<AbortSignal>,
    ) -> Result<GeneratedFields> {
        validate_non_empty_string("document_id", &request.document_id)?;
        self.client
            .post_with_abort(
                &format!("{}/generate-fields-from-document", BASE),
                request,
                abort,
            )
            .await
    }
}

impl ApiService for TemplateService {
    fn service_name(&self) -> &'static str {
        "templates"
    }

    fn token_aware(&self) -> Option<&dyn TokenAware> {
        Some(&self.client)
    }
}
