use anyhow::Result;
use docex_client::domain::model::{
    ConfigSection, DocumentQuery, DocumentUpload, GenerateFieldsFromPrompt, ReviewAction,
    ReviewRequest, ReviewResponse, ReviewStatus,
};
use docex_client::{
    abort_pair, AuthService, DocumentService, ErrorKind, ExtractionService, ServiceRegistry,
    TemplateService, TenantService, Transport, TransportConfig,
};
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn transport_for(server: &MockServer) -> Result<Arc<Transport>> {
    let config = TransportConfig::new(server.base_url()).timeout_seconds(10);
    Ok(Arc::new(Transport::new(config)?))
}

/// 未登入時 /me 回 401，應得到 None 而不是錯誤
#[tokio::test]
async fn test_current_user_is_none_when_unauthenticated() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/auth/me");
            then.status(401).json_body(json!({"detail": "Not authenticated"}));
        })
        .await;

    let auth = AuthService::new(transport_for(&server)?);
    let user = assert_ok!(auth.get_current_user().await);

    assert!(user.is_none());
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_current_user_is_returned_when_logged_in() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/auth/me")
                .header("authorization", "Bearer abc123");
            then.status(200).json_body(json!({
                "id": "u-1",
                "email": "reviewer@example.com",
                "full_name": "Review Er"
            }));
        })
        .await;

    let auth = AuthService::new(transport_for(&server)?);
    auth.client().set_auth_token(Some("abc123".to_string())).await;

    let user = assert_ok!(auth.get_current_user().await).expect("user");
    assert_eq!(user.email, "reviewer@example.com");
    Ok(())
}

#[tokio::test]
async fn test_document_content_is_none_when_missing() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/documents/doc-404/content");
            then.status(404).json_body(json!({"detail": "Document not found"}));
        })
        .await;

    let documents = DocumentService::new(transport_for(&server)?);
    let content = assert_ok!(documents.get_document_content("doc-404").await);

    assert!(content.is_none());
    Ok(())
}

#[tokio::test]
async fn test_forbidden_is_rejected_with_authorization_kind() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/documents/doc-1/content");
            then.status(403)
                .json_body(json!({"detail": "Insufficient permissions"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/templates");
            then.status(403).json_body(json!({}));
        })
        .await;

    let transport = transport_for(&server)?;
    let documents = DocumentService::new(Arc::clone(&transport));
    let templates = TemplateService::new(transport);

    // 403 不屬於「資源不存在」，即使是會回傳 None 的方法也要丟出錯誤
    let err = assert_err!(documents.get_document_content("doc-1").await);
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(err.status_code(), Some(403));
    assert_eq!(err.message(), "Insufficient permissions");

    let err = assert_err!(templates.list_templates().await);
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(err.status_code(), Some(403));
    assert_eq!(err.message(), "Access forbidden");
    Ok(())
}

#[tokio::test]
async fn test_review_submission_returns_response_unchanged() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/extractions/ext-1/review")
                .json_body(json!({"action": "approve", "comments": "Looks good!"}));
            then.status(200).json_body(json!({
                "extraction_id": "ext-1",
                "review_status": "approved",
                "review_comments": "Looks good!",
                "reviewed_by": "u-1",
                "reviewed_at": "2024-05-01T10:00:00Z",
                "updated_at": "2024-05-01T10:00:00Z"
            }));
        })
        .await;

    let extractions = ExtractionService::new(transport_for(&server)?);
    let review = ReviewRequest::new(ReviewAction::Approve).with_comments("Looks good!");
    let response: ReviewResponse = assert_ok!(extractions.start_review("ext-1", &review).await);

    assert_eq!(response.extraction_id, "ext-1");
    assert_eq!(response.review_status, ReviewStatus::Approved);
    assert_eq!(response.review_comments.as_deref(), Some("Looks good!"));
    assert_eq!(response.reviewed_by.as_deref(), Some("u-1"));
    assert!(response.reviewed_at.is_some());
    mock.assert_async().await;
    Ok(())
}

/// 後端回傳不帶時區的時間與未知的審核狀態，仍要原樣保留
#[tokio::test]
async fn test_review_keeps_unknown_status_and_naive_timestamps() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/extractions/ext-2/review");
            then.status(200).json_body(json!({
                "extraction_id": "ext-2",
                "review_status": "escalated",
                "review_comments": "Needs a second look",
                "updated_at": "2024-05-01T10:00:00.123456"
            }));
        })
        .await;

    let extractions = ExtractionService::new(transport_for(&server)?);
    let review = ReviewRequest::new(ReviewAction::StartReview);
    let response = assert_ok!(extractions.start_review("ext-2", &review).await);

    assert_eq!(
        response.review_status,
        ReviewStatus::Other("escalated".to_string())
    );
    let updated_at = response.updated_at.expect("updated_at");
    assert_eq!(updated_at.to_rfc3339(), "2024-05-01T10:00:00.123456+00:00");
    assert!(response.reviewed_at.is_none());

    let echoed = serde_json::to_value(&response)?;
    assert_eq!(echoed["review_status"], "escalated");
    assert_eq!(echoed["review_comments"], "Needs a second look");
    Ok(())
}

#[tokio::test]
async fn test_current_tenant_is_none_without_session_or_tenant() -> Result<()> {
    let unauthenticated = MockServer::start_async().await;
    unauthenticated
        .mock_async(|when, then| {
            when.method(GET).path("/api/auth/tenant");
            then.status(401).json_body(json!({"detail": "Not authenticated"}));
        })
        .await;
    let auth = AuthService::new(transport_for(&unauthenticated)?);
    assert!(assert_ok!(auth.get_current_tenant().await).is_none());

    let no_tenant = MockServer::start_async().await;
    no_tenant
        .mock_async(|when, then| {
            when.method(GET).path("/api/auth/tenant");
            then.status(404).json_body(json!({"detail": "No active tenant"}));
        })
        .await;
    let auth = AuthService::new(transport_for(&no_tenant)?);
    assert!(assert_ok!(auth.get_current_tenant().await).is_none());

    let forbidden = MockServer::start_async().await;
    forbidden
        .mock_async(|when, then| {
            when.method(GET).path("/api/auth/tenant");
            then.status(403).json_body(json!({"detail": "Tenant suspended"}));
        })
        .await;
    let auth = AuthService::new(transport_for(&forbidden)?);
    let err = assert_err!(auth.get_current_tenant().await);
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(err.status_code(), Some(403));
    assert_eq!(err.message(), "Tenant suspended");
    Ok(())
}

#[tokio::test]
async fn test_current_tenant_is_returned() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/auth/tenant");
            then.status(200).json_body(json!({
                "id": "t-1",
                "name": "Acme",
                "slug": "acme",
                "created_at": "2024-01-15T08:30:00"
            }));
        })
        .await;

    let auth = AuthService::new(transport_for(&server)?);
    let tenant = assert_ok!(auth.get_current_tenant().await).expect("tenant");
    assert_eq!(tenant.id, "t-1");
    assert_eq!(tenant.slug.as_deref(), Some("acme"));
    assert!(tenant.created_at.is_some());
    Ok(())
}

#[tokio::test]
async fn test_document_list_sends_query_params() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/documents")
                .query_param("page", "2")
                .query_param("per_page", "10");
            then.status(200).json_body(json!({
                "items": [{"id": "doc-1", "filename": "invoice.pdf"}],
                "total": 11,
                "page": 2,
                "per_page": 10,
                "total_pages": 2
            }));
        })
        .await;

    let documents = DocumentService::new(transport_for(&server)?);
    let page = assert_ok!(
        documents
            .get_documents(&DocumentQuery {
                page: Some(2),
                per_page: Some(10),
                ..Default::default()
            })
            .await
    );

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].filename.as_deref(), Some("invoice.pdf"));
    assert_eq!(page.total, 11);
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_upload_sends_multipart_form() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/documents/upload")
                .body_contains("name=\"file\"")
                .body_contains("invoice.pdf")
                .body_contains("name=\"category_id\"")
                .body_contains("cat-7")
                .body_contains("\"source\":\"scanner\"");
            then.status(201).json_body(json!({
                "id": "doc-9",
                "filename": "invoice.pdf",
                "status": "uploaded",
                "category_id": "cat-7"
            }));
        })
        .await;

    let documents = DocumentService::new(transport_for(&server)?);
    let document = assert_ok!(
        documents
            .upload_document(DocumentUpload {
                filename: "invoice.pdf".to_string(),
                bytes: b"%PDF-1.4 test document".to_vec(),
                content_type: Some("application/pdf".to_string()),
                category_id: Some("cat-7".to_string()),
                metadata: Some(json!({"source": "scanner"})),
            })
            .await
    );

    assert_eq!(document.id, "doc-9");
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_tenant_config_uses_section_and_environment() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/tenants/t-1/config/llm/production");
            then.status(200)
                .json_body(json!({"provider": "openai", "model": "gpt-4o"}));
        })
        .await;

    let tenants = TenantService::new(transport_for(&server)?);
    let config = assert_ok!(
        tenants
            .get_config("t-1", ConfigSection::Llm, Some("production"))
            .await
    );

    assert_eq!(config["provider"], "openai");
    mock.assert_async().await;

    let err = assert_err!(
        tenants
            .get_config("t-1", ConfigSection::Llm, Some("../secrets"))
            .await
    );
    assert_eq!(err.kind(), ErrorKind::Validation);
    Ok(())
}

#[tokio::test]
async fn test_field_generation_can_be_aborted() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/templates/generate-fields-from-prompt");
            then.status(200)
                .delay(Duration::from_secs(5))
                .json_body(json!({"fields": []}));
        })
        .await;

    let templates = TemplateService::new(transport_for(&server)?);
    let (handle, signal) = abort_pair();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();
    });

    let request = GenerateFieldsFromPrompt {
        prompt: "Invoice number, total and due date".to_string(),
        document_type: Some("invoice".to_string()),
        language: None,
    };
    let err = assert_err!(
        templates
            .generate_fields_from_prompt(&request, Some(signal))
            .await
    );

    assert!(err.is_cancelled());
    assert_eq!(err.kind(), ErrorKind::Generic);
    assert_eq!(err.message(), "Request cancelled");
    Ok(())
}

#[tokio::test]
async fn test_registry_token_reaches_next_request() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/documents/doc-1")
                .header("authorization", "Bearer fresh-token")
                .header_exists("x-request-id");
            then.status(200)
                .json_body(json!({"id": "doc-1", "filename": "contract.pdf"}));
        })
        .await;

    let transport = transport_for(&server)?;
    let registry = ServiceRegistry::with_default_services(Arc::clone(&transport));

    let updated = registry.set_auth_token(Some("fresh-token".to_string())).await;
    assert_eq!(updated, 9);

    let documents = registry.get::<DocumentService>("documents")?;
    let document = assert_ok!(documents.get_document("doc-1").await);

    assert_eq!(document.filename.as_deref(), Some("contract.pdf"));
    assert_eq!(transport.interceptor_counts(), (1, 1));
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_registry_lookup_failure_is_immediate() -> Result<()> {
    let server = MockServer::start_async().await;
    let registry = ServiceRegistry::with_default_services(transport_for(&server)?);

    let err = assert_err!(registry.get::<AuthService>("nonexistent"));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    for name in registry.names() {
        assert!(err.message().contains(&name), "missing {} in {}", name, err);
    }

    // 名稱存在但型別不符
    let err = assert_err!(registry.get::<AuthService>("documents"));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    Ok(())
}
