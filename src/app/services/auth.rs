use super::item_path;
use crate::core::client::BaseClient;
use crate::core::request::NO_PARAMS;
use crate::core::transport::Transport;
use crate::domain::model::{
    LoginRequest, SwitchTenantRequest, Tenant, TenantInput, TokenResponse, User, UserCreate,
    UserPermissions, UserUpdate,
};
use crate::domain::ports::{ApiService, TokenAware};
use crate::utils::error::{AbsentAsNone, Result};
use serde_json::json;
use std::sync::Arc;

const BASE: &str = "/api/auth";

/// Session, tenant switching and user/tenant administration.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: BaseClient,
}

impl AuthService {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            client: BaseClient::new(transport),
        }
    }

    pub fn client(&self) -> &BaseClient {
        &self.client
    }

    pub async fn login(&self, credentials: &LoginRequest) -> Result<TokenResponse> {
        tracing::info!("🔐 Logging in as {}", credentials.email);
        self.client
            .post(&format!("{}/login", BASE), credentials)
            .await
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        self.client
            .post(
                &format!("{}/refresh", BASE),
                &json!({ "refresh_token": refresh_token }),
            )
            .await
    }

    pub async fn logout(&self) -> Result<()> {
        self.client
            .post::<serde_json::Value, _>(&format!("{}/logout", BASE), &json!({}))
            .await
            .map(drop)
    }

    /// `None` when nobody is logged in.
    pub async fn get_current_user(&self) -> Result<Option<User>> {
        self.client
            .get::<User, _>(&format!("{}/me", BASE), NO_PARAMS)
            .await
            .absent_as_none()
    }

    /// `None` when there is no session or no active tenant.
    pub async fn get_current_tenant(&self) -> Result<Option<Tenant>> {
        self.client
            .get::<Tenant, _>(&format!("{}/tenant", BASE), NO_PARAMS)
            .await
            .absent_as_none()
    }

    pub async fn switch_tenant(&self, tenant_id: &str) -> Result<TokenResponse> {
        self.client
            .post(
                &format!("{}/switch-tenant", BASE),
                &SwitchTenantRequest {
                    tenant_id: tenant_id.to_string(),
                },
            )
            .await
    }

    pub async fn get_permissions(&self) -> Result<UserPermissions> {
        self.client
            .get(&format!("{}/permissions", BASE), NO_PARAMS)
            .await
    }

    pub async fn list_tenants(&self) -> Result<Vec<Tenant>> {
        self.client
            .get(&format!("{}/tenants", BASE), NO_PARAMS)
            .await
    }

    pub async fn create_tenant(&self, tenant: &TenantInput) -> Result<Tenant> {
        self.client.post(&format!("{}/tenants", BASE), tenant).await
    }

    pub async fn update_tenant(&self, tenant_id: &str, tenant: &TenantInput) -> Result<Tenant> {
        let path = item_path(&format!("{}/tenants", BASE), "tenant_id", tenant_id)?;
        self.client.put(&path, tenant).await
    }

    pub async fn delete_tenant(&self, tenant_id: &str) -> Result<()> {
        let path = item_path(&format!("{}/tenants", BASE), "tenant_id", tenant_id)?;
        self.client
            .delete::<serde_json::Value>(&path)
            .await
            .map(drop)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.client
            .get(&format!("{}/users", BASE), NO_PARAMS)
            .await
    }

    pub async fn create_user(&self, user: &UserCreate) -> Result<User> {
        self.client.post(&format!("{}/users", BASE), user).await
    }

    pub async fn update_user(&self, user_id: &str, user: &UserUpdate) -> Result<User> {
        let path = item_path(&format!("{}/users", BASE), "user_id", user_id)?;
        self.client.put(&path, user).await
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<()> {
        let path = item_path(&format!("{}/users", BASE), "user_id", user_id)?;
        self.client
            .delete::<serde_json::Value>(&path)
            .await
            .map(drop)
    }
}

impl ApiService for AuthService {
    fn service_name(&self) -> &'static str {
        "auth"
    }

    fn token_aware(&self) -> Option<&dyn TokenAware> {
        Some(&self.client)
    }
}
