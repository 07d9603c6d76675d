use crate::app::services::{
    AuthService, CategoryService, DocumentService, ExtractionService, HealthService,
    JobService, LanguageService, TemplateService, TenantService,
};
use crate::core::transport::Transport;
use crate::domain::ports::ApiService;
use crate::utils::error::{ApiError, Result};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

struct Entry {
    service: Arc<dyn ApiService>,
    any: Arc<dyn Any + Send + Sync>,
}

/// 以名稱查找服務實例，並負責把 token 廣播給所有服務
#[derive(Default)]
pub struct ServiceRegistry {
    entries: RwLock<HashMap<String, Entry>>,
    auth_token: RwLock<Option<String>>,
    tenant_id: RwLock<Option<String>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds all nine console services over one transport and registers them.
    pub fn with_default_services(transport: Arc<Transport>) -> Self {
        let registry = Self::new();
        registry.register("auth", Arc::new(AuthService::new(Arc::clone(&transport))));
        registry.register(
            "documents",
            Arc::new(DocumentService::new(Arc::clone(&transport))),
        );
        registry.register(
            "templates",
            Arc::new(TemplateService::new(Arc::clone(&transport))),
        );
        registry.register(
            "extractions",
            Arc::new(ExtractionService::new(Arc::clone(&transport))),
        );
        registry.register("tenants", Arc::new(TenantService::new(Arc::clone(&transport))));
        registry.register(
            "language",
            Arc::new(LanguageService::new(Arc::clone(&transport))),
        );
        registry.register(
            "categories",
            Arc::new(CategoryService::new(Arc::clone(&transport))),
        );
        registry.register("jobs", Arc::new(JobService::new(Arc::clone(&transport))));
        registry.register("health", Arc::new(HealthService::new(transport)));

        tracing::info!("📦 Service registry ready: {}", registry.names().join(", "));
        registry
    }

    /// Inserts or replaces the service under `name`.
    pub fn register<S: ApiService>(&self, name: impl Into<String>, service: Arc<S>) {
        let name = name.into();
        let entry = Entry {
            service: service.clone(),
            any: service,
        };
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.insert(name.clone(), entry).is_some() {
            tracing::debug!("📦 Replaced service '{}'", name);
        }
    }

    pub fn get<S: ApiService>(&self, name: &str) -> Result<Arc<S>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        let Some(entry) = entries.get(name) else {
            let mut names: Vec<&str> = entries.keys().map(String::as_str).collect();
            names.sort_unstable();
            return Err(ApiError::configuration(format!(
                "Service '{}' not found. Available services: {}",
                name,
                names.join(", ")
            )));
        };

        Arc::clone(&entry.any).downcast::<S>().map_err(|_| {
            ApiError::configuration(format!(
                "Service '{}' is a {}, not the requested type",
                name,
                entry.service.service_name()
            ))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Pushes `token` to every service that accepts one and returns how many did.
    pub async fn set_auth_token(&self, token: Option<String>) -> usize {
        *self.auth_token.write().unwrap_or_else(PoisonError::into_inner) = token.clone();

        // 先複製一份清單，避免 await 時還握著鎖
        let services: Vec<(String, Arc<dyn ApiService>)> = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries
                .iter()
                .map(|(name, entry)| (name.clone(), Arc::clone(&entry.service)))
                .collect()
        };

        let mut updated = 0;
        for (name, service) in &services {
            match service.token_aware() {
                Some(aware) => {
                    aware.set_auth_token(token.clone()).await;
                    updated += 1;
                }
                None => tracing::debug!("🔑 Service '{}' does not take a token", name),
            }
        }

        tracing::info!(
            "🔑 Auth token {} for {}/{} services",
            if token.is_some() { "set" } else { "cleared" },
            updated,
            services.len()
        );
        updated
    }

    pub fn current_auth_token(&self) -> Option<String> {
        self.auth_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_tenant_id(&self, tenant_id: Option<String>) {
        *self.tenant_id.write().unwrap_or_else(PoisonError::into_inner) = tenant_id;
    }

    pub fn current_tenant_id(&self) -> Option<String> {
        self.tenant_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.names())
            .field("tenant_id", &self.current_tenant_id())
            .finish_non_exhaustive()
    }
}
