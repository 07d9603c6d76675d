//! One service per console area. Each method maps to exactly one backend
//! endpoint; shaping the request is all they do.

pub mod auth;
pub mod categories;
pub mod documents;
pub mod extractions;
pub mod health;
pub mod jobs;
pub mod language;
pub mod templates;
pub mod tenants;

pub use auth::AuthService;
pub use categories::CategoryService;
pub use documents::DocumentService;
pub use extractions::ExtractionService;
pub use health::HealthService;
pub use jobs::JobService;
pub use language::LanguageService;
pub use templates::TemplateService;
pub use tenants::TenantService;

use crate::utils::error::Result;
use crate::utils::validation::validate_path_segment;

/// Joins `base` and an id after checking the id cannot escape its path segment.
pub(crate) fn item_path(base: &str, field_name: &str, id: &str) -> Result<String> {
    validate_path_segment(field_name, id)?;
    Ok(format!("{}/{}", base, id))
}
