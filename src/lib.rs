//! Typed client for the document extraction console API.
//!
//! A single [`Transport`] is built from configuration and shared by every
//! domain service through [`BaseClient`]. Failures come back as [`ApiError`],
//! classified once by the transport.

pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::{TomlConfig, TransportConfig};

pub use app::services::{
    AuthService, CategoryService, DocumentService, ExtractionService, HealthService,
    JobService, LanguageService, TemplateService, TenantService,
};
pub use core::request::{abort_pair, AbortHandle, AbortSignal, RequestConfig};
pub use core::{BaseClient, Envelope, ServiceRegistry, SessionEvent, Transport};
pub use utils::error::{AbsentAsNone, ApiError, ErrorKind, ErrorSeverity, Result};
