pub mod client;
pub mod interceptor;
pub mod registry;
pub mod request;
pub mod transport;

pub use crate::domain::ports::{ApiService, ConfigProvider, TokenAware};
pub use crate::utils::error::Result;
pub use client::BaseClient;
pub use registry::ServiceRegistry;
pub use transport::{Envelope, SessionEvent, Transport};
