use clap::Parser;
use docex_client::domain::model::{DocumentQuery, LoginRequest, ReviewRequest};
use docex_client::domain::ports::ConfigProvider;
use docex_client::utils::error::ErrorSeverity;
use docex_client::utils::{logger, validation::Validate};
use docex_client::{
    ApiError, AuthService, CliConfig, Command, DocumentService, ExtractionService, HealthService,
    ServiceRegistry, SessionEvent, TomlConfig, Transport,
};
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let file_config = match &cli.config {
        Some(path) => TomlConfig::from_file(path),
        None => Ok(TomlConfig::default()),
    };
    let config = file_config.map(|file| cli.overlay(file));

    // 初始化日誌
    let level = config.as_ref().ok().and_then(|c| c.log_level());
    if cli.json_logs {
        logger::init_json_logger(level);
    } else {
        logger::init_cli_logger(cli.verbose, level);
    }

    let outcome = match config {
        Ok(config) => run(&cli, &config).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "❌ {} (kind: {:?}, status: {:?}, request: {:?})",
                e,
                e.kind(),
                e.status_code(),
                e.request_id()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 4,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: &CliConfig, config: &TomlConfig) -> Result<serde_json::Value, ApiError> {
    config.validate()?;
    tracing::debug!("CLI config: {:?}", config.transport_config());

    let transport = Arc::new(Transport::from_config(config)?);
    let mut session_events = transport.subscribe_session_events();

    let registry = ServiceRegistry::with_default_services(Arc::clone(&transport));
    registry
        .set_auth_token(config.auth_token().map(str::to_string))
        .await;
    registry.set_tenant_id(config.tenant_id().map(str::to_string));

    let output = execute(&cli.command, &registry).await;

    while let Ok(SessionEvent::Logout { request_id, .. }) = session_events.try_recv() {
        tracing::warn!(
            "🔒 Session rejected by the server (request {})",
            request_id.as_deref().unwrap_or("-")
        );
    }

    output
}

async fn execute(
    command: &Command,
    registry: &ServiceRegistry,
) -> Result<serde_json::Value, ApiError> {
    match command {
        Command::Health { detailed } => {
            let health = registry.get::<HealthService>("health")?;
            let status = if *detailed {
                health.detailed().await?
            } else {
                health.check().await?
            };
            if !status.is_healthy() {
                tracing::warn!("🔶 Backend reports status '{}'", status.status);
            }
            Ok(serde_json::to_value(status)?)
        }
        Command::Login {
            email,
            password,
            tenant,
        } => {
            let auth = registry.get::<AuthService>("auth")?;
            let token = auth
                .login(&LoginRequest {
                    email: email.clone(),
                    password: password.clone(),
                    tenant_slug: tenant.clone(),
                })
                .await?;
            registry
                .set_auth_token(Some(token.access_token.clone()))
                .await;
            tracing::info!("✅ Logged in as {}", email);
            Ok(serde_json::to_value(token)?)
        }
        Command::Whoami => {
            let auth = registry.get::<AuthService>("auth")?;
            let user = auth.get_current_user().await?;
            if user.is_none() {
                tracing::warn!("🔒 Not logged in");
            }
            let tenant = auth.get_current_tenant().await?;
            Ok(json!({
                "user": user,
                "tenant": tenant,
                "tenant_id": registry.current_tenant_id(),
            }))
        }
        Command::Documents { page, per_page } => {
            let documents = registry.get::<DocumentService>("documents")?;
            let page = documents
                .get_documents(&DocumentQuery {
                    page: Some(*page),
                    per_page: Some(*per_page),
                    ..Default::default()
                })
                .await?;
            Ok(serde_json::to_value(page)?)
        }
        Command::Review {
            extraction_id,
            action,
            comments,
        } => {
            let extractions = registry.get::<ExtractionService>("extractions")?;
            let mut review = ReviewRequest::new(*action);
            if let Some(comments) = comments {
                review = review.with_comments(comments.clone());
            }
            let response = extractions.start_review(extraction_id, &review).await?;
            Ok(serde_json::to_value(response)?)
        }
    }
}
