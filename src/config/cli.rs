use crate::config::toml_config::{AuthSection, TenantSection, TomlConfig};
use crate::config::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECONDS};
use crate::domain::model::ReviewAction;
use crate::domain::ports::ConfigProvider;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "docex")]
#[command(about = "Command line client for the document extraction console API")]
pub struct CliConfig {
    #[arg(long, help = "TOML config file; flags override its values")]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long, help = "Bearer token sent with every request")]
    pub token: Option<String>,

    #[arg(long)]
    pub tenant_id: Option<String>,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Backend health
    Health {
        #[arg(long)]
        detailed: bool,
    },
    /// Log in and print the issued token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Current user and tenant
    Whoami,
    /// List documents
    Documents {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        per_page: u32,
    },
    /// Submit a review action for an extraction
    Review {
        extraction_id: String,
        #[arg(long, help = "start_review, approve, reject or needs_correction")]
        action: ReviewAction,
        #[arg(long)]
        comments: Option<String>,
    },
}

impl CliConfig {
    /// Applies command line flags on top of a file config.
    pub fn overlay(&self, mut file: TomlConfig) -> TomlConfig {
        if let Some(base_url) = &self.base_url {
            file.api.base_url = base_url.clone();
        }
        if let Some(timeout) = self.timeout_seconds {
            file.api.timeout_seconds = timeout;
        }
        if let Some(token) = &self.token {
            file.auth = Some(AuthSection {
                token: Some(token.clone()),
            });
        }
        if let Some(tenant_id) = &self.tenant_id {
            file.tenant = Some(TenantSection {
                id: Some(tenant_id.clone()),
            });
        }
        file
    }
}

impl ConfigProvider for CliConfig {
    fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }

    fn with_credentials(&self) -> bool {
        true
    }

    fn default_headers(&self) -> Vec<(String, String)> {
        crate::config::TransportConfig::default().default_headers
    }

    fn auth_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_review_command() {
        let cli = CliConfig::try_parse_from([
            "docex",
            "--token",
            "abc",
            "review",
            "ext-1",
            "--action",
            "needs_correction",
            "--comments",
            "Total is wrong",
        ])
        .unwrap();

        assert_eq!(cli.auth_token(), Some("abc"));
        match cli.command {
            Command::Review {
                extraction_id,
                action,
                comments,
            } => {
                assert_eq!(extraction_id, "ext-1");
                assert_eq!(action, ReviewAction::NeedsCorrection);
                assert_eq!(comments.as_deref(), Some("Total is wrong"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_review_action_is_rejected() {
        let result =
            CliConfig::try_parse_from(["docex", "review", "ext-1", "--action", "maybe"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_override_file_config() {
        let cli = CliConfig::try_parse_from([
            "docex",
            "--base-url",
            "https://override.example.com",
            "--tenant-id",
            "t-9",
            "whoami",
        ])
        .unwrap();

        let file = TomlConfig::from_toml_str(
            "[api]\nbase_url = \"https://file.example.com\"\ntimeout_seconds = 45\n",
        )
        .unwrap();
        let merged = cli.overlay(file);

        assert_eq!(merged.base_url(), "https://override.example.com");
        assert_eq!(merged.timeout_seconds(), 45);
        assert_eq!(merged.tenant_id(), Some("t-9"));
    }

    #[test]
    fn test_defaults_without_flags() {
        let cli = CliConfig::try_parse_from(["docex", "health"]).unwrap();
        assert_eq!(cli.base_url(), "http://localhost:8000");
        assert_eq!(cli.timeout_seconds(), 30);
        assert!(matches!(cli.command, Command::Health { detailed: false }));
    }
}
