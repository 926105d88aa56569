//! Configuration for fridge-ri
//!
//! All configuration is read from the environment once at startup. Missing
//! or blank credentials are fatal: `Config::from_env` fails, `main` logs the
//! diagnostic and refuses to start. There is no config file and no CLI.

use std::net::SocketAddr;
use thiserror::Error;

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5750";

/// Default document-understanding model
pub const DEFAULT_EXTRACTION_MODEL: &str = "claude-sonnet-4-6";

/// Default submitter choices when FRIDGE_SUBMITTERS is not set
const DEFAULT_SUBMITTERS: &[&str] = &["You", "Partner"];

/// Configuration error (fatal at startup)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not set or blank. {hint}")]
    Missing { var: &'static str, hint: &'static str },

    #[error("Invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the extraction service (Anthropic)
    pub anthropic_api_key: String,
    /// Integration token for the record store (Notion)
    pub notion_token: String,
    /// Target database in the record store
    pub notion_database_id: String,
    /// Model used for receipt extraction
    pub extraction_model: String,
    /// Submitter identities offered in the review UI
    pub submitters: Vec<String>,
    /// HTTP listen address
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Resolve configuration from the environment.
    ///
    /// Required: ANTHROPIC_API_KEY, FRIDGE_NOTION_TOKEN,
    /// FRIDGE_NOTION_DATABASE_ID. Optional overrides: FRIDGE_SUBMITTERS
    /// (comma-separated), FRIDGE_EXTRACTION_MODEL, FRIDGE_BIND_ADDR.
    pub fn from_env() -> Result<Self, ConfigError> {
        let anthropic_api_key = required(
            "ANTHROPIC_API_KEY",
            "Set it to an Anthropic API key with access to the Messages API \
             (https://console.anthropic.com/).",
        )?;

        let notion_token = required(
            "FRIDGE_NOTION_TOKEN",
            "Set it to a Notion integration token that is shared with the \
             fridge tracker database.",
        )?;

        let notion_database_id = required(
            "FRIDGE_NOTION_DATABASE_ID",
            "Set it to the id of the fridge tracker database (the 32-char \
             segment of the database URL).",
        )?;

        let extraction_model = optional("FRIDGE_EXTRACTION_MODEL")
            .unwrap_or_else(|| DEFAULT_EXTRACTION_MODEL.to_string());

        let submitters = match optional("FRIDGE_SUBMITTERS") {
            Some(raw) => {
                let parsed = parse_submitters(&raw);
                if parsed.is_empty() {
                    return Err(ConfigError::Invalid {
                        var: "FRIDGE_SUBMITTERS",
                        reason: format!(
                            "expected a comma-separated list with at least one name, got {:?}",
                            raw
                        ),
                    });
                }
                parsed
            }
            None => DEFAULT_SUBMITTERS.iter().map(|s| s.to_string()).collect(),
        };

        let bind_addr = optional("FRIDGE_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "FRIDGE_BIND_ADDR",
                reason: format!("expected host:port, parse failed: {}", e),
            })?;

        Ok(Self {
            anthropic_api_key,
            notion_token,
            notion_database_id,
            extraction_model,
            submitters,
            bind_addr,
        })
    }

    /// Whether `name` is one of the configured submitter identities
    pub fn is_known_submitter(&self, name: &str) -> bool {
        self.submitters.iter().any(|s| s == name)
    }
}

/// Read a required variable; blank counts as missing
fn required(var: &'static str, hint: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing { var, hint }),
    }
}

/// Read an optional variable; blank counts as unset
fn optional(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Parse a comma-separated submitter list, dropping blank entries
fn parse_submitters(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
