use anyhow::{Context, Result};
use serde::Deserialize;
use sheets_parser::FinancialSheets;
use std::fmt;
use tokio::fs;
use uuid::Uuid;

pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_BATCH_SIZE: usize = 500;
const MAX_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_url: Option<String>,
    pub sheets_api_base: String,
    pub sheets_token: Option<String>,
    pub api_key: Option<String>,
    pub batch_size: usize,
    pub http_timeout_secs: u64,
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let batch_size = match env_opt("SYNC_BATCH_SIZE") {
            Some(raw) => raw
                .parse::<usize>()
                .context("SYNC_BATCH_SIZE must be a positive integer")?,
            None => DEFAULT_BATCH_SIZE,
        };

        Ok(Self {
            db_url: env_opt("DB_URL"),
            sheets_api_base: env_opt("SHEETS_API_BASE")
                .unwrap_or_else(|| DEFAULT_SHEETS_API_BASE.to_string()),
            sheets_token: env_opt("GOOGLE_SHEETS_TOKEN"),
            api_key: env_opt("GOOGLE_API_KEY"),
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
            http_timeout_secs: env_opt("HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
        })
    }
}

// =============================================================================
// Source Configuration Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Financial,
    Operational,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Financial => write!(f, "financial"),
            SourceKind::Operational => write!(f, "operational"),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "financial" => Ok(SourceKind::Financial),
            "operational" => Ok(SourceKind::Operational),
            other => anyhow::bail!("unknown source kind '{}'", other),
        }
    }
}

/// Per-source tab configuration, stored as jsonb next to the connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SourceOptions {
    pub sheets: Option<FinancialSheets>,
    pub brand_tabs: Vec<String>,
    pub ads_tab: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConnection {
    pub id: Uuid,
    pub name: String,
    pub kind: SourceKind,
    pub spreadsheet_id: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub options: SourceOptions,
}

fn default_true() -> bool {
    true
}

impl SyncConnection {
    /// `--source-id` accepts either the UUID or the connection name.
    pub fn matches(&self, filter: &str) -> bool {
        self.id.to_string() == filter || self.name.eq_ignore_ascii_case(filter)
    }
}

#[derive(Debug, Deserialize)]
pub struct SourcesConfig {
    pub version: String,
    pub sources: Vec<SyncConnection>,
}

/// Load sources configuration from JSON file
pub async fn load_sources_config(path: &str) -> Result<SourcesConfig> {
    let content = fs::read_to_string(path)
        .await
        .context("Failed to read sources config")?;
    let config: SourcesConfig =
        serde_json::from_str(&content).context("Failed to parse sources config")?;
    Ok(config)
}
