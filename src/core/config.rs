//! Client and application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::IngestError;

/// Document dialect a client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// Plain DIAN UBL 2.1 invoices.
    #[default]
    Standard,
    /// Somex: order-reference numbering, receiver party, bundle-to-kilo scaling.
    Somex,
}

/// Per-client processing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub dialect: Dialect,
    /// Fall back to PDF table extraction when a document is not XML.
    pub accept_pdf: bool,
    /// Code written to every line's `subyacente_code`.
    pub subyacente_code: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            enabled: true,
            dialect: Dialect::Standard,
            accept_pdf: false,
            subyacente_code: DEFAULT_SUBYACENTE_CODE.to_string(),
        }
    }
}

/// Subyacente code used when a client does not configure one.
pub const DEFAULT_SUBYACENTE_CODE: &str = "SPN-1";

impl ClientConfig {
    pub fn new(id: impl Into<String>, dialect: Dialect) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            dialect,
            ..Self::default()
        }
    }

    pub fn accept_pdf(mut self, accept: bool) -> Self {
        self.accept_pdf = accept;
        self
    }

    pub fn subyacente_code(mut self, code: impl Into<String>) -> Self {
        self.subyacente_code = code.into();
        self
    }
}

/// Application configuration file (`app_config.json`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub clients: Vec<ClientConfig>,
    /// Location of the durable dedup ledger.
    pub ledger_path: Option<PathBuf>,
    pub output_directory: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self, IngestError> {
        serde_json::from_str(json).map_err(|e| IngestError::Config(format!("invalid config: {e}")))
    }

    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Enabled client with the given id.
    pub fn client(&self, id: &str) -> Result<&ClientConfig, IngestError> {
        self.clients
            .iter()
            .find(|c| c.id == id)
            .filter(|c| c.enabled)
            .ok_or_else(|| IngestError::Config(format!("no enabled client '{id}'")))
    }
}
