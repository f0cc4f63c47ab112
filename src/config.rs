//! Startup configuration.
//!
//! Settings come from a TOML file (`~/.config/equiflow/config.toml` or
//! `--config`) with CLI flags taking precedence. Auth tokens live here
//! because token issuance is external to the service; the config is the
//! handoff point from the identity provider to the verifier.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{ApiError, ApiResult};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub bind_addr: Option<String>,
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub auth: AuthSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSection {
    /// Accepted bearer tokens mapped to the username they resolve to.
    #[serde(default)]
    pub tokens: HashMap<String, String>,
    /// Tokens rejected even if still listed under `tokens`.
    #[serde(default)]
    pub revoked: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// None means the platform data-dir default.
    pub db_path: Option<PathBuf>,
    pub tokens: HashMap<String, String>,
    pub revoked: HashSet<String>,
}

impl Config {
    pub fn load(cli: &Cli) -> ApiResult<Self> {
        let file = match &cli.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    ApiError::Internal(format!("failed to read {}: {e}", path.display()))
                })?;
                parse_file(&raw, &path.display().to_string())?
            }
            None => match default_config_path() {
                Some(path) if path.exists() => {
                    let raw = std::fs::read_to_string(&path)?;
                    parse_file(&raw, &path.display().to_string())?
                }
                _ => FileConfig::default(),
            },
        };
        Ok(Self::from_sources(file, cli))
    }

    /// Merges file settings with CLI overrides; CLI wins.
    pub fn from_sources(file: FileConfig, cli: &Cli) -> Self {
        let mut tokens = file.auth.tokens;
        for entry in &cli.token {
            if let Some((token, username)) = entry.split_once('=') {
                tokens.insert(token.trim().to_string(), username.trim().to_string());
            }
        }

        Config {
            bind_addr: cli
                .bind
                .clone()
                .or(file.bind_addr)
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            db_path: cli.db.clone().or(file.db_path),
            tokens,
            revoked: file.auth.revoked.into_iter().collect(),
        }
    }
}

fn parse_file(raw: &str, origin: &str) -> ApiResult<FileConfig> {
    toml::from_str(raw).map_err(|e| ApiError::Internal(format!("invalid config {origin}: {e}")))
}

/// ~/.config/equiflow/config.toml or platform equivalent.
fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "equiflow")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
