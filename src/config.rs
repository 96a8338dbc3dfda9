//! Configuration loader and validator for the browsing client.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::model::Jurisdiction;
use crate::query::DEFAULT_PAGE_SIZE;
use crate::resolver::{year_to_federal_session, JurisdictionContext};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub api: Api,
    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// Ambient viewing context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub year: i32,
    pub namespace: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Data service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Api {
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// One legislative session of a jurisdiction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub namespace: String,
    pub code: String,
    pub start_year: i32,
    pub end_year: i32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_user_agent() -> String {
    concat!("poliscore-browse/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Config {
    pub fn jurisdiction(&self) -> Result<(String, Jurisdiction), ConfigError> {
        Jurisdiction::from_namespace(&self.app.namespace)
            .ok_or(ConfigError::Invalid("app.namespace must be country/jurisdiction"))
    }

    /// Session of `namespace` covering `year`.
    pub fn lookup_session(&self, namespace: &str, year: i32) -> Option<&Session> {
        self.sessions.iter().find(|s| {
            s.namespace.eq_ignore_ascii_case(namespace) && s.start_year <= year && year <= s.end_year
        })
    }

    /// Context for resolving bare paths. Congress falls back to the
    /// arithmetic session when the calendar has no entry for the year.
    pub fn context(&self) -> Result<JurisdictionContext, ConfigError> {
        let (country, jurisdiction) = self.jurisdiction()?;
        let session_code = match self.lookup_session(&self.app.namespace, self.app.year) {
            Some(session) => session.code.clone(),
            None if jurisdiction.is_federal() => year_to_federal_session(self.app.year).to_string(),
            None => {
                return Err(ConfigError::Invalid(
                    "sessions has no entry covering app.namespace in app.year",
                ))
            }
        };
        Ok(JurisdictionContext::new(
            self.app.year,
            country,
            jurisdiction,
            session_code,
        ))
    }

    /// `API_BASE_URL` overrides `api.base_url`.
    pub fn resolved_base_url(&self) -> String {
        std::env::var("API_BASE_URL").unwrap_or_else(|_| self.api.base_url.clone())
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.page_size == 0 {
        return Err(ConfigError::Invalid("app.page_size must be > 0"));
    }
    cfg.jurisdiction()?;

    if cfg.api.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("api.base_url must be non-empty"));
    }
    if !cfg.api.base_url.ends_with('/') {
        return Err(ConfigError::Invalid("api.base_url must end with '/'"));
    }
    if cfg.api.user_agent.trim().is_empty() {
        return Err(ConfigError::Invalid("api.user_agent must be non-empty"));
    }

    for session in &cfg.sessions {
        if session.code.trim().is_empty() {
            return Err(ConfigError::Invalid("sessions[].code must be non-empty"));
        }
        if Jurisdiction::from_namespace(&session.namespace).is_none() {
            return Err(ConfigError::Invalid("sessions[].namespace must be country/jurisdiction"));
        }
        if session.start_year > session.end_year {
            return Err(ConfigError::Invalid("sessions[].start_year must not exceed end_year"));
        }
    }

    cfg.context()?;
    Ok(())
}

pub fn example() -> &'static str {
    r#"app:
  year: 2024
  namespace: "us/congress"
  page_size: 25

api:
  base_url: "https://api.poliscore.us/"
  user_agent: "poliscore-browse/0.1"

sessions:
  - namespace: "us/congress"
    code: "118"
    start_year: 2023
    end_year: 2024
  - namespace: "us/co"
    code: "2025A"
    start_year: 2025
    end_year: 2025
"#
}
