// src/config.rs
// Configuration system for routeprobe

use crate::assertions::{BodyChecks, BodyExpectation};
use crate::fixtures::FixtureSpec;
use crate::routes::RouteExpectation;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:4567";
pub const URL_ENV: &str = "ROUTEPROBE_URL";
pub const ADMIN_TOKEN_ENV: &str = "ROUTEPROBE_ADMIN_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminConfig {
    #[serde(default = "default_admin_base_path")]
    pub base_path: String,

    #[serde(default)]
    pub token: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        AdminConfig {
            base_path: default_admin_base_path(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub fixtures: FixtureSpec,

    #[serde(default)]
    pub body_checks: BodyChecks,

    /// Extra cases appended after the standard route table.
    #[serde(default)]
    pub routes: Vec<RouteExpectation>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_admin_base_path() -> String {
    "/api/admin".to_string()
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            admin: AdminConfig::default(),
            fixtures: FixtureSpec::default(),
            body_checks: BodyChecks::default(),
            routes: Vec::new(),
        }
    }
}

impl Configuration {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base URL without a trailing slash, so route paths can be appended.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Environment overrides sit between the config file and CLI flags.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(URL_ENV).filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        if let Some(token) = lookup(ADMIN_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.admin.token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            ConfigError::ValidationError(format!("Invalid base URL '{}': {}", self.base_url, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "Base URL must be an http(s) URL with a host: {}",
                self.base_url
            )));
        }

        if self.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if !self.admin.base_path.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "Admin base path must start with '/': {}",
                self.admin.base_path
            )));
        }

        if self.fixtures.category.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Fixture category name cannot be empty".to_string(),
            ));
        }

        if self.fixtures.user.username.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Fixture username cannot be empty".to_string(),
            ));
        }

        for route in &self.routes {
            if !route.path.starts_with('/') {
                return Err(ConfigError::ValidationError(format!(
                    "Route '{}' path must start with '/': {}",
                    route.name, route.path
                )));
            }
            if !(100..=599).contains(&route.status) {
                return Err(ConfigError::ValidationError(format!(
                    "Route '{}' has an invalid status code: {}",
                    route.name, route.status
                )));
            }
            if let BodyExpectation::Matches(ref pattern) = route.body {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::ValidationError(format!(
                        "Route '{}' has an invalid body pattern: {}",
                        route.name, e
                    ))
                })?;
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    FileNotFound(String),
    ParseError(String),
    ValidationError(String),
    IoError(std::io::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Configuration file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse configuration: {}", msg),
            ConfigError::ValidationError(msg) => {
                write!(f, "Configuration validation failed: {}", msg)
            }
            ConfigError::IoError(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

pub struct ConfigLoader {
    search_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(search_dir: PathBuf) -> Self {
        Self { search_dir }
    }

    pub fn load_configuration(
        &self,
        custom_config_path: Option<&str>,
    ) -> Result<Configuration, ConfigError> {
        let mut config = Configuration::default();

        let config_files = if let Some(custom_path) = custom_config_path {
            vec![PathBuf::from(custom_path)]
        } else {
            vec![
                self.search_dir.join("routeprobe.json"),
                self.search_dir.join("package.json"),
            ]
        };

        for config_path in config_files {
            if !config_path.exists() {
                if custom_config_path.is_some() {
                    return Err(ConfigError::FileNotFound(
                        config_path.to_string_lossy().to_string(),
                    ));
                }
                continue;
            }

            let contents = fs::read_to_string(&config_path)?;

            let config_filename = config_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("");

            if config_filename == "package.json" && custom_config_path.is_none() {
                #[derive(Deserialize)]
                struct PackageJson {
                    routeprobe: Option<Configuration>,
                }

                let package_json: PackageJson = serde_json::from_str(&contents)
                    .map_err(|e| ConfigError::ParseError(format!("package.json: {}", e)))?;

                match package_json.routeprobe {
                    Some(section) => config = section,
                    // A package.json without our section is not a config file
                    None => continue,
                }
            } else {
                config = serde_json::from_str(&contents).map_err(|e| {
                    ConfigError::ParseError(format!("{}: {}", config_path.display(), e))
                })?;
            }

            log::info!("Loaded configuration from: {}", config_path.display());
            break;
        }

        // Validated by the caller once env and flags are layered on top
        Ok(config)
    }
}
