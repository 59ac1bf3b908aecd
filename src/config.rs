use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const PROJECT_ID_ENV: &str = "UNIFORM_PROJECT_ID";
pub const API_KEY_ENV: &str = "UNIFORM_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default, skip_serializing)]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_deals_per_page")]
    pub deals_per_page: usize,
}

/// Credentials for the content API. Only constructed when both are present.
#[derive(Clone)]
pub struct ContentCredentials {
    pub project_id: String,
    pub api_key: String,
}

impl std::fmt::Debug for ContentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentConfig")
            .field("api_base_url", &self.api_base_url)
            .field("project_id", &self.project_id.as_ref().map(|_| "<redacted>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl std::fmt::Debug for ContentCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCredentials")
            .field("project_id", &"<redacted>")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub deals_per_page: Option<usize>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/deal-personalizer/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    /// Overlays content API credentials from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(project_id) = lookup(PROJECT_ID_ENV) {
            self.content.project_id = Some(project_id);
        }
        if let Some(api_key) = lookup(API_KEY_ENV) {
            self.content.api_key = Some(api_key);
        }
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(api_base_url) = overrides.api_base_url {
            self.content.api_base_url = api_base_url;
        }
        if let Some(deals_per_page) = overrides.deals_per_page {
            self.display.deals_per_page = deals_per_page.max(1);
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn default_template() -> String {
        let template = r#"# Credentials are read from UNIFORM_PROJECT_ID / UNIFORM_API_KEY.

[server]
host = "127.0.0.1"
port = 3001

[content]
api_base_url = "https://uniform.global"
timeout_secs = 12

[display]
deals_per_page = 3
"#;
        template.to_string()
    }
}

impl ContentConfig {
    /// Both credentials, or `None` when either is missing or blank.
    pub fn credentials(&self) -> Option<ContentCredentials> {
        let project_id = self.project_id.as_deref().map(str::trim).unwrap_or("");
        let api_key = self.api_key.as_deref().map(str::trim).unwrap_or("");
        if project_id.is_empty() || api_key.is_empty() {
            return None;
        }
        Some(ContentCredentials {
            project_id: project_id.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            project_id: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            deals_per_page: default_deals_per_page(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_api_base_url() -> String {
    "https://uniform.global".to_string()
}

fn default_timeout_secs() -> u64 {
    12
}

fn default_deals_per_page() -> usize {
    crate::display::DEFAULT_DEALS_PER_PAGE
}
