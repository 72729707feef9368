use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::registry::{RegistryConfig, RetentionPolicy};
use crate::remote::{DEFAULT_BASE_URL, DEFAULT_VERSION, WorkflowConfig};
use crate::stream::DEFAULT_TARGET_LABEL;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub server: ServerConfig,
    pub remote: RemoteConfig,
    pub tasks: TasksConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub app_id: String,
    pub api_key: Option<String>,
    pub version: String,
    pub target_label: String,
    pub connect_timeout_ms: u64,
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            app_id: String::new(),
            api_key: None,
            version: DEFAULT_VERSION.to_string(),
            target_label: DEFAULT_TARGET_LABEL.to_string(),
            connect_timeout_ms: 30000,
            timeout_ms: 600000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    pub max_concurrent: usize,
    pub max_total_age_ms: u64,
    pub max_terminal_grace_ms: u64,
    pub sweep_interval_ms: u64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            max_total_age_ms: 3600000,
            max_terminal_grace_ms: 600000,
            sweep_interval_ms: 60000,
        }
    }
}

impl TasksConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            log_file: None,
            server: ServerConfig::default(),
            remote: RemoteConfig::default(),
            tasks: TasksConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file_chain(config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_file_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply `PORT`, `WORKFLOW_APP_ID` and `WORKFLOW_API_KEY` on top of the file values
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .context(format!("PORT is not a valid port number: {}", port))?;
        }
        if let Some(app_id) = lookup("WORKFLOW_APP_ID") {
            self.remote.app_id = app_id;
        }
        if let Some(api_key) = lookup("WORKFLOW_API_KEY") {
            self.remote.api_key = Some(api_key);
        }
        Ok(())
    }

    pub fn registry_config(&self) -> Result<RegistryConfig> {
        let retention = RetentionPolicy::new(
            Duration::from_millis(self.tasks.max_total_age_ms),
            Duration::from_millis(self.tasks.max_terminal_grace_ms),
        )?;

        Ok(RegistryConfig {
            retention,
            max_concurrent: self.tasks.max_concurrent,
            remote_timeout: Duration::from_millis(self.remote.timeout_ms),
            target_label: self.remote.target_label.clone(),
        })
    }

    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            base_url: self.remote.base_url.clone(),
            app_id: self.remote.app_id.clone(),
            api_key: self.remote.api_key.clone().unwrap_or_default(),
            version: self.remote.version.clone(),
            connect_timeout: Duration::from_millis(self.remote.connect_timeout_ms),
        }
    }
}
