use crate::dashboard::persistence::JsonFilePersistence;
use crate::dashboard::query::{EnvironmentContext, DEVELOPMENT_ENVIRONMENT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const SETTINGS_FILE: &str = "settings.json";

fn default_environment() -> String {
    DEVELOPMENT_ENVIRONMENT.to_string()
}

fn default_user() -> String {
    "default".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// When enabled the logger starts at debug level and honours `RUST_LOG`.
    #[serde(default)]
    pub debug_logging: bool,
    /// Optional file receiving a copy of every log line.
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default)]
    pub project_id: String,
    /// Deployment environment whose conversations are analysed.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Identity the card layout is stored under.
    #[serde(default = "default_user")]
    pub user_id: String,
    /// Root directory for per-user layouts. Defaults to the platform config
    /// directory.
    #[serde(default)]
    pub storage_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_file: None,
            project_id: String::new(),
            environment: default_environment(),
            user_id: default_user(),
            storage_dir: None,
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn storage_dir(&self) -> PathBuf {
        match &self.storage_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs_next::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("analytics_dashboard"),
        }
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_file.as_ref().map(PathBuf::from)
    }

    pub fn environment_context(&self) -> EnvironmentContext {
        EnvironmentContext::new(self.project_id.clone(), self.environment.clone())
    }

    pub fn persistence(&self) -> JsonFilePersistence {
        JsonFilePersistence::for_user(self.storage_dir(), &self.user_id)
    }
}
