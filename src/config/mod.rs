use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "BRANCHSYNC_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub git: GitConfig,
    pub fetch_before_sync: bool,
    pub allow_stale: bool,
    pub interactive: InteractiveMode,
    pub confirm_destructive: bool,
    pub log_file: Option<PathBuf>,
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractiveMode {
    /// Prompt only when stdin is a terminal.
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub default_remote: String,
    pub default_branch: String,
    pub protected_branches: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            git: GitConfig::default(),
            fetch_before_sync: true,
            allow_stale: false,
            interactive: InteractiveMode::Auto,
            confirm_destructive: true,
            log_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            default_remote: "origin".to_string(),
            default_branch: "main".to_string(),
            protected_branches: vec![
                "main".to_string(),
                "master".to_string(),
                "develop".to_string(),
            ],
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }

        #[cfg(windows)]
        {
            let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(appdata).join("branchsync").join("config.json")
        }

        #[cfg(not(windows))]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home)
                .join(".config")
                .join("branchsync")
                .join("config.json")
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("branchsync.log"))
    }

    pub fn is_protected(&self, branch: &str) -> bool {
        self.git.protected_branches.iter().any(|b| b == branch)
    }
}
