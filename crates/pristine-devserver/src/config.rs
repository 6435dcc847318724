//! Server configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config/devserver.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DevServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served at `/`. Its parent is the project root, which holds
    /// the `frontend` directory.
    #[serde(default = "default_serve_dir")]
    pub serve_dir: PathBuf,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_serve_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            serve_dir: default_serve_dir(),
        }
    }
}

impl DevServerConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Load `config/devserver.toml` if present, else defaults.
    pub fn load() -> Result<Self> {
        let path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if path.exists() {
            return Self::load_from(&path);
        }
        Ok(Self::default())
    }
}
