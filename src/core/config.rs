use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";
const BASE_URL_ENV: &str = "REPOLENS_API_URL";

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    /// Repolens API base URL, e.g. "http://localhost:8000/api/v1"
    pub base_url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path();
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path();
        self.save_to_path(&config_path)
    }

    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    fn get_config_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "repolens");
        match proj_dirs {
            Some(dirs) => dirs.config_dir().join("config.toml"),
            None => PathBuf::from("repolens-config.toml"),
        }
    }

    /// Environment beats config beats default.
    pub fn resolve_base_url(&self) -> String {
        if let Ok(from_env) = std::env::var(BASE_URL_ENV) {
            if !from_env.trim().is_empty() {
                return from_env;
            }
        }
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }
}
