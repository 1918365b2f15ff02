use std::env;
use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Environment variable selecting the backend origin. Takes precedence over
/// the config file.
pub const API_URL_ENV_VAR: &str = "CHATHUB_API_URL";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend origin, e.g. `https://chat.example.com`
    pub api_base_url: Option<String>,
    /// Model id used by `say` and `new-conversation` when none is given
    pub default_model: Option<String>,
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
        let proj_dirs = ProjectDirs::from("org", "permacommons", "chathub")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("config.toml")
    }

    /// Effective backend origin: env var > config file > built-in default.
    pub fn api_base_url(&self) -> String {
        if let Ok(from_env) = env::var(API_URL_ENV_VAR) {
            if !from_env.trim().is_empty() {
                return from_env;
            }
        }
        self.api_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    pub fn print_all(&self) {
        println!("Current configuration:");
        match &self.api_base_url {
            Some(url) => println!("  base-url: {url}"),
            None => println!("  base-url: (unset, using {DEFAULT_API_BASE_URL})"),
        }
        match &self.default_model {
            Some(model) => println!("  default-model: {model}"),
            None => println!("  default-model: (unset)"),
        }
    }
}
