use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CycError;
use crate::identity::Detail;

pub const DEFAULT_CONFIG_FILE: &str = "kira-cyc.json";
pub const BASE_URL_ENV: &str = "BIOCYC_BASE_URL";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub atom_mapping_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<usize>,
    #[serde(default)]
    pub retry_delay_ms: Option<u64>,
    #[serde(default)]
    pub default_detail: Option<Detail>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub atom_mapping_url: String,
    pub timeout: Duration,
    pub max_retries: usize,
    pub retry_delay: Duration,
    pub default_detail: Option<Detail>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ConfigLoader::resolve_config(Config::default())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `kira-cyc.json` in the working directory when it
    /// exists, then applies the `BIOCYC_BASE_URL` override.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CycError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| CycError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| CycError::ConfigParse(err.to_string()))?
        };

        let mut resolved = Self::resolve_config(config);
        if let Ok(base_url) = env::var(BASE_URL_ENV)
            && !base_url.trim().is_empty()
        {
            resolved.base_url = base_url.trim().to_string();
        }
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        ResolvedConfig {
            base_url: config
                .base_url
                .unwrap_or_else(|| "https://websvc.biocyc.org".to_string()),
            atom_mapping_url: config
                .atom_mapping_url
                .unwrap_or_else(|| "https://biocyc.org".to_string()),
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(60)),
            max_retries: config.max_retries.unwrap_or(3),
            retry_delay: Duration::from_millis(config.retry_delay_ms.unwrap_or(200)),
            default_detail: config.default_detail,
        }
    }
}
