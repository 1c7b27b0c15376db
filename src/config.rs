use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::domain::{GeneName, SpeciesCode};
use crate::error::KeggError;
use crate::kegg::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::pacing::{DEFAULT_REQUEST_INTERVAL, Pacing};

pub const CONFIG_FILE_NAME: &str = "kegg-map.json";
pub const DEFAULT_OUTPUT_DIR: &str = "output";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub genes: Vec<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub request_interval_ms: Option<u64>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub species: SpeciesCode,
    pub genes: Vec<GeneName>,
    pub output_dir: Utf8PathBuf,
    pub pacing: Pacing,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            species: SpeciesCode::default(),
            genes: Vec::new(),
            output_dir: Utf8PathBuf::from(DEFAULT_OUTPUT_DIR),
            pacing: Pacing::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist. Without one, `kegg-map.json` in the
    /// current directory and then the per-user config file are tried, and
    /// defaults are used when neither exists.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, KeggError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => match Self::discover() {
                Some(found) => found,
                None => return Ok(ResolvedConfig::default()),
            },
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| KeggError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| KeggError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        ProjectDirs::from("", "", "kegg-map")
            .map(|dirs| dirs.config_dir().join("config.json"))
            .filter(|path| path.exists())
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, KeggError> {
        let defaults = ResolvedConfig::default();

        let species = match config.species {
            Some(value) => value.parse()?,
            None => defaults.species,
        };
        let genes = config
            .genes
            .iter()
            .map(|gene| gene.parse())
            .collect::<Result<Vec<GeneName>, KeggError>>()?;
        let interval = config
            .request_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REQUEST_INTERVAL);

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            species,
            genes,
            output_dir: config
                .output_dir
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.output_dir),
            pacing: Pacing::new(config.workers.unwrap_or(1), interval),
            base_url: config.base_url.unwrap_or(defaults.base_url),
            timeout: config
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        })
    }
}
