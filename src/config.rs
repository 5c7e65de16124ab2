use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{Accession, AccessionRequest, ArtifactFamily, ArtifactKind};
use crate::error::CryoError;

pub const CONFIG_ENV: &str = "CRYOFETCH_CONFIG";
pub const DEFAULT_CONFIG: &str = "cryofetch.json";

const DEFAULT_OUTPUT: &str = "output";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
const DEFAULT_RSYNC_PROGRAM: &str = "rsync";
const DEFAULT_RSYNC_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    pub family: String,
    #[serde(default)]
    pub accessions: Option<Vec<String>>,
    #[serde(default)]
    pub batch_file: Option<PathBuf>,
    #[serde(default)]
    pub kinds: Option<Vec<String>>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub rsync: Option<RsyncConfig>,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RsyncConfig {
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub family: ArtifactFamily,
    pub requests: Vec<AccessionRequest>,
    pub output: Utf8PathBuf,
    pub http_timeout: Duration,
    pub rsync_program: String,
    pub rsync_timeout: Duration,
    pub json: bool,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the file named by `CRYOFETCH_CONFIG`, or `cryofetch.json` in the
    /// working directory.
    pub fn resolve_from_env() -> Result<ResolvedConfig, CryoError> {
        let path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::resolve(path.as_deref())
    }

    pub fn resolve(path: Option<&Path>) -> Result<ResolvedConfig, CryoError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(DEFAULT_CONFIG),
        };

        if path.is_none() && !config_path.exists() {
            return Err(CryoError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CryoError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CryoError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, CryoError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let family: ArtifactFamily = config.family.parse()?;

        let accessions = match (config.accessions, config.batch_file) {
            (Some(_), Some(_)) => return Err(CryoError::ConflictingAccessionSources),
            (Some(list), None) => list
                .iter()
                .filter(|value| !value.trim().is_empty())
                .map(|value| value.parse())
                .collect::<Result<Vec<Accession>, CryoError>>()?,
            (None, Some(path)) => {
                let content =
                    fs::read_to_string(&path).map_err(|_| CryoError::BatchFileRead(path.clone()))?;
                parse_accession_list(&content)
            }
            (None, None) => Vec::new(),
        };
        if accessions.is_empty() {
            return Err(CryoError::MissingAccessions);
        }

        let kinds = match config.kinds {
            Some(values) if !values.is_empty() => values
                .iter()
                .map(|value| value.parse())
                .collect::<Result<BTreeSet<ArtifactKind>, CryoError>>()?,
            _ => family.default_kinds(),
        };

        let requests = accessions
            .into_iter()
            .map(|accession| AccessionRequest::new(accession, family, kinds.clone()))
            .collect();

        let rsync = config.rsync.unwrap_or_default();

        Ok(ResolvedConfig {
            schema_version,
            family,
            requests,
            output: Utf8PathBuf::from(config.output.unwrap_or_else(|| DEFAULT_OUTPUT.to_string())),
            http_timeout: Duration::from_secs(
                config.timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            rsync_program: rsync
                .program
                .unwrap_or_else(|| DEFAULT_RSYNC_PROGRAM.to_string()),
            rsync_timeout: Duration::from_secs(
                rsync.timeout_secs.unwrap_or(DEFAULT_RSYNC_TIMEOUT_SECS),
            ),
            json: config.json,
        })
    }
}

/// Splits a batch file on commas and line breaks, trimming each entry and
/// dropping empty ones.
pub fn parse_accession_list(content: &str) -> Vec<Accession> {
    content
        .split([',', '\n', '\r'])
        .filter_map(|value| value.parse().ok())
        .collect()
}
