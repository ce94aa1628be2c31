//! Environment configuration (`config.json`) and its layered lookup

use crate::core::error::PackError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the configuration file looked up in every source directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Environment variable naming the fallback config directory
pub const ROOT_ENV_VAR: &str = "PSTASKS_ROOT";

/// Top-level configuration
///
/// Every key other than `default_deploy_target` names an environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Environment used when `--env` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_deploy_target: Option<String>,

    /// Per-environment settings keyed by environment name
    #[serde(flatten)]
    pub environments: BTreeMap<String, EnvironmentSettings>,
}

/// Settings for a single deployment environment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSettings {
    /// Credentials handed verbatim to the secure-transfer client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_credentials: Option<DeployCredentials>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_server_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sams_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ps_url: Option<String>,
}

/// Opaque transfer credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeployCredentials(pub serde_json::Value);

impl DeployCredentials {
    /// Look up a string field, accepting both snake_case and camelCase keys
    pub fn field(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .find_map(|name| self.0.get(name).and_then(|v| v.as_str()))
    }
}

impl Config {
    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Settings for an environment, if it is configured
    pub fn environment(&self, name: &str) -> Option<&EnvironmentSettings> {
        self.environments.get(name)
    }
}

/// Where a configuration was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum ConfigSource {
    /// Directory passed with `--config`
    Explicit(PathBuf),
    /// `config.json` in the invocation directory
    WorkingDirectory(PathBuf),
    /// Directory named by `PSTASKS_ROOT`
    RootVariable(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::Explicit(p)
            | ConfigSource::WorkingDirectory(p)
            | ConfigSource::RootVariable(p) => p,
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Explicit(p) => write!(f, "--config ({})", p.display()),
            ConfigSource::WorkingDirectory(p) => write!(f, "project folder ({})", p.display()),
            ConfigSource::RootVariable(p) => write!(f, "{} ({})", ROOT_ENV_VAR, p.display()),
        }
    }
}

/// A parsed configuration together with the source it came from
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: Config,
    pub source: ConfigSource,
}

/// Locates and parses `config.json` using a layered fallback
///
/// Lookup order, first success wins:
/// 1. the explicit directory (errors here are fatal and never fall through)
/// 2. `config.json` in the working directory
/// 3. the directory named by [`ROOT_ENV_VAR`]
///
/// A project folder file that cannot be read or parsed is logged and skipped.
/// The explicit and root-variable sources report it as [`PackError::ConfigParse`].
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    working_dir: PathBuf,
    root_dir: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(working_dir: impl Into<PathBuf>, root_dir: Option<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            root_dir,
        }
    }

    /// Build a resolver for `working_dir`, reading [`ROOT_ENV_VAR`] from the process environment
    pub fn from_env(working_dir: impl Into<PathBuf>) -> Self {
        let root_dir = std::env::var_os(ROOT_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::new(working_dir, root_dir)
    }

    /// Resolve the configuration
    pub fn resolve(&self, explicit_dir: Option<&Path>) -> Result<ResolvedConfig, PackError> {
        if let Some(dir) = explicit_dir {
            let path = self.working_dir.join(dir).join(CONFIG_FILE_NAME);
            let config = match read_config(&path)? {
                Some(config) => config,
                None => {
                    return Err(PackError::ConfigNotFound(format!(
                        "no {} in --config directory {}",
                        CONFIG_FILE_NAME,
                        dir.display()
                    )))
                }
            };
            info!("Using config.json found at {}", path.display());
            return Ok(ResolvedConfig {
                config,
                source: ConfigSource::Explicit(path),
            });
        }

        let local = self.working_dir.join(CONFIG_FILE_NAME);
        match read_config(&local) {
            Ok(Some(config)) => {
                info!("Using config.json found in project folder");
                return Ok(ResolvedConfig {
                    config,
                    source: ConfigSource::WorkingDirectory(local),
                });
            }
            Ok(None) => debug!("No config.json at {}", local.display()),
            Err(e) => warn!("Skipping project folder config: {}", e),
        }

        let root = self.root_dir.as_ref().ok_or_else(|| {
            PackError::ConfigNotFound(format!("{} env var not set", ROOT_ENV_VAR))
        })?;
        let rooted = self.working_dir.join(root).join(CONFIG_FILE_NAME);
        match read_config(&rooted)? {
            Some(config) => {
                info!("Using config.json in {}: {}", ROOT_ENV_VAR, root.display());
                Ok(ResolvedConfig {
                    config,
                    source: ConfigSource::RootVariable(rooted),
                })
            }
            None => {
                warn!("No config.json found at {}", rooted.display());
                Err(PackError::ConfigNotFound(
                    "all three loading methods failed".to_string(),
                ))
            }
        }
    }
}

/// Read and parse a config file; `Ok(None)` when the file does not exist
fn read_config(path: &Path) -> Result<Option<Config>, PackError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(PackError::ConfigParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    };

    Config::from_json(&content)
        .map(Some)
        .map_err(|e| PackError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}
