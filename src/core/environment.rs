//! Active environment selection

use crate::core::config::{Config, EnvironmentSettings};
use crate::core::error::PackError;
use serde::Serialize;

/// The environment a run targets
///
/// `settings` is `None` when `name` is not configured. That is a valid state:
/// deploy and preprocess stages degrade to no-ops against it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentContext {
    pub name: String,
    pub settings: Option<EnvironmentSettings>,
}

impl EnvironmentContext {
    /// Bind an environment name to its settings in `config`
    pub fn new(name: impl Into<String>, config: &Config) -> Self {
        let name = name.into();
        let settings = config.environment(&name).cloned();
        Self { name, settings }
    }

    /// Context for an environment with no configured settings
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.settings.is_some()
    }
}

/// Picks the active environment name
pub struct EnvironmentResolver;

impl EnvironmentResolver {
    /// Return the CLI value verbatim if present, else the configured default
    ///
    /// The CLI value is deliberately not checked against `config.environments`.
    pub fn resolve(cli_env: Option<&str>, config: &Config) -> Result<String, PackError> {
        match cli_env {
            Some(env) => Ok(env.to_string()),
            None => config
                .default_deploy_target
                .clone()
                .ok_or(PackError::MissingDeployTarget),
        }
    }

    /// Resolve the name and bind it to its settings
    pub fn context(cli_env: Option<&str>, config: &Config) -> Result<EnvironmentContext, PackError> {
        let name = Self::resolve(cli_env, config)?;
        Ok(EnvironmentContext::new(name, config))
    }
}
