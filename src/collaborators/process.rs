//! Subprocess-backed collaborators: `zip` archiving and `scp` transfer

use crate::collaborators::{Archiver, CollaboratorError, SecureTransfer};
use crate::core::config::DeployCredentials;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// A program and its argument template
///
/// Arguments may contain `{source}` and `{output}` placeholders, filled in by
/// [`CommandSpec::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Fill in `{source}` and `{output}` placeholders
    pub fn render(&self, source: &Path, output: &Path) -> Vec<String> {
        let source = source.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace("{source}", &source).replace("{output}", &output))
            .collect()
    }
}

/// Runs external programs with a timeout
#[derive(Debug, Clone)]
pub struct CommandRunner {
    /// Timeout for command execution in seconds
    timeout_secs: u64,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self { timeout_secs: 600 }
    }
}

impl CommandRunner {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    /// Run `program` with `args` in `cwd` and return its stdout
    ///
    /// # Errors
    /// Returns `CollaboratorError` if the program cannot be spawned, times out,
    /// or exits with a non-zero status.
    pub async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<String, CollaboratorError> {
        debug!("Running {} {:?} in {}", program, args, cwd.display());

        let result = timeout(
            Duration::from_secs(self.timeout_secs),
            Command::new(program)
                .args(args)
                .current_dir(cwd)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| CollaboratorError::Spawn {
            program: program.to_string(),
            message: format!("timed out after {} seconds", self.timeout_secs),
        })?;

        let output = result.map_err(|e| CollaboratorError::Spawn {
            program: program.to_string(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            warn!("{} exited with code {}: {}", program, code, stderr);
            return Err(CollaboratorError::Process {
                program: program.to_string(),
                code,
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Archiver that calls the system `zip` binary
#[derive(Debug, Clone)]
pub struct ZipArchiver {
    runner: CommandRunner,
}

impl ZipArchiver {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Archiver for ZipArchiver {
    async fn archive(&self, source_root: &Path, archive_path: &Path) -> Result<(), CollaboratorError> {
        if !source_root.is_dir() {
            return Err(CollaboratorError::io(source_root, "nothing to archive"));
        }
        let archive = absolute(archive_path)?;
        if archive.exists() {
            std::fs::remove_file(&archive).map_err(|e| CollaboratorError::io(&archive, e))?;
        }

        let args = vec![
            "-r".to_string(),
            "-q".to_string(),
            archive.to_string_lossy().into_owned(),
            ".".to_string(),
        ];
        self.runner.run("zip", &args, source_root).await?;
        Ok(())
    }
}

/// Where and how to upload, read from opaque deploy credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScpTarget {
    pub host: String,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub remote_path: String,
    pub key: Option<String>,
}

impl ScpTarget {
    /// Interpret credentials shaped like `{ host, user, port, remotePath, key }`
    pub fn from_credentials(credentials: &DeployCredentials) -> Result<Self, CollaboratorError> {
        let host = credentials
            .field(&["host"])
            .ok_or_else(|| CollaboratorError::InvalidCredentials("missing 'host'".to_string()))?
            .to_string();

        let port = match credentials.0.get("port") {
            None => None,
            Some(v) => Some(
                v.as_u64()
                    .and_then(|p| u16::try_from(p).ok())
                    .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
                    .ok_or_else(|| {
                        CollaboratorError::InvalidCredentials(format!("invalid port: {}", v))
                    })?,
            ),
        };

        if credentials.field(&["pass", "password"]).is_some() {
            warn!("Password credentials are not passed to scp; key or agent auth is used");
        }

        Ok(Self {
            host,
            user: credentials.field(&["user", "username"]).map(String::from),
            port,
            remote_path: credentials
                .field(&["remotePath", "remote_path"])
                .unwrap_or(".")
                .to_string(),
            key: credentials
                .field(&["key", "identity_file"])
                .map(String::from),
        })
    }

    /// `user@host:path` destination
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}:{}", user, self.host, self.remote_path),
            None => format!("{}:{}", self.host, self.remote_path),
        }
    }

    /// Arguments for `scp` uploading the contents of the current directory
    pub fn scp_args(&self) -> Vec<String> {
        let mut args = vec!["-r".to_string(), "-B".to_string()];
        if let Some(port) = self.port {
            args.push("-P".to_string());
            args.push(port.to_string());
        }
        if let Some(key) = &self.key {
            args.push("-i".to_string());
            args.push(key.clone());
        }
        args.push(".".to_string());
        args.push(self.destination());
        args
    }
}

/// Secure transfer through the system `scp` binary
#[derive(Debug, Clone)]
pub struct ScpTransfer {
    runner: CommandRunner,
}

impl ScpTransfer {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl SecureTransfer for ScpTransfer {
    async fn upload(
        &self,
        credentials: &DeployCredentials,
        local_root: &Path,
    ) -> Result<(), CollaboratorError> {
        let target = ScpTarget::from_credentials(credentials)?;
        if !local_root.is_dir() {
            return Err(CollaboratorError::io(local_root, "nothing to upload"));
        }
        debug!("Uploading {} to {}", local_root.display(), target.destination());
        self.runner.run("scp", &target.scp_args(), local_root).await?;
        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf, CollaboratorError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| CollaboratorError::io(path, e))?;
    Ok(cwd.join(path))
}
