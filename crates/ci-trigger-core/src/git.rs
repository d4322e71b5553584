//! Git-backed [`VersionControl`] that shells out to the `git` binary.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::debug;

use crate::error::{Result, TriggerError};
use crate::vcs::{Identity, VersionControl};

/// Runs `git` inside a working copy.
///
/// Every invocation uses `repo_dir` as its working directory, so the
/// repository is an explicit input rather than the process cwd.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
    envs: Vec<(OsString, OsString)>,
}

impl GitCli {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            envs: Vec::new(),
        }
    }

    /// Set an environment variable on every spawned git process.
    pub fn with_env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Absolute path of the working copy root containing `repo_dir`.
    pub fn toplevel(&self) -> Result<PathBuf> {
        self.run(["rev-parse", "--show-toplevel"]).map(PathBuf::from)
    }

    fn output<I, S>(&self, args: I) -> Result<(String, Output)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args
            .into_iter()
            .map(|a| a.as_ref().to_os_string())
            .collect();
        let command_line = args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        debug!(repo = %self.repo_dir.display(), command = %command_line, "running git");

        let output = Command::new("git")
            .args(&args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .current_dir(&self.repo_dir)
            .output()
            .map_err(TriggerError::GitSpawn)?;
        Ok((command_line, output))
    }

    /// Run git and fail on a non-zero exit, returning trimmed stdout.
    fn run<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (command, output) = self.output(args)?;
        if !output.status.success() {
            return Err(command_failed(command, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn config_value(&self, key: &str) -> Result<Option<String>> {
        let (command, output) = self.output(["config", "--get", key])?;
        match output.status.code() {
            Some(0) => {
                let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
                Ok(Some(value).filter(|v| !v.is_empty()))
            }
            // `git config --get` exits 1 when the key is unset.
            Some(1) => Ok(None),
            _ => Err(command_failed(command, &output)),
        }
    }
}

fn command_failed(command: String, output: &Output) -> TriggerError {
    TriggerError::GitCommand {
        command,
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

impl VersionControl for GitCli {
    fn stage_directory(&self, path: &Path) -> Result<()> {
        self.run([OsStr::new("add"), OsStr::new("--"), path.as_os_str()])
            .map(|_| ())
    }

    fn has_staged_changes(&self) -> Result<bool> {
        let (command, output) = self.output(["diff", "--cached", "--quiet"])?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(command_failed(command, &output)),
        }
    }

    fn commit(&self, message: &str, allow_empty: bool) -> Result<()> {
        let mut args = vec!["commit", "-m", message];
        if allow_empty {
            args.push("--allow-empty");
        }
        self.run(args).map(|_| ())
    }

    fn head_sha(&self) -> Result<Option<String>> {
        let (command, output) = self.output(["rev-parse", "--verify", "--quiet", "HEAD"])?;
        match output.status.code() {
            Some(0) => {
                let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
                Ok(Some(sha).filter(|s| !s.is_empty()))
            }
            // Unborn branch: HEAD names a ref that does not exist yet.
            Some(1) => Ok(None),
            _ => Err(command_failed(command, &output)),
        }
    }

    fn ensure_identity(&self, identity: &Identity) -> Result<()> {
        if self.config_value("user.name")?.is_none() {
            self.run(["config", "user.name", identity.name.as_str()])?;
        }
        if self.config_value("user.email")?.is_none() {
            self.run(["config", "user.email", identity.email.as_str()])?;
        }
        Ok(())
    }

    fn push(&self, remote: &str, refspec: &str) -> Result<()> {
        self.run(["push", remote, refspec]).map(|_| ())
    }
}
