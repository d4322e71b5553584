//! Trigger configuration.
//!
//! Every field has a default, so a missing or empty config file yields the
//! zero-argument behavior: stage `tests`, commit, never push.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TriggerError};
use crate::vcs::Identity;

/// File looked up in the repository root when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = ".ci-trigger.toml";

/// Settings for one trigger run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriggerConfig {
    /// Subdirectory staged before committing, relative to the repository.
    pub stage_path: PathBuf,

    /// Leading text of every commit message. Text without `trigger CI run`
    /// is added after that marker instead of replacing it.
    pub message_prefix: String,

    pub push: PushConfig,

    /// Identity to fill in when the working copy has none.
    pub identity: Option<Identity>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            stage_path: PathBuf::from("tests"),
            message_prefix: "trigger CI run".to_string(),
            push: PushConfig::default(),
            identity: None,
        }
    }
}

/// Optional push after committing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PushConfig {
    pub enabled: bool,
    pub remote: String,
    pub refspec: String,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            remote: "origin".to_string(),
            refspec: "HEAD".to_string(),
        }
    }
}

impl TriggerConfig {
    /// Parse a config from TOML text. `origin` names the source in errors.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|e| TriggerError::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| TriggerError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Resolve the config for `repo_dir`.
    ///
    /// An explicit path must exist. Without one, `<repo>/.ci-trigger.toml`
    /// is used when present and defaults otherwise.
    pub fn load(repo_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let candidate = repo_dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "loading config");
            Self::from_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}
