//! In-memory [`VersionControl`] fake (testing only)
//!
//! `FakeVcs` keeps a linear commit history and a single "index is dirty"
//! flag, records every call, and can be told to fail staging, committing
//! or pushing with a given exit code and stderr.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, TriggerError};
use crate::vcs::{Identity, VersionControl};

/// One call made against the fake, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Stage(PathBuf),
    HasStagedChanges,
    Commit { message: String, allow_empty: bool },
    HeadSha,
    EnsureIdentity(Identity),
    Push { remote: String, refspec: String },
}

/// A commit recorded by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCommit {
    pub sha: String,
    pub message: String,
    pub allow_empty: bool,
}

#[derive(Debug, Default)]
struct State {
    staged: bool,
    pending: HashSet<PathBuf>,
    commits: Vec<FakeCommit>,
    calls: Vec<FakeCall>,
}

#[derive(Debug, Clone)]
struct Failure {
    code: i32,
    stderr: String,
}

impl Failure {
    fn into_error(self, command: String) -> TriggerError {
        TriggerError::GitCommand {
            command,
            code: Some(self.code),
            stderr: self.stderr,
        }
    }
}

/// In-memory working copy.
#[derive(Debug, Default)]
pub struct FakeVcs {
    state: Mutex<State>,
    stage_failure: Option<Failure>,
    commit_failure: Option<Failure>,
    push_failure: Option<Failure>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `path` holds unstaged changes that staging it will pick up.
    pub fn with_pending(self, path: impl Into<PathBuf>) -> Self {
        self.state.lock().unwrap().pending.insert(path.into());
        self
    }

    /// Pretend changes were staged before the run started.
    pub fn with_staged(self) -> Self {
        self.state.lock().unwrap().staged = true;
        self
    }

    pub fn failing_stage(mut self, stderr: &str) -> Self {
        self.stage_failure = Some(Failure {
            code: 128,
            stderr: stderr.to_string(),
        });
        self
    }

    pub fn failing_commit(mut self, code: i32, stderr: &str) -> Self {
        self.commit_failure = Some(Failure {
            code,
            stderr: stderr.to_string(),
        });
        self
    }

    pub fn failing_push(mut self, code: i32, stderr: &str) -> Self {
        self.push_failure = Some(Failure {
            code,
            stderr: stderr.to_string(),
        });
        self
    }

    pub fn commits(&self) -> Vec<FakeCommit> {
        self.state.lock().unwrap().commits.clone()
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl VersionControl for FakeVcs {
    fn stage_directory(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(FakeCall::Stage(path.to_path_buf()));
        if let Some(failure) = &self.stage_failure {
            return Err(failure
                .clone()
                .into_error(format!("add -- {}", path.display())));
        }
        if state.pending.remove(path) {
            state.staged = true;
        }
        Ok(())
    }

    fn has_staged_changes(&self) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(FakeCall::HasStagedChanges);
        Ok(state.staged)
    }

    fn commit(&self, message: &str, allow_empty: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(FakeCall::Commit {
            message: message.to_string(),
            allow_empty,
        });
        let command = format!("commit -m {message}");
        if let Some(failure) = &self.commit_failure {
            return Err(failure.clone().into_error(command));
        }
        if !state.staged && !allow_empty {
            return Err(TriggerError::GitCommand {
                command,
                code: Some(1),
                stderr: "nothing to commit, working tree clean".to_string(),
            });
        }
        let sha = format!("{:040x}", state.commits.len() + 1);
        state.commits.push(FakeCommit {
            sha,
            message: message.to_string(),
            allow_empty,
        });
        state.staged = false;
        Ok(())
    }

    fn head_sha(&self) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(FakeCall::HeadSha);
        Ok(state.commits.last().map(|c| c.sha.clone()))
    }

    fn ensure_identity(&self, identity: &Identity) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(FakeCall::EnsureIdentity(identity.clone()));
        Ok(())
    }

    fn push(&self, remote: &str, refspec: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(FakeCall::Push {
            remote: remote.to_string(),
            refspec: refspec.to_string(),
        });
        match &self.push_failure {
            Some(failure) => Err(failure.clone().into_error(format!("push {remote} {refspec}"))),
            None => Ok(()),
        }
    }
}
