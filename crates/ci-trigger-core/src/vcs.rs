//! The version-control collaborator a trigger run drives.
//!
//! `CommitTrigger` only sees success or failure from these calls; it never
//! interprets repository internals. [`crate::git::GitCli`] is the real
//! implementation, [`crate::fakes::FakeVcs`] the in-memory one.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Committer identity written into the working copy when none is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

/// Operations a trigger run performs against a working copy.
pub trait VersionControl {
    /// Mark everything under `path` for inclusion in the next commit.
    fn stage_directory(&self, path: &Path) -> Result<()>;

    /// Whether the index differs from HEAD.
    fn has_staged_changes(&self) -> Result<bool>;

    /// Record a commit. `allow_empty` permits a commit with no content delta.
    fn commit(&self, message: &str, allow_empty: bool) -> Result<()>;

    /// Current HEAD commit, `None` on a branch with no commits yet.
    fn head_sha(&self) -> Result<Option<String>>;

    /// Fill in `user.name` / `user.email` where the working copy lacks them.
    /// Values that are already configured stay as they are.
    fn ensure_identity(&self, identity: &Identity) -> Result<()>;

    /// Publish `refspec` to `remote`.
    fn push(&self, remote: &str, refspec: &str) -> Result<()>;
}
