//! The trigger run: stage, commit (empty if need be), optionally push.
//!
//! A successful [`CommitTrigger::run`] always appends exactly one commit to
//! the current branch. When nothing is staged the commit is empty, so two
//! back-to-back runs give two commits instead of a "nothing to commit"
//! failure.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::clock::{time_label, Clock};
use crate::config::TriggerConfig;
use crate::error::Result;
use crate::obs::{
    emit_committed, emit_pushed, emit_stage_skipped, emit_trigger_finished,
    emit_trigger_started, RunSpan,
};
use crate::vcs::VersionControl;

/// Text every trigger commit message carries.
pub const TRIGGER_MARKER: &str = "trigger CI run";

/// Marker appended to the message of a commit that carries no changes.
pub const EMPTY_MARKER: &str = "(empty)";

/// What happened when staging the designated subdirectory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    Staged { path: PathBuf },
    /// Staging failed (path missing, pathspec rejected, ...). Not fatal.
    Skipped { path: PathBuf, reason: String },
}

impl StageOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, StageOutcome::Skipped { .. })
    }
}

/// Whether the trigger commit carried staged content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitKind {
    WithChanges,
    Empty,
}

impl CommitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitKind::WithChanges => "with_changes",
            CommitKind::Empty => "empty",
        }
    }
}

/// The commit a run is about to make. Built once, consumed by the commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAttempt {
    pub timestamp: DateTime<Local>,
    pub has_staged_changes: bool,
    pub message: String,
}

impl CommitAttempt {
    pub fn new(timestamp: DateTime<Local>, has_staged_changes: bool, prefix: &str) -> Self {
        let label = time_label(&timestamp);
        let head = message_head(prefix);
        let message = if has_staged_changes {
            format!("{head} @ {label}")
        } else {
            format!("{head} @ {label} {EMPTY_MARKER}")
        };
        Self {
            timestamp,
            has_staged_changes,
            message,
        }
    }

    pub fn label(&self) -> String {
        time_label(&self.timestamp)
    }

    pub fn kind(&self) -> CommitKind {
        if self.has_staged_changes {
            CommitKind::WithChanges
        } else {
            CommitKind::Empty
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerReport {
    pub timestamp: DateTime<Local>,
    pub label: String,
    pub stage: StageOutcome,
    pub kind: CommitKind,
    pub message: String,
    pub head_before: Option<String>,
    pub head_after: Option<String>,
    pub pushed: bool,
}

/// Produces one commit per invocation against a [`VersionControl`].
pub struct CommitTrigger<V, C> {
    vcs: V,
    clock: C,
    config: TriggerConfig,
}

impl<V: VersionControl, C: Clock> CommitTrigger<V, C> {
    pub fn new(vcs: V, clock: C, config: TriggerConfig) -> Self {
        Self { vcs, clock, config }
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Run once, narrating each phase to `progress`.
    ///
    /// Staging failures are recorded in the report and the run continues.
    /// Any other failure aborts immediately and is returned as is.
    pub fn run(&self, progress: &mut dyn Write) -> Result<TriggerReport> {
        let started = Instant::now();
        let timestamp = self.clock.now();
        let label = time_label(&timestamp);
        let _span = RunSpan::enter(&label);

        let head_before = self.vcs.head_sha()?;
        emit_trigger_started(&self.config.stage_path, head_before.as_deref());

        if let Some(identity) = &self.config.identity {
            self.vcs.ensure_identity(identity)?;
        }

        writeln!(progress, "Staging {} ...", self.config.stage_path.display())?;
        let stage = self.stage(&self.config.stage_path);
        match &stage {
            StageOutcome::Staged { path } => {
                writeln!(progress, "Staged {}", path.display())?;
            }
            StageOutcome::Skipped { path, reason } => {
                writeln!(
                    progress,
                    "Skipped staging {} ({reason}), continuing",
                    path.display()
                )?;
            }
        }

        let attempt = CommitAttempt::new(
            timestamp,
            self.vcs.has_staged_changes()?,
            &self.config.message_prefix,
        );
        let kind = attempt.kind();
        match kind {
            CommitKind::Empty => writeln!(
                progress,
                "No staged changes, creating empty commit: {}",
                attempt.message
            )?,
            CommitKind::WithChanges => writeln!(
                progress,
                "Committing staged changes: {}",
                attempt.message
            )?,
        }
        self.vcs.commit(&attempt.message, kind == CommitKind::Empty)?;
        emit_committed(kind, &attempt.message);

        let push = &self.config.push;
        if push.enabled {
            writeln!(progress, "Pushing {} to {} ...", push.refspec, push.remote)?;
            self.vcs.push(&push.remote, &push.refspec)?;
            emit_pushed(&push.remote, &push.refspec);
        }

        let head_after = self.vcs.head_sha()?;
        emit_trigger_finished(
            head_after.as_deref(),
            started.elapsed().as_millis() as u64,
        );
        writeln!(
            progress,
            "Done: new commit {} is ready for the CI observer",
            head_after.as_deref().map(short_sha).unwrap_or("(unknown)")
        )?;

        Ok(TriggerReport {
            timestamp,
            label,
            stage,
            kind,
            message: attempt.message,
            head_before,
            head_after,
            pushed: push.enabled,
        })
    }

    fn stage(&self, path: &Path) -> StageOutcome {
        match self.vcs.stage_directory(path) {
            Ok(()) => StageOutcome::Staged {
                path: path.to_path_buf(),
            },
            Err(err) => {
                let reason = err
                    .tool_stderr()
                    .and_then(|s| s.lines().next())
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string());
                emit_stage_skipped(path, &reason);
                StageOutcome::Skipped {
                    path: path.to_path_buf(),
                    reason,
                }
            }
        }
    }
}

/// A configured prefix that lacks [`TRIGGER_MARKER`] is tagged onto it
/// rather than replacing it.
fn message_head(prefix: &str) -> String {
    let prefix = prefix.trim();
    if prefix.contains(TRIGGER_MARKER) {
        prefix.to_string()
    } else if prefix.is_empty() {
        TRIGGER_MARKER.to_string()
    } else {
        format!("{TRIGGER_MARKER} [{prefix}]")
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..12).unwrap_or(sha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::PushConfig;
    use crate::fakes::{FakeCall, FakeVcs};
    use crate::vcs::Identity;
    use chrono::TimeZone;

    fn clock() -> FixedClock {
        FixedClock(Local.with_ymd_and_hms(2024, 5, 1, 14, 3, 27).unwrap())
    }

    fn run(trigger: &CommitTrigger<FakeVcs, FixedClock>) -> (Result<TriggerReport>, String) {
        let mut out = Vec::new();
        let result = trigger.run(&mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_attempt_message_embeds_label() {
        let at = clock().0;
        let with = CommitAttempt::new(at, true, "trigger CI run");
        assert_eq!(with.message, "trigger CI run @ 14:03:27");
        assert_eq!(with.kind(), CommitKind::WithChanges);
        assert_eq!(with.label(), "14:03:27");

        let empty = CommitAttempt::new(at, false, "trigger CI run");
        assert_eq!(empty.message, "trigger CI run @ 14:03:27 (empty)");
        assert_eq!(empty.kind(), CommitKind::Empty);
    }

    #[test]
    fn test_prefix_without_marker_keeps_marker() {
        let at = clock().0;
        let attempt = CommitAttempt::new(at, false, "nightly");
        assert_eq!(attempt.message, "trigger CI run [nightly] @ 14:03:27 (empty)");

        let attempt = CommitAttempt::new(at, true, "  ");
        assert_eq!(attempt.message, "trigger CI run @ 14:03:27");
    }

    #[test]
    fn test_configured_prefix_from_toml_keeps_marker() {
        let config =
            TriggerConfig::from_toml_str("message_prefix = \"nightly\"", Path::new("x.toml"))
                .unwrap();
        let trigger = CommitTrigger::new(FakeVcs::new(), clock(), config);
        let report = run(&trigger).0.unwrap();

        assert!(report.message.contains(TRIGGER_MARKER));
        assert!(report.message.contains("nightly"));
        assert!(trigger.vcs().commits()[0].message.contains(TRIGGER_MARKER));
    }

    #[test]
    fn test_clean_tree_makes_empty_commit() {
        let trigger = CommitTrigger::new(FakeVcs::new(), clock(), TriggerConfig::default());
        let (result, out) = run(&trigger);
        let report = result.unwrap();

        assert_eq!(report.kind, CommitKind::Empty);
        assert!(report.message.contains("trigger CI run"));
        assert!(report.message.ends_with(EMPTY_MARKER));
        assert_eq!(trigger.vcs().commits().len(), 1);
        assert!(trigger.vcs().commits()[0].allow_empty);
        assert!(out.contains("No staged changes"));
        assert!(out.contains("Done:"));
    }

    #[test]
    fn test_staged_changes_make_normal_commit() {
        let vcs = FakeVcs::new().with_pending("tests");
        let trigger = CommitTrigger::new(vcs, clock(), TriggerConfig::default());
        let (result, out) = run(&trigger);
        let report = result.unwrap();

        assert_eq!(report.kind, CommitKind::WithChanges);
        assert_eq!(
            report.stage,
            StageOutcome::Staged {
                path: PathBuf::from("tests")
            }
        );
        let commits = trigger.vcs().commits();
        assert_eq!(commits.len(), 1);
        assert!(!commits[0].allow_empty);
        assert!(out.contains("Committing staged changes"));
    }

    #[test]
    fn test_prestaged_changes_commit_even_if_staging_skips() {
        let vcs = FakeVcs::new().with_staged().failing_stage("pathspec 'tests' did not match");
        let trigger = CommitTrigger::new(vcs, clock(), TriggerConfig::default());
        let report = run(&trigger).0.unwrap();
        assert!(report.stage.is_skipped());
        assert_eq!(report.kind, CommitKind::WithChanges);
    }

    #[test]
    fn test_stage_failure_is_skipped_not_fatal() {
        let vcs = FakeVcs::new().failing_stage("fatal: pathspec 'tests' did not match any files");
        let trigger = CommitTrigger::new(vcs, clock(), TriggerConfig::default());
        let (result, out) = run(&trigger);
        let report = result.unwrap();

        match &report.stage {
            StageOutcome::Skipped { path, reason } => {
                assert_eq!(path, Path::new("tests"));
                assert!(reason.contains("did not match"));
            }
            other => panic!("expected skip, got {other:?}"),
        }
        assert_eq!(report.kind, CommitKind::Empty);
        assert_eq!(trigger.vcs().commits().len(), 1);
        assert!(out.contains("Skipped staging tests"));
    }

    #[test]
    fn test_commit_failure_is_fatal() {
        let vcs = FakeVcs::new().failing_commit(128, "Author identity unknown");
        let trigger = CommitTrigger::new(vcs, clock(), TriggerConfig::default());
        let err = run(&trigger).0.unwrap_err();

        assert_eq!(err.exit_code(), 128);
        assert_eq!(err.tool_stderr(), Some("Author identity unknown"));
        assert!(trigger.vcs().commits().is_empty());
        assert!(!trigger
            .vcs()
            .calls()
            .iter()
            .any(|c| matches!(c, FakeCall::Push { .. })));
    }

    #[test]
    fn test_two_runs_give_two_commits() {
        let trigger = CommitTrigger::new(FakeVcs::new(), clock(), TriggerConfig::default());
        let first = run(&trigger).0.unwrap();
        let second = run(&trigger).0.unwrap();

        assert_eq!(trigger.vcs().commits().len(), 2);
        assert_ne!(first.head_after, second.head_after);
        assert_eq!(second.head_before, first.head_after);
        // Same second, same label.
        assert_eq!(first.label, second.label);
    }

    #[test]
    fn test_push_is_off_by_default() {
        let trigger = CommitTrigger::new(FakeVcs::new(), clock(), TriggerConfig::default());
        let report = run(&trigger).0.unwrap();
        assert!(!report.pushed);
        assert!(!trigger
            .vcs()
            .calls()
            .iter()
            .any(|c| matches!(c, FakeCall::Push { .. })));
    }

    #[test]
    fn test_push_when_enabled() {
        let config = TriggerConfig {
            push: PushConfig {
                enabled: true,
                ..PushConfig::default()
            },
            ..TriggerConfig::default()
        };
        let trigger = CommitTrigger::new(FakeVcs::new(), clock(), config);
        let (result, out) = run(&trigger);
        assert!(result.unwrap().pushed);
        assert!(trigger.vcs().calls().contains(&FakeCall::Push {
            remote: "origin".to_string(),
            refspec: "HEAD".to_string(),
        }));
        assert!(out.contains("Pushing HEAD to origin"));
    }

    #[test]
    fn test_push_failure_is_fatal_after_commit() {
        let config = TriggerConfig {
            push: PushConfig {
                enabled: true,
                ..PushConfig::default()
            },
            ..TriggerConfig::default()
        };
        let vcs = FakeVcs::new().failing_push(1, "could not read from remote");
        let trigger = CommitTrigger::new(vcs, clock(), config);
        let err = run(&trigger).0.unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert_eq!(trigger.vcs().commits().len(), 1);
    }

    #[test]
    fn test_identity_is_ensured_before_commit() {
        let identity = Identity {
            name: "CI Trigger Bot".to_string(),
            email: "ci-trigger@example.com".to_string(),
        };
        let config = TriggerConfig {
            identity: Some(identity.clone()),
            ..TriggerConfig::default()
        };
        let trigger = CommitTrigger::new(FakeVcs::new(), clock(), config);
        run(&trigger).0.unwrap();

        let calls = trigger.vcs().calls();
        let ensure = calls
            .iter()
            .position(|c| *c == FakeCall::EnsureIdentity(identity.clone()))
            .unwrap();
        let commit = calls
            .iter()
            .position(|c| matches!(c, FakeCall::Commit { .. }))
            .unwrap();
        assert!(ensure < commit);
    }

    #[test]
    fn test_custom_prefix_and_stage_path() {
        let config = TriggerConfig {
            stage_path: PathBuf::from("ci/generated"),
            message_prefix: "trigger CI run [nightly]".to_string(),
            ..TriggerConfig::default()
        };
        let trigger = CommitTrigger::new(FakeVcs::new(), clock(), config);
        let report = run(&trigger).0.unwrap();
        assert_eq!(report.message, "trigger CI run [nightly] @ 14:03:27 (empty)");
        assert!(trigger
            .vcs()
            .calls()
            .contains(&FakeCall::Stage(PathBuf::from("ci/generated"))));
    }
}
