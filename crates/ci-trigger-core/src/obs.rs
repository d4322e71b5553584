//! Structured tracing events for the trigger run lifecycle.
//!
//! Every event carries an `event` field (`trigger.started`,
//! `trigger.committed`, ...) so JSON logs can be filtered by kind.

use std::path::Path;

use tracing::{info, warn};

use crate::trigger::CommitKind;

/// RAII guard that keeps a `trigger.run` span entered for one run.
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the run's time label.
    pub fn enter(label: &str) -> Self {
        let span = tracing::info_span!("trigger.run", label = %label);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: run started, with the staging target and the HEAD it starts from.
pub fn emit_trigger_started(stage_path: &Path, head: Option<&str>) {
    info!(
        event = "trigger.started",
        stage_path = %stage_path.display(),
        head = head.unwrap_or("(unborn)"),
    );
}

/// Emit event: staging failed and was skipped (warning level).
pub fn emit_stage_skipped(stage_path: &Path, reason: &str) {
    warn!(
        event = "trigger.stage_skipped",
        stage_path = %stage_path.display(),
        reason = %reason,
    );
}

/// Emit event: trigger commit created.
///
/// ```ignore
/// emit_committed(CommitKind::Empty, "trigger CI run @ 10:00:00 (empty)");
/// // logs: event=trigger.committed kind=empty message=...
/// ```
pub fn emit_committed(kind: CommitKind, message: &str) {
    info!(event = "trigger.committed", kind = kind.as_str(), message = %message);
}

/// Emit event: commit pushed to the remote.
pub fn emit_pushed(remote: &str, refspec: &str) {
    info!(event = "trigger.pushed", remote = %remote, refspec = %refspec);
}

/// Emit event: run finished, with the new HEAD and wall-clock duration.
pub fn emit_trigger_finished(head: Option<&str>, duration_ms: u64) {
    info!(
        event = "trigger.finished",
        head = head.unwrap_or("(unknown)"),
        duration_ms = duration_ms,
    );
}
