//! ci-trigger core library
//!
//! Produces one git commit per run (an empty one when nothing is staged) so
//! that an external CI observer watching the repository starts a build.

pub mod clock;
pub mod config;
pub mod error;
pub mod fakes;
pub mod git;
pub mod obs;
pub mod telemetry;
pub mod trigger;
pub mod vcs;

pub use clock::{time_label, Clock, FixedClock, SystemClock};
pub use config::{PushConfig, TriggerConfig, DEFAULT_CONFIG_FILE};
pub use error::{Result, TriggerError};
pub use git::GitCli;
pub use obs::{
    emit_committed, emit_pushed, emit_stage_skipped, emit_trigger_finished,
    emit_trigger_started, RunSpan,
};
pub use telemetry::init_tracing;
pub use trigger::{
    CommitAttempt, CommitKind, CommitTrigger, StageOutcome, TriggerReport, EMPTY_MARKER,
    TRIGGER_MARKER,
};
pub use vcs::{Identity, VersionControl};

/// ci-trigger version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
