#![forbid(unsafe_code)]

//! Error taxonomy for engagement toggles.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `Unreachable` | Remote call could not be attempted or dispatched | Fast fail, rollback, returned from the toggle |
//! | `Rejected` | Remote refused the mutation, or the caller toggled a post outside the working set | Rollback, returned or surfaced via events |
//! | `Superseded` | An in-flight op was abandoned for a later intent | Internal only: events and logs, never a toggle result |
//!
//! Nothing here is fatal to the process; every failure is per-operation and
//! recoverable by the user retrying the tap.

use core::fmt;

/// Errors produced by the engagement toggle engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ToggleError {
    /// The remote call could not be attempted or dispatched.
    Unreachable,
    /// The remote call was refused, or the post is unknown to the engine.
    Rejected(String),
    /// An in-flight operation was abandoned in favor of a later intent.
    ///
    /// Tracked internally through events and logs; `toggle_like` /
    /// `toggle_repost` never return this variant.
    Superseded,
}

impl fmt::Display for ToggleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable => write!(f, "remote unreachable"),
            Self::Rejected(reason) => write!(f, "remote rejected: {reason}"),
            Self::Superseded => write!(f, "operation superseded by a later toggle"),
        }
    }
}

impl std::error::Error for ToggleError {}
