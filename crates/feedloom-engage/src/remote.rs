#![forbid(unsafe_code)]

//! The remote system-of-record boundary.
//!
//! The remote persists two independent record types — like records and
//! repost records — each supporting create and delete keyed by
//! (viewer, post). The engine never talks to it directly: toggles stage
//! [`RemoteCommand`]s in an outbox, and a driver (see
//! [`dispatch`](crate::dispatch)) executes them against a [`RecordStore`].
//!
//! # Invariants
//!
//! 1. **Idempotent remote semantics**: implementations must treat
//!    create-of-duplicate and delete-of-nonexistent as success. Supersession
//!    relies on this — a corrective exchange may re-assert a state the
//!    server already holds.
//! 2. One command carries exactly one record mutation; the engine never
//!    batches two actions into one exchange.

use core::fmt;

use crate::error::ToggleError;
use crate::post::{EngagementAction, PostId};

/// The remote record type backing an engagement action.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RecordKind {
    /// A like record for (viewer, post).
    Like,
    /// A repost record for (viewer, post).
    Repost,
}

impl From<EngagementAction> for RecordKind {
    fn from(action: EngagementAction) -> Self {
        match action {
            EngagementAction::Like => Self::Like,
            EngagementAction::Repost => Self::Repost,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Like => f.write_str("like"),
            Self::Repost => f.write_str("repost"),
        }
    }
}

/// Mutation direction for a record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecordOp {
    /// Create the record (flag transitioned false → true).
    Create,
    /// Delete the record (flag transitioned true → false).
    Delete,
}

/// Failures reported by a [`RecordStore`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RemoteError {
    /// The store could not be reached at all.
    Unreachable,
    /// The store reached a decision and refused (invalid post, permission
    /// denied, rate limited...).
    Rejected(String),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable => write!(f, "record store unreachable"),
            Self::Rejected(reason) => write!(f, "record store rejected: {reason}"),
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<RemoteError> for ToggleError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unreachable => Self::Unreachable,
            RemoteError::Rejected(reason) => Self::Rejected(reason),
        }
    }
}

/// Handle identifying one staged or in-flight confirmation exchange.
///
/// Tickets are unique per engine instance and never reused.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct OpTicket(pub(crate) u64);

impl OpTicket {
    /// The raw ticket value.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OpTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// One remote mutation the engine wants performed.
///
/// Taken from the engine via
/// [`take_commands`](crate::EngagementEngine::take_commands) and resolved
/// back via [`resolve`](crate::EngagementEngine::resolve) with the same
/// ticket.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemoteCommand {
    /// Ticket to hand back on resolution.
    pub ticket: OpTicket,
    /// The post whose record is mutated.
    pub post: PostId,
    /// The action the record backs.
    pub action: EngagementAction,
    /// Create or delete.
    pub op: RecordOp,
}

impl RemoteCommand {
    /// The record kind this command targets.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.action.into()
    }
}

/// The remote system of record, as seen from the toggle contract.
///
/// Implementations are invoked from the dispatcher's worker thread and may
/// block. They must honor idempotent semantics (module docs, invariant 1).
pub trait RecordStore: Send + Sync {
    /// Create the (viewer, post) record of the given kind.
    fn create_record(&self, kind: RecordKind, post: &PostId) -> Result<(), RemoteError>;

    /// Delete the (viewer, post) record of the given kind.
    fn delete_record(&self, kind: RecordKind, post: &PostId) -> Result<(), RemoteError>;

    /// Execute one command against the store.
    fn apply(&self, cmd: &RemoteCommand) -> Result<(), RemoteError> {
        match cmd.op {
            RecordOp::Create => self.create_record(cmd.kind(), &cmd.post),
            RecordOp::Delete => self.delete_record(cmd.kind(), &cmd.post),
        }
    }
}
