#![forbid(unsafe_code)]

//! feedloom-engage: optimistic engagement toggles for Feedloom post cards.
//!
//! A post card renders two stateful engagement controls, like and repost,
//! each backed by a per-viewer record in the remote system of record. A tap
//! must feel instant, so the [`EngagementEngine`] applies every toggle
//! optimistically and reconciles with the remote afterwards: success
//! commits, failure rolls back, and rapid re-taps coalesce so the wire
//! never carries more than one outstanding exchange per (post, action).
//!
//! The engine is sans-IO. It stages [`RemoteCommand`]s in an outbox; a host
//! drains them with [`EngagementEngine::take_commands`], runs them against
//! a [`RecordStore`], and reports back with [`EngagementEngine::resolve`].
//! [`EngagementSession`] packages that loop with a worker-thread
//! [`RemoteDispatcher`] for hosts that just want the assembled pair.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use feedloom_engage::{
//!     EngagementSeed, EngagementSession, PostId, RecordKind, RecordStore, RemoteError,
//! };
//!
//! struct AlwaysOk;
//! impl RecordStore for AlwaysOk {
//!     fn create_record(&self, _: RecordKind, _: &PostId) -> Result<(), RemoteError> {
//!         Ok(())
//!     }
//!     fn delete_record(&self, _: RecordKind, _: &PostId) -> Result<(), RemoteError> {
//!         Ok(())
//!     }
//! }
//!
//! let mut session = EngagementSession::connect(Arc::new(AlwaysOk)).unwrap();
//! session.engine_mut().insert(EngagementSeed::new("p1").likes(5));
//!
//! let snap = session.toggle_like(&PostId::new("p1")).unwrap();
//! assert_eq!(snap.like_count, 6); // reflected before the remote confirms
//!
//! assert!(session.settle(Duration::from_secs(1)));
//! ```

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod post;
pub mod remote;

pub use dispatch::{Completion, EngagementSession, RemoteDispatcher};
pub use engine::EngagementEngine;
pub use error::ToggleError;
pub use events::{EngagementEvent, Subscription};
pub use post::{EngagementAction, EngagementSeed, EngagementSnapshot, PostId};
pub use remote::{OpTicket, RecordKind, RecordOp, RecordStore, RemoteCommand, RemoteError};
