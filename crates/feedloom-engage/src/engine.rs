#![forbid(unsafe_code)]

//! The engagement toggle engine.
//!
//! Owns per-post, per-action engagement state (flag + counter), applies
//! toggles optimistically, and reconciles them against the remote system of
//! record. The engine is sans-IO: toggles stage [`RemoteCommand`]s in an
//! internal outbox, the host drains them with [`take_commands`], executes
//! them (see [`dispatch`](crate::dispatch)), and reports outcomes back via
//! [`resolve`].
//!
//! # Coalescing
//!
//! At most one confirmation exchange is ever outstanding per (post, action):
//!
//! - A toggle while a command is **staged** (outbox not yet drained) rewrites
//!   the staged command's direction, or cancels it outright when the taps
//!   return the visible state to the confirmed state. A rapid double tap in
//!   one pump interval therefore costs zero network exchanges.
//! - A toggle while an exchange is **in flight** marks it superseded. When
//!   it resolves, the engine fires at most one corrective exchange if the
//!   visible state still differs from the freshly confirmed state.
//!
//! # Invariants
//!
//! 1. At most one staged-or-in-flight exchange per (post, action).
//! 2. Every optimistic apply settles as commit or rollback; the engine never
//!    rests in a pending visual state once all exchanges resolve.
//! 3. State is partitioned per post; no toggle touches another post's slots.
//! 4. For a single (post, action), the last user intent wins once all
//!    in-flight exchanges settle.
//! 5. Counters saturate at zero; they never wrap.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Host unreachable | Toggle fails fast with `Unreachable`, no net state change |
//! | Unknown post | Toggle returns `Rejected` (stale caller snapshot) |
//! | Remote failure | Rollback to last confirmed values, `RolledBack` event, warn log |
//! | Resolution after eviction | Dropped silently (trace log) |
//!
//! [`take_commands`]: EngagementEngine::take_commands
//! [`resolve`]: EngagementEngine::resolve

use std::collections::VecDeque;
use std::fmt;

use ahash::AHashMap;
use tracing::{debug, trace, warn};

use crate::error::ToggleError;
use crate::events::{EngagementEvent, Subscribers, Subscription};
use crate::post::{EngagementAction, EngagementSeed, EngagementSnapshot, PostId};
use crate::remote::{OpTicket, RecordOp, RemoteCommand, RemoteError};

/// Confirmation lifecycle of one (post, action) pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    /// Visible state equals confirmed state (or a rollback restored it);
    /// no exchange outstanding.
    Idle,
    /// A command sits in the outbox, not yet handed to the dispatcher.
    /// Still fully cancellable.
    Staged { ticket: OpTicket, target: bool },
    /// The command was taken by the host; only its resolution can advance
    /// this slot. `superseded` records that a later toggle changed the
    /// intent while the exchange was outstanding.
    InFlight {
        ticket: OpTicket,
        target: bool,
        superseded: bool,
    },
}

/// Flag + counter for one action, tracked as confirmed and visible pairs.
#[derive(Clone, Copy, Debug)]
struct ActionSlot {
    confirmed_flag: bool,
    confirmed_count: u32,
    visible_flag: bool,
    visible_count: u32,
    phase: Phase,
}

impl ActionSlot {
    fn seeded(flag: bool, count: u32) -> Self {
        Self {
            confirmed_flag: flag,
            confirmed_count: count,
            visible_flag: flag,
            visible_count: count,
            phase: Phase::Idle,
        }
    }

    fn settled(&self) -> bool {
        self.visible_flag == self.confirmed_flag && self.visible_count == self.confirmed_count
    }
}

/// Both action slots of one registered post.
#[derive(Clone, Copy, Debug)]
struct PostSlots {
    like: ActionSlot,
    repost: ActionSlot,
}

impl PostSlots {
    fn from_seed(seed: &EngagementSeed) -> Self {
        Self {
            like: ActionSlot::seeded(seed.liked, seed.like_count),
            repost: ActionSlot::seeded(seed.reposted, seed.repost_count),
        }
    }

    fn slot_mut(&mut self, action: EngagementAction) -> &mut ActionSlot {
        match action {
            EngagementAction::Like => &mut self.like,
            EngagementAction::Repost => &mut self.repost,
        }
    }

    fn slot(&self, action: EngagementAction) -> &ActionSlot {
        match action {
            EngagementAction::Like => &self.like,
            EngagementAction::Repost => &self.repost,
        }
    }

    fn snapshot(&self) -> EngagementSnapshot {
        EngagementSnapshot {
            liked: self.like.visible_flag,
            like_count: self.like.visible_count,
            reposted: self.repost.visible_flag,
            repost_count: self.repost.visible_count,
        }
    }
}

/// What a toggle decided to do with the outbox, resolved after the slot
/// borrow ends.
enum StagePlan {
    /// Phase was idle: stage a fresh command toward `target`.
    Fresh { target: bool },
    /// Taps cancelled out before dispatch: drop the staged command.
    Cancel(OpTicket),
    /// Still divergent before dispatch: rewrite the staged direction.
    Redirect(OpTicket, RecordOp),
    /// An exchange is in flight; the intent was recorded as superseded.
    Superseded,
}

/// How a resolution settled, computed under the slot borrow.
enum ResolvePlan {
    Committed(EngagementSnapshot),
    Corrective { target: bool },
    RolledBack {
        state: EngagementSnapshot,
        error: ToggleError,
    },
    /// The failed exchange served an intent the user already abandoned;
    /// visible state never left the confirmed values.
    AbandonedFailure,
}

/// Per-post engagement registry with optimistic toggles.
///
/// Single logical owner: the engine is not `Sync` and is meant to live on
/// the host's UI thread. Only [`RemoteCommand`]s and completions cross
/// threads.
///
/// # Example
///
/// ```
/// use feedloom_engage::{EngagementEngine, EngagementSeed, PostId};
///
/// let mut engine = EngagementEngine::new();
/// engine.insert(EngagementSeed::new("p1").likes(5));
///
/// let id = PostId::new("p1");
/// let snap = engine.toggle_like(&id).unwrap();
/// assert!(snap.liked);
/// assert_eq!(snap.like_count, 6);
///
/// // One staged exchange for the dispatcher to run.
/// assert_eq!(engine.take_commands().len(), 1);
/// ```
pub struct EngagementEngine {
    posts: AHashMap<PostId, PostSlots>,
    outbox: VecDeque<RemoteCommand>,
    /// Ticket → owning (post, action) for exchanges handed to the host.
    in_flight: AHashMap<u64, (PostId, EngagementAction)>,
    subscribers: Subscribers,
    reachable: bool,
    next_ticket: u64,
}

impl EngagementEngine {
    /// Create an empty engine, assumed reachable.
    #[must_use]
    pub fn new() -> Self {
        Self {
            posts: AHashMap::new(),
            outbox: VecDeque::new(),
            in_flight: AHashMap::new(),
            subscribers: Subscribers::default(),
            reachable: true,
            next_ticket: 0,
        }
    }

    // ── Working set ─────────────────────────────────────────────────

    /// Register a post entering the feed's working set.
    ///
    /// Re-inserting an already-registered post replaces its state with the
    /// fresh seed and abandons any exchanges raised for the old state.
    pub fn insert(&mut self, seed: EngagementSeed) {
        let id = seed.id.clone();
        self.purge(&id);
        self.posts.insert(id, PostSlots::from_seed(&seed));
    }

    /// Remove a post leaving the working set.
    ///
    /// Staged commands are dropped and in-flight resolutions will be
    /// discarded silently when they arrive. Returns whether the post was
    /// registered.
    pub fn remove(&mut self, id: &PostId) -> bool {
        self.purge(id);
        self.posts.remove(id).is_some()
    }

    /// Whether a post is in the working set.
    #[must_use]
    pub fn contains(&self, id: &PostId) -> bool {
        self.posts.contains_key(id)
    }

    /// Number of registered posts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    /// Whether the working set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    fn purge(&mut self, id: &PostId) {
        self.outbox.retain(|cmd| cmd.post != *id);
        self.in_flight.retain(|_, owner| owner.0 != *id);
    }

    // ── Read side ───────────────────────────────────────────────────

    /// Current visible (optimistic) engagement state of a post.
    #[must_use]
    pub fn snapshot(&self, id: &PostId) -> Option<EngagementSnapshot> {
        self.posts.get(id).map(PostSlots::snapshot)
    }

    /// Whether a confirmation exchange is staged or in flight for this
    /// (post, action) pair.
    #[must_use]
    pub fn is_pending(&self, id: &PostId, action: EngagementAction) -> bool {
        self.posts
            .get(id)
            .is_some_and(|slots| slots.slot(action).phase != Phase::Idle)
    }

    /// Whether anything at all is staged or in flight.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.outbox.is_empty() || !self.in_flight.is_empty()
    }

    /// Observe state transitions. The callback fires on optimistic applies,
    /// commits, and rollbacks until the returned guard is dropped.
    pub fn subscribe(&self, callback: impl Fn(&EngagementEvent) + 'static) -> Subscription {
        self.subscribers.subscribe(callback)
    }

    // ── Connectivity ────────────────────────────────────────────────

    /// Connectivity hint from the host. While unreachable, toggles fail
    /// fast with [`ToggleError::Unreachable`] instead of staging exchanges
    /// that cannot be attempted.
    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    /// Current connectivity hint.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    // ── Toggles ─────────────────────────────────────────────────────

    /// Toggle the viewer's like on a post.
    ///
    /// Applies the flag/counter change immediately and returns the updated
    /// state so the view reflects intent without waiting on the network;
    /// the matching record mutation is staged for the dispatcher.
    pub fn toggle_like(&mut self, id: &PostId) -> Result<EngagementSnapshot, ToggleError> {
        self.toggle(id, EngagementAction::Like)
    }

    /// Toggle the viewer's repost on a post. Same contract as
    /// [`toggle_like`](Self::toggle_like).
    pub fn toggle_repost(&mut self, id: &PostId) -> Result<EngagementSnapshot, ToggleError> {
        self.toggle(id, EngagementAction::Repost)
    }

    fn toggle(
        &mut self,
        id: &PostId,
        action: EngagementAction,
    ) -> Result<EngagementSnapshot, ToggleError> {
        if !self.reachable {
            trace!(post = %id, %action, "toggle refused: host unreachable");
            return Err(ToggleError::Unreachable);
        }
        let Some(slots) = self.posts.get_mut(id) else {
            return Err(ToggleError::Rejected(format!("unknown post {id}")));
        };

        let slot = slots.slot_mut(action);
        let target = !slot.visible_flag;
        slot.visible_flag = target;
        slot.visible_count = if target {
            slot.visible_count.saturating_add(1)
        } else {
            slot.visible_count.saturating_sub(1)
        };

        let plan = match slot.phase {
            Phase::Idle => StagePlan::Fresh { target },
            Phase::Staged { ticket, .. } => {
                if slot.settled() {
                    slot.phase = Phase::Idle;
                    StagePlan::Cancel(ticket)
                } else {
                    slot.phase = Phase::Staged { ticket, target };
                    let op = if target {
                        RecordOp::Create
                    } else {
                        RecordOp::Delete
                    };
                    StagePlan::Redirect(ticket, op)
                }
            }
            Phase::InFlight { ticket, target: sent, .. } => {
                slot.phase = Phase::InFlight {
                    ticket,
                    target: sent,
                    superseded: true,
                };
                StagePlan::Superseded
            }
        };
        let state = slots.snapshot();

        match plan {
            StagePlan::Fresh { target } => {
                let ticket = self.alloc_ticket();
                self.stage(id.clone(), action, target, ticket);
            }
            StagePlan::Cancel(ticket) => {
                self.outbox.retain(|cmd| cmd.ticket != ticket);
                trace!(post = %id, %action, %ticket, "taps cancelled before dispatch; exchange dropped");
            }
            StagePlan::Redirect(ticket, op) => {
                if let Some(cmd) = self.outbox.iter_mut().find(|cmd| cmd.ticket == ticket) {
                    cmd.op = op;
                }
                trace!(post = %id, %action, %ticket, ?op, "staged exchange redirected");
            }
            StagePlan::Superseded => {
                trace!(post = %id, %action, "exchange in flight; intent superseded");
            }
        }

        self.subscribers.notify(&EngagementEvent::Toggled {
            post: id.clone(),
            action,
            state,
        });
        Ok(state)
    }

    // ── Host protocol ───────────────────────────────────────────────

    /// Drain staged commands for the dispatcher, marking them in flight.
    ///
    /// Each command must eventually come back through
    /// [`resolve`](Self::resolve) with its ticket, or stay unresolved
    /// forever only if the owning post is removed first.
    pub fn take_commands(&mut self) -> Vec<RemoteCommand> {
        let cmds: Vec<RemoteCommand> = self.outbox.drain(..).collect();
        for cmd in &cmds {
            self.in_flight
                .insert(cmd.ticket.id(), (cmd.post.clone(), cmd.action));
            if let Some(slots) = self.posts.get_mut(&cmd.post) {
                let slot = slots.slot_mut(cmd.action);
                if let Phase::Staged { ticket, target } = slot.phase
                    && ticket == cmd.ticket
                {
                    slot.phase = Phase::InFlight {
                        ticket,
                        target,
                        superseded: false,
                    };
                }
            }
        }
        cmds
    }

    /// Report the outcome of a dispatched command.
    ///
    /// Success confirms the exchange's intent (and fires at most one
    /// corrective exchange when the intent was superseded); failure rolls
    /// flag and counter back to their last confirmed values. Resolutions
    /// for unknown tickets or evicted posts are dropped silently.
    pub fn resolve(&mut self, ticket: OpTicket, result: Result<(), RemoteError>) {
        let Some((post, action)) = self.in_flight.remove(&ticket.id()) else {
            trace!(%ticket, "resolution for unknown ticket dropped");
            return;
        };
        let Some(slots) = self.posts.get_mut(&post) else {
            trace!(post = %post, %ticket, "post left the working set; resolution dropped");
            return;
        };

        let slot = slots.slot_mut(action);
        let (target, superseded) = match slot.phase {
            Phase::InFlight {
                ticket: t,
                target,
                superseded,
            } if t == ticket => (target, superseded),
            _ => {
                trace!(post = %post, %action, %ticket, "stale resolution dropped");
                return;
            }
        };

        let plan = match result {
            Ok(()) => {
                slot.confirmed_flag = target;
                slot.confirmed_count = if target {
                    slot.confirmed_count.saturating_add(1)
                } else {
                    slot.confirmed_count.saturating_sub(1)
                };
                if slot.settled() {
                    slot.phase = Phase::Idle;
                    ResolvePlan::Committed(slots.snapshot())
                } else {
                    // Superseded while in flight and still divergent: one
                    // corrective exchange toward the latest intent.
                    ResolvePlan::Corrective {
                        target: slots.slot(action).visible_flag,
                    }
                }
            }
            Err(err) => {
                let diverged = !slot.settled();
                slot.visible_flag = slot.confirmed_flag;
                slot.visible_count = slot.confirmed_count;
                slot.phase = Phase::Idle;
                if diverged {
                    ResolvePlan::RolledBack {
                        state: slots.snapshot(),
                        error: err.into(),
                    }
                } else {
                    ResolvePlan::AbandonedFailure
                }
            }
        };

        match plan {
            ResolvePlan::Committed(state) => {
                if superseded {
                    debug!(post = %post, %action, %ticket, "superseded exchange landed on the latest intent");
                } else {
                    debug!(post = %post, %action, %ticket, "exchange confirmed");
                }
                self.subscribers.notify(&EngagementEvent::Committed {
                    post,
                    action,
                    state,
                });
            }
            ResolvePlan::Corrective { target } => {
                let corrective = self.alloc_ticket();
                debug!(
                    post = %post, %action, superseded = %ticket, %corrective,
                    "intent superseded; firing corrective exchange"
                );
                self.stage(post, action, target, corrective);
            }
            ResolvePlan::RolledBack { state, error } => {
                warn!(post = %post, %action, %ticket, %error, "exchange failed; rolled back");
                self.subscribers.notify(&EngagementEvent::RolledBack {
                    post,
                    action,
                    state,
                    error,
                });
            }
            ResolvePlan::AbandonedFailure => {
                trace!(
                    post = %post, %action, %ticket, discarded = %ToggleError::Superseded,
                    "failed exchange served an abandoned intent; nothing to roll back"
                );
            }
        }
    }

    fn stage(&mut self, post: PostId, action: EngagementAction, target: bool, ticket: OpTicket) {
        let op = if target {
            RecordOp::Create
        } else {
            RecordOp::Delete
        };
        if let Some(slots) = self.posts.get_mut(&post) {
            slots.slot_mut(action).phase = Phase::Staged { ticket, target };
        }
        trace!(post = %post, %action, %ticket, ?op, "exchange staged");
        self.outbox.push_back(RemoteCommand {
            ticket,
            post,
            action,
            op,
        });
    }

    fn alloc_ticket(&mut self) -> OpTicket {
        self.next_ticket += 1;
        OpTicket(self.next_ticket)
    }
}

impl Default for EngagementEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EngagementEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngagementEngine")
            .field("posts", &self.posts.len())
            .field("staged", &self.outbox.len())
            .field("in_flight", &self.in_flight.len())
            .field("reachable", &self.reachable)
            .finish()
    }
}
