#![forbid(unsafe_code)]

//! Change notification for engagement state.
//!
//! The engine is an explicit value store, not an implicit reactive runtime:
//! callers that need to observe asynchronous resolution (commit or rollback
//! after the optimistic return) register a callback and hold the returned
//! RAII [`Subscription`].
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//! 3. Notification never re-enters the engine: events carry plain value
//!    snapshots only.
//!
//! # Failure Modes
//!
//! - Callback panic: propagates to the caller of the mutating engine method.
//! - Subscription outliving the engine: drop becomes a no-op.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::error::ToggleError;
use crate::post::{EngagementAction, EngagementSnapshot, PostId};

/// A state transition on one (post, action) pair.
#[derive(Clone, Debug, PartialEq)]
pub enum EngagementEvent {
    /// An optimistic toggle was applied locally; confirmation is pending
    /// (or was coalesced away entirely).
    Toggled {
        /// The post that changed.
        post: PostId,
        /// Which control was toggled.
        action: EngagementAction,
        /// Visible state after the toggle.
        state: EngagementSnapshot,
    },
    /// The remote confirmed the in-flight intent; visible state is now
    /// also the confirmed state for this action.
    Committed {
        /// The post that settled.
        post: PostId,
        /// Which control settled.
        action: EngagementAction,
        /// Visible state after the commit.
        state: EngagementSnapshot,
    },
    /// The remote failed; flag and counter were rolled back to their last
    /// confirmed values.
    RolledBack {
        /// The post that rolled back.
        post: PostId,
        /// Which control rolled back.
        action: EngagementAction,
        /// Visible state after the rollback (the pre-toggle values).
        state: EngagementSnapshot,
        /// Why the exchange failed.
        error: ToggleError,
    },
}

impl EngagementEvent {
    /// The post this event concerns.
    #[must_use]
    pub fn post(&self) -> &PostId {
        match self {
            Self::Toggled { post, .. }
            | Self::Committed { post, .. }
            | Self::RolledBack { post, .. } => post,
        }
    }

    /// The action this event concerns.
    #[must_use]
    pub fn action(&self) -> EngagementAction {
        match self {
            Self::Toggled { action, .. }
            | Self::Committed { action, .. }
            | Self::RolledBack { action, .. } => *action,
        }
    }

    /// Visible engagement state after the transition.
    #[must_use]
    pub fn state(&self) -> EngagementSnapshot {
        match self {
            Self::Toggled { state, .. }
            | Self::Committed { state, .. }
            | Self::RolledBack { state, .. } => *state,
        }
    }
}

type Callback = Rc<dyn Fn(&EngagementEvent)>;
type SubscriberList = RefCell<Vec<(u64, Callback)>>;

/// Subscriber registry owned by the engine.
#[derive(Default)]
pub(crate) struct Subscribers {
    list: Rc<SubscriberList>,
    next_id: Cell<u64>,
}

impl Subscribers {
    pub(crate) fn subscribe(&self, callback: impl Fn(&EngagementEvent) + 'static) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.list.borrow_mut().push((id, Rc::new(callback)));
        Subscription {
            id,
            list: Rc::downgrade(&self.list),
        }
    }

    pub(crate) fn notify(&self, event: &EngagementEvent) {
        // Snapshot the callbacks so a subscriber dropping its Subscription
        // mid-notification cannot invalidate the iteration.
        let callbacks: Vec<Callback> = self
            .list
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for cb in callbacks {
            cb(event);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.list.borrow().len()
    }
}

/// RAII guard for an engagement subscription.
///
/// Dropping the guard unsubscribes the callback.
pub struct Subscription {
    id: u64,
    list: Weak<SubscriberList>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(list) = self.list.upgrade() {
            list.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggled(post: &str) -> EngagementEvent {
        EngagementEvent::Toggled {
            post: PostId::new(post),
            action: EngagementAction::Like,
            state: EngagementSnapshot::default(),
        }
    }

    #[test]
    fn notify_reaches_subscriber() {
        let subs = Subscribers::default();
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let _sub = subs.subscribe(move |_| s.set(s.get() + 1));

        subs.notify(&toggled("p1"));
        subs.notify(&toggled("p1"));
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn drop_unsubscribes() {
        let subs = Subscribers::default();
        let seen = Rc::new(Cell::new(0));
        {
            let s = Rc::clone(&seen);
            let _sub = subs.subscribe(move |_| s.set(s.get() + 1));
            subs.notify(&toggled("p1"));
        }
        subs.notify(&toggled("p1"));
        assert_eq!(seen.get(), 1, "callback must not fire after drop");
        assert_eq!(subs.len(), 0);
    }

    #[test]
    fn registration_order_preserved() {
        let subs = Subscribers::default();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = Rc::clone(&order);
        let _a = subs.subscribe(move |_| o.borrow_mut().push("a"));
        let o = Rc::clone(&order);
        let _b = subs.subscribe(move |_| o.borrow_mut().push("b"));

        subs.notify(&toggled("p1"));
        assert_eq!(*order.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn subscription_outlives_registry() {
        let sub;
        {
            let subs = Subscribers::default();
            sub = subs.subscribe(|_| {});
        }
        drop(sub); // must not panic
    }

    #[test]
    fn event_accessors() {
        let ev = EngagementEvent::RolledBack {
            post: PostId::new("p9"),
            action: EngagementAction::Repost,
            state: EngagementSnapshot {
                repost_count: 4,
                ..Default::default()
            },
            error: ToggleError::Unreachable,
        };
        assert_eq!(ev.post().as_str(), "p9");
        assert_eq!(ev.action(), EngagementAction::Repost);
        assert_eq!(ev.state().repost_count, 4);
    }
}
