#![forbid(unsafe_code)]

//! Command dispatch against a live [`RecordStore`].
//!
//! [`RemoteDispatcher`] owns a worker thread that executes commands off the
//! UI thread; [`EngagementSession`] wires a dispatcher to an
//! [`EngagementEngine`] and pumps the two queues. The engine itself stays
//! single-threaded — only [`RemoteCommand`]s and [`Completion`]s cross the
//! channel boundary.
//!
//! # Invariants
//!
//! 1. Commands are executed in the order they were dispatched.
//! 2. Every dispatched command yields exactly one [`Completion`] (unless the
//!    dispatcher is dropped first).
//! 3. Dropping the dispatcher closes the command channel and joins the
//!    worker; no thread leaks.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Worker thread gone | `dispatch` fails; the session resolves the command as unreachable |
//! | Store call blocks | Later commands queue behind it; `settle` bounds the wait with its timeout |

use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::engine::EngagementEngine;
use crate::error::ToggleError;
use crate::post::{EngagementSnapshot, PostId};
use crate::remote::{OpTicket, RecordStore, RemoteCommand, RemoteError};

/// Outcome of one dispatched command, ready to feed back into
/// [`EngagementEngine::resolve`].
#[derive(Clone, Debug)]
pub struct Completion {
    /// Ticket of the command that finished.
    pub ticket: OpTicket,
    /// What the store said.
    pub result: Result<(), RemoteError>,
}

/// Executes [`RemoteCommand`]s on a dedicated worker thread.
pub struct RemoteDispatcher {
    commands: Option<Sender<RemoteCommand>>,
    completions: Receiver<Completion>,
    worker: Option<JoinHandle<()>>,
}

impl RemoteDispatcher {
    /// Spawn the worker thread over the given store.
    pub fn spawn(store: Arc<dyn RecordStore>) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<RemoteCommand>();
        let (done_tx, done_rx) = mpsc::channel::<Completion>();
        let worker = thread::Builder::new()
            .name("feedloom-remote".into())
            .spawn(move || {
                while let Ok(cmd) = cmd_rx.recv() {
                    trace!(ticket = %cmd.ticket, post = %cmd.post, action = %cmd.action, "executing");
                    let result = store.apply(&cmd);
                    let done = Completion {
                        ticket: cmd.ticket,
                        result,
                    };
                    if done_tx.send(done).is_err() {
                        // Dispatcher dropped; nobody wants the rest.
                        break;
                    }
                }
            })?;
        Ok(Self {
            commands: Some(cmd_tx),
            completions: done_rx,
            worker: Some(worker),
        })
    }

    /// Queue a command for execution.
    pub fn dispatch(&self, cmd: RemoteCommand) -> Result<(), ToggleError> {
        let Some(tx) = self.commands.as_ref() else {
            return Err(ToggleError::Unreachable);
        };
        tx.send(cmd).map_err(|_| ToggleError::Unreachable)
    }

    /// Drain every completion that has already arrived, without blocking.
    #[must_use]
    pub fn poll(&self) -> Vec<Completion> {
        self.completions.try_iter().collect()
    }

    /// Block for the next completion, up to `timeout`.
    #[must_use]
    pub fn recv(&self, timeout: Duration) -> Option<Completion> {
        match self.completions.recv_timeout(timeout) {
            Ok(done) => Some(done),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("dispatcher worker exited with completions outstanding");
                None
            }
        }
    }
}

impl Drop for RemoteDispatcher {
    fn drop(&mut self) {
        // Closing the command channel ends the worker's recv loop.
        self.commands.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl std::fmt::Debug for RemoteDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteDispatcher")
            .field("alive", &self.commands.is_some())
            .finish()
    }
}

/// An [`EngagementEngine`] wired to a [`RemoteDispatcher`].
///
/// The session is the host-facing assembly: toggles go straight to the
/// engine (optimistic, synchronous), and [`pump`](Self::pump) moves work
/// across the thread boundary in both directions. Hosts with an event loop
/// call `pump` once per frame; tests and shutdown paths use
/// [`settle`](Self::settle).
#[derive(Debug)]
pub struct EngagementSession {
    engine: EngagementEngine,
    dispatcher: RemoteDispatcher,
}

impl EngagementSession {
    /// Wrap an existing engine and dispatcher.
    #[must_use]
    pub fn new(engine: EngagementEngine, dispatcher: RemoteDispatcher) -> Self {
        Self { engine, dispatcher }
    }

    /// Spawn a dispatcher over `store` and pair it with a fresh engine.
    pub fn connect(store: Arc<dyn RecordStore>) -> io::Result<Self> {
        Ok(Self::new(
            EngagementEngine::new(),
            RemoteDispatcher::spawn(store)?,
        ))
    }

    /// The underlying engine, for seeding and reads.
    #[must_use]
    pub fn engine(&self) -> &EngagementEngine {
        &self.engine
    }

    /// Mutable access to the underlying engine.
    pub fn engine_mut(&mut self) -> &mut EngagementEngine {
        &mut self.engine
    }

    /// Toggle a like and pump once. Consecutive toggles within one pump
    /// interval still coalesce inside the engine's outbox.
    pub fn toggle_like(&mut self, id: &PostId) -> Result<EngagementSnapshot, ToggleError> {
        self.engine.toggle_like(id)
    }

    /// Toggle a repost. Same contract as [`toggle_like`](Self::toggle_like).
    pub fn toggle_repost(&mut self, id: &PostId) -> Result<EngagementSnapshot, ToggleError> {
        self.engine.toggle_repost(id)
    }

    /// One pump cycle: apply arrived completions, then hand freshly staged
    /// commands to the worker. Returns the number of completions applied.
    pub fn pump(&mut self) -> usize {
        let done = self.dispatcher.poll();
        let resolved = done.len();
        for c in done {
            self.engine.resolve(c.ticket, c.result);
        }
        for cmd in self.engine.take_commands() {
            let ticket = cmd.ticket;
            if self.dispatcher.dispatch(cmd).is_err() {
                // Worker is gone; settle the exchange as unreachable now.
                self.engine.resolve(ticket, Err(RemoteError::Unreachable));
            }
        }
        resolved
    }

    /// Pump until nothing is pending or `timeout` elapses. Returns whether
    /// everything settled.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if !self.engine.has_pending() {
                debug!("engagement session settled");
                return true;
            }
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                warn!("engagement session settle timed out");
                return false;
            };
            match self.dispatcher.recv(remaining) {
                Some(done) => self.engine.resolve(done.ticket, done.result),
                None => {
                    warn!("engagement session settle timed out");
                    return false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::EngagementSeed;
    use crate::remote::RecordKind;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that replays a script of results and counts calls.
    struct ScriptedStore {
        script: Mutex<VecDeque<Result<(), RemoteError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedStore {
        fn new(script: impl IntoIterator<Item = Result<(), RemoteError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into_iter().collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn always_ok() -> Arc<Self> {
            Self::new(std::iter::empty())
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next(&self) -> Result<(), RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }
    }

    impl RecordStore for ScriptedStore {
        fn create_record(&self, _: RecordKind, _: &PostId) -> Result<(), RemoteError> {
            self.next()
        }
        fn delete_record(&self, _: RecordKind, _: &PostId) -> Result<(), RemoteError> {
            self.next()
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn session_over(store: Arc<ScriptedStore>, seed: EngagementSeed) -> EngagementSession {
        let mut session = EngagementSession::connect(store).unwrap();
        session.engine_mut().insert(seed);
        session
    }

    #[test]
    fn toggle_settles_through_worker() {
        let store = ScriptedStore::always_ok();
        let mut session = session_over(Arc::clone(&store), EngagementSeed::new("p1").likes(5));
        let id = PostId::new("p1");

        let snap = session.toggle_like(&id).unwrap();
        assert_eq!(snap.like_count, 6);

        assert!(session.settle(TIMEOUT));
        let snap = session.engine().snapshot(&id).unwrap();
        assert!(snap.liked);
        assert_eq!(snap.like_count, 6);
        assert_eq!(store.calls(), 1);
    }

    #[test]
    fn failure_rolls_back_through_worker() {
        let store = ScriptedStore::new([Err(RemoteError::Rejected("invalid post".into()))]);
        let mut session = session_over(Arc::clone(&store), EngagementSeed::new("p1").likes(5));
        let id = PostId::new("p1");

        session.toggle_like(&id).unwrap();
        assert!(session.settle(TIMEOUT));

        let snap = session.engine().snapshot(&id).unwrap();
        assert!(!snap.liked);
        assert_eq!(snap.like_count, 5);
        assert_eq!(store.calls(), 1);
    }

    #[test]
    fn double_tap_within_one_pump_costs_zero_calls() {
        let store = ScriptedStore::always_ok();
        let mut session = session_over(Arc::clone(&store), EngagementSeed::new("p1").likes(5));
        let id = PostId::new("p1");

        session.toggle_like(&id).unwrap();
        session.toggle_like(&id).unwrap();

        assert!(session.settle(TIMEOUT));
        let snap = session.engine().snapshot(&id).unwrap();
        assert!(!snap.liked);
        assert_eq!(snap.like_count, 5);
        assert_eq!(store.calls(), 0, "coalesced taps must not hit the store");
    }

    #[test]
    fn double_tap_across_pumps_costs_two_calls() {
        let store = ScriptedStore::always_ok();
        let mut session = session_over(Arc::clone(&store), EngagementSeed::new("p1").likes(5));
        let id = PostId::new("p1");

        // First tap is dispatched before the second lands.
        session.toggle_like(&id).unwrap();
        session.pump();
        session.toggle_like(&id).unwrap();

        assert!(session.settle(TIMEOUT));
        let snap = session.engine().snapshot(&id).unwrap();
        assert!(!snap.liked);
        assert_eq!(snap.like_count, 5);
        assert!(store.calls() <= 2, "at most the create and one corrective");
    }

    #[test]
    fn like_and_repost_settle_together() {
        let store = ScriptedStore::always_ok();
        let mut session = session_over(
            Arc::clone(&store),
            EngagementSeed::new("p1").likes(5).reposts(2),
        );
        let id = PostId::new("p1");

        session.toggle_like(&id).unwrap();
        session.toggle_repost(&id).unwrap();
        assert!(session.settle(TIMEOUT));

        let snap = session.engine().snapshot(&id).unwrap();
        assert!(snap.liked);
        assert_eq!(snap.like_count, 6);
        assert!(snap.reposted);
        assert_eq!(snap.repost_count, 3);
        assert_eq!(store.calls(), 2);
    }

    #[test]
    fn settle_with_nothing_pending_returns_immediately() {
        let store = ScriptedStore::always_ok();
        let mut session = session_over(store, EngagementSeed::new("p1"));
        assert!(session.settle(Duration::from_millis(1)));
    }

    #[test]
    fn dispatcher_drop_joins_worker() {
        let store = ScriptedStore::always_ok();
        let dispatcher = RemoteDispatcher::spawn(store).unwrap();
        drop(dispatcher); // must not hang
    }

    #[test]
    fn commands_complete_in_order() {
        let store = ScriptedStore::always_ok();
        let mut session =
            EngagementSession::connect(Arc::clone(&store) as Arc<dyn RecordStore>).unwrap();
        for i in 0..4 {
            session
                .engine_mut()
                .insert(EngagementSeed::new(format!("p{i}")));
            session.toggle_like(&PostId::new(format!("p{i}"))).unwrap();
        }
        assert!(session.settle(TIMEOUT));
        assert_eq!(store.calls(), 4);
        for i in 0..4 {
            let snap = session
                .engine()
                .snapshot(&PostId::new(format!("p{i}")))
                .unwrap();
            assert!(snap.liked);
            assert_eq!(snap.like_count, 1);
        }
    }
}
