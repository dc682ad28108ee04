//! Shared storage locks and the transport that grants them.
//!
//! A [`MutexHandle`] is a named lock that may be synchronized with a remote
//! authority. Identity is by reference: cloning a handle yields the same lock,
//! and several storages may share one lock. The engine never owns a lock; it
//! requests one through a [`MutexTransport`], observes its state, and releases
//! it.
//!
//! # State machine
//!
//! | From | Event | To |
//! |------|-------|----|
//! | `Unlocked` | request sent | `Requested(actor)` |
//! | `Requested(actor)` | authority grants | `Held(actor)` |
//! | `Requested(actor)` | authority denies | `Unlocked` |
//! | `Held(actor)` | release | `Unlocked` |

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::provider::ActorId;

/// Observable state of a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutexState {
    Unlocked,
    Requested(ActorId),
    Held(ActorId),
}

struct MutexInner {
    name: String,
    state: Cell<MutexState>,
}

/// Reference-counted lock handle.
#[derive(Clone)]
pub struct MutexHandle {
    inner: Rc<MutexInner>,
}

impl MutexHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(MutexInner {
                name: name.into(),
                state: Cell::new(MutexState::Unlocked),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn state(&self) -> MutexState {
        self.inner.state.get()
    }

    /// True while anyone holds the lock.
    pub fn is_locked(&self) -> bool {
        matches!(self.state(), MutexState::Held(_))
    }

    /// True when `actor` is the holder.
    pub fn is_lock_held(&self, actor: ActorId) -> bool {
        self.state() == MutexState::Held(actor)
    }

    /// True when the lock is neither held nor awaiting a grant.
    pub fn is_free(&self) -> bool {
        self.state() == MutexState::Unlocked
    }

    /// Same underlying lock.
    pub fn same_as(&self, other: &MutexHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ── Transport-side transitions ─────────────────────────────────────

    /// `Unlocked → Requested(actor)`. Returns false from any other state.
    pub fn mark_requested(&self, actor: ActorId) -> bool {
        if self.is_free() {
            self.inner.state.set(MutexState::Requested(actor));
            true
        } else {
            false
        }
    }

    /// Grant the lock to `actor`. Valid from `Unlocked` or from a pending
    /// request by the same actor; re-granting to the holder is a no-op.
    pub fn grant(&self, actor: ActorId) -> bool {
        match self.state() {
            MutexState::Unlocked => {
                self.inner.state.set(MutexState::Held(actor));
                true
            }
            MutexState::Requested(a) | MutexState::Held(a) if a == actor => {
                self.inner.state.set(MutexState::Held(actor));
                true
            }
            _ => false,
        }
    }

    /// Abandon a pending request by `actor`.
    pub fn deny(&self, actor: ActorId) {
        if self.state() == MutexState::Requested(actor) {
            self.inner.state.set(MutexState::Unlocked);
        }
    }

    /// `Held(actor) → Unlocked`. Releasing a lock `actor` does not hold does
    /// nothing.
    pub fn release(&self, actor: ActorId) -> bool {
        if self.is_lock_held(actor) {
            self.inner.state.set(MutexState::Unlocked);
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for MutexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexHandle")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .finish()
    }
}

impl PartialEq for MutexHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for MutexHandle {}

/// Distinct locks in first-seen order.
pub fn distinct_mutexes<'a>(mutexes: impl IntoIterator<Item = &'a MutexHandle>) -> Vec<MutexHandle> {
    let mut out: Vec<MutexHandle> = Vec::new();
    for m in mutexes {
        if !out.iter().any(|seen| seen.same_as(m)) {
            out.push(m.clone());
        }
    }
    out
}

/// Result of an aggregated lock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockOutcome {
    /// Every requested lock is now held by the requester.
    Granted,
    /// None of the requested locks were acquired.
    Denied,
}

/// Continuation invoked exactly once when a request resolves.
pub type LockCallback = Box<dyn FnOnce(LockOutcome)>;

/// Lock authority. Implementations may resolve a request immediately (inside
/// `request`) or later, e.g. after a network round trip; either way the
/// callback fires once. Aggregated requests are all-or-nothing.
pub trait MutexTransport {
    fn request(&self, actor: ActorId, mutexes: Vec<MutexHandle>, on_done: LockCallback);

    fn release(&self, actor: ActorId, mutexes: &[MutexHandle]);
}

/// In-process authority that resolves every request synchronously.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalTransport;

impl MutexTransport for LocalTransport {
    fn request(&self, actor: ActorId, mutexes: Vec<MutexHandle>, on_done: LockCallback) {
        let mut requested = Vec::with_capacity(mutexes.len());
        let mut ok = true;
        for m in &mutexes {
            if m.is_lock_held(actor) {
                continue;
            }
            if m.mark_requested(actor) {
                requested.push(m.clone());
            } else {
                ok = false;
                break;
            }
        }

        if ok {
            for m in &requested {
                m.grant(actor);
            }
            on_done(LockOutcome::Granted);
        } else {
            for m in &requested {
                m.deny(actor);
            }
            on_done(LockOutcome::Denied);
        }
    }

    fn release(&self, actor: ActorId, mutexes: &[MutexHandle]) {
        for m in mutexes {
            m.release(actor);
        }
    }
}
