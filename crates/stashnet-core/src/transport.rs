//! Tick-driven lock authority.
//!
//! `QueuedTransport` behaves like a remote lock server with one tick of
//! latency: requests are marked on the locks immediately, queued, and decided
//! on the next [`tick`](QueuedTransport::tick) in arrival order. A request is
//! granted only if every lock it named is still requested by (or already held
//! by) the same actor; otherwise all of its marks are rolled back and it is
//! denied.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use stashnet_logic::mutex::{LockCallback, LockOutcome, MutexHandle, MutexState, MutexTransport};
use stashnet_logic::provider::ActorId;

struct PendingLock {
    actor: ActorId,
    mutexes: Vec<MutexHandle>,
    /// Locks this request moved to `Requested`.
    marked: Vec<MutexHandle>,
    conflict: bool,
    on_done: LockCallback,
}

#[derive(Default)]
pub struct QueuedTransport {
    queue: RefCell<VecDeque<PendingLock>>,
    granted: Cell<u64>,
    denied: Cell<u64>,
}

impl QueuedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests waiting for the next tick.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// `(granted, denied)` so far.
    pub fn totals(&self) -> (u64, u64) {
        (self.granted.get(), self.denied.get())
    }

    /// Decide every request queued before this call. Requests issued by the
    /// callbacks wait for the next tick.
    pub fn tick(&self) -> usize {
        let batch: Vec<PendingLock> = self.queue.borrow_mut().drain(..).collect();
        let resolved = batch.len();

        for request in batch {
            let actor = request.actor;
            let granted = !request.conflict
                && request.mutexes.iter().all(|m| {
                    m.is_lock_held(actor) || m.state() == MutexState::Requested(actor)
                });

            if granted {
                for m in &request.marked {
                    m.grant(actor);
                }
                self.granted.set(self.granted.get() + 1);
                log::debug!("granted {} locks to {:?}", request.mutexes.len(), actor);
                (request.on_done)(LockOutcome::Granted);
            } else {
                for m in &request.marked {
                    m.deny(actor);
                }
                self.denied.set(self.denied.get() + 1);
                log::info!("denied {} locks to {:?}", request.mutexes.len(), actor);
                (request.on_done)(LockOutcome::Denied);
            }
        }

        resolved
    }
}

impl MutexTransport for QueuedTransport {
    fn request(&self, actor: ActorId, mutexes: Vec<MutexHandle>, on_done: LockCallback) {
        let mut marked = Vec::new();
        let mut conflict = false;
        for m in &mutexes {
            if m.is_lock_held(actor) {
                continue;
            }
            if m.mark_requested(actor) {
                marked.push(m.clone());
            } else {
                conflict = true;
            }
        }

        self.queue.borrow_mut().push_back(PendingLock {
            actor,
            mutexes,
            marked,
            conflict,
            on_done,
        });
    }

    fn release(&self, actor: ActorId, mutexes: &[MutexHandle]) {
        for m in mutexes {
            m.release(actor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    const ALICE: ActorId = ActorId(1);
    const BOB: ActorId = ActorId(2);

    fn recorder() -> (Rc<RefCell<Vec<LockOutcome>>>, impl Fn() -> LockCallback) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        (log, move || {
            let sink = sink.clone();
            Box::new(move |outcome| sink.borrow_mut().push(outcome)) as LockCallback
        })
    }

    #[test]
    fn test_request_waits_for_tick() {
        let transport = QueuedTransport::new();
        let chest = MutexHandle::new("chest");
        let (log, callback) = recorder();

        transport.request(ALICE, vec![chest.clone()], callback());
        assert_eq!(chest.state(), MutexState::Requested(ALICE));
        assert!(log.borrow().is_empty());
        assert_eq!(transport.pending(), 1);

        assert_eq!(transport.tick(), 1);
        assert_eq!(*log.borrow(), vec![LockOutcome::Granted]);
        assert!(chest.is_lock_held(ALICE));

        transport.release(ALICE, &[chest.clone()]);
        assert!(chest.is_free());
    }

    #[test]
    fn test_first_come_first_served() {
        let transport = QueuedTransport::new();
        let chest = MutexHandle::new("chest");
        let fridge = MutexHandle::new("fridge");
        let (log, callback) = recorder();

        transport.request(ALICE, vec![chest.clone()], callback());
        transport.request(BOB, vec![fridge.clone(), chest.clone()], callback());
        transport.tick();

        assert_eq!(*log.borrow(), vec![LockOutcome::Granted, LockOutcome::Denied]);
        assert!(chest.is_lock_held(ALICE));
        assert!(fridge.is_free(), "partial marks are rolled back");
        assert_eq!(transport.totals(), (1, 1));
    }

    #[test]
    fn test_requests_from_callbacks_wait() {
        let transport = Rc::new(QueuedTransport::new());
        let chest = MutexHandle::new("chest");
        let inner = transport.clone();
        let again = chest.clone();
        transport.request(
            ALICE,
            vec![chest.clone()],
            Box::new(move |_| {
                inner.release(ALICE, &[again.clone()]);
                inner.request(BOB, vec![again], Box::new(|_| {}));
            }),
        );
        assert_eq!(transport.tick(), 1);
        assert_eq!(transport.pending(), 1);
        assert_eq!(chest.state(), MutexState::Requested(BOB));
        transport.tick();
        assert!(chest.is_lock_held(BOB));
    }
}
