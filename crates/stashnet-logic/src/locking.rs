//! Lock coordination across many storages at once.
//!
//! [`LockCoordinator::with_locks`] turns located storages into
//! [`WorkingResource`]s and makes sure each one is safe to touch:
//!
//! 1. Candidates without a location (unless allowed), without a provider, or
//!    no longer valid are dropped.
//! 2. Candidates whose provider requires a lock but exposes none are dropped.
//! 3. Candidates whose lock is held by another actor are dropped.
//! 4. Candidates needing no lock, or whose lock this actor already holds, are
//!    ready immediately. The rest are *lockable*.
//!
//! If nothing is lockable the body runs right away. Otherwise a single
//! aggregated request for the distinct locks of the lockable set goes to the
//! [`MutexTransport`], and the body runs when it resolves: with every
//! candidate on success, or with only the ready ones on failure.
//!
//! # Caller contract
//!
//! The body may receive fewer storages than were asked for. Nothing but the
//! length of the list (and [`LockRelease::holds_locks`]) tells a degraded
//! grant apart from a full one, so bodies must work correctly on any subset.
//!
//! The body receives a [`LockRelease`] guard. Releasing is idempotent, and
//! dropping the guard releases, so locks are returned even if the body
//! panics.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::mutex::{distinct_mutexes, LockOutcome, MutexTransport};
use crate::provider::{ActorId, LocatedResource, ResourceContext, Resolver, WorkingResource};

/// Release capability for the locks acquired by one `with_locks` call.
#[must_use = "dropping the guard releases the locks immediately"]
pub struct LockRelease {
    action: Option<Box<dyn FnOnce()>>,
}

impl LockRelease {
    /// A guard with nothing to release.
    pub fn noop() -> Self {
        Self { action: None }
    }

    fn new(action: impl FnOnce() + 'static) -> Self {
        Self {
            action: Some(Box::new(action)),
        }
    }

    /// Whether this guard still holds locks it will release.
    pub fn holds_locks(&self) -> bool {
        self.action.is_some()
    }

    /// Release the locks. Calling this again does nothing.
    pub fn release(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

impl Drop for LockRelease {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for LockRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockRelease")
            .field("holds_locks", &self.holds_locks())
            .finish()
    }
}

/// Issues aggregated lock requests for storage transactions.
#[derive(Clone)]
pub struct LockCoordinator {
    transport: Rc<dyn MutexTransport>,
    null_location_valid: bool,
}

impl LockCoordinator {
    pub fn new(transport: Rc<dyn MutexTransport>) -> Self {
        Self {
            transport,
            null_location_valid: false,
        }
    }

    /// Accept candidates that have no location (virtual inventories).
    pub fn allow_null_location(mut self, allow: bool) -> Self {
        self.null_location_valid = allow;
        self
    }

    /// Lock what can be locked and hand the usable storages to `body`.
    ///
    /// `body` runs at most once: synchronously when no lock is needed,
    /// otherwise whenever the transport resolves the request.
    pub fn with_locks<R, F>(&self, candidates: &[LocatedResource], resolver: &R, actor: ActorId, body: F)
    where
        R: Resolver + ?Sized,
        F: FnOnce(Vec<WorkingResource>, LockRelease) + 'static,
    {
        let (mut ready, lockable) = self.classify(candidates, resolver, actor);

        if lockable.is_empty() {
            log::debug!("{} storages ready without locking", ready.len());
            body(ready, LockRelease::noop());
            return;
        }

        let mutexes = distinct_mutexes(lockable.iter().filter_map(|w| w.mutex.as_ref()));
        log::debug!(
            "requesting {} locks for {} storages ({} already ready)",
            mutexes.len(),
            lockable.len(),
            ready.len()
        );

        let transport = self.transport.clone();
        let requested = mutexes.clone();
        self.transport.request(
            actor,
            mutexes,
            Box::new(move |outcome| match outcome {
                LockOutcome::Granted => {
                    ready.extend(lockable);
                    let release = LockRelease::new(move || transport.release(actor, &requested));
                    body(ready, release);
                }
                LockOutcome::Denied => {
                    log::info!(
                        "lock request denied, continuing with {} of {} storages",
                        ready.len(),
                        ready.len() + lockable.len()
                    );
                    body(ready, LockRelease::noop());
                }
            }),
        );
    }

    /// Like [`with_locks`](Self::with_locks), releasing as soon as `body`
    /// returns.
    pub fn with_locks_scoped<R, F>(&self, candidates: &[LocatedResource], resolver: &R, actor: ActorId, body: F)
    where
        R: Resolver + ?Sized,
        F: FnOnce(&[WorkingResource]) + 'static,
    {
        self.with_locks(candidates, resolver, actor, move |locked, mut release| {
            body(&locked);
            release.release();
        });
    }

    fn classify<R>(
        &self,
        candidates: &[LocatedResource],
        resolver: &R,
        actor: ActorId,
    ) -> (Vec<WorkingResource>, Vec<WorkingResource>)
    where
        R: Resolver + ?Sized,
    {
        let mut ready = Vec::new();
        let mut lockable = Vec::new();
        let mut seen = HashSet::new();

        for entry in resolve(candidates, resolver, Some(actor), self.null_location_valid) {
            if !seen.insert(entry.handle) {
                continue;
            }
            let (is_ready, busy) = match &entry.mutex {
                None => (true, false),
                Some(m) => (m.is_lock_held(actor), m.is_locked()),
            };
            if is_ready {
                ready.push(entry);
            } else if busy {
                log::debug!("skipping {:?}: lock held by another actor", entry.handle);
            } else {
                lockable.push(entry);
            }
        }

        (ready, lockable)
    }
}

impl fmt::Debug for LockCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockCoordinator")
            .field("null_location_valid", &self.null_location_valid)
            .finish_non_exhaustive()
    }
}

/// Resolve candidates into working storages without looking at lock state.
///
/// Applies the same validity and lock-required filtering as the coordinator
/// but never requests anything. The caller is responsible for safety.
pub fn unsafe_resources<R>(
    candidates: &[LocatedResource],
    resolver: &R,
    actor: Option<ActorId>,
    null_location_valid: bool,
) -> Vec<WorkingResource>
where
    R: Resolver + ?Sized,
{
    resolve(candidates, resolver, actor, null_location_valid).collect()
}

fn resolve<'a, R>(
    candidates: &'a [LocatedResource],
    resolver: &'a R,
    actor: Option<ActorId>,
    null_location_valid: bool,
) -> impl Iterator<Item = WorkingResource> + 'a
where
    R: Resolver + ?Sized,
{
    candidates.iter().filter_map(move |candidate| {
        if candidate.location.is_none() && !null_location_valid {
            return None;
        }
        let provider = resolver.provider(candidate.handle)?;
        let ctx = ResourceContext {
            handle: candidate.handle,
            location: candidate.location,
            actor,
        };
        if !provider.is_valid(&ctx) {
            return None;
        }
        let mutex = provider.mutex(&ctx);
        if mutex.is_none() && provider.is_mutex_required(&ctx) {
            log::debug!("skipping {:?}: lock required but unavailable", candidate.handle);
            return None;
        }
        Some(WorkingResource {
            handle: candidate.handle,
            provider,
            mutex,
            location: candidate.location,
            actor,
        })
    })
}
