//! Heap entry gate
//!
//! Compiler threads read live class metadata only while holding a
//! [`HeapEntryScope`]. Runtime activity that moves or frees metadata (a
//! collection cycle, class redefinition) takes a [`PauseGuard`] instead:
//! the pause waits for every open scope to close and holds new entries back
//! until it is released.
//!
//! ```text
//!   compiler thread            gate             collector thread
//!   enter() ─────────────► active += 1
//!                                      ◄──────── pause(): pending = true,
//!   drop(scope) ─────────► active -= 1             wait for active == 0
//!   enter() blocks ......  (pending)   ────────► pause granted
//!                                      ◄──────── drop(guard): pending = false
//!   enter() returns  ◄──── active += 1
//! ```

use crate::error::HeapError;
use parking_lot::{Condvar, Mutex};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Identifies one gate, so stores can check a scope was opened on theirs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GateId(u64);

impl GateId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        GateId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
struct GateState {
    /// Scopes currently open
    active: usize,
    /// A pause has been requested or granted
    pause_pending: bool,
    /// No further entries are allowed
    shut_down: bool,
}

/// Counters describing gate traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    /// Scopes successfully entered
    pub scopes_entered: usize,
    /// Entries that had to wait for a pause to finish
    pub contended_entries: usize,
    /// Pauses granted
    pub pauses: usize,
}

#[derive(Debug, Default)]
struct GateCounters {
    scopes_entered: AtomicUsize,
    contended_entries: AtomicUsize,
    pauses: AtomicUsize,
}

/// Coordinates compiler reads of heap metadata with runtime pauses
#[derive(Debug)]
pub struct HeapGate {
    id: GateId,
    state: Mutex<GateState>,
    changed: Condvar,
    counters: GateCounters,
}

impl HeapGate {
    /// Create an open gate
    pub fn new() -> Self {
        Self {
            id: GateId::next(),
            state: Mutex::new(GateState::default()),
            changed: Condvar::new(),
            counters: GateCounters::default(),
        }
    }

    /// This gate's identity
    pub fn id(&self) -> GateId {
        self.id
    }

    /// Enter the heap, blocking while a pause is in progress
    pub fn enter(&self) -> Result<HeapEntryScope<'_>, HeapError> {
        self.enter_until(None)
    }

    /// Enter the heap, giving up after `timeout`
    pub fn enter_timeout(&self, timeout: Duration) -> Result<HeapEntryScope<'_>, HeapError> {
        self.enter_until(Some(timeout))
    }

    fn enter_until(&self, timeout: Option<Duration>) -> Result<HeapEntryScope<'_>, HeapError> {
        let start = Instant::now();
        let mut state = self.state.lock();
        let mut contended = false;

        loop {
            if state.shut_down {
                return Err(HeapError::ShutDown);
            }
            if !state.pause_pending {
                break;
            }
            contended = true;
            match timeout {
                Some(limit) => {
                    let deadline = start + limit;
                    if self.changed.wait_until(&mut state, deadline).timed_out()
                        && state.pause_pending
                        && !state.shut_down
                    {
                        let waited = start.elapsed();
                        tracing::debug!(?waited, gate = self.id.0, "heap entry timed out");
                        return Err(HeapError::Timeout { waited });
                    }
                }
                None => self.changed.wait(&mut state),
            }
        }

        state.active += 1;
        drop(state);

        self.counters.scopes_entered.fetch_add(1, Ordering::Relaxed);
        if contended {
            self.counters.contended_entries.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(waited = ?start.elapsed(), gate = self.id.0, "heap entry waited for pause");
        }

        Ok(HeapEntryScope {
            gate: self,
            _thread_bound: PhantomData,
        })
    }

    /// Stop the world for metadata mutation
    ///
    /// Blocks new entries, then waits for all open scopes to close. Must not
    /// be called from a thread that itself holds a scope on this gate.
    pub fn pause(&self) -> Result<PauseGuard<'_>, HeapError> {
        let mut state = self.state.lock();

        while state.pause_pending && !state.shut_down {
            self.changed.wait(&mut state);
        }
        if state.shut_down {
            return Err(HeapError::ShutDown);
        }

        state.pause_pending = true;
        while state.active > 0 {
            self.changed.wait(&mut state);
        }
        drop(state);

        self.counters.pauses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(gate = self.id.0, "heap paused");
        Ok(PauseGuard { gate: self })
    }

    /// Refuse all future entries and wake every waiter
    ///
    /// Scopes that are already open stay valid until dropped.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shut_down = true;
        self.changed.notify_all();
    }

    /// Has [`shutdown`](Self::shutdown) been called
    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }

    /// Number of scopes currently open
    pub fn active_scopes(&self) -> usize {
        self.state.lock().active
    }

    /// Snapshot of the traffic counters
    pub fn stats(&self) -> GateStats {
        GateStats {
            scopes_entered: self.counters.scopes_entered.load(Ordering::Relaxed),
            contended_entries: self.counters.contended_entries.load(Ordering::Relaxed),
            pauses: self.counters.pauses.load(Ordering::Relaxed),
        }
    }

    fn leave(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.active > 0, "heap scope released twice");
        state.active -= 1;
        if state.active == 0 && state.pause_pending {
            self.changed.notify_all();
        }
    }

    fn resume(&self) {
        let mut state = self.state.lock();
        state.pause_pending = false;
        self.changed.notify_all();
    }
}

impl Default for HeapGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof that the current thread may read live heap metadata
///
/// Released on drop. Not `Send`: a scope belongs to the thread that opened it.
#[derive(Debug)]
pub struct HeapEntryScope<'g> {
    gate: &'g HeapGate,
    _thread_bound: PhantomData<*const ()>,
}

impl HeapEntryScope<'_> {
    /// The gate this scope was opened on
    pub fn gate_id(&self) -> GateId {
        self.gate.id
    }
}

impl Drop for HeapEntryScope<'_> {
    fn drop(&mut self) {
        self.gate.leave();
    }
}

/// A granted pause; entries resume when dropped
#[derive(Debug)]
pub struct PauseGuard<'g> {
    gate: &'g HeapGate,
}

impl Drop for PauseGuard<'_> {
    fn drop(&mut self) {
        self.gate.resume();
        tracing::debug!(gate = self.gate.id.0, "heap resumed");
    }
}
