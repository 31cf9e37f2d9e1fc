//! Scope lock table.
//!
//! [`ScopeLocks`] serializes transactions whose scopes overlap. A scope is
//! acquired as a whole or not at all, so batch callers that request the union of
//! their items up front cannot deadlock against each other. A thread may
//! re-acquire a scope that overlaps one it already holds (nested per-item
//! transactions inside a batch).

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, ThreadId};

use tracing::debug;

use crate::scope::Scope;

#[derive(Debug)]
struct Held {
    ticket: u64,
    owner: ThreadId,
    scope: Scope,
}

#[derive(Debug, Default)]
struct Table {
    held: Vec<Held>,
    next_ticket: u64,
}

/// A blocking lock table keyed by [`Scope`].
#[derive(Debug, Default)]
pub struct ScopeLocks {
    table: Mutex<Table>,
    released: Condvar,
}

impl ScopeLocks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Block until no other thread holds an overlapping scope, then hold
    /// `scope` until the returned guard is dropped.
    pub fn acquire(self: &Arc<Self>, scope: &Scope) -> ScopeGuard {
        let me = thread::current().id();
        let mut table = self.table.lock().expect("lock poisoned");
        while table
            .held
            .iter()
            .any(|h| h.owner != me && h.scope.conflicts_with(scope))
        {
            debug!(%scope, "waiting for overlapping scope");
            table = self.released.wait(table).expect("lock poisoned");
        }

        let ticket = table.next_ticket;
        table.next_ticket += 1;
        table.held.push(Held {
            ticket,
            owner: me,
            scope: scope.clone(),
        });
        ScopeGuard {
            locks: Arc::clone(self),
            ticket,
        }
    }

    /// Number of scopes currently held.
    pub fn held_count(&self) -> usize {
        self.table.lock().expect("lock poisoned").held.len()
    }

    fn release(&self, ticket: u64) {
        let mut table = self.table.lock().expect("lock poisoned");
        table.held.retain(|h| h.ticket != ticket);
        drop(table);
        self.released.notify_all();
    }
}

/// Holds a scope until dropped.
#[derive(Debug)]
#[must_use = "the scope is released when the guard is dropped"]
pub struct ScopeGuard {
    locks: Arc<ScopeLocks>,
    ticket: u64,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.locks.release(self.ticket);
    }
}
