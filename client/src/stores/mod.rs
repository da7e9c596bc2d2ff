// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::sync::atomic::{AtomicU64, Ordering};

use common::ErrorEnvelope;

pub mod goal;
pub mod search;
pub mod task;
pub mod user;

pub use goal::{GoalStore, GoalUndo};
pub use search::{SearchKind, SearchScope, SearchStore};
pub use task::{TaskStore, TaskUndo};
pub use user::{HeartbeatHandle, UserStore};

/// One store's slice of state: the focused data, a loading flag for the
/// page to render a spinner from, and the last error envelope (if any).
#[derive(Debug, Clone, Default)]
pub struct StoreState<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<ErrorEnvelope>,
}

/// Monotonic ticket counter implementing the stale-response guard.
///
/// Each outgoing request takes a ticket; a response is only applied while
/// its ticket is still the newest one issued. "Last response wins" is keyed
/// by request identity, not by arrival order, so a slow response for a
/// superseded focus id can never overwrite a newer one.
#[derive(Debug, Default)]
pub(crate) struct RequestGuard {
    counter: AtomicU64,
}

impl RequestGuard {
    /// Issues the next ticket. Must be called before the first await of the
    /// operation it guards.
    pub(crate) fn issue(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// True while `ticket` is still the newest issued.
    pub(crate) fn is_current(&self, ticket: u64) -> bool {
        self.counter.load(Ordering::SeqCst) == ticket
    }
}
