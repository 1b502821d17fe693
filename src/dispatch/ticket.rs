use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum IdempotencyScope {
    /// Cleared when an episode reset is applied.
    PerEpisode,
    /// Fires at most once for the lifetime of the dispatcher.
    PerProcess,
}

/// Bookkeeping for one named action.
///
/// A ticket that has `completed` is still `started`: it will not fire again
/// until its scope is explicitly reset, whatever the outcome of the run was.
/// A reset that arrives while the run is in flight is held in `reset_pending`
/// and applied when the run finishes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionTicket {
    pub name: String,
    pub scope: IdempotencyScope,
    pub started: bool,
    pub completed: bool,
    #[serde(default)]
    pub reset_pending: bool,
}

impl ActionTicket {
    pub fn new(name: impl Into<String>, scope: IdempotencyScope) -> Self {
        Self {
            name: name.into(),
            scope,
            started: false,
            completed: false,
            reset_pending: false,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.started && !self.completed
    }

    /// Clears a finished episode-scoped ticket. A running one is only marked
    /// `reset_pending`, so a second instance never starts alongside it.
    /// Returns whether the ticket was cleared right away.
    pub fn reset_for_new_episode(&mut self) -> bool {
        if self.scope != IdempotencyScope::PerEpisode || !self.started {
            return false;
        }
        if self.in_flight() {
            self.reset_pending = true;
            return false;
        }
        self.clear();
        true
    }

    /// Records the end of a run. A pending reset is applied only when the
    /// run was not cancelled.
    pub fn finish(&mut self, cancelled: bool) {
        self.completed = true;
        if self.reset_pending && !cancelled {
            self.clear();
        }
        self.reset_pending = false;
    }

    fn clear(&mut self) {
        self.started = false;
        self.completed = false;
        self.reset_pending = false;
    }
}
