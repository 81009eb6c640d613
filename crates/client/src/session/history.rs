//! Local login history and per-user statistics.

use std::collections::BTreeMap;

use kisan_setu_core::{LoginRecord, LoginStats};

use crate::store::{Store, keys};

/// Most recent logins kept; older entries are evicted first.
pub const MAX_LOGIN_HISTORY: usize = 100;

/// Login bookkeeping persisted across sessions (it survives logout).
#[derive(Debug, Clone)]
pub struct LoginHistory {
    store: Store,
}

impl LoginHistory {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Append `record` and bump the statistics for its username.
    pub fn record(&self, record: LoginRecord) {
        let mut stats = self.stats();
        stats
            .entry(record.username.clone())
            .and_modify(|s| s.record(record.login_time))
            .or_insert_with(|| LoginStats::first(record.login_time));
        self.store.set(keys::LOGIN_STATS, &stats);

        let mut entries = self.entries();
        entries.push(record);
        if entries.len() > MAX_LOGIN_HISTORY {
            let excess = entries.len() - MAX_LOGIN_HISTORY;
            entries.drain(..excess);
        }
        self.store.set(keys::LOGIN_HISTORY, &entries);
    }

    /// All recorded logins, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LoginRecord> {
        self.store.get(keys::LOGIN_HISTORY).unwrap_or_default()
    }

    /// Statistics keyed by username.
    #[must_use]
    pub fn stats(&self) -> BTreeMap<String, LoginStats> {
        self.store.get(keys::LOGIN_STATS).unwrap_or_default()
    }

    /// Statistics for one username.
    #[must_use]
    pub fn stats_for(&self, username: &str) -> Option<LoginStats> {
        self.stats().remove(username)
    }
}
