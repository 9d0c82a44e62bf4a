//! Shared test helpers: a store with injectable failures.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use linkgraph::error::{StoreError, StoreResult};
use linkgraph::{ConnectionQuery, ConnectionRecord, ConnectionState, GraphStore, MemoryGraph};

/// Which store calls should fail
#[derive(Default, Clone)]
pub struct Faults {
    /// `delete_connection(from, to)` for this pair
    pub delete_pair: Option<(String, String)>,
    /// `followings_not_connected_to(via, _)` for these `via` users
    pub expand_via: HashSet<String>,
    /// `block_exists(_, user)` or `block_exists(user, _)` for these users
    pub block_check_for: HashSet<String>,
    /// `block_exists(from, to)` for this exact pair
    pub block_check_pair: Option<(String, String)>,
    /// `find_connections` whatever the query
    pub find: bool,
    pub random: bool,
}

/// MemoryGraph wrapper failing the calls selected in `Faults`.
pub struct FaultyStore {
    pub inner: MemoryGraph,
    faults: Mutex<Faults>,
}

fn injected(what: &str) -> StoreError {
    StoreError::Unavailable(format!("injected failure: {}", what))
}

impl FaultyStore {
    pub fn new(faults: Faults) -> Self {
        Self {
            inner: MemoryGraph::ephemeral(),
            faults: Mutex::new(faults),
        }
    }

    pub fn set_faults(&self, faults: Faults) {
        *self.faults.lock().unwrap() = faults;
    }

    fn faults(&self) -> Faults {
        self.faults.lock().unwrap().clone()
    }

    pub fn follow(&self, a: &str, b: &str) {
        self.inner
            .merge_connection(ConnectionRecord::new(a, b, ConnectionState::Connected))
            .unwrap();
    }
}

impl GraphStore for FaultyStore {
    fn get_connection(&self, a: &str, b: &str) -> StoreResult<Option<ConnectionRecord>> {
        self.inner.get_connection(a, b)
    }

    fn merge_connection(&self, record: ConnectionRecord) -> StoreResult<ConnectionRecord> {
        self.inner.merge_connection(record)
    }

    fn update_connection(&self, record: ConnectionRecord) -> StoreResult<ConnectionRecord> {
        self.inner.update_connection(record)
    }

    fn delete_connection(&self, a: &str, b: &str) -> StoreResult<bool> {
        if let Some((from, to)) = self.faults().delete_pair {
            if from == a && to == b {
                return Err(injected("delete_connection"));
            }
        }
        self.inner.delete_connection(a, b)
    }

    fn find_connections(&self, query: &ConnectionQuery) -> StoreResult<Vec<ConnectionRecord>> {
        if self.faults().find {
            return Err(injected("find_connections"));
        }
        self.inner.find_connections(query)
    }

    fn merge_block(&self, a: &str, b: &str) -> StoreResult<bool> {
        self.inner.merge_block(a, b)
    }

    fn delete_block(&self, a: &str, b: &str) -> StoreResult<bool> {
        self.inner.delete_block(a, b)
    }

    fn block_exists(&self, a: &str, b: &str) -> StoreResult<bool> {
        let faults = self.faults();
        if faults.block_check_for.contains(a) || faults.block_check_for.contains(b) {
            return Err(injected("block_exists"));
        }
        if let Some((from, to)) = faults.block_check_pair {
            if from == a && to == b {
                return Err(injected("block_exists"));
            }
        }
        self.inner.block_exists(a, b)
    }

    fn blocked_by(&self, user_id: &str) -> StoreResult<Vec<String>> {
        self.inner.blocked_by(user_id)
    }

    fn blockers_of(&self, user_id: &str) -> StoreResult<Vec<String>> {
        self.inner.blockers_of(user_id)
    }

    fn followings_not_connected_to(&self, via: &str, user_id: &str) -> StoreResult<Vec<String>> {
        if self.faults().expand_via.contains(via) {
            return Err(injected("followings_not_connected_to"));
        }
        self.inner.followings_not_connected_to(via, user_id)
    }

    fn random_users(&self, exclude: &HashSet<String>, limit: usize) -> StoreResult<Vec<String>> {
        if self.faults().random {
            return Err(injected("random_users"));
        }
        self.inner.random_users(exclude, limit)
    }

    fn user_count(&self) -> StoreResult<usize> {
        self.inner.user_count()
    }

    fn count_edges_by_type(&self) -> StoreResult<HashMap<String, usize>> {
        self.inner.count_edges_by_type()
    }

    fn flush(&self) -> StoreResult<()> {
        self.inner.flush()
    }
}
