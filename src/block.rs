//! BlockGuard - owner of BLOCK edges
//!
//! Answers directional and bidirectional block queries and cascades a new
//! block into removal of CONNECT edges between the pair. Every connection
//! operation consults `is_blocked_either` before touching the store.

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::error::Result;
use crate::graph::GraphStore;

#[derive(Clone)]
pub struct BlockGuard {
    store: Arc<dyn GraphStore>,
}

impl BlockGuard {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Block `blocked_user_id` on behalf of `user_id`.
    ///
    /// Merge semantics: blocking twice is a no-op. Afterwards the CONNECT
    /// edges in both directions are deleted. The cascade is best-effort: if a
    /// delete fails the error is returned, but the block edge already written
    /// stays and the remaining delete is not attempted.
    #[instrument(skip(self))]
    pub fn block(&self, user_id: &str, blocked_user_id: &str) -> Result<()> {
        info!("User {} blocks user {}", user_id, blocked_user_id);

        self.store.merge_block(user_id, blocked_user_id).map_err(|e| {
            error!("Error on blocking user: {}", e);
            e
        })?;

        for (from, to) in [(user_id, blocked_user_id), (blocked_user_id, user_id)] {
            self.store.delete_connection(from, to).map_err(|e| {
                error!("Error deleting connection {} -> {} after block: {}", from, to, e);
                e
            })?;
        }

        Ok(())
    }

    /// Remove the block edge. Absence is not an error.
    #[instrument(skip(self))]
    pub fn unblock(&self, user_id: &str, blocked_user_id: &str) -> Result<()> {
        info!("User {} unblocks user {}", user_id, blocked_user_id);

        self.store.delete_block(user_id, blocked_user_id).map_err(|e| {
            error!("Error on unblocking user: {}", e);
            e
        })?;
        Ok(())
    }

    /// Does `user_id` block `other_id`
    #[instrument(skip(self))]
    pub fn is_blocked(&self, user_id: &str, other_id: &str) -> Result<bool> {
        Ok(self.store.block_exists(user_id, other_id)?)
    }

    /// True if either user blocks the other.
    ///
    /// `a -> b` is checked first; the reverse query is only issued when it
    /// comes back false.
    #[instrument(skip(self))]
    pub fn is_blocked_either(&self, a: &str, b: &str) -> Result<bool> {
        if self.store.block_exists(a, b)? {
            return Ok(true);
        }
        Ok(self.store.block_exists(b, a)?)
    }

    /// Users that `user_id` blocks
    #[instrument(skip(self))]
    pub fn list_blocked_by_me(&self, user_id: &str) -> Result<Vec<String>> {
        info!("Get users blocked by user {}", user_id);
        Ok(self.store.blocked_by(user_id)?)
    }

    /// Users that block `user_id`
    #[instrument(skip(self))]
    pub fn list_blocked_me(&self, user_id: &str) -> Result<Vec<String>> {
        info!("Get users blocking user {}", user_id);
        Ok(self.store.blockers_of(user_id)?)
    }

    /// Both directions concatenated. May contain duplicates.
    #[instrument(skip(self))]
    pub fn list_blocked_either(&self, user_id: &str) -> Result<Vec<String>> {
        let mut blocked = self.store.blocked_by(user_id)?;
        blocked.extend(self.store.blockers_of(user_id)?);
        Ok(blocked)
    }
}

#[cfg(test)]
mod block_tests {
    use super::*;
    use crate::graph::MemoryGraph;
    use crate::storage::{ConnectionRecord, ConnectionState};

    fn setup() -> (Arc<MemoryGraph>, BlockGuard) {
        let store = Arc::new(MemoryGraph::ephemeral());
        let guard = BlockGuard::new(store.clone());
        (store, guard)
    }

    #[test]
    fn test_block_is_directional() {
        let (_store, guard) = setup();
        guard.block("alice", "bob").unwrap();

        assert!(guard.is_blocked("alice", "bob").unwrap());
        assert!(!guard.is_blocked("bob", "alice").unwrap());
        assert!(guard.is_blocked_either("alice", "bob").unwrap());
        assert!(guard.is_blocked_either("bob", "alice").unwrap());
    }

    #[test]
    fn test_block_twice_is_noop() {
        let (store, guard) = setup();
        guard.block("alice", "bob").unwrap();
        guard.block("alice", "bob").unwrap();

        assert_eq!(store.count_edges_by_type().unwrap()["BLOCK"], 1);
    }

    #[test]
    fn test_block_cascades_both_directions() {
        let (store, guard) = setup();
        store
            .merge_connection(ConnectionRecord::new("alice", "bob", ConnectionState::Connected))
            .unwrap();
        store
            .merge_connection(ConnectionRecord::new("bob", "alice", ConnectionState::Pending))
            .unwrap();
        store
            .merge_connection(ConnectionRecord::new("alice", "carol", ConnectionState::Connected))
            .unwrap();

        guard.block("bob", "alice").unwrap();

        assert_eq!(store.get_connection("alice", "bob").unwrap(), None);
        assert_eq!(store.get_connection("bob", "alice").unwrap(), None);
        assert!(store.get_connection("alice", "carol").unwrap().is_some());
    }

    #[test]
    fn test_unblock_absent_is_ok() {
        let (_store, guard) = setup();
        assert!(guard.unblock("alice", "bob").is_ok());
    }

    #[test]
    fn test_unblock_removes_only_one_direction() {
        let (_store, guard) = setup();
        guard.block("alice", "bob").unwrap();
        guard.block("bob", "alice").unwrap();

        guard.unblock("alice", "bob").unwrap();

        assert!(!guard.is_blocked("alice", "bob").unwrap());
        assert!(guard.is_blocked_either("alice", "bob").unwrap());
    }

    #[test]
    fn test_list_blocked_either_keeps_duplicates() {
        let (_store, guard) = setup();
        guard.block("alice", "bob").unwrap();
        guard.block("bob", "alice").unwrap();
        guard.block("carol", "alice").unwrap();

        assert_eq!(guard.list_blocked_by_me("alice").unwrap(), vec!["bob"]);
        let mut blocked_me = guard.list_blocked_me("alice").unwrap();
        blocked_me.sort();
        assert_eq!(blocked_me, vec!["bob", "carol"]);

        let mut either = guard.list_blocked_either("alice").unwrap();
        either.sort();
        assert_eq!(either, vec!["bob", "bob", "carol"]);
    }
}
