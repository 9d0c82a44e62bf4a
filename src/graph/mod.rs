//! Graph store API and the in-memory reference backend

pub mod adjacency;
pub mod id_gen;
pub mod memory;

pub use adjacency::AdjacencyIndex;
pub use id_gen::user_node_id;
pub use memory::MemoryGraph;

use std::collections::{HashMap, HashSet};

use crate::error::StoreResult;
use crate::storage::{ConnectionQuery, ConnectionRecord};

/// Capability over the property-graph substrate holding User nodes and
/// CONNECT / BLOCK edges.
///
/// Every method is one logical session: it acquires what it needs, runs,
/// and releases before returning. Single calls are atomic per edge; nothing
/// is held across calls, so guard-then-act sequences built on top of this
/// trait are not isolated from concurrent writers.
///
/// User nodes are never created or deleted explicitly. A store may
/// materialize a node the first time an edge references it.
///
/// Send + Sync required for sharing behind `Arc<dyn GraphStore>`.
pub trait GraphStore: Send + Sync {
    // === CONNECT EDGES ===

    /// Get the edge `user_id -> connected_user_id`, if any
    fn get_connection(
        &self,
        user_id: &str,
        connected_user_id: &str,
    ) -> StoreResult<Option<ConnectionRecord>>;

    /// Create the edge if absent (merge).
    ///
    /// Returns the stored edge. An existing edge for the same ordered pair is
    /// returned unchanged, never overwritten.
    fn merge_connection(&self, record: ConnectionRecord) -> StoreResult<ConnectionRecord>;

    /// Replace the attributes of an existing edge (update).
    ///
    /// Fails with `StoreError::ConnectionNotFound` if the edge is absent.
    fn update_connection(&self, record: ConnectionRecord) -> StoreResult<ConnectionRecord>;

    /// Delete the edge. Returns false if it did not exist.
    fn delete_connection(&self, user_id: &str, connected_user_id: &str) -> StoreResult<bool>;

    /// Find edges matching the query
    fn find_connections(&self, query: &ConnectionQuery) -> StoreResult<Vec<ConnectionRecord>>;

    // === BLOCK EDGES ===

    /// Create the block edge if absent (merge). Returns true if newly created.
    fn merge_block(&self, user_id: &str, blocked_user_id: &str) -> StoreResult<bool>;

    /// Delete the block edge. Returns false if it did not exist.
    fn delete_block(&self, user_id: &str, blocked_user_id: &str) -> StoreResult<bool>;

    /// Does `user_id` block `blocked_user_id`
    fn block_exists(&self, user_id: &str, blocked_user_id: &str) -> StoreResult<bool>;

    /// Users that `user_id` blocks
    fn blocked_by(&self, user_id: &str) -> StoreResult<Vec<String>>;

    /// Users that block `user_id`
    fn blockers_of(&self, user_id: &str) -> StoreResult<Vec<String>>;

    // === TRAVERSAL ===

    /// Connected followings of `via` that `user_id` has no CONNECT edge to
    /// (pending or connected). Second hop of friend-of-friend expansion.
    fn followings_not_connected_to(&self, via: &str, user_id: &str) -> StoreResult<Vec<String>>;

    /// Up to `limit` user ids sampled uniformly at random, skipping `exclude`
    fn random_users(&self, exclude: &HashSet<String>, limit: usize) -> StoreResult<Vec<String>>;

    // === STATS ===

    /// Number of materialized User nodes
    fn user_count(&self) -> StoreResult<usize>;

    /// Edge counts keyed by edge type name ("CONNECT", "BLOCK")
    fn count_edges_by_type(&self) -> StoreResult<HashMap<String, usize>>;

    // === MAINTENANCE ===

    /// Persist current state, if the backend has anywhere to persist it
    fn flush(&self) -> StoreResult<()>;
}
