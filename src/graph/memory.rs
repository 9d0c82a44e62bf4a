//! MemoryGraph - in-memory GraphStore with optional snapshot persistence.
//!
//! All state lives behind one `RwLock`. Reads take the read lock, writes the
//! write lock, and no lock is held between calls. Adjacency indexes are
//! rebuilt from the snapshot on open and are never written to disk.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rand::seq::IteratorRandom;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::storage::{BlockRecord, ConnectionQuery, ConnectionRecord, EdgeKind};
use super::{AdjacencyIndex, GraphStore, user_node_id};

/// Snapshot file name inside the data directory.
pub const SNAPSHOT_FILE: &str = "graph.snapshot";

const SNAPSHOT_VERSION: u32 = 1;

/// On-disk form of the graph.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    users: Vec<String>,
    connections: Vec<ConnectionRecord>,
    blocks: Vec<BlockRecord>,
}

#[derive(Default)]
struct GraphState {
    /// node id -> external user id
    users: HashMap<u128, String>,
    /// CONNECT edges keyed by (src, dst) node ids
    connections: HashMap<(u128, u128), ConnectionRecord>,
    connect_index: AdjacencyIndex,
    /// BLOCK edges carry no attributes, so the index is the storage
    blocks: AdjacencyIndex,
}

impl GraphState {
    /// Node id for a user, materializing the User node on first reference.
    fn touch_user(&mut self, user_id: &str) -> u128 {
        let id = user_node_id(user_id);
        self.users.entry(id).or_insert_with(|| user_id.to_string());
        id
    }

    fn user_name(&self, id: u128) -> Option<&String> {
        self.users.get(&id)
    }

    fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut state = GraphState::default();
        for user in &snapshot.users {
            state.touch_user(user);
        }
        for record in snapshot.connections {
            let src = state.touch_user(&record.user_id);
            let dst = state.touch_user(&record.connected_user_id);
            state.connect_index.insert(src, dst);
            state.connections.insert((src, dst), record);
        }
        for block in &snapshot.blocks {
            let src = state.touch_user(&block.user_id);
            let dst = state.touch_user(&block.blocked_user_id);
            state.blocks.insert(src, dst);
        }
        state
    }

    fn to_snapshot(&self) -> Snapshot {
        let blocks = self
            .blocks
            .iter()
            .filter_map(|(src, dst)| {
                Some(BlockRecord {
                    user_id: self.user_name(src)?.clone(),
                    blocked_user_id: self.user_name(dst)?.clone(),
                })
            })
            .collect();

        Snapshot {
            version: SNAPSHOT_VERSION,
            users: self.users.values().cloned().collect(),
            connections: self.connections.values().cloned().collect(),
            blocks,
        }
    }
}

/// In-memory graph store.
///
/// `ephemeral()` never touches disk. `open(dir)` loads `dir/graph.snapshot`
/// if present and writes it back on `flush()`.
pub struct MemoryGraph {
    state: RwLock<GraphState>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryGraph {
    /// Create an in-memory graph with no backing file
    pub fn ephemeral() -> Self {
        Self {
            state: RwLock::new(GraphState::default()),
            snapshot_path: None,
        }
    }

    /// Open (or create) a graph persisted under `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> StoreResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let snapshot_path = dir.join(SNAPSHOT_FILE);

        let state = if snapshot_path.exists() {
            let reader = BufReader::new(File::open(&snapshot_path)?);
            let snapshot: Snapshot = bincode::deserialize_from(reader)?;
            if snapshot.version != SNAPSHOT_VERSION {
                return Err(StoreError::Unavailable(format!(
                    "unsupported snapshot version {} in {:?}",
                    snapshot.version, snapshot_path
                )));
            }
            GraphState::from_snapshot(snapshot)
        } else {
            GraphState::default()
        };

        Ok(Self {
            state: RwLock::new(state),
            snapshot_path: Some(snapshot_path),
        })
    }

    pub fn is_ephemeral(&self) -> bool {
        self.snapshot_path.is_none()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, GraphState>> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, GraphState>> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }

    /// Write the snapshot to a temp file, then rename over the old one.
    fn write_snapshot(path: &Path, snapshot: &Snapshot) -> StoreResult<()> {
        let tmp_path = path.with_extension("snapshot.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            bincode::serialize_into(&mut writer, snapshot)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

impl GraphStore for MemoryGraph {
    fn get_connection(
        &self,
        user_id: &str,
        connected_user_id: &str,
    ) -> StoreResult<Option<ConnectionRecord>> {
        let state = self.read()?;
        let key = (user_node_id(user_id), user_node_id(connected_user_id));
        Ok(state.connections.get(&key).cloned())
    }

    fn merge_connection(&self, record: ConnectionRecord) -> StoreResult<ConnectionRecord> {
        let mut state = self.write()?;
        let src = state.touch_user(&record.user_id);
        let dst = state.touch_user(&record.connected_user_id);

        if let Some(existing) = state.connections.get(&(src, dst)) {
            return Ok(existing.clone());
        }

        state.connect_index.insert(src, dst);
        state.connections.insert((src, dst), record.clone());
        Ok(record)
    }

    fn update_connection(&self, record: ConnectionRecord) -> StoreResult<ConnectionRecord> {
        let mut state = self.write()?;
        let key = (user_node_id(&record.user_id), user_node_id(&record.connected_user_id));

        match state.connections.get_mut(&key) {
            Some(existing) => {
                *existing = record.clone();
                Ok(record)
            }
            None => Err(StoreError::ConnectionNotFound {
                user_id: record.user_id,
                connected_user_id: record.connected_user_id,
            }),
        }
    }

    fn delete_connection(&self, user_id: &str, connected_user_id: &str) -> StoreResult<bool> {
        let mut state = self.write()?;
        let src = user_node_id(user_id);
        let dst = user_node_id(connected_user_id);

        let removed = state.connections.remove(&(src, dst)).is_some();
        if removed {
            state.connect_index.remove(src, dst);
        }
        Ok(removed)
    }

    fn find_connections(&self, query: &ConnectionQuery) -> StoreResult<Vec<ConnectionRecord>> {
        let state = self.read()?;

        // Narrow by endpoint through the adjacency index before filtering
        let keys: Vec<(u128, u128)> = match (&query.user_id, &query.connected_user_id, &query.touching) {
            (Some(src), _, _) => {
                let src = user_node_id(src);
                state.connect_index.outgoing(src).map(|dst| (src, dst)).collect()
            }
            (None, Some(dst), _) => {
                let dst = user_node_id(dst);
                state.connect_index.incoming(dst).map(|src| (src, dst)).collect()
            }
            (None, None, Some(user)) => {
                let id = user_node_id(user);
                state
                    .connect_index
                    .outgoing(id)
                    .map(|dst| (id, dst))
                    .chain(state.connect_index.incoming(id).map(|src| (src, id)))
                    .collect()
            }
            (None, None, None) => state.connections.keys().copied().collect(),
        };

        let mut seen = HashSet::new();
        Ok(keys
            .into_iter()
            .filter(|key| seen.insert(*key))
            .filter_map(|key| state.connections.get(&key))
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }

    fn merge_block(&self, user_id: &str, blocked_user_id: &str) -> StoreResult<bool> {
        let mut state = self.write()?;
        let src = state.touch_user(user_id);
        let dst = state.touch_user(blocked_user_id);
        Ok(state.blocks.insert(src, dst))
    }

    fn delete_block(&self, user_id: &str, blocked_user_id: &str) -> StoreResult<bool> {
        let mut state = self.write()?;
        Ok(state.blocks.remove(user_node_id(user_id), user_node_id(blocked_user_id)))
    }

    fn block_exists(&self, user_id: &str, blocked_user_id: &str) -> StoreResult<bool> {
        let state = self.read()?;
        Ok(state.blocks.contains(user_node_id(user_id), user_node_id(blocked_user_id)))
    }

    fn blocked_by(&self, user_id: &str) -> StoreResult<Vec<String>> {
        let state = self.read()?;
        Ok(state
            .blocks
            .outgoing(user_node_id(user_id))
            .filter_map(|id| state.user_name(id).cloned())
            .collect())
    }

    fn blockers_of(&self, user_id: &str) -> StoreResult<Vec<String>> {
        let state = self.read()?;
        Ok(state
            .blocks
            .incoming(user_node_id(user_id))
            .filter_map(|id| state.user_name(id).cloned())
            .collect())
    }

    fn followings_not_connected_to(&self, via: &str, user_id: &str) -> StoreResult<Vec<String>> {
        let state = self.read()?;
        let via_id = user_node_id(via);
        let user = user_node_id(user_id);

        Ok(state
            .connect_index
            .outgoing(via_id)
            .filter(|dst| {
                state
                    .connections
                    .get(&(via_id, *dst))
                    .is_some_and(|record| record.is_connected())
            })
            .filter(|dst| !state.connect_index.contains(user, *dst))
            .filter_map(|dst| state.user_name(dst).cloned())
            .collect())
    }

    fn random_users(&self, exclude: &HashSet<String>, limit: usize) -> StoreResult<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let state = self.read()?;
        let mut rng = rand::thread_rng();
        Ok(state
            .users
            .values()
            .filter(|user| !exclude.contains(*user))
            .cloned()
            .choose_multiple(&mut rng, limit))
    }

    fn user_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.users.len())
    }

    fn count_edges_by_type(&self) -> StoreResult<HashMap<String, usize>> {
        let state = self.read()?;
        let mut counts = HashMap::new();
        counts.insert(EdgeKind::Connect.as_str().to_string(), state.connect_index.edge_count());
        counts.insert(EdgeKind::Block.as_str().to_string(), state.blocks.edge_count());
        Ok(counts)
    }

    fn flush(&self) -> StoreResult<()> {
        let Some(ref path) = self.snapshot_path else {
            return Ok(());
        };
        // Snapshot under the read lock, write the file without holding it
        let snapshot = self.read()?.to_snapshot();
        Self::write_snapshot(path, &snapshot)
    }
}
