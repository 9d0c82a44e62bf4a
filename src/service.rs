//! Service - the components wired around one shared store.

use std::sync::Arc;

use tracing::info;

use crate::block::BlockGuard;
use crate::config::Config;
use crate::error::{Result, StoreResult};
use crate::graph::{GraphStore, MemoryGraph};
use crate::relationship::RelationshipEngine;
use crate::suggestion::SuggestionEngine;
use crate::visibility::{PeerVisibility, StaticVisibility, VisibilityLookup};

/// Size of the graph as last flushed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub users: usize,
    pub edges: usize,
}

#[derive(Clone)]
pub struct Service {
    store: Arc<dyn GraphStore>,
    pub blocks: BlockGuard,
    pub relationships: RelationshipEngine,
    pub suggestions: SuggestionEngine,
}

impl Service {
    pub fn new(
        store: Arc<dyn GraphStore>,
        visibility: Arc<dyn VisibilityLookup>,
        config: &Config,
    ) -> Self {
        let blocks = BlockGuard::new(store.clone());
        let relationships = RelationshipEngine::new(store.clone(), blocks.clone(), visibility);
        let suggestions =
            SuggestionEngine::new(store.clone(), blocks.clone(), config.suggestion_target);
        Self {
            store,
            blocks,
            relationships,
            suggestions,
        }
    }

    /// Open the store and visibility lookup described by `config`.
    pub fn from_config(config: &Config) -> StoreResult<Self> {
        let store: Arc<dyn GraphStore> = match &config.data_dir {
            Some(dir) => {
                info!("Opening graph snapshot in {:?}", dir);
                Arc::new(MemoryGraph::open(dir)?)
            }
            None => {
                info!("Using ephemeral in-memory graph");
                Arc::new(MemoryGraph::ephemeral())
            }
        };

        let visibility: Arc<dyn VisibilityLookup> = match &config.visibility_socket {
            Some(socket) => {
                info!("Resolving visibility through identity service at {:?}", socket);
                Arc::new(PeerVisibility::new(socket, config.visibility_timeout()))
            }
            None => {
                info!("Resolving visibility locally (default private: {})", config.default_private);
                Arc::new(StaticVisibility::new(config.default_private))
            }
        };

        Ok(Self::new(store, visibility, config))
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Persist the graph and report what was written.
    pub fn flush(&self) -> Result<FlushReport> {
        self.store.flush()?;
        let users = self.store.user_count()?;
        let edges = self.store.count_edges_by_type()?.values().sum();
        info!("Flushed graph: {} users, {} edges", users, edges);
        Ok(FlushReport { users, edges })
    }
}
