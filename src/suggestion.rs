//! SuggestionEngine - "people you may know"
//!
//! Candidates come from second-degree expansion over followings, topped up
//! with random users when the expansion comes back short. The requester and
//! anyone blocked in either direction are filtered out. Membership only, no
//! ranking.

use std::collections::HashSet;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::block::BlockGuard;
use crate::error::Result;
use crate::graph::GraphStore;
use crate::storage::ConnectionQuery;

/// Number of suggestions aimed for when not configured otherwise
pub const DEFAULT_SUGGESTION_TARGET: usize = 15;

#[derive(Clone)]
pub struct SuggestionEngine {
    store: Arc<dyn GraphStore>,
    guard: BlockGuard,
    target: usize,
}

impl SuggestionEngine {
    pub fn new(store: Arc<dyn GraphStore>, guard: BlockGuard, target: usize) -> Self {
        Self { store, guard, target }
    }

    /// Friends of friends of `user_id`.
    ///
    /// Fails only if the user's own followings cannot be read. A neighbor
    /// whose followings cannot be read is skipped.
    #[instrument(skip(self))]
    pub fn expand(&self, user_id: &str) -> Result<HashSet<String>> {
        let followings = self
            .store
            .find_connections(&ConnectionQuery::new().from(user_id).connected())?;

        let candidates: HashSet<String> = followings
            .par_iter()
            .flat_map_iter(|following| {
                let via = following.connected_user_id.as_str();
                match self.store.followings_not_connected_to(via, user_id) {
                    Ok(found) => found,
                    Err(e) => {
                        warn!("Skipping followings of {} for user {}: {}", via, user_id, e);
                        Vec::new()
                    }
                }
            })
            .collect();

        debug!(
            "Expanded {} followings of user {} into {} candidates",
            followings.len(),
            user_id,
            candidates.len()
        );
        Ok(candidates)
    }

    /// Suggestions for `user_id` with the configured target
    pub fn get_suggestions(&self, user_id: &str) -> Result<Vec<String>> {
        self.suggest(user_id, self.target)
    }

    #[instrument(skip(self))]
    pub fn suggest(&self, user_id: &str, target: usize) -> Result<Vec<String>> {
        info!("Get suggestions for user {}", user_id);

        let mut candidates = self.expand(user_id)?;

        if candidates.len() < target {
            let mut exclude = candidates.clone();
            exclude.insert(user_id.to_string());
            match self.store.random_users(&exclude, target - candidates.len()) {
                Ok(extra) => candidates.extend(extra),
                Err(e) => warn!("Random backfill for user {} failed: {}", user_id, e),
            }
        }

        Ok(candidates
            .into_iter()
            .filter(|candidate| candidate != user_id)
            .filter(|candidate| match self.guard.is_blocked_either(user_id, candidate) {
                Ok(blocked) => !blocked,
                Err(e) => {
                    warn!("Dropping suggestion {} for user {}: {}", candidate, user_id, e);
                    false
                }
            })
            .collect())
    }
}
