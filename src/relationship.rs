//! RelationshipEngine - the connection state machine.
//!
//! Per ordered pair (user_id, connected_user_id):
//!
//! ```text
//! NONE --create(private)--> PENDING --approve--> CONNECTED
//!   ^                          |                     |
//!   +---------reject-----------+                     |
//!   +---------------------delete---------------------+
//! NONE --create(public)--> CONNECTED
//! ```
//!
//! Every mutation checks `BlockGuard::is_blocked_either` first and refuses
//! with `Blocked`. The check and the write are separate store calls; a block
//! landing in between is not detected.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::block::BlockGuard;
use crate::error::{ConnectionError, Result};
use crate::graph::GraphStore;
use crate::storage::{ConnectionQuery, ConnectionRecord, ConnectionState};
use crate::visibility::VisibilityLookup;

/// Which per-edge notification toggle to flip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Message,
    Post,
    Comment,
}

impl NotificationKind {
    fn flip(self, record: &mut ConnectionRecord) {
        let flag = match self {
            NotificationKind::Message => &mut record.message_notifications,
            NotificationKind::Post => &mut record.post_notifications,
            NotificationKind::Comment => &mut record.comment_notifications,
        };
        *flag = !*flag;
    }
}

#[derive(Clone)]
pub struct RelationshipEngine {
    store: Arc<dyn GraphStore>,
    guard: BlockGuard,
    visibility: Arc<dyn VisibilityLookup>,
}

impl RelationshipEngine {
    pub fn new(
        store: Arc<dyn GraphStore>,
        guard: BlockGuard,
        visibility: Arc<dyn VisibilityLookup>,
    ) -> Self {
        Self { store, guard, visibility }
    }

    fn ensure_not_blocked(&self, user_id: &str, other_id: &str) -> Result<()> {
        if self.guard.is_blocked_either(user_id, other_id)? {
            warn!("Refusing operation, users {} and {} are blocked", user_id, other_id);
            return Err(ConnectionError::blocked(user_id, other_id));
        }
        Ok(())
    }

    fn require_connection(&self, user_id: &str, connected_user_id: &str) -> Result<ConnectionRecord> {
        self.store
            .get_connection(user_id, connected_user_id)?
            .ok_or_else(|| ConnectionError::not_found(user_id, connected_user_id))
    }

    fn require_pending(&self, user_id: &str, connected_user_id: &str) -> Result<ConnectionRecord> {
        let record = self.require_connection(user_id, connected_user_id)?;
        if !record.is_pending() {
            return Err(ConnectionError::not_pending(user_id, connected_user_id));
        }
        Ok(record)
    }

    // === STATE MACHINE ===

    /// Request a connection from `user_id` to `connected_user_id`.
    ///
    /// Public targets are connected immediately, private targets get a
    /// pending request. An existing edge for the pair is returned as is.
    #[instrument(skip(self))]
    pub fn create_connection(&self, user_id: &str, connected_user_id: &str) -> Result<ConnectionRecord> {
        info!("Creating connection by user {} with user {}", user_id, connected_user_id);

        self.ensure_not_blocked(user_id, connected_user_id)?;

        let is_private = self.visibility.is_private(connected_user_id).map_err(|e| {
            error!("Visibility lookup for user {} failed: {}", connected_user_id, e);
            e
        })?;

        let state = if is_private {
            ConnectionState::Pending
        } else {
            ConnectionState::Connected
        };

        Ok(self
            .store
            .merge_connection(ConnectionRecord::new(user_id, connected_user_id, state))?)
    }

    /// Approve the pending request `user_id -> connected_user_id`.
    ///
    /// Issued by `connected_user_id`, the party that received the request.
    #[instrument(skip(self))]
    pub fn approve_connection(&self, user_id: &str, connected_user_id: &str) -> Result<ConnectionRecord> {
        info!(
            "Approving connection request from user {} by user {}",
            user_id, connected_user_id
        );

        self.ensure_not_blocked(user_id, connected_user_id)?;

        let mut record = self.require_pending(user_id, connected_user_id)?;
        record.state = ConnectionState::Connected;
        Ok(self.store.update_connection(record)?)
    }

    /// Reject the pending request `user_id -> connected_user_id`, removing it.
    #[instrument(skip(self))]
    pub fn reject_connection(&self, user_id: &str, connected_user_id: &str) -> Result<()> {
        info!(
            "Rejecting connection request from user {} by user {}",
            user_id, connected_user_id
        );

        self.ensure_not_blocked(user_id, connected_user_id)?;

        self.require_pending(user_id, connected_user_id)?;
        self.store.delete_connection(user_id, connected_user_id)?;
        Ok(())
    }

    /// Delete the edge `user_id -> connected_user_id` in any state.
    /// Absence is not an error.
    #[instrument(skip(self))]
    pub fn delete_connection(&self, user_id: &str, connected_user_id: &str) -> Result<()> {
        info!("Deleting connection of user {} with user {}", user_id, connected_user_id);

        self.ensure_not_blocked(user_id, connected_user_id)?;

        self.store.delete_connection(user_id, connected_user_id)?;
        Ok(())
    }

    /// Approve every request directed at `user_id`.
    ///
    /// Stops at the first failure and returns it; approvals already applied
    /// stay applied.
    #[instrument(skip(self))]
    pub fn approve_all_connections(&self, user_id: &str) -> Result<Vec<ConnectionRecord>> {
        info!("Approving all connection requests of user {}", user_id);

        let requests = self.get_all_requests_sent_to(user_id)?;
        let mut approved = Vec::with_capacity(requests.len());
        for request in requests {
            approved.push(self.approve_connection(&request.user_id, &request.connected_user_id)?);
        }
        Ok(approved)
    }

    // === NOTIFICATION TOGGLES ===

    fn toggle_notification(
        &self,
        user_id: &str,
        connected_user_id: &str,
        kind: NotificationKind,
    ) -> Result<ConnectionRecord> {
        info!(
            "Changing {:?} notification of connection {} -> {}",
            kind, user_id, connected_user_id
        );

        self.ensure_not_blocked(user_id, connected_user_id)?;

        let mut record = self.require_connection(user_id, connected_user_id)?;
        kind.flip(&mut record);
        Ok(self.store.update_connection(record)?)
    }

    #[instrument(skip(self))]
    pub fn change_message_notification(
        &self,
        user_id: &str,
        connected_user_id: &str,
    ) -> Result<ConnectionRecord> {
        self.toggle_notification(user_id, connected_user_id, NotificationKind::Message)
    }

    #[instrument(skip(self))]
    pub fn change_post_notification(
        &self,
        user_id: &str,
        connected_user_id: &str,
    ) -> Result<ConnectionRecord> {
        self.toggle_notification(user_id, connected_user_id, NotificationKind::Post)
    }

    #[instrument(skip(self))]
    pub fn change_comment_notification(
        &self,
        user_id: &str,
        connected_user_id: &str,
    ) -> Result<ConnectionRecord> {
        self.toggle_notification(user_id, connected_user_id, NotificationKind::Comment)
    }

    // === QUERIES ===

    #[instrument(skip(self))]
    pub fn get_connection(&self, user_id: &str, connected_user_id: &str) -> Result<ConnectionRecord> {
        self.require_connection(user_id, connected_user_id)
    }

    /// Edges touching `user_id` in either direction, any state
    #[instrument(skip(self))]
    pub fn get_all_connections(&self, user_id: &str) -> Result<Vec<ConnectionRecord>> {
        info!("Get all connections of user {}", user_id);
        Ok(self.store.find_connections(&ConnectionQuery::new().touching(user_id))?)
    }

    /// Connected edges `user_id -> *`
    #[instrument(skip(self))]
    pub fn get_followings(&self, user_id: &str) -> Result<Vec<ConnectionRecord>> {
        info!("Get followings of user {}", user_id);
        Ok(self
            .store
            .find_connections(&ConnectionQuery::new().from(user_id).connected())?)
    }

    /// Connected edges `* -> user_id`
    #[instrument(skip(self))]
    pub fn get_followers(&self, user_id: &str) -> Result<Vec<ConnectionRecord>> {
        info!("Get followers of user {}", user_id);
        Ok(self
            .store
            .find_connections(&ConnectionQuery::new().to(user_id).connected())?)
    }

    /// Pending requests `* -> user_id` awaiting this user's approval
    #[instrument(skip(self))]
    pub fn get_all_requests_sent_to(&self, user_id: &str) -> Result<Vec<ConnectionRecord>> {
        info!("Get all connection requests sent to user {}", user_id);
        Ok(self
            .store
            .find_connections(&ConnectionQuery::new().to(user_id).pending())?)
    }

    /// Pending requests `user_id -> *` this user is waiting on
    #[instrument(skip(self))]
    pub fn get_all_pending_sent_by(&self, user_id: &str) -> Result<Vec<ConnectionRecord>> {
        info!("Get all pending connections sent by user {}", user_id);
        Ok(self
            .store
            .find_connections(&ConnectionQuery::new().from(user_id).pending())?)
    }
}
