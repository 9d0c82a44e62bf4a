//! Edge records stored in the relationship graph

use serde::{Deserialize, Serialize};

/// Edge types in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Connect,
    Block,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Connect => "CONNECT",
            EdgeKind::Block => "BLOCK",
        }
    }
}

/// Lifecycle state of a stored CONNECT edge.
///
/// There is no "neither" state: an edge that is neither pending nor
/// connected is deleted, not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Request awaiting approval by the connected user
    Pending,
    /// Accepted relationship
    Connected,
}

/// CONNECT edge `user_id -> connected_user_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Requester / follower
    pub user_id: String,

    /// Target / followed user
    pub connected_user_id: String,

    pub state: ConnectionState,

    pub message_notifications: bool,
    pub post_notifications: bool,
    pub comment_notifications: bool,
}

impl ConnectionRecord {
    /// New edge with every notification toggle enabled.
    pub fn new(
        user_id: impl Into<String>,
        connected_user_id: impl Into<String>,
        state: ConnectionState,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            connected_user_id: connected_user_id.into(),
            state,
            message_notifications: true,
            post_notifications: true,
            comment_notifications: true,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn is_pending(&self) -> bool {
        self.state == ConnectionState::Pending
    }

    /// True if this edge touches `user_id` in either direction.
    pub fn touches(&self, user_id: &str) -> bool {
        self.user_id == user_id || self.connected_user_id == user_id
    }
}

/// BLOCK edge `user_id -> blocked_user_id` (existence only)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRecord {
    pub user_id: String,
    pub blocked_user_id: String,
}

/// Query for filtering CONNECT edges
///
/// All set filters must match (AND semantics).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionQuery {
    /// Edge source
    pub user_id: Option<String>,
    /// Edge target
    pub connected_user_id: Option<String>,
    /// Either endpoint
    pub touching: Option<String>,
    pub state: Option<ConnectionState>,
}

impl ConnectionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Edges going out of `user_id`.
    pub fn from(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Edges coming into `user_id`.
    pub fn to(mut self, user_id: impl Into<String>) -> Self {
        self.connected_user_id = Some(user_id.into());
        self
    }

    pub fn touching(mut self, user_id: impl Into<String>) -> Self {
        self.touching = Some(user_id.into());
        self
    }

    pub fn state(mut self, state: ConnectionState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn pending(self) -> Self {
        self.state(ConnectionState::Pending)
    }

    pub fn connected(self) -> Self {
        self.state(ConnectionState::Connected)
    }

    pub fn matches(&self, record: &ConnectionRecord) -> bool {
        if let Some(ref user_id) = self.user_id {
            if &record.user_id != user_id {
                return false;
            }
        }
        if let Some(ref connected_user_id) = self.connected_user_id {
            if &record.connected_user_id != connected_user_id {
                return false;
            }
        }
        if let Some(ref user_id) = self.touching {
            if !record.touches(user_id) {
                return false;
            }
        }
        if let Some(state) = self.state {
            if record.state != state {
                return false;
            }
        }
        true
    }
}
